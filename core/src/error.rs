//! Error types for the todo store and the backend protocol.
//!
//! # Design
//! `StoreError` is the user-facing taxonomy: every variant maps to an HTTP
//! status. `BackendError` covers everything that can go wrong talking to blob
//! storage, Key Vault or the identity endpoint. It carries strings rather
//! than transport error types so the core stays free of an HTTP client.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`crate::TodoStore`] operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The request failed validation (missing or empty title).
    #[error("{0}")]
    Validation(String),

    /// No todo with this id exists.
    #[error("todo {0} not found")]
    NotFound(u64),
}

/// Errors from an external backend. Always advisory: the server logs and
/// swallows them.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a status the operation does not accept.
    #[error("unexpected status {status}{}: {body}", error_code_suffix(.code))]
    UnexpectedStatus {
        status: u16,
        code: Option<String>,
        body: String,
    },

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A configured endpoint is not a usable URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A blob key, container or secret name is not acceptable to the backend.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// No bearer token could be obtained.
    #[error("credential unavailable: {0}")]
    Credential(String),
}

fn error_code_suffix(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
}
