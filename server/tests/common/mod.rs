//! Shared helpers for the router-level tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{self, Request};
use http_body_util::BodyExt;
use todo_api::{AppState, BlobStore, LoadedSecrets, Mirror};
use todo_core::BackendError;

pub async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOp {
    Put { key: String, body: String },
    Delete { key: String },
}

/// Records every operation and always succeeds.
#[derive(Default)]
pub struct RecordingStore {
    pub ops: Mutex<Vec<BlobOp>>,
}

impl RecordingStore {
    pub fn ops(&self) -> Vec<BlobOp> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn put_json(&self, key: &str, body: String) -> Result<(), BackendError> {
        self.ops.lock().unwrap().push(BlobOp::Put {
            key: key.to_string(),
            body,
        });
        Ok(())
    }

    async fn delete_if_exists(&self, key: &str) -> Result<bool, BackendError> {
        self.ops.lock().unwrap().push(BlobOp::Delete {
            key: key.to_string(),
        });
        Ok(true)
    }
}

/// Fails every operation, like a backend with revoked permissions.
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    fn describe(&self) -> String {
        "failing".to_string()
    }

    async fn put_json(&self, _key: &str, _body: String) -> Result<(), BackendError> {
        Err(BackendError::UnexpectedStatus {
            status: 403,
            code: Some("AuthorizationPermissionMismatch".to_string()),
            body: String::new(),
        })
    }

    async fn delete_if_exists(&self, _key: &str) -> Result<bool, BackendError> {
        Err(BackendError::Transport("connection reset".to_string()))
    }
}

pub fn state_with_store(store: Arc<dyn BlobStore>) -> AppState {
    AppState::new(Mirror::new(store), None)
}

pub fn state_with_secrets(secrets: LoadedSecrets) -> AppState {
    AppState::new(Mirror::disabled(), Some(secrets))
}
