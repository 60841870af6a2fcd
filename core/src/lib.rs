//! Domain model and I/O-free backend protocol for the todo service.
//!
//! # Overview
//! Holds the authoritative in-memory [`TodoStore`] and the request builders
//! and response parsers for the Azure backends the service mirrors into. No
//! function in this crate touches the network or reads the clock: callers
//! pass in `now` and execute every [`HttpRequest`] themselves
//! (host-does-IO), which keeps the core deterministic and easy to test.
//!
//! # Design
//! - `TodoStore` is a plain synchronous collection; locking is the caller's
//!   concern.
//! - Each backend call is split into `build_*` (produces a request) and
//!   `parse_*` (consumes a response), so the I/O boundary is explicit.
//! - Backend failures surface as [`BackendError`]; the server decides that
//!   they are advisory.

pub mod blob;
pub mod error;
pub mod http;
pub mod identity;
pub mod keyvault;
pub mod store;
pub mod types;

pub use blob::{todo_blob_key, BlobContainer};
pub use error::{BackendError, StoreError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use identity::{AccessToken, ManagedIdentityEndpoint};
pub use keyvault::{KeyVault, SecretBundle};
pub use store::TodoStore;
pub use types::{CreateTodo, DeletedTodo, ErrorBody, Todo, TodoList, UpdateTodo};
