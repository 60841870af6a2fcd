//! Best-effort mirroring of todos into blob storage.
//!
//! # Design
//! `Mirror` wraps an optional [`BlobStore`]. With no store every operation is
//! a no-op. With a store, each write is attempted exactly once; any failure is
//! logged at `warn` and reported to the caller only as a `bool`, never as an
//! error. The HTTP response is built from the todo store, not from here.

use std::sync::Arc;

use async_trait::async_trait;
use todo_core::{todo_blob_key, BackendError, Todo};
use tracing::{debug, warn};

/// A keyed object store that accepts JSON documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    /// Write `body` under `key`, overwriting any existing object.
    async fn put_json(&self, key: &str, body: String) -> Result<(), BackendError>;

    /// Remove the object under `key`. Returns whether one existed.
    async fn delete_if_exists(&self, key: &str) -> Result<bool, BackendError>;
}

#[derive(Clone, Default)]
pub struct Mirror {
    store: Option<Arc<dyn BlobStore>>,
}

impl Mirror {
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Write the todo's JSON under `todos/{id}.json`.
    ///
    /// Returns `None` when mirroring is off, otherwise whether the write
    /// succeeded.
    pub async fn write_todo(&self, todo: &Todo) -> Option<bool> {
        let store = self.store.as_ref()?;
        let key = todo_blob_key(todo.id);

        let body = match todo.to_blob_json() {
            Ok(body) => body,
            Err(e) => {
                warn!(id = todo.id, error = %e, "Could not serialize todo for blob storage");
                return Some(false);
            }
        };

        match store.put_json(&key, body).await {
            Ok(()) => {
                debug!(id = todo.id, key = %key, "Todo mirrored to blob storage");
                Some(true)
            }
            Err(e) => {
                warn!(
                    id = todo.id,
                    store = %store.describe(),
                    key = %key,
                    error = %e,
                    "Could not store todo in blob"
                );
                Some(false)
            }
        }
    }

    /// Remove the todo's blob if present.
    pub async fn remove_todo(&self, id: u64) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let key = todo_blob_key(id);
        match store.delete_if_exists(&key).await {
            Ok(existed) => debug!(id, key = %key, existed, "Todo blob removed"),
            Err(e) => warn!(
                id,
                store = %store.describe(),
                key = %key,
                error = %e,
                "Could not delete todo from blob"
            ),
        }
    }
}
