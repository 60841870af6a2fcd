use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use todo_core::blob::STORAGE_RESOURCE;
use todo_core::{BackendError, BlobContainer};

use super::credential::TokenCredential;
use super::transport::Transport;
use crate::mirror::BlobStore;

/// [`BlobStore`] backed by an Azure Blob Storage container.
pub struct AzureBlobStore {
    container: BlobContainer,
    credential: Arc<dyn TokenCredential>,
    transport: Transport,
}

impl AzureBlobStore {
    pub fn new(
        container: BlobContainer,
        credential: Arc<dyn TokenCredential>,
        transport: Transport,
    ) -> Self {
        Self {
            container,
            credential,
            transport,
        }
    }

    /// Create the container unless it already exists. Returns whether it was
    /// created by this call.
    pub async fn ensure_container(&self) -> Result<bool, BackendError> {
        let token = self.credential.token(STORAGE_RESOURCE).await?;
        let request = self.container.build_create_container(&token, Utc::now());
        let response = self.transport.execute(request).await?;
        self.container.parse_create_container(response)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn describe(&self) -> String {
        self.container.container_url()
    }

    async fn put_json(&self, key: &str, body: String) -> Result<(), BackendError> {
        let token = self.credential.token(STORAGE_RESOURCE).await?;
        let request = self.container.build_put_json(key, body, &token, Utc::now())?;
        let response = self.transport.execute(request).await?;
        self.container.parse_put(response)
    }

    async fn delete_if_exists(&self, key: &str) -> Result<bool, BackendError> {
        let token = self.credential.token(STORAGE_RESOURCE).await?;
        let request = self.container.build_delete(key, &token, Utc::now())?;
        let response = self.transport.execute(request).await?;
        self.container.parse_delete(response)
    }
}
