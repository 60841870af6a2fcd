//! Bearer tokens for Azure resources.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use todo_core::{AccessToken, BackendError, ManagedIdentityEndpoint};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::transport::Transport;

/// Tokens are refreshed this many seconds before they expire.
const REFRESH_MARGIN_SECS: i64 = 300;

#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// A bearer token valid for `resource` (the token audience).
    async fn token(&self, resource: &str) -> Result<String, BackendError>;
}

/// A fixed token, typically from `AZURE_ACCESS_TOKEN` during development.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn token(&self, _resource: &str) -> Result<String, BackendError> {
        Ok(self.token.clone())
    }
}

/// Tokens from the App Service identity endpoint or IMDS, cached per
/// resource.
pub struct ManagedIdentityCredential {
    endpoint: ManagedIdentityEndpoint,
    transport: Transport,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl ManagedIdentityCredential {
    pub fn new(endpoint: ManagedIdentityEndpoint, transport: Transport) -> Self {
        Self {
            endpoint,
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env(transport: Transport) -> Self {
        let endpoint = ManagedIdentityEndpoint::detect(
            std::env::var("IDENTITY_ENDPOINT").ok(),
            std::env::var("IDENTITY_HEADER").ok(),
        );
        Self::new(endpoint, transport)
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn token(&self, resource: &str) -> Result<String, BackendError> {
        // Held across the fetch so concurrent callers share one request.
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(resource) {
            if cached.expires_on - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(cached.token.clone());
            }
        }

        let request = self.endpoint.build_token_request(resource)?;
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| BackendError::Credential(e.to_string()))?;
        let token = self.endpoint.parse_token_response(response)?;
        debug!(resource, expires_on = %token.expires_on, "Acquired managed identity token");

        let value = token.token.clone();
        cache.insert(resource.to_string(), token);
        Ok(value)
    }
}

/// `AZURE_ACCESS_TOKEN` when set, managed identity otherwise.
pub fn default_credential(transport: &Transport) -> Arc<dyn TokenCredential> {
    match std::env::var("AZURE_ACCESS_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            info!("Using static access token from AZURE_ACCESS_TOKEN");
            Arc::new(StaticTokenCredential::new(token.trim()))
        }
        _ => {
            let credential = ManagedIdentityCredential::from_env(transport.clone());
            info!(endpoint = ?credential.endpoint, "Using managed identity credential");
            Arc::new(credential)
        }
    }
}
