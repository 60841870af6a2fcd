//! Process-wide application state.
//!
//! # Design
//! One `AppState` is built at startup and handed to every handler through
//! axum's `State` extractor. It owns the todo store (behind an async
//! read/write lock, since handlers run on a multi-threaded runtime), the
//! mirror, and the outcome of secret loading. Nothing lives in globals.

use std::sync::Arc;

use todo_core::{BackendError, BlobContainer, KeyVault, Todo, TodoStore};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::azure::{default_credential, AzureBlobStore, KeyVaultClient, TokenCredential, Transport};
use crate::config::Config;
use crate::mirror::{BlobStore, Mirror};
use crate::secrets::{load_secrets, LoadedSecrets};

pub type Db = Arc<RwLock<TodoStore>>;

#[derive(Clone)]
pub struct AppState {
    store: Db,
    mirror: Mirror,
    secrets: Option<Arc<LoadedSecrets>>,
}

impl AppState {
    /// `secrets` is `Some` when a secrets store was configured, even if
    /// nothing could be loaded from it.
    pub fn new(mirror: Mirror, secrets: Option<LoadedSecrets>) -> Self {
        Self {
            store: Arc::new(RwLock::new(TodoStore::new())),
            mirror,
            secrets: secrets.map(Arc::new),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Mirror::disabled(), None)
    }

    /// Build state from configuration using the default credential chain.
    /// Never fails: a backend that cannot be set up is logged and left out.
    pub async fn connect(config: &Config) -> Self {
        let transport = match Transport::new(config.backend_timeout()) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "Could not build backend HTTP client; running in-memory only");
                return Self::in_memory();
            }
        };
        if !config.storage_configured() && !config.key_vault_configured() {
            info!("No Azure backends configured; running in-memory only");
            return Self::in_memory();
        }
        let credential = default_credential(&transport);
        Self::connect_with(config, transport, credential).await
    }

    pub async fn connect_with(
        config: &Config,
        transport: Transport,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        let timeout = transport.timeout();
        let secrets = match key_vault(config) {
            Some(Ok(vault)) => {
                info!(vault = %vault.endpoint(), "Connected to Key Vault");
                let client = KeyVaultClient::new(vault, credential.clone(), transport.clone());
                Some(load_secrets(&client, config.secret_names()).await)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Invalid Key Vault configuration; continuing without it");
                None
            }
            None => None,
        };

        let mirror = match blob_container(config) {
            Some(Ok(container)) => {
                let store = AzureBlobStore::new(container, credential, transport);
                info!(container = %store.describe(), "Connected to Storage");
                if config.create_container {
                    match store.ensure_container().await {
                        Ok(true) => info!("Created blob container"),
                        Ok(false) => info!("Blob container already exists"),
                        Err(e) => warn!(error = %e, "Could not create blob container"),
                    }
                }
                Mirror::new(Arc::new(store))
            }
            Some(Err(e)) => {
                warn!(error = %e, "Invalid storage configuration; mirroring disabled");
                Mirror::disabled()
            }
            None => Mirror::disabled(),
        };

        info!(
            storage = mirror.is_configured(),
            key_vault = secrets.is_some(),
            timeout_ms = timeout.as_millis() as u64,
            "Azure integrations initialized"
        );
        Self::new(mirror, secrets)
    }

    pub fn store(&self) -> &Db {
        &self.store
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn secrets(&self) -> Option<&LoadedSecrets> {
        self.secrets.as_deref()
    }

    /// Second half of the create/update pipeline: write the mirror, record
    /// the outcome on the stored todo and return the todo as the caller
    /// should see it. The store lock is not held while the write is awaited.
    pub async fn mirror_write(&self, mut todo: Todo) -> Todo {
        if let Some(stored) = self.mirror.write_todo(&todo).await {
            self.store.write().await.record_mirror_outcome(todo.id, stored);
            todo.stored_in_blob = Some(stored);
        }
        todo
    }
}

fn key_vault(config: &Config) -> Option<Result<KeyVault, BackendError>> {
    match config.key_vault_endpoint() {
        Some(endpoint) => Some(KeyVault::new(endpoint)),
        None => config.key_vault().map(KeyVault::for_name),
    }
}

fn blob_container(config: &Config) -> Option<Result<BlobContainer, BackendError>> {
    let container = config.storage_container.trim();
    match config.storage_endpoint() {
        Some(endpoint) => Some(BlobContainer::new(endpoint, container)),
        None => config
            .storage_account()
            .map(|account| BlobContainer::for_account(account, container)),
    }
}
