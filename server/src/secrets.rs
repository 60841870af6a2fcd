//! Startup-time secret loading.
//!
//! Secrets are fetched once, each independently. Only a per-name "loaded"
//! flag survives; values are never kept. Expiry is
//! logged for diagnostics and never acted on.

use std::collections::BTreeMap;

use async_trait::async_trait;
use todo_core::types::timestamp;
use todo_core::{BackendError, SecretBundle};
use tracing::{info, warn};

/// Anything that can hand out a secret by name.
#[async_trait]
pub trait SecretSource: Send + Sync {
    fn describe(&self) -> String;

    async fn get_secret(&self, name: &str) -> Result<SecretBundle, BackendError>;
}

/// Which secrets were loaded. Serializes as `{name: bool}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct LoadedSecrets {
    flags: BTreeMap<String, bool>,
}

impl LoadedSecrets {
    pub fn is_loaded(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn loaded_count(&self) -> usize {
        self.flags.values().filter(|loaded| **loaded).count()
    }

    pub fn requested_count(&self) -> usize {
        self.flags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(name, loaded)| (name.as_str(), *loaded))
    }
}

pub async fn load_secrets<'a>(
    source: &dyn SecretSource,
    names: impl IntoIterator<Item = &'a str>,
) -> LoadedSecrets {
    let mut flags = BTreeMap::new();
    for name in names {
        let loaded = match source.get_secret(name).await {
            Ok(secret) => {
                let expires = secret
                    .expires_on()
                    .map(|ts| timestamp::format(&ts))
                    .unwrap_or_else(|| "never".to_string());
                info!(secret = name, expires = %expires, enabled = secret.enabled(), "Loaded secret");
                true
            }
            Err(e) => {
                warn!(secret = name, error = %e, "Could not load secret");
                false
            }
        };
        flags.insert(name.to_string(), loaded);
    }

    let secrets = LoadedSecrets { flags };
    info!(
        vault = %source.describe(),
        loaded = secrets.loaded_count(),
        requested = secrets.requested_count(),
        "Secrets loaded"
    );
    secrets
}
