use std::sync::Arc;

use async_trait::async_trait;
use todo_core::keyvault::KEY_VAULT_RESOURCE;
use todo_core::{BackendError, KeyVault, SecretBundle};

use super::credential::TokenCredential;
use super::transport::Transport;
use crate::secrets::SecretSource;

/// [`SecretSource`] backed by Azure Key Vault.
pub struct KeyVaultClient {
    vault: KeyVault,
    credential: Arc<dyn TokenCredential>,
    transport: Transport,
}

impl KeyVaultClient {
    pub fn new(vault: KeyVault, credential: Arc<dyn TokenCredential>, transport: Transport) -> Self {
        Self {
            vault,
            credential,
            transport,
        }
    }
}

#[async_trait]
impl SecretSource for KeyVaultClient {
    fn describe(&self) -> String {
        self.vault.endpoint().to_string()
    }

    async fn get_secret(&self, name: &str) -> Result<SecretBundle, BackendError> {
        let token = self.credential.token(KEY_VAULT_RESOURCE).await?;
        let request = self.vault.build_get_secret(name, &token)?;
        let response = self.transport.execute(request).await?;
        self.vault.parse_get_secret(response)
    }
}
