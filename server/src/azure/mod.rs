//! Azure adapters: a reqwest transport that executes the requests built by
//! `todo_core`, a bearer-token credential, and the blob store and Key Vault
//! implementations of the [`crate::mirror::BlobStore`] and
//! [`crate::secrets::SecretSource`] seams.

pub mod blob;
pub mod credential;
pub mod keyvault;
pub mod transport;

pub use blob::AzureBlobStore;
pub use credential::{default_credential, ManagedIdentityCredential, StaticTokenCredential, TokenCredential};
pub use keyvault::KeyVaultClient;
pub use transport::Transport;
