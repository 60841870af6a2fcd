//! Azure Key Vault "Get Secret" request builder and response parser.
//!
//! Only the latest version of a secret is ever read. The parsed
//! [`SecretBundle`] carries the secret's attributes only; the value in the
//! response body is never deserialized, so it cannot leak through logging.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::BackendError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const KEY_VAULT_API_VERSION: &str = "7.4";

/// Token audience for Key Vault.
pub const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";

pub fn vault_endpoint(name: &str) -> String {
    format!("https://{name}.vault.azure.net")
}

#[derive(Debug, Clone)]
pub struct KeyVault {
    endpoint: String,
}

/// Attributes of a secret as returned by Key Vault.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretBundle {
    #[serde(default)]
    attributes: SecretAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SecretAttributes {
    #[serde(default)]
    enabled: Option<bool>,
    /// Expiry as Unix seconds.
    #[serde(default)]
    exp: Option<i64>,
}

impl SecretBundle {
    pub fn new(expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            attributes: SecretAttributes {
                enabled: Some(true),
                exp: expires_on.map(|ts| ts.timestamp()),
            },
        }
    }

    pub fn enabled(&self) -> bool {
        self.attributes.enabled.unwrap_or(true)
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .exp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl KeyVault {
    pub fn new(endpoint: &str) -> Result<Self, BackendError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| BackendError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn for_name(name: &str) -> Result<Self, BackendError> {
        Self::new(&vault_endpoint(name))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_get_secret(&self, name: &str, token: &str) -> Result<HttpRequest, BackendError> {
        validate_secret_name(name)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!(
                "{}/secrets/{name}?api-version={KEY_VAULT_API_VERSION}",
                self.endpoint
            ),
            headers: vec![("authorization".to_string(), format!("Bearer {token}"))],
            body: None,
        })
    }

    pub fn parse_get_secret(&self, response: HttpResponse) -> Result<SecretBundle, BackendError> {
        response.expect_status(&[200])?;
        serde_json::from_str(&response.body)
            .map_err(|e| BackendError::Deserialization(e.to_string()))
    }
}

/// Secret names: 1-127 alphanumerics and dashes.
fn validate_secret_name(name: &str) -> Result<(), BackendError> {
    let valid = (1..=127).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidName(format!("secret {name:?}")))
    }
}
