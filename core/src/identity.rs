//! Managed-identity token requests.
//!
//! Two sources are supported: the App Service identity endpoint (advertised
//! through `IDENTITY_ENDPOINT` / `IDENTITY_HEADER`) and the VM instance
//! metadata service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::BackendError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

#[derive(Clone)]
pub enum ManagedIdentityEndpoint {
    AppService { endpoint: String, header: String },
    Imds { endpoint: String },
}

impl fmt::Debug for ManagedIdentityEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppService { endpoint, .. } => f
                .debug_struct("AppService")
                .field("endpoint", endpoint)
                .finish_non_exhaustive(),
            Self::Imds { endpoint } => f.debug_struct("Imds").field("endpoint", endpoint).finish(),
        }
    }
}

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_on: ExpiresOn,
}

/// IMDS returns `expires_on` as a numeric string, some hosts as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresOn {
    Secs(i64),
    Text(String),
}

impl ManagedIdentityEndpoint {
    /// Pick the App Service endpoint when both variables are present,
    /// otherwise fall back to IMDS.
    pub fn detect(identity_endpoint: Option<String>, identity_header: Option<String>) -> Self {
        match (identity_endpoint, identity_header) {
            (Some(endpoint), Some(header)) if !endpoint.is_empty() && !header.is_empty() => {
                Self::AppService { endpoint, header }
            }
            _ => Self::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }

    pub fn build_token_request(&self, resource: &str) -> Result<HttpRequest, BackendError> {
        let (endpoint, api_version, header) = match self {
            Self::AppService { endpoint, header } => (
                endpoint,
                APP_SERVICE_API_VERSION,
                ("x-identity-header".to_string(), header.clone()),
            ),
            Self::Imds { endpoint } => (
                endpoint,
                IMDS_API_VERSION,
                ("metadata".to_string(), "true".to_string()),
            ),
        };
        let url = Url::parse_with_params(
            endpoint,
            &[("api-version", api_version), ("resource", resource)],
        )
        .map_err(|e| BackendError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![header],
            body: None,
        })
    }

    pub fn parse_token_response(&self, response: HttpResponse) -> Result<AccessToken, BackendError> {
        response
            .expect_status(&[200])
            .map_err(|e| BackendError::Credential(e.to_string()))?;
        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| BackendError::Deserialization(e.to_string()))?;

        let secs = match parsed.expires_on {
            ExpiresOn::Secs(secs) => secs,
            ExpiresOn::Text(text) => text
                .parse()
                .map_err(|_| BackendError::Deserialization(format!("expires_on {text:?}")))?,
        };
        let expires_on = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| BackendError::Deserialization(format!("expires_on {secs}")))?;

        Ok(AccessToken {
            token: parsed.access_token,
            expires_on,
        })
    }
}
