//! Azure Blob Storage request builder and response parser.
//!
//! # Design
//! `BlobContainer` holds only the account endpoint and the container name.
//! Each operation is a `build_*` method producing an [`HttpRequest`] and a
//! `parse_*` method interpreting the [`HttpResponse`]; the caller supplies
//! the bearer token and the request time and performs the round-trip.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::BackendError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Storage service version sent with every request. Bearer-token auth needs
/// 2017-11-09 or later.
pub const BLOB_API_VERSION: &str = "2021-08-06";

/// Token audience for Azure Storage.
pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

/// Blob key under which a todo is mirrored.
pub fn todo_blob_key(id: u64) -> String {
    format!("todos/{id}.json")
}

/// The public endpoint of a storage account.
pub fn account_endpoint(account: &str) -> String {
    format!("https://{account}.blob.core.windows.net")
}

/// RFC 1123 date as required by the `x-ms-date` header.
pub fn ms_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Debug, Clone)]
pub struct BlobContainer {
    endpoint: String,
    container: String,
}

impl BlobContainer {
    /// `endpoint` is the account's blob endpoint, e.g.
    /// `https://myaccount.blob.core.windows.net`.
    pub fn new(endpoint: &str, container: &str) -> Result<Self, BackendError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| BackendError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::InvalidEndpoint(endpoint.to_string()));
        }
        validate_container_name(container)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            container: container.to_string(),
        })
    }

    pub fn for_account(account: &str, container: &str) -> Result<Self, BackendError> {
        Self::new(&account_endpoint(account), container)
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn container_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.container)
    }

    pub fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.container_url(), key)
    }

    /// Put Block Blob with a JSON body, overwriting any existing blob.
    pub fn build_put_json(
        &self,
        key: &str,
        body: String,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<HttpRequest, BackendError> {
        validate_blob_key(key)?;
        let mut headers = common_headers(token, now);
        headers.push(("x-ms-blob-type".to_string(), "BlockBlob".to_string()));
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: self.blob_url(key),
            headers,
            body: Some(body),
        })
    }

    pub fn build_delete(
        &self,
        key: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<HttpRequest, BackendError> {
        validate_blob_key(key)?;
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: self.blob_url(key),
            headers: common_headers(token, now),
            body: None,
        })
    }

    pub fn build_create_container(&self, token: &str, now: DateTime<Utc>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}?restype=container", self.container_url()),
            headers: common_headers(token, now),
            body: None,
        }
    }

    pub fn parse_put(&self, response: HttpResponse) -> Result<(), BackendError> {
        response.expect_status(&[201])?;
        Ok(())
    }

    /// Returns whether a blob was actually removed. A missing blob is not an
    /// error.
    pub fn parse_delete(&self, response: HttpResponse) -> Result<bool, BackendError> {
        Ok(response.expect_status(&[202, 404])? == 202)
    }

    /// Returns whether the container was created by this call. An existing
    /// container is not an error.
    pub fn parse_create_container(&self, response: HttpResponse) -> Result<bool, BackendError> {
        Ok(response.expect_status(&[201, 409])? == 201)
    }
}

fn common_headers(token: &str, now: DateTime<Utc>) -> Vec<(String, String)> {
    vec![
        ("authorization".to_string(), format!("Bearer {token}")),
        ("x-ms-version".to_string(), BLOB_API_VERSION.to_string()),
        ("x-ms-date".to_string(), ms_date(now)),
    ]
}

/// Container names: 3-63 chars of lowercase letters, digits and single
/// dashes, starting and ending with a letter or digit.
fn validate_container_name(name: &str) -> Result<(), BackendError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidName(format!("container {name:?}")))
    }
}

fn validate_blob_key(key: &str) -> Result<(), BackendError> {
    let valid = !key.is_empty()
        && key.len() <= 1024
        && !key.starts_with('/')
        && key.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..")
        && !key.contains(&['?', '#'][..]);
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidName(format!("blob {key:?}")))
    }
}
