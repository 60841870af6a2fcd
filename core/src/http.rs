//! HTTP transport types for the host-does-IO pattern.
//!
//! The core builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; the server executes the round-trip.

use crate::error::BackendError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Accept any of `expected`, otherwise turn the response into a
    /// [`BackendError::UnexpectedStatus`] carrying the Azure error code.
    pub(crate) fn expect_status(&self, expected: &[u16]) -> Result<u16, BackendError> {
        if expected.contains(&self.status) {
            return Ok(self.status);
        }
        Err(BackendError::UnexpectedStatus {
            status: self.status,
            code: self.header("x-ms-error-code").map(str::to_string),
            body: self.body.clone(),
        })
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
