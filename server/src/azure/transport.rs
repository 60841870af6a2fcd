//! Executes core [`HttpRequest`]s over the network.

use std::time::Duration;

use todo_core::{BackendError, HttpMethod, HttpRequest, HttpResponse};
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    /// Every request made through this transport, including connect and body
    /// read, is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("todo-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BackendError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let request_id = Uuid::new_v4().to_string();
        trace!(method = %method, url = %request.url, request_id = %request_id, "backend request");

        let mut builder = self
            .client
            .request(method.clone(), &request.url)
            .header("x-ms-client-request-id", &request_id);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        match request.body {
            Some(body) => builder = builder.body(body),
            // Azure rejects bodiless PUTs without an explicit zero length.
            None if method == reqwest::Method::PUT => builder = builder.body(""),
            None => {}
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        trace!(status, request_id = %request_id, "backend response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}
