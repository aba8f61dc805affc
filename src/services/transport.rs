//! Client-side transport to the query endpoint.
//!
//! The chat controller talks to the backend through `QueryTransport`, so
//! tests can script outcomes without a socket and the UI layer never sees
//! HTTP details.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::types::{ErrorResponse, QueryRequest, QueryResponse};

/// Failure of one submission, carrying only the user-facing message the
/// controller surfaces as `error_message`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send(&self, request: QueryRequest) -> Result<QueryResponse, TransportError>;
}

/// Real transport: POSTs to `<base>/query` and lifts the server's
/// `{"error": ...}` body into the failure message.
pub struct HttpTransport {
    http: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            url: format!("{}/query", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn send(&self, request: QueryRequest) -> Result<QueryResponse, TransportError> {
        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("Request failed with status {status}"));
            return Err(TransportError::new(message));
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| TransportError::new(format!("Malformed server response: {e}")))
    }
}
