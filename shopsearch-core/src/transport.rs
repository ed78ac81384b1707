//! HTTP access to the product-search backend.
//!
//! Every call is single-shot: no retries, no timeout beyond the client's
//! connect timeout. All failures are folded into `TransportError`, whose
//! message prefers the server's own `{"error": ...}` text.

use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::types::{ProductResult, SelectedFile};

/// Message used when the backend says `success: false` without saying why.
pub const GENERIC_FAILURE: &str = "search failed";

/// Errors that can occur when talking to the search backend.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Network-level failure (DNS, connection refused, reset, ...).
    Network(String),
    /// The backend answered with a non-2xx status.
    Status { status: u16, message: String },
    /// The backend answered 2xx but reported `success: false`.
    Rejected(String),
    /// The response body could not be decoded.
    MalformedResponse(String),
    /// The request could not be built, so nothing was sent.
    InvalidRequest(String),
}

impl TransportError {
    /// Text suitable for showing to the user.
    pub fn message(&self) -> &str {
        match self {
            Self::Network(msg)
            | Self::Rejected(msg)
            | Self::MalformedResponse(msg)
            | Self::InvalidRequest(msg)
            | Self::Status { message: msg, .. } => msg,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Status { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Rejected(msg) => write!(f, "rejected by server: {msg}"),
            Self::MalformedResponse(msg) => write!(f, "malformed response: {msg}"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outbound calls the search surface depends on.
pub trait Transport: Send + Sync {
    fn search_by_text(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ProductResult>, TransportError>> + Send;

    fn search_by_image(
        &self,
        file: &SelectedFile,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<ProductResult>, TransportError>> + Send;

    fn random_products(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Vec<ProductResult>, TransportError>> + Send;

    fn categories(&self) -> impl Future<Output = Result<Vec<String>, TransportError>> + Send;
}

/// Every backend route answers with some subset of these keys.
#[derive(Debug, Deserialize, Default)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    results: Vec<ProductResult>,
    #[serde(default)]
    products: Vec<ProductResult>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `Transport` backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    api_base: String,
}

impl HttpTransport {
    pub fn new(config: &BackendConfig) -> Result<Self, String> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

impl Transport for HttpTransport {
    async fn search_by_text(&self, query: &str) -> Result<Vec<ProductResult>, TransportError> {
        log::info!("text search: {query:?}");
        let response = self
            .client
            .get(self.endpoint("/search/text"))
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        Ok(envelope.results)
    }

    async fn search_by_image(
        &self,
        file: &SelectedFile,
        top_k: usize,
    ) -> Result<Vec<ProductResult>, TransportError> {
        log::info!(
            "image search: {} ({} bytes, top_k={top_k})",
            file.name,
            file.len()
        );
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| {
                TransportError::InvalidRequest(format!("invalid mime type '{}': {e}", file.mime))
            })?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(self.endpoint("/search/image"))
            .query(&[("top_k", top_k)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        Ok(envelope.results)
    }

    async fn random_products(&self, count: usize) -> Result<Vec<ProductResult>, TransportError> {
        let response = self
            .client
            .get(self.endpoint("/products/random"))
            .query(&[("count", count)])
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        Ok(envelope.products)
    }

    async fn categories(&self) -> Result<Vec<String>, TransportError> {
        let response = self
            .client
            .get(self.endpoint("/categories"))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        Ok(envelope.categories)
    }
}

/// Check status and the `success` flag, then decode the body.
async fn read_envelope(response: Response) -> Result<Envelope, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let fallback = response
            .error_for_status_ref()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("HTTP {status}"));
        let body = response.text().await.unwrap_or_default();
        return Err(map_error_status(status.as_u16(), &body, &fallback));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;
    let envelope: Envelope = serde_json::from_str(&body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    if envelope.success != Some(true) {
        let message = envelope
            .error
            .clone()
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        return Err(TransportError::Rejected(message));
    }
    Ok(envelope)
}

/// Map a non-2xx response. The server's `error` string wins over the
/// transport's description.
pub(crate) fn map_error_status(status: u16, body: &str, fallback: &str) -> TransportError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| fallback.to_string());
    log::warn!("backend returned HTTP {status}: {message}");
    TransportError::Status { status, message }
}
