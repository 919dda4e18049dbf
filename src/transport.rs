// ABOUTME: Transport seam for single HTTP requests against the telemetry backend
// ABOUTME: Production impl wraps a pooled reqwest client with bearer auth and JSON parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::PlatformConfig;
use crate::errors::{HistorianError, Result};

/// HTTP method for a transport request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request, parameters in the query string
    Get,
    /// POST request with a JSON body
    Post,
}

/// One request to the backend, independent of any HTTP library
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path below the API base URL, starting with `/`
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<Value>,
}

impl TransportRequest {
    /// GET request for a path with query parameters
    #[must_use]
    pub fn get(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query,
            body: None,
        }
    }
}

/// Performs a single HTTP request and returns the parsed JSON body
///
/// The retrieval pipeline never talks HTTP directly; everything goes through
/// this seam so tests can script responses without sockets.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request
    ///
    /// # Errors
    ///
    /// Returns `Network` when the request cannot be sent or the body cannot
    /// be read, and `Api` with status and body text for a non-2xx response.
    async fn request(&self, request: &TransportRequest) -> Result<Value>;
}

/// Shared client with connection pooling and conservative timeouts
fn api_client() -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Production transport over HTTPS (or plain HTTP for on-prem deployments)
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpTransport {
    /// Build a transport from platform configuration
    ///
    /// # Errors
    ///
    /// Returns `Config` when the configured host does not form a valid URL.
    pub fn new(config: &PlatformConfig, on_prem_override: Option<bool>) -> Result<Self> {
        let base = config.base_url(on_prem_override)?;
        let base_url = Url::parse(&base)
            .map_err(|e| HistorianError::Config(format!("invalid base URL {base}: {e}")))?;
        Ok(Self {
            client: api_client(),
            base_url,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: &TransportRequest) -> Result<Value> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| HistorianError::Config(format!("invalid path {}: {e}", request.path)))?;

        debug!(method = ?request.method, %url, "issuing backend request");

        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => {
                let builder = self.client.post(url);
                match &request.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        let response = builder
            .bearer_auth(&self.token)
            .query(&request.query)
            .send()
            .await
            .map_err(HistorianError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HistorianError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(HistorianError::Network)
    }
}
