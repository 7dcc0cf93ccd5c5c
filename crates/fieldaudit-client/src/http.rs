//! HTTP access to the API under audit.
//!
//! One GET per call, `Accept: application/json`, a per-request timeout, and
//! no retry. Every status code is a successful call: error bodies are parsed
//! the same way as success bodies so their shape can be analysed.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;

use crate::config::{AuditConfig, ConfigError};
use crate::error::ClientError;

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body, or `None` when the body is not JSON.
    pub body: Option<Value>,
    /// Wall-clock time from send to fully-read body.
    pub latency_ms: u64,
}

impl ApiResponse {
    /// Whether the status is `200 OK`.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Thin GET client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    timeout_secs: u64,
}

impl ApiClient {
    /// Build a client from the run configuration.
    pub fn new(config: &AuditConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(ClientError::ClientInit)?;

        Ok(Self {
            http,
            base: config.base().to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Join a path (and optional query) onto the base URL.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    /// Issue one GET against a fully-formed URL.
    pub async fn get(&self, url: &str) -> Result<ApiResponse, ClientError> {
        let start = Instant::now();
        let resp = self.http.get(url).send().await.map_err(|e| self.map_send_error(url, e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout(url)
            } else {
                ClientError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let body = serde_json::from_slice::<Value>(&bytes).ok();
        if body.is_none() && !bytes.is_empty() {
            tracing::debug!(url, status, "response body is not JSON");
        }
        tracing::debug!(url, status, latency_ms, "GET complete");
        Ok(ApiResponse {
            status,
            body,
            latency_ms,
        })
    }

    /// GET a base-relative path; `Some` only for a `200` with a JSON body.
    pub async fn get_ok_json(&self, path_and_query: &str) -> Option<Value> {
        let url = self.url_for(path_and_query);
        match self.get(&url).await {
            Ok(resp) if resp.is_ok() => resp.body,
            Ok(resp) => {
                tracing::debug!(url = %url, status = resp.status, "non-200 response");
                None
            }
            Err(e) => {
                tracing::debug!(url = %url, "request failed: {e}");
                None
            }
        }
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            self.timeout(url)
        } else {
            ClientError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }

    fn timeout(&self, url: &str) -> ClientError {
        ClientError::Timeout {
            url: url.to_string(),
            timeout_secs: self.timeout_secs,
        }
    }
}
