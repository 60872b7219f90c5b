//! HTTP utilities for GCP REST API calls

use crate::error::ProviderError;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human-readable message out of a GCP error body
/// (`{"error": {"code": 404, "message": "..."}}`).
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| sanitize_for_log(body))
}

/// Map a transport-level failure onto the provider error taxonomy.
fn classify_send_error(err: &reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::Invalid(err.to_string())
    } else {
        // timeouts, connection resets, DNS hiccups: all worth another pass
        ProviderError::Transient(err.to_string())
    }
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcp-teardown/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value, ProviderError> {
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(
        &self,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(request).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value, ProviderError> {
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(url).bearer_auth(token)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::debug!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ProviderError::from_status(
                status.as_u16(),
                error_message(&body),
            ));
        }

        // Handle empty response
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Transient(format!("failed to parse response JSON: {e}")))
    }
}
