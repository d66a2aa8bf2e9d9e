//! Completion provider abstraction and the OpenAI-compatible HTTP client.
//!
//! The dispatcher talks to an injected [`CompletionProvider`] rather than a
//! concrete HTTP client, so the whole chat path can be tested with a stub
//! provider and no network. [`OpenAiClient`] is the production
//! implementation, speaking the `/v1/chat/completions` wire format.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::RelayError;
use crate::messages::CanonicalMessage;

/// Generation parameters sent with every completion request.
///
/// Fixed at construction from config — clients cannot override them.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    /// `f64` rather than `f32` so the value serializes exactly as written.
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn for_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// A service that turns a conversation into reply text.
///
/// Returns `Ok(None)` when the provider answered successfully but the first
/// choice carried no message text; the dispatcher substitutes a fallback.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[CanonicalMessage],
        params: &GenerationParams,
    ) -> Result<Option<String>, RelayError>;
}

/// HTTP client for an OpenAI-compatible completion endpoint.
///
/// Because [`reqwest::Client`] holds an `Arc` internally it is cheap to
/// clone; one client is built at startup and shared across requests.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
}

/// Request timeout for upstream calls. The original service relied on the
/// HTTP library default; a fixed bound keeps a stalled provider from pinning
/// handlers indefinitely.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

impl OpenAiClient {
    /// Construct a client from config.
    ///
    /// The API key (when present) is injected as a static
    /// `Authorization: Bearer ...` header. Construction succeeds without a
    /// key — the dispatcher refuses to call the provider in that case.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = format!("Bearer {key}");
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&value)
                    .context("invalid API key value for Authorization header")?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .context("building reqwest client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pull a human-readable message out of a provider error body.
    ///
    /// OpenAI-style errors nest it at `error.message`; anything else falls
    /// back to the raw body text.
    fn extract_error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or_else(|| body.trim().to_string())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(
        &self,
        messages: &[CanonicalMessage],
        params: &GenerationParams,
    ) -> Result<Option<String>, RelayError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": params.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Upstream {
                status: None,
                message: format!("request to completion provider failed: {e}"),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| RelayError::Upstream {
            status: Some(status.as_u16()),
            message: format!("reading provider response failed: {e}"),
        })?;

        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: Some(status.as_u16()),
                message: Self::extract_error_message(&text),
            });
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| RelayError::Upstream {
            status: Some(status.as_u16()),
            message: format!("provider returned invalid JSON: {e}"),
        })?;

        Ok(parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(String::from))
    }
}
