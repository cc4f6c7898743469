//! OpenAI embedding client.
//!
//! [`OpenAIEmbedder`] implements the core [`Embedder`] trait against
//! `POST /v1/embeddings`. Inputs are truncated to `embedding.max_chars`
//! characters before submission.
//!
//! # Retry Strategy
//!
//! Retries are off by default (`embedding.max_retries = 0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use recruit_chat_core::embedding::{truncate_chars, Embedder, Embedding, EmbeddingUsage};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Build the embedder named by `config.provider`, or `None` when disabled.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Arc::new(OpenAIEmbedder::new(config)?))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embedding client for the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
    max_chars: usize,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            model,
            dims,
            max_chars: config.max_chars,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let body = serde_json::json!({
            "model": self.model,
            "input": truncate_chars(text, self.max_chars),
        });
        let endpoint = format!("{}/embeddings", self.url.trim_end_matches('/'));

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let embedding = parse_openai_response(&json)?;
                        tracing::debug!(
                            model = %self.model,
                            tokens = embedding.usage.total_tokens,
                            "embedded text"
                        );
                        return Ok(embedding);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = anyhow::anyhow!(
                        "OpenAI API error {}: {}",
                        status.as_u16(),
                        upstream_message(&body_text)
                    );
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

/// `error.message` from an OpenAI error body, or the raw body.
pub(crate) fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Extract the first `data[].embedding` array and the `usage` block.
fn parse_openai_response(json: &serde_json::Value) -> Result<Embedding> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

    let vector: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    let usage = json.get("usage");
    let count = |key: &str| {
        usage
            .and_then(|u| u.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    };

    Ok(Embedding {
        vector,
        usage: EmbeddingUsage {
            prompt_tokens: count("prompt_tokens"),
            total_tokens: count("total_tokens"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "data": [{ "embedding": [0.5, -0.25, 1.0], "index": 0 }],
            "usage": { "prompt_tokens": 7, "total_tokens": 7 }
        });
        let e = parse_openai_response(&json).unwrap();
        assert_eq!(e.vector, vec![0.5, -0.25, 1.0]);
        assert_eq!(e.usage.total_tokens, 7);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        assert!(parse_openai_response(&serde_json::json!({ "object": "list" })).is_err());
    }

    #[test]
    fn test_upstream_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(upstream_message(body), "Incorrect API key provided");
        assert_eq!(upstream_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_disabled_provider_yields_none() {
        assert!(create_embedder(&EmbeddingConfig::default()).unwrap().is_none());
    }
}
