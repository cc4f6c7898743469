//! OpenAI-compatible chat-completion client.
//!
//! Implements the core [`ChatModel`] trait against `POST /chat/completions`.
//! No retries: a failed generation surfaces to the chat service, which turns
//! it into an apologetic reply.

use anyhow::{bail, Result};
use async_trait::async_trait;
use recruit_chat_core::llm::{
    ChatMessage, ChatModel, Completion, GenerationParams, MessageRole, TokenUsage,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::embedding::upstream_message;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Build the generation client named by `config.provider`.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledChatModel)),
        "openai" => Ok(Arc::new(OpenAIChatModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

/// Fails every call. Used when `llm.provider = "disabled"`.
pub struct DisabledChatModel;

#[async_trait]
impl ChatModel for DisabledChatModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[ChatMessage], _params: GenerationParams) -> Result<Completion> {
        bail!("LLM provider is disabled; set [llm] provider = \"openai\" to generate answers")
    }
}

pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    input_cost_per_1k: f64,
    output_cost_per_1k: f64,
}

impl OpenAIChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
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
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            input_cost_per_1k: config.input_cost_per_1k,
            output_cost_per_1k: config.output_cost_per_1k,
        })
    }

    fn request_body(&self, messages: &[ChatMessage], params: GenerationParams) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": role_name(m.role),
                    "content": m.content,
                })
            })
            .collect();
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature.unwrap_or(params.temperature),
            "max_tokens": self.max_tokens.unwrap_or(params.max_tokens),
        })
    }

    fn estimated_cost(&self, usage: &TokenUsage) -> f64 {
        usage.prompt_tokens as f64 / 1000.0 * self.input_cost_per_1k
            + usage.completion_tokens as f64 / 1000.0 * self.output_cost_per_1k
    }
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], params: GenerationParams) -> Result<Completion> {
        let endpoint = format!("{}/chat/completions", self.url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!(
                "OpenAI API error {}: {}",
                status.as_u16(),
                upstream_message(&body_text)
            );
        }

        let json: serde_json::Value = response.json().await?;
        let completion = parse_completion(&json)?;
        tracing::info!(
            model = %self.model,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            cost_usd = self.estimated_cost(&completion.usage),
            "generation complete"
        );
        Ok(completion)
    }
}

fn parse_completion(json: &serde_json::Value) -> Result<Completion> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))?
        .trim()
        .to_string();

    let count = |key: &str| {
        json.get("usage")
            .and_then(|u| u.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    };

    Ok(Completion {
        text,
        usage: TokenUsage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAIChatModel {
        OpenAIChatModel {
            client: reqwest::Client::new(),
            api_key: "test".to_string(),
            url: DEFAULT_OPENAI_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: Some(500),
            input_cost_per_1k: 0.15,
            output_cost_per_1k: 0.6,
        }
    }

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Found **Priya Sharma**.\n" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150 }
        });
        let c = parse_completion(&json).unwrap();
        assert_eq!(c.text, "Found **Priya Sharma**.");
        assert_eq!(c.usage.total_tokens, 150);
    }

    #[test]
    fn test_parse_completion_missing_choices() {
        assert!(parse_completion(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_request_body_applies_overrides() {
        let body = model().request_body(
            &[ChatMessage::system("rules"), ChatMessage::user("hi")],
            GenerationParams {
                temperature: 0.3,
                max_tokens: 1200,
            },
        );
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 500);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_estimated_cost() {
        let usage = TokenUsage {
            prompt_tokens: 1000,
            completion_tokens: 500,
            total_tokens: 1500,
        };
        assert!((model().estimated_cost(&usage) - 0.45).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disabled_model_errors() {
        let err = DisabledChatModel
            .complete(&[ChatMessage::user("hi")], GenerationParams { temperature: 0.5, max_tokens: 10 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }
}
