use anyhow::{Context, Result};
use recruit_chat_core::chat::ChatSettings;
use recruit_chat_core::router::RouterSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
    #[serde(default = "default_semantic_k")]
    pub semantic_k: usize,
    #[serde(default = "default_similar_threshold")]
    pub similar_threshold: f64,
    #[serde(default = "default_jd_match_threshold")]
    pub jd_match_threshold: f64,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            sample_size: default_sample_size(),
            semantic_threshold: default_semantic_threshold(),
            semantic_k: default_semantic_k(),
            similar_threshold: default_similar_threshold(),
            jd_match_threshold: default_jd_match_threshold(),
            history_window: default_history_window(),
        }
    }
}

fn default_limit() -> usize {
    10
}
fn default_sample_size() -> usize {
    200
}
fn default_semantic_threshold() -> f64 {
    0.3
}
fn default_semantic_k() -> usize {
    10
}
fn default_similar_threshold() -> f64 {
    0.5
}
fn default_jd_match_threshold() -> f64 {
    0.35
}
fn default_history_window() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            enabled: true,
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Base URL override for OpenAI-compatible endpoints.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            max_chars: default_max_chars(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            batch_delay_ms: default_batch_delay_ms(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_chars() -> usize {
    8000
}
fn default_max_retries() -> u32 {
    0
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_batch_delay_ms() -> u64 {
    50
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
    /// Overrides the per-intent temperature when set.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Overrides the per-intent token cap when set.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// USD per 1,000 prompt tokens, used only for cost logging.
    #[serde(default)]
    pub input_cost_per_1k: f64,
    #[serde(default)]
    pub output_cost_per_1k: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            url: None,
            temperature: None,
            max_tokens: None,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Config {
    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            default_limit: self.retrieval.default_limit,
            sample_size: self.retrieval.sample_size,
            semantic_threshold: self.retrieval.semantic_threshold,
            semantic_k: self.retrieval.semantic_k,
        }
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            router: self.router_settings(),
            history_window: self.retrieval.history_window,
            cache_enabled: self.cache.enabled,
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
            similar_threshold: self.retrieval.similar_threshold,
            jd_match_threshold: self.retrieval.jd_match_threshold,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let r = &config.retrieval;
    if !(1..=100).contains(&r.default_limit) {
        anyhow::bail!("retrieval.default_limit must be in [1, 100]");
    }
    if r.sample_size < r.default_limit {
        anyhow::bail!("retrieval.sample_size must be >= retrieval.default_limit");
    }
    if r.semantic_k == 0 {
        anyhow::bail!("retrieval.semantic_k must be >= 1");
    }
    for (name, value) in [
        ("semantic_threshold", r.semantic_threshold),
        ("similar_threshold", r.similar_threshold),
        ("jd_match_threshold", r.jd_match_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("retrieval.{} must be in [0.0, 1.0]", name);
        }
    }

    if !(1..=3600).contains(&config.cache.ttl_secs) {
        anyhow::bail!("cache.ttl_secs must be in [1, 3600]");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.max_chars == 0 {
        anyhow::bail!("embedding.max_chars must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    match config.llm.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if let Some(t) = config.llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Result<Config> {
        let text = format!(
            "[db]\npath = \"./data/rchat.sqlite\"\n\n[server]\nbind = \"127.0.0.1:7331\"\n\n{}",
            extra
        );
        let config: Config = toml::from_str(&text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.retrieval.default_limit, 10);
        assert_eq!(config.retrieval.sample_size, 200);
        assert_eq!(config.cache.ttl_secs, 300);
        assert!(config.cache.enabled);
        assert_eq!(config.embedding.max_retries, 0);
        assert_eq!(config.embedding.max_chars, 8000);
        assert!(!config.llm.is_enabled());

        let settings = config.chat_settings();
        assert_eq!(settings.cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.router.semantic_k, 10);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../config/rchat.example.toml")).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7341");
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(parse("[retrieval]\ndefault_limit = 0").is_err());
        assert!(parse("[retrieval]\ndefault_limit = 50\nsample_size = 20").is_err());
        assert!(parse("[retrieval]\nsemantic_threshold = 1.5").is_err());
        assert!(parse("[cache]\nttl_secs = 7200").is_err());
        assert!(parse("[llm]\nprovider = \"anthropic\"").is_err());
    }

    #[test]
    fn test_enabled_embedding_needs_model_and_dims() {
        assert!(parse("[embedding]\nprovider = \"openai\"").is_err());
        assert!(parse("[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"")
            .is_err());
        let config = parse(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536",
        )
        .unwrap();
        assert!(config.embedding.is_enabled());
    }
}
