//! Chat orchestration.
//!
//! [`ChatService`] owns the router, synthesizer, and response cache and
//! drives one message through cache → classify → route → synthesize. It is
//! the single entry point used by the CLI and the HTTP surface.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::ResponseCache;
use crate::classify::{classify_query, QueryType};
use crate::embedding::Embedder;
use crate::extract::extract_name_from_query;
use crate::llm::{ChatMessage, ChatModel, GenerationParams};
use crate::models::{
    Candidate, CandidateMatch, ConversationTurn, EntityKind, Job, RecruitmentStats,
    ReferencedEntity,
};
use crate::router::{Retrieval, RouteContext, RouteRequest, Router, RouterSettings};
use crate::store::{NameMatch, RecruitStore};
use crate::synth::{
    format_job_description_matches, format_similar_candidates, suggestions, SynthesisInput,
    Synthesizer,
};

static SIMILAR_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:similar to|like|same as)\b").expect("similar-to regex is valid")
});

const CRITERIA_PROMPT: &str = "Extract hiring criteria from the job description. \
Respond with a single JSON object and nothing else, using exactly these keys: \
\"skills\" (array of strings), \"min_experience_years\" (number or null), \
\"location\" (string or null).";

const CRITERIA_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.0,
    max_tokens: 300,
};

/// Service tuning, decoupled from application config.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub router: RouterSettings,
    /// Conversation turns included in each prompt.
    pub history_window: usize,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    /// Minimum similarity for "similar to <name>" results.
    pub similar_threshold: f64,
    /// Minimum similarity for job-description matches.
    pub jd_match_threshold: f64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            router: RouterSettings::default(),
            history_window: 6,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
            similar_threshold: 0.5,
            jd_match_threshold: 0.35,
        }
    }
}

/// A reply as returned to the chat surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub suggestions: Vec<String>,
    /// The record this reply is about; callers store it on the assistant turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced: Option<ReferencedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<QueryType>,
    /// Name of the retrieval strategy that produced the rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub cached: bool,
}

impl ChatReply {
    /// The single user-facing failure notice.
    pub fn apology(err: &anyhow::Error) -> Self {
        Self {
            text: format!(
                "I'm sorry, I couldn't answer that right now. The error was: {:#}",
                err
            ),
            suggestions: Vec::new(),
            referenced: None,
            intent: None,
            strategy: None,
            cached: false,
        }
    }
}

/// Hiring criteria pulled out of a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JdCriteria {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub min_experience_years: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl JdCriteria {
    /// Parse the model's JSON answer, tolerating a surrounding code fence.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();
        serde_json::from_str(body).context("job description criteria were not valid JSON")
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.skills.is_empty() {
            parts.push(format!("Skills: {}", self.skills.join(", ")));
        }
        if let Some(years) = self.min_experience_years {
            parts.push(format!("Minimum experience: {} years", years));
        }
        if let Some(location) = &self.location {
            parts.push(format!("Location: {}", location));
        }
        parts.join("\n")
    }
}

/// Result of a "similar to <name>" lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SimilarCandidates {
    UnknownCandidate,
    NoEmbedding(Candidate),
    Found {
        target: Candidate,
        matches: Vec<CandidateMatch>,
    },
}

impl SimilarCandidates {
    pub fn render(&self, name: &str) -> String {
        match self {
            SimilarCandidates::UnknownCandidate => {
                format!("I couldn't find a candidate named **{}**.", name)
            }
            SimilarCandidates::NoEmbedding(target) => format!(
                "**{}** has no stored embedding yet, so similar candidates can't be ranked.",
                target.name
            ),
            SimilarCandidates::Found { target, matches } => {
                format_similar_candidates(&target.name, matches)
            }
        }
    }
}

pub struct ChatService {
    store: Arc<dyn RecruitStore>,
    model: Arc<dyn ChatModel>,
    embedder: Option<Arc<dyn Embedder>>,
    router: Router,
    synthesizer: Synthesizer,
    cache: ResponseCache<ChatReply>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn RecruitStore>,
        model: Arc<dyn ChatModel>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            store,
            model,
            embedder: None,
            router: Router::standard(),
            synthesizer: Synthesizer::new(settings.history_window),
            cache: ResponseCache::new(settings.cache_ttl),
            settings,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn store(&self) -> &dyn RecruitStore {
        self.store.as_ref()
    }

    /// Answer one message.
    ///
    /// With empty `history`, a fresh cached reply for the same normalized
    /// text is returned without classification, retrieval, or generation.
    /// Only recruitment replies are cached. Generation failures propagate.
    pub async fn send_message(
        &self,
        text: &str,
        context_id: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<ChatReply> {
        let context_id = context_id.unwrap_or("-");
        let use_cache = self.settings.cache_enabled && history.is_empty();
        if use_cache {
            if let Some(mut hit) = self.cache.get(text) {
                tracing::info!(context_id, "response cache hit");
                hit.cached = true;
                return Ok(hit);
            }
        }

        let classification = classify_query(text);
        let intent = classification.query_type;
        tracing::info!(
            context_id,
            intent = intent.as_str(),
            confidence = classification.confidence,
            "classified message"
        );

        if intent != QueryType::Recruitment {
            let stats = self.stats_or_default().await;
            let completion = self
                .synthesizer
                .synthesize(
                    self.model.as_ref(),
                    &SynthesisInput {
                        query: text,
                        intent,
                        stats: &stats,
                        history,
                        retrieval: None,
                    },
                )
                .await?;
            return Ok(ChatReply {
                text: completion.text,
                suggestions: suggestions(intent, None),
                referenced: None,
                intent: Some(intent),
                strategy: None,
                cached: false,
            });
        }

        let reply = match self.similar_from_message(text).await {
            Some(reply) => reply,
            None => self.routed_reply(text, history).await?,
        };
        if use_cache {
            self.cache.put(text, reply.clone());
        }
        Ok(reply)
    }

    /// [`send_message`](Self::send_message), turning any failure into the
    /// apologetic reply shown to end users.
    pub async fn reply_or_apology(
        &self,
        text: &str,
        context_id: Option<&str>,
        history: &[ConversationTurn],
    ) -> ChatReply {
        match self.send_message(text, context_id, history).await {
            Ok(reply) => reply,
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "chat request failed");
                ChatReply::apology(&e)
            }
        }
    }

    /// Route `text` through the strategy chain without generating an answer.
    pub async fn retrieve(&self, text: &str, history: &[ConversationTurn]) -> Retrieval {
        let ctx = RouteContext {
            store: self.store.as_ref(),
            embedder: self.embedder.as_deref(),
            settings: &self.settings.router,
        };
        let request = RouteRequest {
            query: text,
            history,
            requested_count: None,
        };
        self.router.route(&request, &ctx).await
    }

    async fn routed_reply(&self, text: &str, history: &[ConversationTurn]) -> Result<ChatReply> {
        let retrieval = self.retrieve(text, history).await;
        let stats = self.stats_or_default().await;

        let completion = self
            .synthesizer
            .synthesize(
                self.model.as_ref(),
                &SynthesisInput {
                    query: text,
                    intent: QueryType::Recruitment,
                    stats: &stats,
                    history,
                    retrieval: Some(&retrieval),
                },
            )
            .await?;

        Ok(ChatReply {
            text: completion.text,
            suggestions: suggestions(QueryType::Recruitment, Some(&retrieval)),
            referenced: retrieval.referenced_entity(),
            intent: Some(QueryType::Recruitment),
            strategy: Some(retrieval.strategy.to_string()),
            cached: false,
        })
    }

    /// "similar to <Name>" answered from the stored embedding of that
    /// candidate. `None` falls back to normal routing.
    async fn similar_from_message(&self, text: &str) -> Option<ChatReply> {
        if !SIMILAR_TO_RE.is_match(text) {
            return None;
        }
        let name = extract_name_from_query(text)?;
        let result = match self.similar_candidates(&name).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "similar-candidate lookup failed; routing instead");
                return None;
            }
        };
        let text = result.render(&name);
        let SimilarCandidates::Found { target, matches } = result else {
            return None;
        };
        tracing::info!(name = %target.name, matches = matches.len(), "similar candidates");

        let mut suggested = vec![format!("What is {}'s status?", target.name)];
        if let Some(first) = matches.first() {
            suggested.push(format!("Find candidates similar to {}", first.candidate.name));
        }
        Some(ChatReply {
            text,
            suggestions: suggested,
            referenced: Some(ReferencedEntity {
                kind: EntityKind::Candidate,
                id: target.id,
                name: target.name,
            }),
            intent: Some(QueryType::Recruitment),
            strategy: Some("similar_candidates".to_string()),
            cached: false,
        })
    }

    /// Resolve `name` and rank other candidates by embedding similarity.
    pub async fn similar_candidates(&self, name: &str) -> Result<SimilarCandidates> {
        let k = self.settings.router.semantic_k;
        let Some(target) = self
            .store
            .candidates_by_name(&NameMatch::Phrase(name.to_string()), 1)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(SimilarCandidates::UnknownCandidate);
        };
        let Some(vector) = self.store.candidate_embedding(target.id).await? else {
            return Ok(SimilarCandidates::NoEmbedding(target));
        };
        let mut matches = self
            .store
            .match_candidates(&vector, self.settings.similar_threshold, k + 1)
            .await?;
        matches.retain(|m| m.candidate.id != target.id);
        matches.truncate(k);
        Ok(SimilarCandidates::Found { target, matches })
    }

    /// Deterministic similar-candidate list for `name`.
    pub async fn find_similar_candidates(&self, name: &str) -> Result<String> {
        Ok(self.similar_candidates(name).await?.render(name))
    }

    /// Ask the model for hiring criteria as JSON.
    pub async fn extract_criteria(&self, job_description: &str) -> Result<JdCriteria> {
        let messages = [
            ChatMessage::system(CRITERIA_PROMPT),
            ChatMessage::user(job_description),
        ];
        let completion = self.model.complete(&messages, CRITERIA_PARAMS).await?;
        JdCriteria::parse(&completion.text)
    }

    /// Rank candidates against a job description.
    ///
    /// Criteria extraction and embedding failures propagate. Candidates
    /// whose experience is known and below the extracted minimum are dropped.
    pub async fn match_job_description(&self, job_description: &str) -> Result<String> {
        let embedder = self
            .embedder
            .as_deref()
            .context("job description matching requires an embedding provider")?;
        let criteria = self.extract_criteria(job_description).await?;
        tracing::info!(
            skills = criteria.skills.len(),
            min_experience = ?criteria.min_experience_years,
            "extracted job description criteria"
        );

        let text = format!("{}\n\n{}", criteria.summary(), job_description);
        let embedding = embedder.embed(&text).await?;
        let mut matches = self
            .store
            .match_candidates(
                &embedding.vector,
                self.settings.jd_match_threshold,
                self.settings.router.semantic_k,
            )
            .await?;
        if let Some(min) = criteria.min_experience_years {
            matches.retain(|m| m.candidate.experience_years().map_or(true, |y| y >= min));
        }
        Ok(format_job_description_matches(&matches))
    }

    pub async fn all_jobs(&self) -> Result<Vec<Job>> {
        self.store.list_jobs(false, None).await
    }

    /// Drop every cached reply. Returns how many were removed.
    pub fn clear_cache(&self) -> usize {
        let n = self.cache.clear();
        tracing::info!(cleared = n, "response cache cleared");
        n
    }

    async fn stats_or_default(&self) -> RecruitmentStats {
        match self.store.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load statistics; continuing without");
                RecruitmentStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_parse_plain_and_fenced() {
        let c = JdCriteria::parse(
            r#"{"skills":["Python","AWS"],"min_experience_years":5,"location":"Pune"}"#,
        )
        .unwrap();
        assert_eq!(c.skills, vec!["Python", "AWS"]);
        assert_eq!(c.min_experience_years, Some(5.0));

        let c = JdCriteria::parse("```json\n{\"skills\":[\"Go\"]}\n```").unwrap();
        assert_eq!(c.skills, vec!["Go"]);
        assert_eq!(c.location, None);
    }

    #[test]
    fn test_criteria_parse_rejects_prose() {
        let err = JdCriteria::parse("Sure! The candidate needs Python.").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_criteria_summary() {
        let c = JdCriteria {
            skills: vec!["Rust".to_string()],
            min_experience_years: Some(3.0),
            location: None,
        };
        assert_eq!(c.summary(), "Skills: Rust\nMinimum experience: 3 years");
    }

    #[test]
    fn test_apology_names_error() {
        let err = anyhow::anyhow!("OpenAI API error 429: rate limited");
        let reply = ChatReply::apology(&err);
        assert!(reply.text.starts_with("I'm sorry"));
        assert!(reply.text.contains("rate limited"));
    }
}
