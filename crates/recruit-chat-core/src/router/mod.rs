//! Tiered retrieval routing.
//!
//! A recruitment query is mapped to the first nonempty result set produced
//! by an ordered list of [`RetrievalStrategy`] objects. Every strategy reads
//! through the [`RecruitStore`] trait; none of them write.
//!
//! # Strategy order ([`Router::standard`])
//!
//! 1. `top_n_for`: "top N for X", criterion matched in candidate text
//! 2. `top_candidates`: "top N candidates" with no other criteria
//! 3. `all_candidates`: bare "all candidates"
//! 4. `follow_up`: short pronoun/cue follow-up resolved from history
//! 5. `email` → `phone` → `job_id`
//! 6. `semantic`: vector search on similarity phrasing
//! 7. `experience` → `score` → `salary`
//! 8. `skill`
//! 9. `job_title`
//! 10. `status`
//! 11. `location`
//! 12. `client`
//! 13. `job`
//! 14. `status_catalog`
//! 15. `broad`: word-level typo-tolerant catch-all
//! 16. `name`: phrase → all-of → any-of → free text
//! 17. `no_results`
//!
//! # Failure semantics
//!
//! A strategy error is logged at `warn` and treated as "no data"; routing
//! continues with the next strategy. Nothing is retried.

pub mod fallback;
pub mod lookup;
pub mod ranked;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::embedding::Embedder;
use crate::extract::{
    extract_city, extract_email, extract_experience, extract_job_id, extract_job_title,
    extract_phone, extract_requested_count, extract_salary, extract_score, extract_skill,
};
use crate::models::{
    Candidate, CandidateMatch, ClientWithContacts, ConversationTurn, EntityKind, Job,
    NumericFilter, ReferencedEntity, StatusEntry,
};
use crate::similarity::normalize_text;
use crate::store::RecruitStore;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Result count when the query does not ask for one.
    pub default_limit: usize,
    /// Candidates fetched for client-side filtering.
    pub sample_size: usize,
    /// Minimum cosine similarity for semantic search hits.
    pub semantic_threshold: f64,
    /// Maximum semantic search hits.
    pub semantic_k: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            sample_size: 200,
            semantic_threshold: 0.3,
            semantic_k: 10,
        }
    }
}

/// Inputs for one routing call.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub query: &'a str,
    pub history: &'a [ConversationTurn],
    /// Overrides the count extracted from the query text.
    pub requested_count: Option<usize>,
}

/// Collaborators available to strategies.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    pub store: &'a dyn RecruitStore,
    pub embedder: Option<&'a dyn Embedder>,
    pub settings: &'a RouterSettings,
}

/// A query with every extractor already applied.
///
/// Built once per routing call so strategies share one extraction pass.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pub text: &'a str,
    /// Output of [`normalize_text`].
    pub normalized: String,
    pub words: Vec<String>,
    pub history: &'a [ConversationTurn],
    pub requested_count: Option<usize>,
    /// `requested_count` or the configured default.
    pub limit: usize,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_id: Option<String>,
    pub skill: Option<&'static str>,
    pub title: Option<&'static str>,
    pub city: Option<&'static str>,
    pub experience: Option<NumericFilter>,
    pub score: Option<NumericFilter>,
    pub salary: Option<NumericFilter>,
}

impl<'a> Query<'a> {
    pub fn new(request: &RouteRequest<'a>, settings: &RouterSettings) -> Self {
        let text = request.query;
        let normalized = normalize_text(text);
        let words = normalized.split_whitespace().map(str::to_string).collect();
        let requested_count = request
            .requested_count
            .or_else(|| extract_requested_count(text));
        Self {
            text,
            normalized,
            words,
            history: request.history,
            requested_count,
            limit: requested_count.unwrap_or(settings.default_limit),
            email: extract_email(text),
            phone: extract_phone(text),
            job_id: extract_job_id(text),
            skill: extract_skill(text),
            title: extract_job_title(text),
            city: extract_city(text),
            experience: extract_experience(text),
            score: extract_score(text),
            salary: extract_salary(text),
        }
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn has_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.has_word(w))
    }

    /// Whole-word phrase containment on the normalized text.
    pub fn has_phrase(&self, phrase: &str) -> bool {
        format!(" {} ", self.normalized).contains(&format!(" {} ", phrase))
    }

    pub fn has_identifier(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.job_id.is_some()
    }

    pub fn has_numeric_filter(&self) -> bool {
        self.experience.is_some() || self.score.is_some() || self.salary.is_some()
    }
}

/// Rows returned by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum RetrievalData {
    Candidates(Vec<Candidate>),
    Matches(Vec<CandidateMatch>),
    Jobs(Vec<Job>),
    Clients(Vec<ClientWithContacts>),
    Statuses(Vec<StatusEntry>),
    NoResults,
}

impl RetrievalData {
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalData::Candidates(_) => "candidates",
            RetrievalData::Matches(_) => "matches",
            RetrievalData::Jobs(_) => "jobs",
            RetrievalData::Clients(_) => "clients",
            RetrievalData::Statuses(_) => "statuses",
            RetrievalData::NoResults => "no_results",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RetrievalData::Candidates(v) => v.len(),
            RetrievalData::Matches(v) => v.len(),
            RetrievalData::Jobs(v) => v.len(),
            RetrievalData::Clients(v) => v.len(),
            RetrievalData::Statuses(v) => v.len(),
            RetrievalData::NoResults => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of routing: the strategy that answered and its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub strategy: &'static str,
    pub data: RetrievalData,
}

impl Retrieval {
    pub const NO_RESULTS: &'static str = "no_results";

    pub fn no_results() -> Self {
        Self {
            strategy: Self::NO_RESULTS,
            data: RetrievalData::NoResults,
        }
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self.data, RetrievalData::NoResults)
    }

    /// The record a reply built from this retrieval is primarily about.
    pub fn referenced_entity(&self) -> Option<ReferencedEntity> {
        match &self.data {
            RetrievalData::Candidates(v) => v.first().map(|c| ReferencedEntity {
                kind: EntityKind::Candidate,
                id: c.id,
                name: c.name.clone(),
            }),
            RetrievalData::Matches(v) => v.first().map(|m| ReferencedEntity {
                kind: EntityKind::Candidate,
                id: m.candidate.id,
                name: m.candidate.name.clone(),
            }),
            RetrievalData::Jobs(v) => v.first().map(|j| ReferencedEntity {
                kind: EntityKind::Job,
                id: j.id,
                name: j.title.clone(),
            }),
            RetrievalData::Clients(v) => v.first().map(|c| ReferencedEntity {
                kind: EntityKind::Client,
                id: c.client.id,
                name: c.client.name.clone(),
            }),
            RetrievalData::Statuses(_) | RetrievalData::NoResults => None,
        }
    }
}

/// What a strategy decided.
#[derive(Debug)]
pub enum Attempt {
    /// Rows found. Empty rows are treated like [`Attempt::Pass`].
    Found(RetrievalData),
    /// Not applicable or nothing found; try the next strategy.
    Pass,
    /// Applicable and authoritative, but nothing found: answer "no results".
    Stop,
}

/// One self-contained attempt to satisfy a query against the store.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, query: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt>;
}

/// Ordered strategy list evaluated until one yields rows.
pub struct Router {
    strategies: Vec<Box<dyn RetrievalStrategy>>,
}

impl Router {
    pub fn new(strategies: Vec<Box<dyn RetrievalStrategy>>) -> Self {
        Self { strategies }
    }

    /// The full priority chain.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ranked::TopNFor),
            Box::new(ranked::TopCandidates),
            Box::new(ranked::AllCandidates),
            Box::new(ranked::FollowUp),
            Box::new(lookup::EmailLookup),
            Box::new(lookup::PhoneLookup),
            Box::new(lookup::JobIdLookup),
            Box::new(ranked::Semantic),
            Box::new(lookup::ExperienceFilter),
            Box::new(lookup::ScoreFilter),
            Box::new(lookup::SalaryFilter),
            Box::new(lookup::SkillSearch),
            Box::new(lookup::JobTitleSearch),
            Box::new(lookup::StatusSearch),
            Box::new(lookup::LocationSearch),
            Box::new(lookup::ClientSearch),
            Box::new(lookup::JobSearch),
            Box::new(lookup::StatusCatalog),
            Box::new(fallback::BroadSearch),
            Box::new(fallback::NameSearch),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn route(&self, request: &RouteRequest<'_>, ctx: &RouteContext<'_>) -> Retrieval {
        let query = Query::new(request, ctx.settings);

        for strategy in &self.strategies {
            match strategy.attempt(&query, ctx).await {
                Ok(Attempt::Found(data)) if !data.is_empty() => {
                    tracing::info!(
                        strategy = strategy.name(),
                        kind = data.kind(),
                        rows = data.len(),
                        "retrieval strategy matched"
                    );
                    return Retrieval {
                        strategy: strategy.name(),
                        data,
                    };
                }
                Ok(Attempt::Found(_)) | Ok(Attempt::Pass) => {}
                Ok(Attempt::Stop) => {
                    tracing::info!(strategy = strategy.name(), "authoritative lookup found nothing");
                    return Retrieval::no_results();
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "retrieval strategy failed; trying next"
                    );
                }
            }
        }

        tracing::info!("no retrieval strategy matched");
        Retrieval::no_results()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_extracts_once() {
        let settings = RouterSettings::default();
        let req = RouteRequest {
            query: "top 5 Python developers in Pune",
            history: &[],
            requested_count: None,
        };
        let q = Query::new(&req, &settings);
        assert_eq!(q.limit, 5);
        assert_eq!(q.skill, Some("python"));
        assert_eq!(q.city, Some("pune"));
        assert!(q.has_word("developers"));
        assert!(q.has_phrase("python developers"));
        assert!(!q.has_identifier());
    }

    #[test]
    fn test_explicit_count_overrides_text() {
        let settings = RouterSettings::default();
        let req = RouteRequest {
            query: "top 5 candidates",
            history: &[],
            requested_count: Some(2),
        };
        assert_eq!(Query::new(&req, &settings).limit, 2);
    }

    #[test]
    fn test_standard_order() {
        let names = Router::standard().strategy_names();
        assert_eq!(names.len(), 20);
        let pos = |n: &str| names.iter().position(|s| *s == n).unwrap();
        assert!(pos("email") < pos("phone"));
        assert!(pos("phone") < pos("job_id"));
        assert!(pos("job_id") < pos("semantic"));
        assert!(pos("salary") < pos("skill"));
        assert!(pos("skill") < pos("job_title"));
        assert_eq!(names.last(), Some(&"name"));
    }

    #[test]
    fn test_referenced_entity_is_first_row() {
        let r = Retrieval {
            strategy: "skill",
            data: RetrievalData::Candidates(vec![
                Candidate {
                    id: 4,
                    name: "Anita Desai".to_string(),
                    ..Default::default()
                },
                Candidate {
                    id: 5,
                    name: "Other".to_string(),
                    ..Default::default()
                },
            ]),
        };
        let e = r.referenced_entity().unwrap();
        assert_eq!((e.kind, e.id, e.name.as_str()), (EntityKind::Candidate, 4, "Anita Desai"));
        assert!(Retrieval::no_results().referenced_entity().is_none());
    }
}
