//! Core data models used throughout recruit-chat.
//!
//! Records mirror the rows of the external relational store. They are
//! read-only snapshots for the duration of a request; nothing in the core
//! mutates them after retrieval.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*\+?\s*(?:years?|yrs?)").expect("years regex is valid")
});

/// A candidate (applicant) row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub interview_result: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-text duration, e.g. `"5 years in backend development"`.
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub expected_salary: Option<f64>,
    /// `job_id` code of the posting this candidate applied to.
    #[serde(default)]
    pub applied_job_id: Option<String>,
}

impl Candidate {
    /// Skills, experience, and resume text joined into one searchable string.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = self.skills.iter().map(String::as_str).collect();
        if let Some(exp) = &self.experience {
            parts.push(exp);
        }
        if let Some(resume) = &self.resume_text {
            parts.push(resume);
        }
        parts.join(" ")
    }

    /// Years of experience parsed from the free-text `experience` field.
    ///
    /// Takes the first `"<n> years"` / `"<n> yrs"` occurrence. Returns `None`
    /// when the field is missing or carries no recognisable duration.
    pub fn experience_years(&self) -> Option<f64> {
        let text = self.experience.as_deref()?;
        YEARS_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

/// A job posting row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    /// Posting code, e.g. `"DEV101"`.
    pub job_id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Job {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("active") | Some("open")
        )
    }

    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        parts.extend(self.skills.iter().map(String::as_str));
        if let Some(desc) = &self.description {
            parts.push(desc);
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Client {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("active"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientContact {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
}

/// A client together with its contacts, as returned by client lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientWithContacts {
    #[serde(flatten)]
    pub client: Client,
    pub contacts: Vec<ClientContact>,
}

/// Which candidate column a status keyword filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColumn {
    Status,
    InterviewResult,
}

impl StatusColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColumn::Status => "status",
            StatusColumn::InterviewResult => "interview_result",
        }
    }
}

/// One row of the status catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    pub column: StatusColumn,
    #[serde(default)]
    pub description: Option<String>,
}

/// Comparison direction for numeric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Lt,
    Gt,
}

impl Comparator {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Lt => value < threshold,
            Comparator::Gt => value > threshold,
        }
    }
}

/// A numeric threshold pulled out of a query ("salary above 10 lakh").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericFilter {
    pub value: f64,
    pub op: Comparator,
}

/// Candidate columns that support numeric threshold lookups in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    OverallScore,
    ExpectedSalary,
}

/// A candidate returned by vector similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMatch {
    pub candidate: Candidate,
    /// Cosine similarity in `[-1, 1]`; in practice `[0, 1]` for text embeddings.
    pub similarity: f64,
}

/// Aggregate application count for one job (top-jobs procedure).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobApplicationCount {
    pub job_id: String,
    pub title: String,
    pub applications: i64,
}

/// Candidate count per status value (status-distribution procedure).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Live aggregate statistics included in every synthesized prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecruitmentStats {
    pub total_candidates: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub total_clients: i64,
    pub top_jobs: Vec<JobApplicationCount>,
    pub status_distribution: Vec<StatusCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Candidate,
    Job,
    Client,
}

/// The record an assistant reply was about, carried alongside the reply text
/// so follow-up questions ("what about his status") can be resolved without
/// scraping the rendered markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedEntity {
    pub kind: EntityKind,
    pub id: i64,
    pub name: String,
}

/// One turn of conversation, held only in session memory by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub referenced: Option<ReferencedEntity>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            referenced: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            referenced: None,
        }
    }

    pub fn with_reference(mut self, entity: ReferencedEntity) -> Self {
        self.referenced = Some(entity);
        self
    }
}

/// Which record an embedding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EmbeddingOwner {
    Candidate(i64),
    Job(i64),
}

/// A stored embedding: owner → vector plus the text chunk it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub owner: EmbeddingOwner,
    pub vector: Vec<f32>,
    pub chunk_text: String,
    pub content_hash: String,
    pub model: String,
    pub metadata: serde_json::Value,
}

/// One row of the embedding-generation audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingLogEntry {
    pub run_id: String,
    /// `"candidates"` or `"jobs"`.
    pub target: String,
    pub model: String,
    pub total: i64,
    pub embedded: i64,
    pub skipped: i64,
    pub failed: i64,
    pub tokens: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_years_parses_first_duration() {
        let c = Candidate {
            experience: Some("5 years backend, 2 years lead".to_string()),
            ..Default::default()
        };
        assert_eq!(c.experience_years(), Some(5.0));

        let c = Candidate {
            experience: Some("3.5 yrs".to_string()),
            ..Default::default()
        };
        assert_eq!(c.experience_years(), Some(3.5));
    }

    #[test]
    fn test_experience_years_missing() {
        let c = Candidate {
            experience: Some("fresher".to_string()),
            ..Default::default()
        };
        assert_eq!(c.experience_years(), None);
        assert_eq!(Candidate::default().experience_years(), None);
    }

    #[test]
    fn test_search_text_joins_fields() {
        let c = Candidate {
            skills: vec!["Python".to_string(), "AWS".to_string()],
            experience: Some("4 years".to_string()),
            resume_text: Some("Built ETL pipelines".to_string()),
            ..Default::default()
        };
        assert_eq!(c.search_text(), "Python AWS 4 years Built ETL pipelines");
    }

    #[test]
    fn test_comparator() {
        assert!(Comparator::Gt.holds(6.0, 5.0));
        assert!(!Comparator::Gt.holds(5.0, 5.0));
        assert!(Comparator::Lt.holds(4.0, 5.0));
    }

    #[test]
    fn test_turn_deserializes_without_timestamp() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role":"assistant","text":"hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.referenced.is_none());
    }
}
