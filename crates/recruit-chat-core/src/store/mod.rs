//! Storage abstraction for recruit-chat.
//!
//! The [`RecruitStore`] trait is every read and write the retrieval router,
//! the chat service, and the bulk embedding run issue against the
//! recruitment database. Backends: [`memory::InMemoryStore`] here, and the
//! SQLite store in the app crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Candidate, CandidateMatch, Client, ClientContact, ClientWithContacts, EmbeddingLogEntry,
    EmbeddingOwner, EmbeddingRecord, Job, NumericColumn, NumericFilter, RecruitmentStats,
    StatusColumn, StatusEntry,
};

/// Status values seeded into a fresh database: `(name, column, description)`.
pub const DEFAULT_STATUSES: &[(&str, StatusColumn, &str)] = &[
    ("Applied", StatusColumn::Status, "Application received"),
    ("Screening", StatusColumn::Status, "Resume under review"),
    ("Shortlisted", StatusColumn::Status, "Cleared screening"),
    ("Interview", StatusColumn::Status, "Interview scheduled or in progress"),
    ("Offered", StatusColumn::Status, "Offer extended"),
    ("Hired", StatusColumn::Status, "Offer accepted"),
    ("On Hold", StatusColumn::Status, "Paused by recruiter or client"),
    ("Pending", StatusColumn::InterviewResult, "Awaiting interview feedback"),
    ("Selected", StatusColumn::InterviewResult, "Passed the interview"),
    ("Rejected", StatusColumn::InterviewResult, "Did not pass the interview"),
];

pub fn default_status_catalog() -> Vec<StatusEntry> {
    DEFAULT_STATUSES
        .iter()
        .map(|(name, column, description)| StatusEntry {
            name: name.to_string(),
            column: *column,
            description: Some(description.to_string()),
        })
        .collect()
}

/// Categorical candidate columns used by keyword lookups.
///
/// `Status` and `InterviewResult` match exactly; `Location` matches as a
/// case-insensitive substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateField {
    Status,
    InterviewResult,
    Location,
}

/// How a name guess is matched against candidate names. Every variant is a
/// case-insensitive partial match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// The whole phrase occurs in the name.
    Phrase(String),
    /// Every keyword occurs in the name.
    AllOf(Vec<String>),
    /// At least one keyword occurs in the name.
    AnyOf(Vec<String>),
}

impl NameMatch {
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            NameMatch::Phrase(p) => name.contains(&p.to_lowercase()),
            NameMatch::AllOf(words) => {
                !words.is_empty() && words.iter().all(|w| name.contains(&w.to_lowercase()))
            }
            NameMatch::AnyOf(words) => words.iter().any(|w| name.contains(&w.to_lowercase())),
        }
    }
}

/// Ordering for candidate lists: `overall_score` descending, missing scores
/// last, ties broken by id.
pub fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    let by_score = match (a.overall_score, b.overall_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then(a.id.cmp(&b.id))
}

/// Abstract recruitment database.
///
/// Candidate lists are ordered by `overall_score` descending with missing
/// scores last, unless an operation says otherwise.
///
/// | Group | Methods |
/// |-------|---------|
/// | writes | `upsert_*`, [`append_embedding_log`](RecruitStore::append_embedding_log) |
/// | identifier lookups | [`candidates_by_email`](RecruitStore::candidates_by_email), [`candidates_by_phone`](RecruitStore::candidates_by_phone), [`job_by_code`](RecruitStore::job_by_code) |
/// | filtered reads | [`candidates_by_field`](RecruitStore::candidates_by_field), [`candidates_by_threshold`](RecruitStore::candidates_by_threshold), [`candidates_by_name`](RecruitStore::candidates_by_name), [`candidates_by_text`](RecruitStore::candidates_by_text) |
/// | listings | [`top_candidates`](RecruitStore::top_candidates), [`list_jobs`](RecruitStore::list_jobs), [`clients_with_contacts`](RecruitStore::clients_with_contacts), [`status_catalog`](RecruitStore::status_catalog) |
/// | aggregates | [`stats`](RecruitStore::stats) |
/// | vectors | [`match_candidates`](RecruitStore::match_candidates), [`candidate_embedding`](RecruitStore::candidate_embedding), [`embedding_hash`](RecruitStore::embedding_hash) |
#[async_trait]
pub trait RecruitStore: Send + Sync {
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<()>;
    async fn upsert_job(&self, job: &Job) -> Result<()>;
    async fn upsert_client(&self, client: &Client) -> Result<()>;
    async fn upsert_contact(&self, contact: &ClientContact) -> Result<()>;
    /// Insert or replace the embedding for `record.owner`.
    async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<()>;

    /// Highest-scored candidates, nulls last.
    async fn top_candidates(&self, limit: usize) -> Result<Vec<Candidate>>;
    /// Exact (case-insensitive) email match.
    async fn candidates_by_email(&self, email: &str) -> Result<Vec<Candidate>>;
    /// Phone numbers containing `digits`.
    async fn candidates_by_phone(&self, digits: &str) -> Result<Vec<Candidate>>;
    /// Candidates whose `applied_job_id` equals `code`.
    async fn candidates_by_applied_job(&self, code: &str) -> Result<Vec<Candidate>>;
    /// Job posting with this exact code.
    async fn job_by_code(&self, code: &str) -> Result<Option<Job>>;
    async fn candidates_by_field(
        &self,
        field: CandidateField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>>;
    async fn candidates_by_threshold(
        &self,
        column: NumericColumn,
        filter: NumericFilter,
        limit: usize,
    ) -> Result<Vec<Candidate>>;
    async fn candidates_by_name(&self, name: &NameMatch, limit: usize) -> Result<Vec<Candidate>>;
    /// Case-insensitive substring match over skills, experience, and resume text.
    async fn candidates_by_text(&self, term: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// Jobs ordered by code. `active_only` keeps `active`/`open` postings.
    async fn list_jobs(&self, active_only: bool, limit: Option<usize>) -> Result<Vec<Job>>;
    async fn jobs_by_location(&self, city: &str, limit: usize) -> Result<Vec<Job>>;
    async fn clients_with_contacts(
        &self,
        active_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<ClientWithContacts>>;
    async fn status_catalog(&self) -> Result<Vec<StatusEntry>>;

    /// Counts plus the top-jobs-by-applications and status-distribution aggregates.
    async fn stats(&self) -> Result<RecruitmentStats>;

    /// Nearest candidates to `query` by cosine similarity, keeping those
    /// strictly above `threshold`, best first, at most `k`.
    async fn match_candidates(
        &self,
        query: &[f32],
        threshold: f64,
        k: usize,
    ) -> Result<Vec<CandidateMatch>>;
    async fn candidate_embedding(&self, candidate_id: i64) -> Result<Option<Vec<f32>>>;
    /// Content hash of the stored embedding chunk, if any.
    async fn embedding_hash(&self, owner: EmbeddingOwner) -> Result<Option<String>>;
    async fn candidates_without_embeddings(&self) -> Result<Vec<Candidate>>;
    async fn jobs_without_embeddings(&self) -> Result<Vec<Job>>;
    async fn append_embedding_log(&self, entry: &EmbeddingLogEntry) -> Result<()>;
}
