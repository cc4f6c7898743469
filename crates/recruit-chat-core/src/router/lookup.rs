//! Identifier lookups, numeric filters, and keyword searches.

use anyhow::Result;
use async_trait::async_trait;

use super::{Attempt, Query, RetrievalData, RetrievalStrategy, RouteContext};
use crate::extract::SKILL_VOCABULARY;
use crate::models::{Candidate, NumericColumn};
use crate::similarity::{
    calculate_similarity, fuzzy_contains, FIELD_MATCH_THRESHOLD, WORD_MATCH_THRESHOLD,
};
use crate::store::CandidateField;

/// Status keyword → (column, exact stored value).
const STATUS_KEYWORDS: &[(&str, CandidateField, &str)] = &[
    ("screening", CandidateField::Status, "Screening"),
    ("shortlisted", CandidateField::Status, "Shortlisted"),
    ("interview", CandidateField::Status, "Interview"),
    ("interviews", CandidateField::Status, "Interview"),
    ("interviewing", CandidateField::Status, "Interview"),
    ("offered", CandidateField::Status, "Offered"),
    ("hired", CandidateField::Status, "Hired"),
    ("on hold", CandidateField::Status, "On Hold"),
    ("selected", CandidateField::InterviewResult, "Selected"),
    ("rejected", CandidateField::InterviewResult, "Rejected"),
    ("pending", CandidateField::InterviewResult, "Pending"),
];

pub(crate) const JOB_KEYWORDS: &[&str] = &[
    "job", "jobs", "position", "positions", "opening", "openings", "vacancy", "vacancies",
    "role", "roles",
];

pub(crate) const CLIENT_KEYWORDS: &[&str] = &["client", "clients", "company", "companies"];

const UNBOUNDED_CUES: &[&str] = &["all", "every"];

/// Words never treated as misspelled skills.
const NON_SKILL_WORDS: &[&str] = &[
    "candidate", "candidates", "applicant", "applicants", "skills", "skilled", "people",
    "profiles", "developer", "developers", "engineer", "engineers", "experience", "years",
    "with", "have", "having", "know", "knows", "show", "find", "list", "give", "good",
    "strong", "who", "whose", "what", "which", "about", "from", "status", "screening",
    "shortlisted", "selected", "rejected", "pending", "offered", "hired", "interview",
    "clients", "client", "jobs", "openings", "position", "positions", "salary", "score",
    "location", "based", "working", "please", "their", "them", "there", "these", "those",
];

/// The column and value a status keyword in the query filters on.
pub fn status_filter(q: &Query<'_>) -> Option<(CandidateField, &'static str)> {
    STATUS_KEYWORDS
        .iter()
        .find(|(kw, _, _)| q.has_phrase(kw))
        .map(|(_, field, value)| (*field, *value))
}

/// The skill a query asks about: an exact vocabulary hit, else a single
/// query word that looks like a misspelled vocabulary skill.
///
/// The fuzzy path only considers words of four or more characters whose
/// length is within one of the skill, since character-set overlap is
/// meaningless on shorter tokens.
pub fn detect_skill(q: &Query<'_>) -> Option<&'static str> {
    if q.skill.is_some() {
        return q.skill;
    }
    q.words
        .iter()
        .filter(|w| w.chars().count() >= 4 && !NON_SKILL_WORDS.contains(&w.as_str()))
        .find_map(|word| {
            SKILL_VOCABULARY.iter().copied().find(|skill| {
                !skill.contains(' ')
                    && skill.len().abs_diff(word.len()) <= 1
                    && skill.chars().all(char::is_alphanumeric)
                    && calculate_similarity(word, skill) > WORD_MATCH_THRESHOLD
            })
        })
}

async fn sample(ctx: &RouteContext<'_>) -> Result<Vec<Candidate>> {
    ctx.store.top_candidates(ctx.settings.sample_size).await
}

fn matching<F>(candidates: Vec<Candidate>, limit: usize, keep: F) -> Vec<Candidate>
where
    F: Fn(&Candidate) -> bool,
{
    candidates.into_iter().filter(|c| keep(c)).take(limit).collect()
}

/// Exact email match. Authoritative: no match means "no results".
pub struct EmailLookup;

#[async_trait]
impl RetrievalStrategy for EmailLookup {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(email) = &q.email else {
            return Ok(Attempt::Pass);
        };
        let rows = ctx.store.candidates_by_email(email).await?;
        if rows.is_empty() {
            return Ok(Attempt::Stop);
        }
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Partial phone match on the bare 10 digits. Authoritative.
pub struct PhoneLookup;

#[async_trait]
impl RetrievalStrategy for PhoneLookup {
    fn name(&self) -> &'static str {
        "phone"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(phone) = &q.phone else {
            return Ok(Attempt::Pass);
        };
        let rows = ctx.store.candidates_by_phone(phone).await?;
        if rows.is_empty() {
            return Ok(Attempt::Stop);
        }
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Job code lookup: the posting's applicants, or the posting itself when
/// nobody has applied. Codes that match no posting fall through.
pub struct JobIdLookup;

#[async_trait]
impl RetrievalStrategy for JobIdLookup {
    fn name(&self) -> &'static str {
        "job_id"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(code) = &q.job_id else {
            return Ok(Attempt::Pass);
        };
        let Some(job) = ctx.store.job_by_code(code).await? else {
            return Ok(Attempt::Pass);
        };
        let applicants = ctx.store.candidates_by_applied_job(code).await?;
        if applicants.is_empty() {
            return Ok(Attempt::Found(RetrievalData::Jobs(vec![job])));
        }
        Ok(Attempt::Found(RetrievalData::Candidates(applicants)))
    }
}

/// Years-of-experience threshold, computed from the free-text field.
pub struct ExperienceFilter;

#[async_trait]
impl RetrievalStrategy for ExperienceFilter {
    fn name(&self) -> &'static str {
        "experience"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(filter) = q.experience else {
            return Ok(Attempt::Pass);
        };
        let rows = matching(sample(ctx).await?, q.limit, |c| {
            c.experience_years()
                .is_some_and(|years| filter.op.holds(years, filter.value))
        });
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

pub struct ScoreFilter;

#[async_trait]
impl RetrievalStrategy for ScoreFilter {
    fn name(&self) -> &'static str {
        "score"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(filter) = q.score else {
            return Ok(Attempt::Pass);
        };
        let rows = ctx
            .store
            .candidates_by_threshold(NumericColumn::OverallScore, filter, q.limit)
            .await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

pub struct SalaryFilter;

#[async_trait]
impl RetrievalStrategy for SalaryFilter {
    fn name(&self) -> &'static str {
        "salary"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(filter) = q.salary else {
            return Ok(Attempt::Pass);
        };
        let rows = ctx
            .store
            .candidates_by_threshold(NumericColumn::ExpectedSalary, filter, q.limit)
            .await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Skill keyword, matched typo-tolerantly across skills, experience, and resume.
pub struct SkillSearch;

#[async_trait]
impl RetrievalStrategy for SkillSearch {
    fn name(&self) -> &'static str {
        "skill"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(skill) = detect_skill(q) else {
            return Ok(Attempt::Pass);
        };
        let rows = matching(sample(ctx).await?, q.limit, |c| {
            fuzzy_contains(&c.search_text(), skill, FIELD_MATCH_THRESHOLD)
        });
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// Job title keyword: candidates first, then postings.
pub struct JobTitleSearch;

#[async_trait]
impl RetrievalStrategy for JobTitleSearch {
    fn name(&self) -> &'static str {
        "job_title"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(title) = q.title else {
            return Ok(Attempt::Pass);
        };
        let candidates = matching(sample(ctx).await?, q.limit, |c| {
            fuzzy_contains(&c.search_text(), title, FIELD_MATCH_THRESHOLD)
        });
        if !candidates.is_empty() {
            return Ok(Attempt::Found(RetrievalData::Candidates(candidates)));
        }

        let jobs: Vec<_> = ctx
            .store
            .list_jobs(false, None)
            .await?
            .into_iter()
            .filter(|j| fuzzy_contains(&j.title, title, FIELD_MATCH_THRESHOLD))
            .take(q.limit)
            .collect();
        Ok(Attempt::Found(RetrievalData::Jobs(jobs)))
    }
}

pub struct StatusSearch;

#[async_trait]
impl RetrievalStrategy for StatusSearch {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some((field, value)) = status_filter(q) else {
            return Ok(Attempt::Pass);
        };
        tracing::debug!(?field, value, "status keyword lookup");
        let rows = ctx.store.candidates_by_field(field, value, q.limit).await?;
        Ok(Attempt::Found(RetrievalData::Candidates(rows)))
    }
}

/// City keyword: jobs when the query is about postings, otherwise
/// candidates with jobs as a fallback.
pub struct LocationSearch;

#[async_trait]
impl RetrievalStrategy for LocationSearch {
    fn name(&self) -> &'static str {
        "location"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        let Some(city) = q.city else {
            return Ok(Attempt::Pass);
        };
        if !q.has_any_word(JOB_KEYWORDS) {
            let rows = ctx
                .store
                .candidates_by_field(CandidateField::Location, city, q.limit)
                .await?;
            if !rows.is_empty() {
                return Ok(Attempt::Found(RetrievalData::Candidates(rows)));
            }
        }
        let jobs = ctx.store.jobs_by_location(city, q.limit).await?;
        Ok(Attempt::Found(RetrievalData::Jobs(jobs)))
    }
}

/// Clients and their contacts; "active" restricts, "all"/"every" lifts the limit.
pub struct ClientSearch;

#[async_trait]
impl RetrievalStrategy for ClientSearch {
    fn name(&self) -> &'static str {
        "client"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        if !q.has_any_word(CLIENT_KEYWORDS) {
            return Ok(Attempt::Pass);
        }
        let active_only = q.has_word("active");
        let limit = (!q.has_any_word(UNBOUNDED_CUES)).then_some(q.limit);
        let rows = ctx.store.clients_with_contacts(active_only, limit).await?;
        Ok(Attempt::Found(RetrievalData::Clients(rows)))
    }
}

/// Job postings; "active"/"open" restricts, "all"/"every" lifts the limit.
pub struct JobSearch;

#[async_trait]
impl RetrievalStrategy for JobSearch {
    fn name(&self) -> &'static str {
        "job"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        if !q.has_any_word(JOB_KEYWORDS) {
            return Ok(Attempt::Pass);
        }
        let active_only = q.has_any_word(&["active", "open"]);
        let limit = (!q.has_any_word(UNBOUNDED_CUES)).then_some(q.limit);
        let rows = ctx.store.list_jobs(active_only, limit).await?;
        Ok(Attempt::Found(RetrievalData::Jobs(rows)))
    }
}

/// The list of valid status values.
pub struct StatusCatalog;

impl StatusCatalog {
    pub(crate) fn applies(q: &Query<'_>) -> bool {
        q.has_word("statuses")
            || (q.has_word("status")
                && q.has_any_word(&[
                    "list", "options", "values", "available", "valid", "possible", "types",
                    "all", "stages",
                ]))
    }
}

#[async_trait]
impl RetrievalStrategy for StatusCatalog {
    fn name(&self) -> &'static str {
        "status_catalog"
    }

    async fn attempt(&self, q: &Query<'_>, ctx: &RouteContext<'_>) -> Result<Attempt> {
        if !Self::applies(q) {
            return Ok(Attempt::Pass);
        }
        let rows = ctx.store.status_catalog().await?;
        Ok(Attempt::Found(RetrievalData::Statuses(rows)))
    }
}
