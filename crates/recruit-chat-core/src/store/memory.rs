//! In-memory [`RecruitStore`] implementation for tests and demos.
//!
//! Rows live in `BTreeMap`s behind `std::sync::RwLock`. Vector matching is
//! brute-force cosine similarity over every stored candidate vector.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{
    Candidate, CandidateMatch, Client, ClientContact, ClientWithContacts, EmbeddingLogEntry,
    EmbeddingOwner, EmbeddingRecord, Job, JobApplicationCount, NumericColumn, NumericFilter,
    RecruitmentStats, StatusCount, StatusEntry,
};

use super::{by_score_desc, default_status_catalog, CandidateField, NameMatch, RecruitStore};

/// In-memory store seeded with the default status catalog.
pub struct InMemoryStore {
    candidates: RwLock<BTreeMap<i64, Candidate>>,
    jobs: RwLock<BTreeMap<i64, Job>>,
    clients: RwLock<BTreeMap<i64, Client>>,
    contacts: RwLock<BTreeMap<i64, ClientContact>>,
    statuses: RwLock<Vec<StatusEntry>>,
    embeddings: RwLock<HashMap<EmbeddingOwner, EmbeddingRecord>>,
    embedding_logs: RwLock<Vec<EmbeddingLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            candidates: RwLock::new(BTreeMap::new()),
            jobs: RwLock::new(BTreeMap::new()),
            clients: RwLock::new(BTreeMap::new()),
            contacts: RwLock::new(BTreeMap::new()),
            statuses: RwLock::new(default_status_catalog()),
            embeddings: RwLock::new(HashMap::new()),
            embedding_logs: RwLock::new(Vec::new()),
        }
    }

    /// Audit-log rows appended so far.
    pub fn embedding_logs(&self) -> Vec<EmbeddingLogEntry> {
        read(&self.embedding_logs).clone()
    }

    fn ranked_candidates<F>(&self, keep: F, limit: usize) -> Vec<Candidate>
    where
        F: Fn(&Candidate) -> bool,
    {
        let mut out: Vec<Candidate> = read(&self.candidates)
            .values()
            .filter(|c| keep(c))
            .cloned()
            .collect();
        out.sort_by(by_score_desc);
        out.truncate(limit);
        out
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

#[async_trait]
impl RecruitStore for InMemoryStore {
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<()> {
        write(&self.candidates).insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn upsert_job(&self, job: &Job) -> Result<()> {
        write(&self.jobs).insert(job.id, job.clone());
        Ok(())
    }

    async fn upsert_client(&self, client: &Client) -> Result<()> {
        write(&self.clients).insert(client.id, client.clone());
        Ok(())
    }

    async fn upsert_contact(&self, contact: &ClientContact) -> Result<()> {
        write(&self.contacts).insert(contact.id, contact.clone());
        Ok(())
    }

    async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        write(&self.embeddings).insert(record.owner, record.clone());
        Ok(())
    }

    async fn top_candidates(&self, limit: usize) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(|_| true, limit))
    }

    async fn candidates_by_email(&self, email: &str) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(
            |c| c.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)),
            usize::MAX,
        ))
    }

    async fn candidates_by_phone(&self, digits: &str) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(|c| contains_ci(c.phone.as_deref(), digits), usize::MAX))
    }

    async fn candidates_by_applied_job(&self, code: &str) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(
            |c| c.applied_job_id.as_deref() == Some(code),
            usize::MAX,
        ))
    }

    async fn job_by_code(&self, code: &str) -> Result<Option<Job>> {
        Ok(read(&self.jobs).values().find(|j| j.job_id == code).cloned())
    }

    async fn candidates_by_field(
        &self,
        field: CandidateField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(
            |c| match field {
                CandidateField::Status => c.status.as_deref() == Some(value),
                CandidateField::InterviewResult => c.interview_result.as_deref() == Some(value),
                CandidateField::Location => contains_ci(c.location.as_deref(), value),
            },
            limit,
        ))
    }

    async fn candidates_by_threshold(
        &self,
        column: NumericColumn,
        filter: NumericFilter,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(
            |c| {
                let value = match column {
                    NumericColumn::OverallScore => c.overall_score,
                    NumericColumn::ExpectedSalary => c.expected_salary,
                };
                value.is_some_and(|v| filter.op.holds(v, filter.value))
            },
            limit,
        ))
    }

    async fn candidates_by_name(&self, name: &NameMatch, limit: usize) -> Result<Vec<Candidate>> {
        Ok(self.ranked_candidates(|c| name.matches(&c.name), limit))
    }

    async fn candidates_by_text(&self, term: &str, limit: usize) -> Result<Vec<Candidate>> {
        let term = term.to_lowercase();
        Ok(self.ranked_candidates(
            |c| c.search_text().to_lowercase().contains(&term),
            limit,
        ))
    }

    async fn list_jobs(&self, active_only: bool, limit: Option<usize>) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = read(&self.jobs)
            .values()
            .filter(|j| !active_only || j.is_active())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn jobs_by_location(&self, city: &str, limit: usize) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = read(&self.jobs)
            .values()
            .filter(|j| contains_ci(j.location.as_deref(), city))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn clients_with_contacts(
        &self,
        active_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<ClientWithContacts>> {
        let contacts = read(&self.contacts);
        let mut out: Vec<ClientWithContacts> = read(&self.clients)
            .values()
            .filter(|c| !active_only || c.is_active())
            .map(|client| ClientWithContacts {
                client: client.clone(),
                contacts: contacts
                    .values()
                    .filter(|ct| ct.client_id == client.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        out.sort_by(|a, b| a.client.name.cmp(&b.client.name));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn status_catalog(&self) -> Result<Vec<StatusEntry>> {
        Ok(read(&self.statuses).clone())
    }

    async fn stats(&self) -> Result<RecruitmentStats> {
        let candidates = read(&self.candidates);
        let jobs = read(&self.jobs);

        let mut applications: HashMap<&str, i64> = HashMap::new();
        let mut statuses: HashMap<String, i64> = HashMap::new();
        for c in candidates.values() {
            if let Some(code) = c.applied_job_id.as_deref() {
                *applications.entry(code).or_default() += 1;
            }
            let status = c.status.clone().unwrap_or_else(|| "Unknown".to_string());
            *statuses.entry(status).or_default() += 1;
        }

        let mut top_jobs: Vec<JobApplicationCount> = jobs
            .values()
            .filter_map(|j| {
                applications
                    .get(j.job_id.as_str())
                    .map(|&n| JobApplicationCount {
                        job_id: j.job_id.clone(),
                        title: j.title.clone(),
                        applications: n,
                    })
            })
            .collect();
        top_jobs.sort_by(|a, b| {
            b.applications
                .cmp(&a.applications)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        top_jobs.truncate(5);

        let mut status_distribution: Vec<StatusCount> = statuses
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        status_distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));

        Ok(RecruitmentStats {
            total_candidates: candidates.len() as i64,
            total_jobs: jobs.len() as i64,
            active_jobs: jobs.values().filter(|j| j.is_active()).count() as i64,
            total_clients: read(&self.clients).len() as i64,
            top_jobs,
            status_distribution,
        })
    }

    async fn match_candidates(
        &self,
        query: &[f32],
        threshold: f64,
        k: usize,
    ) -> Result<Vec<CandidateMatch>> {
        let candidates = read(&self.candidates);
        let mut matches: Vec<CandidateMatch> = read(&self.embeddings)
            .values()
            .filter_map(|rec| match rec.owner {
                EmbeddingOwner::Candidate(id) => {
                    let similarity = cosine_similarity(query, &rec.vector) as f64;
                    (similarity > threshold)
                        .then(|| candidates.get(&id))
                        .flatten()
                        .map(|c| CandidateMatch {
                            candidate: c.clone(),
                            similarity,
                        })
                }
                EmbeddingOwner::Job(_) => None,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn candidate_embedding(&self, candidate_id: i64) -> Result<Option<Vec<f32>>> {
        Ok(read(&self.embeddings)
            .get(&EmbeddingOwner::Candidate(candidate_id))
            .map(|r| r.vector.clone()))
    }

    async fn embedding_hash(&self, owner: EmbeddingOwner) -> Result<Option<String>> {
        Ok(read(&self.embeddings)
            .get(&owner)
            .map(|r| r.content_hash.clone()))
    }

    async fn candidates_without_embeddings(&self) -> Result<Vec<Candidate>> {
        let embeddings = read(&self.embeddings);
        Ok(read(&self.candidates)
            .values()
            .filter(|c| !embeddings.contains_key(&EmbeddingOwner::Candidate(c.id)))
            .cloned()
            .collect())
    }

    async fn jobs_without_embeddings(&self) -> Result<Vec<Job>> {
        let embeddings = read(&self.embeddings);
        Ok(read(&self.jobs)
            .values()
            .filter(|j| !embeddings.contains_key(&EmbeddingOwner::Job(j.id)))
            .cloned()
            .collect())
    }

    async fn append_embedding_log(&self, entry: &EmbeddingLogEntry) -> Result<()> {
        write(&self.embedding_logs).push(entry.clone());
        Ok(())
    }
}
