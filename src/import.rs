//! Bulk data import (`rchat import <file>`).
//!
//! Reads a JSON document with optional `jobs`, `clients`, `contacts`, and
//! `candidates` arrays and upserts every record by id. Jobs and clients are
//! written before contacts and candidates so foreign keys resolve.
//!
//! ```json
//! {
//!   "jobs": [{ "id": 1, "job_id": "JOB-101", "title": "Data Engineer" }],
//!   "candidates": [{ "id": 7, "name": "Priya Sharma", "skills": ["python"] }]
//! }
//! ```

use anyhow::{bail, Context, Result};
use recruit_chat_core::models::{Candidate, Client, ClientContact, Job};
use recruit_chat_core::store::RecruitStore;
use serde::Deserialize;
use std::path::Path;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Default, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub contacts: Vec<ClientContact>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    pub jobs: usize,
    pub clients: usize,
    pub contacts: usize,
    pub candidates: usize,
}

pub fn parse_import(json: &str) -> Result<ImportData> {
    let data: ImportData = serde_json::from_str(json).context("Invalid import document")?;

    for c in &data.candidates {
        if c.name.trim().is_empty() {
            bail!("candidate {} has an empty name", c.id);
        }
    }
    for j in &data.jobs {
        if j.job_id.trim().is_empty() {
            bail!("job {} has an empty job_id", j.id);
        }
    }

    Ok(data)
}

/// Upsert everything in `data`, parents first.
pub async fn import_data(store: &dyn RecruitStore, data: &ImportData) -> Result<ImportCounts> {
    let mut counts = ImportCounts::default();

    for job in &data.jobs {
        store
            .upsert_job(job)
            .await
            .with_context(|| format!("Failed to import job {}", job.job_id))?;
        counts.jobs += 1;
    }
    for client in &data.clients {
        store
            .upsert_client(client)
            .await
            .with_context(|| format!("Failed to import client {}", client.name))?;
        counts.clients += 1;
    }
    for contact in &data.contacts {
        store.upsert_contact(contact).await.with_context(|| {
            format!(
                "Failed to import contact {} (client {})",
                contact.name, contact.client_id
            )
        })?;
        counts.contacts += 1;
    }
    for candidate in &data.candidates {
        store
            .upsert_candidate(candidate)
            .await
            .with_context(|| format!("Failed to import candidate {}", candidate.name))?;
        counts.candidates += 1;
    }

    Ok(counts)
}

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let data = parse_import(&raw)?;

    let store = SqliteStore::open(config).await?;
    let counts = import_data(&store, &data).await?;
    store.pool().close().await;

    tracing::info!(
        jobs = counts.jobs,
        clients = counts.clients,
        contacts = counts.contacts,
        candidates = counts.candidates,
        "import finished"
    );

    println!("import {}", path.display());
    println!("  jobs: {}", counts.jobs);
    println!("  clients: {}", counts.clients);
    println!("  contacts: {}", counts.contacts);
    println!("  candidates: {}", counts.candidates);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recruit_chat_core::store::memory::InMemoryStore;

    const DOC: &str = r#"{
        "jobs": [
            { "id": 1, "job_id": "JOB-101", "title": "Data Engineer", "status": "Open" }
        ],
        "clients": [{ "id": 3, "name": "Acme Analytics", "status": "Active" }],
        "contacts": [{ "id": 9, "client_id": 3, "name": "Anita Rao" }],
        "candidates": [
            { "id": 7, "name": "Priya Sharma", "skills": ["python", "sql"], "applied_job_id": "JOB-101" }
        ]
    }"#;

    #[test]
    fn test_missing_sections_default_to_empty() {
        let data = parse_import(r#"{ "candidates": [] }"#).unwrap();
        assert!(data.jobs.is_empty());
        assert!(data.contacts.is_empty());
    }

    #[test]
    fn test_blank_candidate_name_rejected() {
        let err = parse_import(r#"{ "candidates": [{ "id": 1, "name": " " }] }"#).unwrap_err();
        assert!(err.to_string().contains("empty name"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = parse_import("{ not json").unwrap_err();
        assert!(err.to_string().contains("Invalid import document"));
    }

    #[tokio::test]
    async fn test_import_counts_and_lookup() {
        let store = InMemoryStore::new();
        let data = parse_import(DOC).unwrap();
        let counts = import_data(&store, &data).await.unwrap();

        assert_eq!(
            counts,
            ImportCounts {
                jobs: 1,
                clients: 1,
                contacts: 1,
                candidates: 1
            }
        );

        let applied = store.candidates_by_applied_job("JOB-101").await.unwrap();
        assert_eq!(applied.len(), 1);
        let by_skill = store.candidates_by_text("python", 10).await.unwrap();
        assert_eq!(by_skill[0].name, "Priya Sharma");
    }

    #[tokio::test]
    async fn test_reimport_updates_in_place() {
        let store = InMemoryStore::new();
        let data = parse_import(DOC).unwrap();
        import_data(&store, &data).await.unwrap();
        import_data(&store, &data).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_candidates, 1);
        assert_eq!(stats.total_jobs, 1);
    }
}
