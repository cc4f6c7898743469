//! SQLite store behaviour against a real database file.

use recruit_chat::config::Config;
use recruit_chat::sqlite_store::SqliteStore;
use recruit_chat::{db, migrate};
use recruit_chat_core::models::{
    Candidate, Client, ClientContact, Comparator, EmbeddingOwner, EmbeddingRecord, Job,
    NumericColumn, NumericFilter, StatusColumn,
};
use recruit_chat_core::store::{CandidateField, NameMatch, RecruitStore};
use tempfile::TempDir;

async fn open_store(tmp: &TempDir) -> SqliteStore {
    let config: Config = toml::from_str(&format!(
        "[db]\npath = \"{}/db/rchat.sqlite\"\n\n[server]\nbind = \"127.0.0.1:0\"\n",
        tmp.path().display()
    ))
    .unwrap();
    let pool = db::connect(&config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn candidate(id: i64, name: &str, score: Option<f64>) -> Candidate {
    Candidate {
        id,
        name: name.to_string(),
        overall_score: score,
        ..Default::default()
    }
}

async fn seeded(tmp: &TempDir) -> SqliteStore {
    let store = open_store(tmp).await;

    store
        .upsert_job(&Job {
            id: 1,
            job_id: "JOB-101".into(),
            title: "Data Engineer".into(),
            status: Some("Open".into()),
            skills: vec!["python".into(), "spark".into()],
            location: Some("Bangalore".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .upsert_job(&Job {
            id: 2,
            job_id: "JOB-102".into(),
            title: "QA Analyst".into(),
            status: Some("Closed".into()),
            location: Some("Pune".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    store
        .upsert_candidate(&Candidate {
            email: Some("Priya@Example.com".into()),
            phone: Some("+91 98765-43210".into()),
            status: Some("Screening".into()),
            location: Some("Bangalore".into()),
            skills: vec!["python".into(), "sql".into()],
            expected_salary: Some(14.0),
            applied_job_id: Some("JOB-101".into()),
            ..candidate(1, "Priya Sharma", Some(88.0))
        })
        .await
        .unwrap();
    store
        .upsert_candidate(&Candidate {
            status: Some("Applied".into()),
            interview_result: Some("Selected".into()),
            location: Some("Pune".into()),
            resume_text: Some("Built dashboards in Tableau".into()),
            expected_salary: Some(8.0),
            applied_job_id: Some("JOB-101".into()),
            ..candidate(2, "Rahul Verma", Some(71.0))
        })
        .await
        .unwrap();
    store
        .upsert_candidate(&candidate(3, "Meera Nair", None))
        .await
        .unwrap();

    store
}

// ─── schema ───

#[tokio::test]
async fn test_apply_schema_is_idempotent_and_seeds_statuses() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    migrate::apply_schema(store.pool()).await.unwrap();

    let catalog = store.status_catalog().await.unwrap();
    assert!(!catalog.is_empty());
    let first_result = catalog
        .iter()
        .position(|s| s.column == StatusColumn::InterviewResult)
        .unwrap();
    assert!(catalog[..first_result]
        .iter()
        .all(|s| s.column == StatusColumn::Status));
    assert!(catalog.iter().any(|s| s.name == "Selected"));
}

// ─── candidate lookups ───

#[tokio::test]
async fn test_top_candidates_puts_missing_scores_last() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let names: Vec<String> = store
        .top_candidates(10)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Priya Sharma", "Rahul Verma", "Meera Nair"]);
    assert_eq!(store.top_candidates(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upsert_replaces_existing_row() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    store
        .upsert_candidate(&candidate(3, "Meera Nair", Some(95.0)))
        .await
        .unwrap();
    let top = store.top_candidates(1).await.unwrap();
    assert_eq!(top[0].name, "Meera Nair");
    assert_eq!(store.stats().await.unwrap().total_candidates, 3);
}

#[tokio::test]
async fn test_identifier_lookups() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let by_email = store.candidates_by_email("priya@example.com").await.unwrap();
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].skills, vec!["python", "sql"]);

    let by_phone = store.candidates_by_phone("9876543210").await.unwrap();
    assert_eq!(by_phone[0].name, "Priya Sharma");

    let applied = store.candidates_by_applied_job("JOB-101").await.unwrap();
    assert_eq!(applied.len(), 2);

    assert_eq!(
        store.job_by_code("JOB-102").await.unwrap().unwrap().title,
        "QA Analyst"
    );
    assert!(store.job_by_code("JOB-999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_field_lookups() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let screening = store
        .candidates_by_field(CandidateField::Status, "Screening", 10)
        .await
        .unwrap();
    assert_eq!(screening.len(), 1);

    // Status values match exactly.
    let lower = store
        .candidates_by_field(CandidateField::Status, "screening", 10)
        .await
        .unwrap();
    assert!(lower.is_empty());

    let selected = store
        .candidates_by_field(CandidateField::InterviewResult, "Selected", 10)
        .await
        .unwrap();
    assert_eq!(selected[0].name, "Rahul Verma");

    let pune = store
        .candidates_by_field(CandidateField::Location, "pune", 10)
        .await
        .unwrap();
    assert_eq!(pune.len(), 1);
}

#[tokio::test]
async fn test_threshold_lookup_skips_missing_values() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let above = store
        .candidates_by_threshold(
            NumericColumn::ExpectedSalary,
            NumericFilter {
                value: 10.0,
                op: Comparator::Gt,
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(above.len(), 1);
    assert_eq!(above[0].name, "Priya Sharma");

    let below = store
        .candidates_by_threshold(
            NumericColumn::OverallScore,
            NumericFilter {
                value: 80.0,
                op: Comparator::Lt,
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(below.len(), 1);
    assert_eq!(below[0].name, "Rahul Verma");
}

#[tokio::test]
async fn test_name_and_text_lookups() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let all = store
        .candidates_by_name(&NameMatch::AllOf(vec!["sharma".into(), "priya".into()]), 10)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let any = store
        .candidates_by_name(&NameMatch::AnyOf(vec!["nair".into(), "verma".into()]), 10)
        .await
        .unwrap();
    assert_eq!(any.len(), 2);

    let none = store
        .candidates_by_name(&NameMatch::AllOf(Vec::new()), 10)
        .await
        .unwrap();
    assert!(none.is_empty());

    let tableau = store.candidates_by_text("tableau", 10).await.unwrap();
    assert_eq!(tableau[0].name, "Rahul Verma");
}

// ─── jobs / clients ───

#[tokio::test]
async fn test_job_listings() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    assert_eq!(store.list_jobs(false, None).await.unwrap().len(), 2);
    let active = store.list_jobs(true, None).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].skills, vec!["python", "spark"]);

    let pune = store.jobs_by_location("PUNE", 10).await.unwrap();
    assert_eq!(pune[0].job_id, "JOB-102");
}

#[tokio::test]
async fn test_clients_carry_their_contacts() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    for (id, name, status) in [(1, "Acme", "Active"), (2, "Globex", "Inactive")] {
        store
            .upsert_client(&Client {
                id,
                name: name.into(),
                status: Some(status.into()),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    store
        .upsert_contact(&ClientContact {
            id: 1,
            client_id: 1,
            name: "Anita Rao".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let all = store.clients_with_contacts(false, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].contacts.len(), 1);
    assert!(all[1].contacts.is_empty());

    let active = store.clients_with_contacts(true, None).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_contact_for_unknown_client_fails() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let err = store
        .upsert_contact(&ClientContact {
            id: 1,
            client_id: 42,
            name: "Nobody".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("client 42"));
}

// ─── stats ───

#[tokio::test]
async fn test_stats_aggregates() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_candidates, 3);
    assert_eq!(stats.total_jobs, 2);
    assert_eq!(stats.active_jobs, 1);
    assert_eq!(stats.top_jobs[0].job_id, "JOB-101");
    assert_eq!(stats.top_jobs[0].applications, 2);
    assert!(stats
        .status_distribution
        .iter()
        .any(|s| s.status == "Unknown" && s.count == 1));
}

// ─── embeddings ───

fn record(owner: EmbeddingOwner, vector: Vec<f32>, hash: &str) -> EmbeddingRecord {
    EmbeddingRecord {
        owner,
        vector,
        chunk_text: "chunk".into(),
        content_hash: hash.into(),
        model: "test-model".into(),
        metadata: serde_json::json!({}),
    }
}

#[tokio::test]
async fn test_embedding_round_trip_and_matching() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    store
        .upsert_embedding(&record(EmbeddingOwner::Candidate(1), vec![1.0, 0.0], "a"))
        .await
        .unwrap();
    store
        .upsert_embedding(&record(EmbeddingOwner::Candidate(2), vec![0.8, 0.6], "b"))
        .await
        .unwrap();
    store
        .upsert_embedding(&record(EmbeddingOwner::Candidate(3), vec![0.0, 1.0], "c"))
        .await
        .unwrap();

    assert_eq!(
        store.candidate_embedding(2).await.unwrap(),
        Some(vec![0.8, 0.6])
    );
    assert_eq!(
        store
            .embedding_hash(EmbeddingOwner::Candidate(1))
            .await
            .unwrap()
            .as_deref(),
        Some("a")
    );
    assert!(store
        .embedding_hash(EmbeddingOwner::Job(1))
        .await
        .unwrap()
        .is_none());

    let matches = store.match_candidates(&[1.0, 0.0], 0.5, 10).await.unwrap();
    let ids: Vec<i64> = matches.iter().map(|m| m.candidate.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(matches[0].similarity > matches[1].similarity);

    let top_one = store.match_candidates(&[1.0, 0.0], 0.0, 1).await.unwrap();
    assert_eq!(top_one.len(), 1);
}

#[tokio::test]
async fn test_missing_embedding_listings() {
    let tmp = TempDir::new().unwrap();
    let store = seeded(&tmp).await;

    store
        .upsert_embedding(&record(EmbeddingOwner::Job(1), vec![1.0, 0.0], "j"))
        .await
        .unwrap();
    store
        .upsert_embedding(&record(EmbeddingOwner::Candidate(1), vec![1.0, 0.0], "a"))
        .await
        .unwrap();

    assert_eq!(store.candidates_without_embeddings().await.unwrap().len(), 2);
    let jobs = store.jobs_without_embeddings().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_id, "JOB-102");
}
