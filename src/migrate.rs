//! Schema creation for `rchat init`. Every statement is idempotent.

use anyhow::Result;
use recruit_chat_core::store::DEFAULT_STATUSES;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY,
        job_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        status TEXT,
        skills_json TEXT NOT NULL DEFAULT '[]',
        location TEXT,
        client_name TEXT,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        status TEXT,
        interview_result TEXT,
        location TEXT,
        skills_json TEXT NOT NULL DEFAULT '[]',
        experience TEXT,
        resume_text TEXT,
        overall_score REAL,
        expected_salary REAL,
        applied_job_id TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        industry TEXT,
        location TEXT,
        status TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS client_contacts (
        id INTEGER PRIMARY KEY,
        client_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        designation TEXT,
        FOREIGN KEY (client_id) REFERENCES clients(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidate_statuses (
        name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        description TEXT,
        PRIMARY KEY (name, column_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resume_embeddings (
        candidate_id INTEGER PRIMARY KEY,
        model TEXT NOT NULL,
        dims INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        chunk_text TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        metadata_json TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        FOREIGN KEY (candidate_id) REFERENCES candidates(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_embeddings (
        job_id INTEGER PRIMARY KEY,
        model TEXT NOT NULL,
        dims INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        chunk_text TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        metadata_json TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        FOREIGN KEY (job_id) REFERENCES jobs(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS embedding_logs (
        run_id TEXT PRIMARY KEY,
        target TEXT NOT NULL,
        model TEXT NOT NULL,
        total INTEGER NOT NULL,
        embedded INTEGER NOT NULL,
        skipped INTEGER NOT NULL,
        failed INTEGER NOT NULL,
        tokens INTEGER NOT NULL,
        started_at INTEGER NOT NULL,
        finished_at INTEGER NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_candidates_email ON candidates(email COLLATE NOCASE)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_phone ON candidates(phone)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_status ON candidates(status)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_score ON candidates(overall_score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_applied_job ON candidates(applied_job_id)",
    "CREATE INDEX IF NOT EXISTS idx_contacts_client ON client_contacts(client_id)",
];

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes, then seed the status catalog.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for ddl in TABLES.iter().chain(INDEXES) {
        sqlx::query(ddl).execute(pool).await?;
    }

    for (name, column, description) in DEFAULT_STATUSES {
        sqlx::query(
            "INSERT OR IGNORE INTO candidate_statuses (name, column_name, description) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(column.as_str())
        .bind(description)
        .execute(pool)
        .await?;
    }

    Ok(())
}
