//! Recruitment database overview (`rchat stats`).
//!
//! Prints totals, the most-applied jobs, the candidate status distribution,
//! and how many records still lack an embedding.

use anyhow::Result;
use recruit_chat_core::models::RecruitmentStats;
use recruit_chat_core::store::RecruitStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Records with and without a stored embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingCoverage {
    pub candidates_total: i64,
    pub candidates_missing: i64,
    pub jobs_total: i64,
    pub jobs_missing: i64,
}

pub async fn embedding_coverage(
    store: &dyn RecruitStore,
    stats: &RecruitmentStats,
) -> Result<EmbeddingCoverage> {
    let (candidates, jobs) = tokio::try_join!(
        store.candidates_without_embeddings(),
        store.jobs_without_embeddings()
    )?;
    Ok(EmbeddingCoverage {
        candidates_total: stats.total_candidates,
        candidates_missing: candidates.len() as i64,
        jobs_total: stats.total_jobs,
        jobs_missing: jobs.len() as i64,
    })
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let stats = store.stats().await?;
    let coverage = embedding_coverage(&store, &stats).await?;
    store.pool().close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    for line in render(&stats, &coverage) {
        println!("{}", line);
    }
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    Ok(())
}

fn render(stats: &RecruitmentStats, coverage: &EmbeddingCoverage) -> Vec<String> {
    let mut out = vec![
        "Recruitment Database Stats".to_string(),
        "==========================".to_string(),
        String::new(),
        format!("  Candidates:  {}", stats.total_candidates),
        format!("  Jobs:        {} ({} active)", stats.total_jobs, stats.active_jobs),
        format!("  Clients:     {}", stats.total_clients),
        format!(
            "  Embedded:    {} / {} candidates ({}%), {} / {} jobs ({}%)",
            coverage.candidates_total - coverage.candidates_missing,
            coverage.candidates_total,
            percent(
                coverage.candidates_total - coverage.candidates_missing,
                coverage.candidates_total
            ),
            coverage.jobs_total - coverage.jobs_missing,
            coverage.jobs_total,
            percent(coverage.jobs_total - coverage.jobs_missing, coverage.jobs_total),
        ),
    ];

    if !stats.top_jobs.is_empty() {
        out.push(String::new());
        out.push("  Top jobs by applications:".to_string());
        out.push(format!("  {:<12} {:<36} {:>6}", "JOB", "TITLE", "APPS"));
        out.push(format!("  {}", "-".repeat(56)));
        for j in &stats.top_jobs {
            out.push(format!(
                "  {:<12} {:<36} {:>6}",
                j.job_id, j.title, j.applications
            ));
        }
    }

    if !stats.status_distribution.is_empty() {
        out.push(String::new());
        out.push("  Status distribution:".to_string());
        for s in &stats.status_distribution {
            out.push(format!("  {:<24} {:>6}", s.status, s.count));
        }
    }

    out.push(String::new());
    out
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
