//! Bulk embedding generation (`rchat embed pending|rebuild`).
//!
//! One text chunk per candidate and per job is built, hashed with SHA-256,
//! and embedded sequentially. `pending` skips records whose stored hash
//! matches the current chunk; `rebuild` re-embeds everything. Calls are
//! spaced by `embedding.batch_delay_ms`. Each run appends one
//! `embedding_logs` row per target.

use anyhow::{bail, Result};
use chrono::Utc;
use recruit_chat_core::embedding::{candidate_chunk_text, job_chunk_text, Embedder};
use recruit_chat_core::models::{EmbeddingLogEntry, EmbeddingOwner, EmbeddingRecord};
use recruit_chat_core::store::RecruitStore;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::Config;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Pending,
    Rebuild,
}

/// One record to embed.
struct EmbedItem {
    owner: EmbeddingOwner,
    text: String,
    hash: String,
    metadata: serde_json::Value,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmbedCounts {
    pub total: i64,
    pub embedded: i64,
    pub skipped: i64,
    pub failed: i64,
    pub tokens: i64,
}

pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub async fn run_embed(config: &Config, mode: EmbedMode, dry_run: bool) -> Result<()> {
    let Some(embedder) = embedding::create_embedder(&config.embedding)? else {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    };
    let store = SqliteStore::open(config).await?;
    let delay = Duration::from_millis(config.embedding.batch_delay_ms);

    let targets = [
        ("candidates", candidate_items(&store).await?),
        ("jobs", job_items(&store).await?),
    ];

    for (target, items) in targets {
        if dry_run {
            let stale = count_stale(&store, &items, mode).await?;
            println!("embed {} (dry-run)", target);
            println!("  {} needing embeddings: {}", target, stale);
            continue;
        }

        let started_at = Utc::now();
        let counts = embed_items(&store, embedder.as_ref(), &items, mode, delay).await?;
        let entry = EmbeddingLogEntry {
            run_id: uuid::Uuid::new_v4().to_string(),
            target: target.to_string(),
            model: embedder.model_name().to_string(),
            total: counts.total,
            embedded: counts.embedded,
            skipped: counts.skipped,
            failed: counts.failed,
            tokens: counts.tokens,
            started_at,
            finished_at: Utc::now(),
        };
        store.append_embedding_log(&entry).await?;

        println!("embed {}", target);
        println!("  total: {}", counts.total);
        println!("  embedded: {}", counts.embedded);
        println!("  skipped (unchanged): {}", counts.skipped);
        println!("  failed: {}", counts.failed);
        println!("  tokens: {}", counts.tokens);
    }

    store.pool().close().await;
    Ok(())
}

async fn candidate_items(store: &dyn RecruitStore) -> Result<Vec<EmbedItem>> {
    Ok(store
        .top_candidates(usize::MAX)
        .await?
        .into_iter()
        .map(|c| {
            let text = candidate_chunk_text(&c);
            EmbedItem {
                owner: EmbeddingOwner::Candidate(c.id),
                hash: content_hash(&text),
                text,
                metadata: serde_json::json!({ "name": c.name, "skills": c.skills }),
            }
        })
        .collect())
}

async fn job_items(store: &dyn RecruitStore) -> Result<Vec<EmbedItem>> {
    Ok(store
        .list_jobs(false, None)
        .await?
        .into_iter()
        .map(|j| {
            let text = job_chunk_text(&j);
            EmbedItem {
                owner: EmbeddingOwner::Job(j.id),
                hash: content_hash(&text),
                text,
                metadata: serde_json::json!({ "job_id": j.job_id, "title": j.title }),
            }
        })
        .collect())
}

async fn is_current(store: &dyn RecruitStore, item: &EmbedItem, mode: EmbedMode) -> Result<bool> {
    if mode == EmbedMode::Rebuild {
        return Ok(false);
    }
    Ok(store.embedding_hash(item.owner).await?.as_deref() == Some(item.hash.as_str()))
}

async fn count_stale(store: &dyn RecruitStore, items: &[EmbedItem], mode: EmbedMode) -> Result<usize> {
    let mut n = 0;
    for item in items {
        if !is_current(store, item, mode).await? {
            n += 1;
        }
    }
    Ok(n)
}

/// Embed every item that is not current, one call at a time.
///
/// A failed embedding call is counted and logged; store errors abort.
async fn embed_items(
    store: &dyn RecruitStore,
    embedder: &dyn Embedder,
    items: &[EmbedItem],
    mode: EmbedMode,
    delay: Duration,
) -> Result<EmbedCounts> {
    let mut counts = EmbedCounts {
        total: items.len() as i64,
        ..Default::default()
    };
    let mut first_call = true;

    for item in items {
        if is_current(store, item, mode).await? {
            counts.skipped += 1;
            continue;
        }
        if !first_call && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        first_call = false;

        match embedder.embed(&item.text).await {
            Ok(embedding) => {
                counts.tokens += embedding.usage.total_tokens as i64;
                store
                    .upsert_embedding(&EmbeddingRecord {
                        owner: item.owner,
                        vector: embedding.vector,
                        chunk_text: item.text.clone(),
                        content_hash: item.hash.clone(),
                        model: embedder.model_name().to_string(),
                        metadata: item.metadata.clone(),
                    })
                    .await?;
                counts.embedded += 1;
            }
            Err(e) => {
                tracing::warn!(owner = ?item.owner, error = %e, "embedding failed");
                counts.failed += 1;
            }
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use recruit_chat_core::embedding::{Embedding, EmbeddingUsage};
    use recruit_chat_core::models::Candidate;
    use recruit_chat_core::store::memory::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        fn dims(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> Result<Embedding> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_on {
                return Err(anyhow!("OpenAI API error 500: boom"));
            }
            Ok(Embedding {
                vector: vec![1.0, 0.0],
                usage: EmbeddingUsage {
                    prompt_tokens: 4,
                    total_tokens: 4,
                },
            })
        }
    }

    async fn store_with(n: i64) -> InMemoryStore {
        let store = InMemoryStore::new();
        for id in 1..=n {
            store
                .upsert_candidate(&Candidate {
                    id,
                    name: format!("Candidate {}", id),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn test_content_hash_is_stable_hex() {
        let h = content_hash("Name: Priya Sharma");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash("Name: Priya Sharma"));
        assert_ne!(h, content_hash("Name: Rahul Verma"));
    }

    #[tokio::test]
    async fn test_pending_skips_unchanged_chunks() {
        let store = store_with(2).await;
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };

        let items = candidate_items(&store).await.unwrap();
        let first = embed_items(&store, &embedder, &items, EmbedMode::Pending, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(first.embedded, 2);
        assert_eq!(first.tokens, 8);

        let items = candidate_items(&store).await.unwrap();
        let second = embed_items(&store, &embedder, &items, EmbedMode::Pending, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(second.embedded, 0);
        assert_eq!(second.skipped, 2);

        let rebuilt = embed_items(&store, &embedder, &items, EmbedMode::Rebuild, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(rebuilt.embedded, 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_call_is_counted_not_fatal() {
        let store = store_with(3).await;
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail_on: Some(1),
        };
        let items = candidate_items(&store).await.unwrap();
        let counts = embed_items(&store, &embedder, &items, EmbedMode::Pending, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(counts.embedded, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(store.candidates_without_embeddings().await.unwrap().len(), 1);
    }
}
