//! # Recruit Chat Core
//!
//! Pure query-understanding and retrieval-routing logic for recruit-chat:
//! data models, pattern extractors, intent classification, the tiered
//! retrieval router, answer synthesis, and the response cache.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. Storage,
//! embeddings, and text generation are reached through the [`store::RecruitStore`],
//! [`embedding::Embedder`], and [`llm::ChatModel`] traits; the `recruit-chat`
//! app crate supplies the SQLite and OpenAI implementations.
//!
//! ## Pipeline
//!
//! ```text
//! message ──▶ cache ──▶ classify ──▶ extract + route ──▶ synthesize ──▶ reply
//!              (hit)      │              │                   │
//!                         │              ▼                   ▼
//!                         │         RecruitStore          ChatModel
//!                         └─ greeting / help / unclear / off_topic ──▶ ChatModel
//! ```

pub mod cache;
pub mod chat;
pub mod classify;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod models;
pub mod router;
pub mod similarity;
pub mod store;
pub mod synth;
