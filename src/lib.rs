//! # Recruit Chat
//!
//! A chat assistant over a recruitment database of jobs, candidates, and
//! clients.
//!
//! Each message is classified (greeting, help, recruitment, unclear,
//! off-topic). Recruitment questions are routed through an ordered chain of
//! retrieval strategies against SQLite, and the rows found are handed to a
//! language model that writes the answer. Replies to history-free questions
//! are cached for a few minutes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────┐
//! │ message  │──▶│ classifier │──▶│ strategy     │──▶│ SQLite   │
//! └──────────┘   └────────────┘   │ router       │   │ + vectors│
//!                                 └──────┬───────┘   └──────────┘
//!                                        ▼
//!                                 ┌──────────────┐
//!                                 │ synthesizer  │──▶ OpenAI chat
//!                                 └──────────────┘
//! ```
//!
//! The domain logic (extraction, classification, routing, synthesis, cache)
//! lives in `recruit-chat-core`; this crate supplies the SQLite store, the
//! OpenAI clients, configuration, the CLI, and the HTTP server.
//!
//! ## Quick Start
//!
//! ```bash
//! rchat init                          # create database
//! rchat import ./data/seed.json       # load jobs, clients, candidates
//! rchat embed pending                 # generate embeddings
//! rchat ask "candidates with python and 5 years"
//! rchat serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and status seeding |
//! | [`sqlite_store`] | `RecruitStore` over SQLite |
//! | [`embedding`] | OpenAI embedding client |
//! | [`llm`] | OpenAI chat-completions client |
//! | [`embed_cmd`] | Bulk embedding generation |
//! | [`import`] | JSON data import |
//! | [`stats`] | Database overview |
//! | [`service`] | Chat service wiring |
//! | [`ask`] | One-shot CLI question |
//! | [`server`] | HTTP chat server |
//! | [`logging`] | Tracing subscriber setup |

pub mod ask;
pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod import;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod service;
pub mod sqlite_store;
pub mod stats;
