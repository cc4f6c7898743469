//! HTTP surface tests against a server bound to an ephemeral local port.

use anyhow::{bail, Result};
use async_trait::async_trait;
use recruit_chat::server;
use recruit_chat_core::chat::{ChatService, ChatSettings};
use recruit_chat_core::llm::{ChatMessage, ChatModel, Completion, GenerationParams, TokenUsage};
use recruit_chat_core::models::{Candidate, Job};
use recruit_chat_core::store::memory::InMemoryStore;
use recruit_chat_core::store::RecruitStore;
use serde_json::{json, Value};
use std::sync::Arc;

struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _params: GenerationParams,
    ) -> Result<Completion> {
        Ok(Completion {
            text: "Here is what I found.".to_string(),
            usage: TokenUsage::default(),
        })
    }
}

struct DownModel;

#[async_trait]
impl ChatModel for DownModel {
    fn model_name(&self) -> &str {
        "down"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _params: GenerationParams,
    ) -> Result<Completion> {
        bail!("OpenAI API error 503: overloaded")
    }
}

async fn start(model: Arc<dyn ChatModel>) -> String {
    let store = InMemoryStore::new();
    store
        .upsert_candidate(&Candidate {
            id: 1,
            name: "Priya Sharma".into(),
            skills: vec!["python".into()],
            overall_score: Some(90.0),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .upsert_job(&Job {
            id: 1,
            job_id: "JOB-101".into(),
            title: "Data Engineer".into(),
            status: Some("Open".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let chat = ChatService::new(Arc::new(store), model, ChatSettings::default());
    let app = server::app(Arc::new(chat));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("{}{}", base, path)).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ─── /chat ───

#[tokio::test]
async fn test_chat_returns_reply_and_reference() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, body) = post(&base, "/chat", json!({ "message": "candidates with python" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["reply"], "Here is what I found.");
    assert_eq!(body["strategy"], "skill");
    assert_eq!(body["referenced"]["name"], "Priya Sharma");
    assert_eq!(body["cached"], false);

    let (_, again) = post(&base, "/chat", json!({ "message": "candidates with python" })).await;
    assert_eq!(again["cached"], true);
}

#[tokio::test]
async fn test_chat_failure_becomes_apology() {
    let base = start(Arc::new(DownModel)).await;

    let (status, body) = post(&base, "/chat", json!({ "message": "candidates with python" })).await;
    assert_eq!(status, 200);
    assert!(body["reply"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, body) = post(&base, "/chat", json!({ "message": "   " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

// ─── listings / cache ───

#[tokio::test]
async fn test_jobs_and_stats() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, body) = get(&base, "/jobs").await;
    assert_eq!(status, 200);
    assert_eq!(body["jobs"][0]["job_id"], "JOB-101");

    let (status, body) = get(&base, "/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_candidates"], 1);
    assert_eq!(body["active_jobs"], 1);
}

#[tokio::test]
async fn test_cache_clear_reports_count() {
    let base = start(Arc::new(EchoModel)).await;

    post(&base, "/chat", json!({ "message": "candidates with python" })).await;
    let (status, body) = post(&base, "/cache/clear", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["cleared"], 1);
}

// ─── embeddings-dependent endpoints ───

#[tokio::test]
async fn test_match_without_embedder_is_rejected() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, body) = post(
        &base,
        "/match",
        json!({ "job_description": "Senior data engineer, python, 5+ years" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "embeddings_disabled");
}

#[tokio::test]
async fn test_similar_requires_name() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, _) = post(&base, "/candidates/similar", json!({ "name": "" })).await;
    assert_eq!(status, 400);
}

// ─── /health ───

#[tokio::test]
async fn test_health() {
    let base = start(Arc::new(EchoModel)).await;

    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
