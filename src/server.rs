//! HTTP chat surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer one message (`{message, context_id?, history?}`) |
//! | `GET`  | `/jobs` | All job postings |
//! | `POST` | `/cache/clear` | Drop cached replies (`{cleared}`) |
//! | `POST` | `/candidates/similar` | Candidates similar to a named one (`{name}`) |
//! | `POST` | `/match` | Rank candidates against a job description (`{job_description}`) |
//! | `GET`  | `/stats` | Aggregate recruitment statistics |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400), `upstream_error` (502),
//! `internal` (500). `POST /chat` never returns a processing error: failures become
//! an apologetic reply naming the error.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for browser-based chat widgets.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use recruit_chat_core::chat::ChatService;
use recruit_chat_core::classify::QueryType;
use recruit_chat_core::models::{ConversationTurn, Job, RecruitmentStats, ReferencedEntity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::service;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    chat: Arc<ChatService>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let chat = service::build_chat_service(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;

    tracing::info!(bind = %config.server.bind, "chat server listening");
    println!("rchat server listening on http://{}", config.server.bind);

    axum::serve(listener, app(Arc::new(chat))).await?;
    Ok(())
}

/// Build the router around an existing chat service.
pub fn app(chat: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/jobs", get(handle_jobs))
        .route("/cache/clear", post(handle_clear_cache))
        .route("/candidates/similar", post(handle_similar))
        .route("/match", post(handle_match))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { chat })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Map a service error to the closest status code.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = format!("{:#}", err);
    tracing::error!(error = %msg, "request failed");

    if msg.contains("requires an embedding provider") {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "embeddings_disabled".to_string(),
            message: msg,
        }
    } else if msg.contains("API error") {
        AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "upstream_error".to_string(),
            message: msg,
        }
    } else {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: msg,
        }
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    context_id: Option<String>,
    #[serde(default)]
    history: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referenced: Option<ReferencedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<QueryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<String>,
    cached: bool,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let reply = state
        .chat
        .reply_or_apology(&req.message, req.context_id.as_deref(), &req.history)
        .await;

    Ok(Json(ChatResponse {
        reply: reply.text,
        suggestions: reply.suggestions,
        referenced: reply.referenced,
        intent: reply.intent,
        strategy: reply.strategy,
        cached: reply.cached,
    }))
}

// ============ GET /jobs ============

#[derive(Serialize)]
struct JobsResponse {
    jobs: Vec<Job>,
}

async fn handle_jobs(State(state): State<AppState>) -> Result<Json<JobsResponse>, AppError> {
    let jobs = state.chat.all_jobs().await.map_err(classify_error)?;
    Ok(Json(JobsResponse { jobs }))
}

// ============ POST /cache/clear ============

#[derive(Serialize)]
struct ClearCacheResponse {
    cleared: usize,
}

async fn handle_clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    Json(ClearCacheResponse {
        cleared: state.chat.clear_cache(),
    })
}

// ============ POST /candidates/similar ============

#[derive(Deserialize)]
struct SimilarRequest {
    name: String,
}

#[derive(Serialize)]
struct ReplyResponse {
    reply: String,
}

async fn handle_similar(
    State(state): State<AppState>,
    Json(req): Json<SimilarRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    let reply = state
        .chat
        .find_similar_candidates(name)
        .await
        .map_err(classify_error)?;
    Ok(Json(ReplyResponse { reply }))
}

// ============ POST /match ============

#[derive(Deserialize)]
struct MatchRequest {
    job_description: String,
}

async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(bad_request("job_description must not be empty"));
    }
    let reply = state
        .chat
        .match_job_description(&req.job_description)
        .await
        .map_err(classify_error)?;
    Ok(Json(ReplyResponse { reply }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<RecruitmentStats>, AppError> {
    let stats = state.chat.store().stats().await.map_err(classify_error)?;
    Ok(Json(stats))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
