//! HTTP front door.
//!
//! Thin plumbing over the query engine and the sync scheduler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health probe (service name + version) |
//! | `GET`  | `/search` | Semantic search (`q`, `limit?`, `agency?`, `category?`) |
//! | `POST` | `/reindex` | Trigger a sync pass; returns immediately |
//!
//! # Error Contract
//!
//! Error responses are JSON:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Validation failures map to 400, everything else to 500. A reindex
//! trigger never fails from the caller's point of view — sync outcomes
//! are only observable through logs and the periodic report.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the search UI is a
//! browser client on another origin.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::models::SearchRequest;
use crate::scheduler::SyncHandle;
use crate::search::QueryEngine;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<QueryEngine>,
    sync: SyncHandle,
}

/// Start the HTTP server. Runs until the process is terminated.
pub async fn run_server(
    config: &Config,
    engine: Arc<QueryEngine>,
    sync: SyncHandle,
) -> anyhow::Result<()> {
    let state = AppState { engine, sync };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/reindex", post(handle_reindex))
        .layer(cors)
        .with_state(state);

    info!(bind = %config.server.bind, "server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => bad_request(msg),
            other => internal_error(other.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    agency: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    if params.q.trim().is_empty() {
        return Err(bad_request("query parameter 'q' is required"));
    }

    let req = SearchRequest {
        query: params.q,
        limit: params.limit.unwrap_or(0),
        agency: params.agency,
        category: params.category,
    };

    let response = state.engine.search(&req).await?;
    Ok(Json(response).into_response())
}

// ============ POST /reindex ============

#[derive(Serialize)]
struct ReindexResponse {
    message: String,
}

/// Always returns immediately; sync failures surface only in logs.
async fn handle_reindex(State(state): State<AppState>) -> Json<ReindexResponse> {
    let message = if state.sync.request_sync() {
        "reindex scheduled"
    } else {
        "reindex already pending"
    };
    Json(ReindexResponse {
        message: message.to_string(),
    })
}
