//! Thin HTTP façade over [`Engine`] (spec.md §1: the server is explicitly
//! out of core scope — one query endpoint and a health check, no auth,
//! backup, or admin surface). Grounded on the teacher's `server` module:
//! shared `AppState` behind `Arc`, a `Router` built in `build_router`, and
//! structured `log::info!`/`log::debug!` timing around the query itself.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

use crate::executor::{Engine, QueryResponse};
use crate::storage::SqliteStorage;
use crate::value::PropertyValue;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine<SqliteStorage>>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

pub fn build_router(engine: Engine<SqliteStorage>) -> Router {
    let state = AppState { engine: Arc::new(engine) };
    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query_handler))
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "cypher-relay",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> impl IntoResponse {
    let start = Instant::now();
    log::debug!("query: {}", payload.query);

    let params: HashMap<String, PropertyValue> = payload
        .params
        .into_iter()
        .map(|(k, v)| (k, PropertyValue::from_json(&v)))
        .collect();

    let response = state.engine.execute(&payload.query, params);
    let elapsed = start.elapsed();

    match &response {
        QueryResponse::Success { meta, .. } => {
            log::info!("query returned {} row(s) in {:?}", meta.count, elapsed);
            (StatusCode::OK, Json(response))
        }
        QueryResponse::Failure { error } => {
            log::warn!("query failed after {:?}: {}", elapsed, error.message);
            (StatusCode::BAD_REQUEST, Json(response))
        }
    }
}
