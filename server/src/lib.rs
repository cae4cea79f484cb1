use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use cinematch_core::persist::{load_index, IndexPaths};
use cinematch_core::{Index, IndexHandle, Item, ItemId, RecommendError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on `k` accepted over HTTP.
pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct RecommendParams {
    pub title: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub resolved: ItemSummary,
    pub took_s: f64,
    pub results: Vec<RecommendHit>,
}

#[derive(Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
}

#[derive(Serialize)]
pub struct RecommendHit {
    pub id: ItemId,
    pub title: String,
    pub release_year: String,
    pub score: f32,
}

#[derive(Clone)]
pub struct AppState {
    pub index: IndexHandle,
    pub index_dir: PathBuf,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: RecommendError) -> ApiError {
    let status = match err {
        RecommendError::ItemNotFound { .. } | RecommendError::UnknownId(_) => StatusCode::NOT_FOUND,
        RecommendError::InvalidK(_) | RecommendError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let suggestion = match &err {
        RecommendError::ItemNotFound { suggestion, .. } => suggestion.clone(),
        _ => None,
    };
    (status, Json(json!({ "error": err.to_string(), "suggestion": suggestion })))
}

/// Load the index stored in `index_dir` and serve it.
pub fn build_app(index_dir: String) -> Result<Router> {
    let index = load_index(&IndexPaths::new(&index_dir))?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(build_app_with_index(index, PathBuf::from(index_dir), admin_token))
}

pub fn build_app_with_index(index: Index, index_dir: PathBuf, admin_token: Option<String>) -> Router {
    let app_state = AppState { index: IndexHandle::new(index), index_dir, admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/recommend", get(recommend_handler))
        .route("/item/:id", get(item_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let start = std::time::Instant::now();
    let index = state.index.current();
    let k = params.k.unwrap_or(index.config().k_default).min(MAX_K);
    // A bad k is a bad request whatever the title.
    if k == 0 {
        return Err(error_response(RecommendError::InvalidK(k)));
    }

    let resolved = index.resolve_title(&params.title).map_err(error_response)?;
    let resolved = ItemSummary { id: resolved.id, title: resolved.title.clone() };
    let results = index
        .recommend_by_id(resolved.id, k)
        .map_err(error_response)?
        .into_iter()
        .map(|r| RecommendHit {
            id: r.item.id,
            title: r.item.title.clone(),
            release_year: r.item.release_year.clone(),
            score: r.score,
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(title = %params.title, k, took_s = elapsed.as_secs_f64(), "recommend");
    Ok(Json(RecommendResponse { query: params.title, resolved, took_s: elapsed.as_secs_f64(), results }))
}

pub async fn item_handler(State(state): State<AppState>, Path(id): Path<ItemId>) -> Result<Json<Item>, ApiError> {
    let index = state.index.current();
    index.item(id).cloned().map(Json).ok_or_else(|| error_response(RecommendError::UnknownId(id)))
}

/// Re-read the index directory and swap it in; queries in flight finish on the old index.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let dir = state.index_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || load_index(&IndexPaths::new(dir)))
        .await
        .map_err(|e| internal(e.to_string()))?
        .map_err(|e| internal(format!("{e:#}")))?;
    let num_items = loaded.len();
    state.index.swap(loaded);
    tracing::info!(num_items, "index reloaded");
    Ok(Json(json!({ "reloaded": true, "num_items": num_items })))
}

fn internal(msg: String) -> ApiError {
    tracing::error!(error = %msg, "index reload failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "ADMIN_TOKEN not set" })))),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid admin token" }))))
    }
}
