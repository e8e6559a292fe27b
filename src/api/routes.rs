use crate::config::Config;
use crate::db::Database;
use crate::tracking::aggregate::{self, HeatmapView, PageStat};
use crate::tracking::validator::{self, TrackPayload};
use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/track", post(track))
        .route("/api/heatmap", get(heatmap))
        .route("/api/stats", get(stats))
        .route("/api/data", delete(clear))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct HeatmapQuery {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthPayload {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct TrackedPayload {
    status: &'static str,
    id: i64,
}

#[derive(Debug, Serialize)]
struct DeletedPayload {
    deleted: usize,
}

async fn health() -> Json<HealthPayload> {
    Json(HealthPayload { status: "ok" })
}

async fn track(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<TrackPayload>, JsonRejection>,
) -> ApiResult<Json<TrackedPayload>> {
    let Json(payload) = payload?;
    let click = validator::validate(payload).map_err(|error| {
        debug!(reason = %error, "click rejected");
        ApiError::Unprocessable(error.to_string())
    })?;

    let url = click.url.clone();
    let id = with_database(&state, move |database| database.insert_click(&click)).await?;

    info!(id, url = %url, "click tracked");
    Ok(Json(TrackedPayload {
        status: "tracked",
        id,
    }))
}

async fn heatmap(
    State(state): State<ApiState>,
    query: std::result::Result<Query<HeatmapQuery>, QueryRejection>,
) -> ApiResult<Json<HeatmapView>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let url = query
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("url query parameter is required".to_string()))?;

    let clicks = with_database(&state, move |database| database.clicks_for_url(&url)).await?;

    Ok(Json(aggregate::heatmap_view(&clicks)))
}

async fn stats(State(state): State<ApiState>) -> ApiResult<Json<Vec<PageStat>>> {
    let counts = with_database(&state, |database| database.click_counts()).await?;

    Ok(Json(aggregate::stats_view(counts)))
}

async fn clear(State(state): State<ApiState>) -> ApiResult<Json<DeletedPayload>> {
    let deleted = with_database(&state, |database| database.delete_all()).await?;

    info!(deleted, "click data cleared");
    Ok(Json(DeletedPayload { deleted }))
}

/// Runs one storage operation on a connection scoped to this call.
///
/// The connection is opened on the blocking pool and dropped when `operation`
/// returns, whatever the outcome.
async fn with_database<T, F>(state: &ApiState, operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
{
    let db_path = state.config.db_path.clone();

    tokio::task::spawn_blocking(move || {
        let mut database = Database::open(&db_path)?;
        operation(&mut database)
    })
    .await
    .context("Storage task failed to complete")?
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        let message = value.body_text();
        debug!(reason = %message, "click payload rejected");
        match value {
            JsonRejection::JsonDataError(_) => Self::Unprocessable(message),
            _ => Self::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unprocessable(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Internal(error) => {
                error!(error = %format_args!("{error:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
