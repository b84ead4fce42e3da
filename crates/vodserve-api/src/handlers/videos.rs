//! Read endpoints for published videos.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use vodserve_core::models::VideoRecord;
use vodserve_core::AppError;

use crate::error::{ErrorResponse, HttpAppError, ValidatedPath};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[utoipa::path(
    get,
    path = "/videos",
    tag = "videos",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum records to return (default 100)"),
        ("offset" = Option<i64>, Query, description = "Records to skip (default 0)")
    ),
    responses(
        (status = 200, description = "Videos in reverse creation order", body = Vec<VideoRecord>),
        (status = 500, description = "Metadata store failure", body = ErrorResponse)
    )
)]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<VideoRecord>>, HttpAppError> {
    let videos = state
        .repository
        .find_all(query.limit, query.offset)
        .await?;
    Ok(Json(videos))
}

#[utoipa::path(
    get,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "The video record", body = VideoRecord),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "No such video", body = ErrorResponse)
    )
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<VideoRecord>, HttpAppError> {
    let video = state
        .repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
    Ok(Json(video))
}
