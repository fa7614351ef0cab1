// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::VideoSummary;
use crate::services::videos::MAX_PAGE_SIZE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(get_videos))
        .route("/videos/{video_id}", get(get_video))
        .route("/toggle-publish-status/{video_id}", patch(toggle_publish_status))
}

#[derive(Deserialize)]
struct VideosQuery {
    /// Restrict to one owner's videos
    owner: Option<String>,
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    10
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideosResponse {
    pub videos: Vec<VideoSummary>,
    pub page: u32,
    pub limit: u32,
}

/// Published videos only, whatever the caller's role.
async fn get_videos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<VideosQuery>,
) -> Result<Json<VideosResponse>> {
    let owner = params.owner.filter(|o| !o.trim().is_empty());
    let videos = state
        .videos
        .list(user.role, owner, params.page, params.limit)
        .await?;

    Ok(Json(VideosResponse {
        videos,
        page: params.page,
        limit: params.limit.clamp(1, MAX_PAGE_SIZE),
    }))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoSummary>> {
    Ok(Json(state.videos.video(&user.user_id, &video_id).await?))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublishResponse {
    pub video_id: String,
    pub is_published: bool,
}

async fn toggle_publish_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<Json<PublishResponse>> {
    let is_published = state
        .videos
        .toggle_publish(&user.user_id, &video_id)
        .await?;

    Ok(Json(PublishResponse {
        video_id,
        is_published,
    }))
}
