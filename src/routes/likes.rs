// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Like routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{LikeState, VideoSummary};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/toggle-like/{video_id}", post(toggle_like))
        .route("/liked-videos", get(get_liked_videos))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LikeResponse {
    pub video_id: String,
    pub state: LikeState,
    pub liked: bool,
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<Json<LikeResponse>> {
    let outcome = state.likes.toggle(&user.user_id, &video_id).await?;

    Ok(Json(LikeResponse {
        video_id,
        liked: outcome.state == LikeState::Liked,
        state: outcome.state,
    }))
}

async fn get_liked_videos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<VideoSummary>>> {
    Ok(Json(state.likes.liked_videos(&user.user_id).await?))
}
