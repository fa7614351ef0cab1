// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription routes.

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{ChannelSummary, SubscriptionState};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/toggle-subscription/{channel_id}", patch(toggle_subscription))
        .route("/subscribers/{channel_id}", get(get_subscribers))
        .route("/subscribed-channels/{subscriber_id}", get(get_subscribed_channels))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ToggleResponse {
    pub channel_id: String,
    pub state: SubscriptionState,
    pub subscribed: bool,
}

async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<Json<ToggleResponse>> {
    let outcome = state
        .subscriptions
        .toggle(&user.user_id, &channel_id)
        .await?;

    Ok(Json(ToggleResponse {
        channel_id,
        subscribed: outcome.state == SubscriptionState::Subscribed,
        state: outcome.state,
    }))
}

async fn get_subscribers(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<ChannelSummary>>> {
    Ok(Json(state.subscriptions.subscribers(&channel_id).await?))
}

async fn get_subscribed_channels(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
) -> Result<Json<Vec<ChannelSummary>>> {
    Ok(Json(
        state
            .subscriptions
            .subscribed_channels(&subscriber_id)
            .await?,
    ))
}
