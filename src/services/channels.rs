// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel profiles and watch history.

use crate::db::SharedDatabase;
use crate::error::{AppError, Result};
use crate::models::{ChannelProfile, VideoSummary};
use crate::services::videos::summarize;

#[derive(Clone)]
pub struct ChannelService {
    db: SharedDatabase,
}

impl ChannelService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Look up a channel by handle (case-insensitive) and compute its counts
    /// relative to `viewer_id`.
    ///
    /// The counts and `is_subscribed` come from a single `channel_stats` read;
    /// they are never combined from separate queries.
    pub async fn channel_profile(&self, viewer_id: &str, handle: &str) -> Result<ChannelProfile> {
        let handle = handle.trim().to_lowercase();
        if handle.is_empty() {
            return Err(AppError::Validation("Channel handle is required".to_string()));
        }

        let channel = self
            .db
            .user_by_username(&handle)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", handle)))?;

        let stats = self.db.channel_stats(&channel.id, viewer_id).await?;

        tracing::debug!(
            channel_id = %channel.id,
            viewer_id,
            subscriber_count = stats.subscriber_count,
            "Computed channel profile"
        );

        Ok(ChannelProfile::new(channel, stats))
    }

    /// Videos in the user's watch history, in stored order, each with its
    /// owner's summary. Deleted videos are skipped.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<VideoSummary>> {
        let user = self
            .db
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        if user.watch_history.is_empty() {
            return Ok(vec![]);
        }

        let videos = self.db.videos_by_ids(&user.watch_history).await?;

        let dropped = user.watch_history.len() - videos.len();
        if dropped > 0 {
            tracing::debug!(user_id, dropped, "Watch history references missing videos");
        }

        summarize(self.db.as_ref(), videos).await
    }
}
