// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video likes.
//!
//! Same shape as subscriptions: a toggle over a pair with a storage unique
//! key, where a lost race is reconciled instead of failing the request.

use crate::db::SharedDatabase;
use crate::error::{AppError, Result};
use crate::models::{Like, LikeOutcome, LikeState, VideoSummary};
use crate::services::videos::summarize;

#[derive(Clone)]
pub struct LikeService {
    db: SharedDatabase,
}

impl LikeService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Like the video if the user hasn't, unlike it otherwise.
    ///
    /// The video must be visible to the user; liking someone else's draft
    /// reports it as missing.
    pub async fn toggle(&self, user_id: &str, video_id: &str) -> Result<LikeOutcome> {
        self.db
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.db
            .video_by_id(video_id)
            .await?
            .filter(|v| v.visible_to(user_id))
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

        let outcome = if self.db.find_like(user_id, video_id).await?.is_some() {
            let deleted = self.db.delete_like(user_id, video_id).await?;
            if !deleted {
                tracing::info!(user_id, video_id, "Like already removed by a concurrent toggle");
            }
            LikeOutcome {
                state: LikeState::Unliked,
                reconciled: !deleted,
            }
        } else {
            match self.db.insert_like(&Like::new(user_id, video_id)).await {
                Ok(()) => LikeOutcome {
                    state: LikeState::Liked,
                    reconciled: false,
                },
                Err(e) if e.is_conflict() => {
                    tracing::info!(
                        user_id,
                        video_id,
                        "Like already created by a concurrent toggle"
                    );
                    LikeOutcome {
                        state: LikeState::Liked,
                        reconciled: true,
                    }
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::debug!(
            user_id,
            video_id,
            state = ?outcome.state,
            reconciled = outcome.reconciled,
            "Like toggled"
        );

        Ok(outcome)
    }

    /// Videos the user liked, most recent like first.
    ///
    /// Deleted videos and other people's drafts are skipped. No likes at all
    /// is an empty list, not an error.
    pub async fn liked_videos(&self, user_id: &str) -> Result<Vec<VideoSummary>> {
        let likes = self.db.likes_by_user(user_id).await?;
        if likes.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = likes.into_iter().map(|l| l.video_id).collect();
        let videos = self
            .db
            .videos_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|v| v.visible_to(user_id))
            .collect();

        summarize(self.db.as_ref(), videos).await
    }
}
