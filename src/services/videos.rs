// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video reads and the publish flag.

use std::collections::{HashMap, HashSet};

use crate::db::{Database, SharedDatabase};
use crate::error::{AppError, Result};
use crate::models::{OwnerSummary, Role, Video, VideoFilter, VideoSummary};

/// Upper bound for `limit` on video listings.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct VideoService {
    db: SharedDatabase,
}

impl VideoService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Videos visible to `role`, newest first.
    pub async fn list(
        &self,
        role: Role,
        owner_id: Option<String>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<VideoSummary>> {
        if page == 0 {
            return Err(AppError::Validation("Page must be greater than 0".to_string()));
        }
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("Page number causes overflow".to_string()))?;

        let filter = VideoFilter::for_role(role).with_owner(owner_id);
        let videos = self.db.list_videos(&filter, offset, limit).await?;
        summarize(self.db.as_ref(), videos).await
    }

    /// One video with its owner. Drafts are reported as missing to everyone
    /// but their owner.
    pub async fn video(&self, caller_id: &str, video_id: &str) -> Result<VideoSummary> {
        let video = self.visible_video(caller_id, video_id).await?;
        let mut summaries = summarize(self.db.as_ref(), vec![video]).await?;
        summaries
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))
    }

    /// Flip a video between draft and published. Owner only.
    pub async fn toggle_publish(&self, caller_id: &str, video_id: &str) -> Result<bool> {
        let video = self.visible_video(caller_id, video_id).await?;
        if video.owner_id != caller_id {
            return Err(AppError::InvalidOperation(
                "Only the owner can change a video's publish status".to_string(),
            ));
        }

        let published = self.db.toggle_video_published(video_id).await?;
        tracing::info!(video_id, published, "Toggled publish status");
        Ok(published)
    }

    /// Fetch a video the caller is allowed to see.
    pub(crate) async fn visible_video(&self, caller_id: &str, video_id: &str) -> Result<Video> {
        self.db
            .video_by_id(video_id)
            .await?
            .filter(|v| v.visible_to(caller_id))
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))
    }
}

/// Attach owner summaries, preserving the input order.
pub(crate) async fn summarize(db: &dyn Database, videos: Vec<Video>) -> Result<Vec<VideoSummary>> {
    let owner_ids: Vec<String> = {
        let mut seen = HashSet::new();
        videos
            .iter()
            .filter(|v| seen.insert(v.owner_id.as_str()))
            .map(|v| v.owner_id.clone())
            .collect()
    };

    let owners: HashMap<String, OwnerSummary> = db
        .users_by_ids(&owner_ids)
        .await?
        .iter()
        .map(|u| (u.id.clone(), OwnerSummary::from(u)))
        .collect();

    Ok(videos
        .into_iter()
        .map(|video| {
            let owner = owners.get(&video.owner_id).cloned();
            VideoSummary::new(video, owner)
        })
        .collect())
}
