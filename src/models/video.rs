// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video model. Uploading and transcoding happen elsewhere; this service only reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Video stored in the `videos` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Document ID
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Media URL
    pub video_file: String,
    /// Thumbnail URL
    pub thumbnail: String,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

impl Video {
    /// Published videos are visible to everyone, drafts only to their owner.
    pub fn visible_to(&self, user_id: &str) -> bool {
        self.is_published || self.owner_id == user_id
    }
}

/// Filter for video listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFilter {
    /// Only return published videos
    pub published_only: bool,
    /// Only return videos owned by this user
    pub owner_id: Option<String>,
}

impl VideoFilter {
    /// Visibility rules for a caller's role.
    ///
    /// Listings never include drafts, not even for admins. A draft is only
    /// reachable by its owner, by ID.
    pub fn for_role(role: Role) -> Self {
        let published_only = match role {
            Role::Viewer => true,
            Role::Admin => true,
        };
        Self {
            published_only,
            owner_id: None,
        }
    }

    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn matches(&self, video: &Video) -> bool {
        if self.published_only && !video.is_published {
            return false;
        }
        match &self.owner_id {
            Some(owner) => &video.owner_id == owner,
            None => true,
        }
    }
}
