// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::subscription::edge_document_id;

/// Directed edge `user -> video`, unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub liked_by: String,
    pub video_id: String,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn new(liked_by: &str, video_id: &str) -> Self {
        Self {
            liked_by: liked_by.to_string(),
            video_id: video_id.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn document_id(&self) -> String {
        like_document_id(&self.liked_by, &self.video_id)
    }
}

/// Deterministic document ID for the `(user, video)` pair.
pub fn like_document_id(liked_by: &str, video_id: &str) -> String {
    edge_document_id(liked_by, video_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    Liked,
    Unliked,
}

/// Like toggle result. `reconciled` has the same meaning as on
/// [`ToggleOutcome`](crate::models::ToggleOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub state: LikeState,
    pub reconciled: bool,
}
