// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Database`] is the storage contract the services are written against.
//! It promises three things beyond plain lookups:
//! - unique keys on user email, user handle, the subscription pair and the
//!   like pair (a duplicate create fails with [`DatabaseError::Conflict`]);
//! - an atomic compare-and-swap on a user's stored refresh token, and an
//!   atomic flip of a video's published flag;
//! - a single-snapshot read of a channel's edge counts.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{ChannelStats, Like, Subscription, User, Video, VideoFilter};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Create-only claim documents enforcing unique email/username
    pub const USER_HANDLES: &str = "user_handles";
    pub const VIDEOS: &str = "videos";
    /// Subscription edges keyed by `{subscriber}_{channel}`
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    /// Like edges keyed by `{user}_{video}`
    pub const LIKES: &str = "likes";
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Shared handle to whichever backend is configured.
pub type SharedDatabase = Arc<dyn Database>;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A record the write depends on doesn't exist
    #[error("{resource} {identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// A unique key is already taken
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    /// Backend failure
    #[error("{0}")]
    Internal(String),
}

impl DatabaseError {
    pub fn user_not_found(user_id: &str) -> Self {
        DatabaseError::NotFound {
            resource: "user",
            identifier: user_id.to_string(),
        }
    }

    pub fn video_not_found(video_id: &str) -> Self {
        DatabaseError::NotFound {
            resource: "video",
            identifier: video_id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict { .. })
    }
}

/// Storage operations used by the services.
#[async_trait]
pub trait Database: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>>;
    /// Lookup by lowercase email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Lookup by lowercase username (channel handle).
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Fetch several users; missing IDs are skipped, order is not guaranteed.
    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>>;
    /// Create a user, failing with `Conflict` if the email or username is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Lookup by either email or username.
    async fn user_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        if let Some(user) = self.user_by_email(identifier).await? {
            return Ok(Some(user));
        }
        self.user_by_username(identifier).await
    }

    // ─── Refresh token field ─────────────────────────────────────

    /// Overwrite (or clear) the stored refresh token unconditionally.
    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<()>;

    /// Replace the stored refresh token only if it currently equals `expected`.
    ///
    /// Returns `Ok(false)` when the stored value differs, including when a
    /// concurrent swap got there first.
    async fn swap_refresh_token(&self, user_id: &str, expected: &str, new: &str) -> Result<bool>;

    // ─── Videos ──────────────────────────────────────────────────

    async fn upsert_video(&self, video: &Video) -> Result<()>;
    async fn video_by_id(&self, video_id: &str) -> Result<Option<Video>>;
    /// Flip `is_published` atomically and return the new value.
    async fn toggle_video_published(&self, video_id: &str) -> Result<bool>;
    /// Fetch videos in the order of `video_ids`; missing IDs are skipped.
    async fn videos_by_ids(&self, video_ids: &[String]) -> Result<Vec<Video>>;
    /// Newest first.
    async fn list_videos(&self, filter: &VideoFilter, offset: u32, limit: u32)
        -> Result<Vec<Video>>;

    // ─── Subscription edges ──────────────────────────────────────

    async fn find_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<Option<Subscription>>;
    /// Create an edge, failing with `Conflict` if the pair already exists.
    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()>;
    /// Delete an edge. Returns `false` if it was already gone.
    async fn delete_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool>;
    async fn subscriptions_to_channel(&self, channel_id: &str) -> Result<Vec<Subscription>>;
    async fn subscriptions_by_subscriber(&self, subscriber_id: &str)
        -> Result<Vec<Subscription>>;
    /// Edge counts for `channel_id` plus whether `viewer_id` subscribes to it,
    /// all read from the same snapshot.
    async fn channel_stats(&self, channel_id: &str, viewer_id: &str) -> Result<ChannelStats>;

    // ─── Like edges ──────────────────────────────────────────────

    async fn find_like(&self, user_id: &str, video_id: &str) -> Result<Option<Like>>;
    /// Create a like, failing with `Conflict` if the pair already exists.
    async fn insert_like(&self, like: &Like) -> Result<()>;
    /// Delete a like. Returns `false` if it was already gone.
    async fn delete_like(&self, user_id: &str, video_id: &str) -> Result<bool>;
    /// A user's likes, newest first.
    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<Like>>;
}
