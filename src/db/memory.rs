// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for local development and tests.
//!
//! Users sit in a `DashMap`, so a `get_mut` holds the shard lock for the
//! whole compare-and-swap on the refresh token. Subscription edges live in
//! one `RwLock`ed set so that count queries see a single snapshot. Likes are
//! keyed by `(user, video)` in a `DashMap`, so `entry` gives the unique insert.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::RwLock;
use std::collections::BTreeSet;

use crate::db::{Database, DatabaseError, Result};
use crate::models::{ChannelStats, Like, Subscription, User, Video, VideoFilter};

type EdgeKey = (String, String);

#[derive(Default)]
pub struct MemoryDb {
    users: DashMap<String, User>,
    /// email -> user id
    emails: DashMap<String, String>,
    /// username -> user id
    usernames: DashMap<String, String>,
    videos: DashMap<String, Video>,
    edges: RwLock<BTreeSet<EdgeKey>>,
    edge_created_at: DashMap<EdgeKey, chrono::DateTime<chrono::Utc>>,
    /// (user, video) -> like
    likes: DashMap<EdgeKey, Like>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored edges.
    pub fn subscription_count(&self) -> usize {
        self.edges.read().len()
    }

    /// Replace a user's watch history.
    pub fn set_watch_history(&self, user_id: &str, video_ids: Vec<String>) -> Result<()> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| DatabaseError::user_not_found(user_id))?;
        user.watch_history = video_ids;
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Number of stored likes.
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Remove a video.
    pub fn delete_video(&self, video_id: &str) {
        self.videos.remove(video_id);
    }

    /// Remove a user record and its unique index entries. Edges are kept.
    pub fn delete_user(&self, user_id: &str) {
        if let Some((_, user)) = self.users.remove(user_id) {
            self.emails.remove(&user.email);
            self.usernames.remove(&user.username);
        }
    }

    fn subscription_from_key(&self, key: &EdgeKey) -> Subscription {
        let created_at = self
            .edge_created_at
            .get(key)
            .map(|t| *t)
            .unwrap_or_else(chrono::Utc::now);
        Subscription {
            subscriber_id: key.0.clone(),
            channel_id: key.1.clone(),
            created_at,
        }
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(user_id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.user_by_id(&user_id).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(user_id) = self.usernames.get(username).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.user_by_id(&user_id).await
    }

    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(DatabaseError::Conflict {
                    resource: "user",
                    field: "email",
                    value: user.email.clone(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                self.emails.remove(&user.email);
                return Err(DatabaseError::Conflict {
                    resource: "user",
                    field: "username",
                    value: user.username.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| DatabaseError::user_not_found(user_id))?;
        user.refresh_token = token.map(str::to_string);
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn swap_refresh_token(&self, user_id: &str, expected: &str, new: &str) -> Result<bool> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| DatabaseError::user_not_found(user_id))?;

        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }

        user.refresh_token = Some(new.to_string());
        user.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn upsert_video(&self, video: &Video) -> Result<()> {
        self.videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn video_by_id(&self, video_id: &str) -> Result<Option<Video>> {
        Ok(self.videos.get(video_id).map(|v| v.clone()))
    }

    async fn toggle_video_published(&self, video_id: &str) -> Result<bool> {
        let mut video = self
            .videos
            .get_mut(video_id)
            .ok_or_else(|| DatabaseError::video_not_found(video_id))?;
        video.is_published = !video.is_published;
        Ok(video.is_published)
    }

    async fn videos_by_ids(&self, video_ids: &[String]) -> Result<Vec<Video>> {
        Ok(video_ids
            .iter()
            .filter_map(|id| self.videos.get(id).map(|v| v.clone()))
            .collect())
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Video>> {
        let mut videos: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| filter.matches(v.value()))
            .map(|v| v.value().clone())
            .collect();

        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(videos
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<Option<Subscription>> {
        let key = (subscriber_id.to_string(), channel_id.to_string());
        let exists = self.edges.read().contains(&key);
        Ok(exists.then(|| self.subscription_from_key(&key)))
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let key = (
            subscription.subscriber_id.clone(),
            subscription.channel_id.clone(),
        );

        let mut edges = self.edges.write();
        if !edges.insert(key.clone()) {
            return Err(DatabaseError::Conflict {
                resource: "subscription",
                field: "subscriber_id+channel_id",
                value: subscription.document_id(),
            });
        }
        self.edge_created_at.insert(key, subscription.created_at);
        Ok(())
    }

    async fn delete_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        let key = (subscriber_id.to_string(), channel_id.to_string());
        let removed = self.edges.write().remove(&key);
        if removed {
            self.edge_created_at.remove(&key);
        }
        Ok(removed)
    }

    async fn subscriptions_to_channel(&self, channel_id: &str) -> Result<Vec<Subscription>> {
        let keys: Vec<EdgeKey> = self
            .edges
            .read()
            .iter()
            .filter(|(_, channel)| channel == channel_id)
            .cloned()
            .collect();
        Ok(keys.iter().map(|k| self.subscription_from_key(k)).collect())
    }

    async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>> {
        let keys: Vec<EdgeKey> = self
            .edges
            .read()
            .iter()
            .filter(|(subscriber, _)| subscriber == subscriber_id)
            .cloned()
            .collect();
        Ok(keys.iter().map(|k| self.subscription_from_key(k)).collect())
    }

    async fn channel_stats(&self, channel_id: &str, viewer_id: &str) -> Result<ChannelStats> {
        let edges = self.edges.read();

        let mut stats = ChannelStats::default();
        for (subscriber, channel) in edges.iter() {
            if channel == channel_id {
                stats.subscriber_count += 1;
                if subscriber == viewer_id {
                    stats.is_subscribed = true;
                }
            }
            if subscriber == channel_id {
                stats.subscribed_to_count += 1;
            }
        }

        Ok(stats)
    }

    async fn find_like(&self, user_id: &str, video_id: &str) -> Result<Option<Like>> {
        let key = (user_id.to_string(), video_id.to_string());
        Ok(self.likes.get(&key).map(|l| l.clone()))
    }

    async fn insert_like(&self, like: &Like) -> Result<()> {
        match self.likes.entry((like.liked_by.clone(), like.video_id.clone())) {
            Entry::Occupied(_) => Err(DatabaseError::Conflict {
                resource: "like",
                field: "liked_by+video_id",
                value: like.document_id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(like.clone());
                Ok(())
            }
        }
    }

    async fn delete_like(&self, user_id: &str, video_id: &str) -> Result<bool> {
        let key = (user_id.to_string(), video_id.to_string());
        Ok(self.likes.remove(&key).is_some())
    }

    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<Like>> {
        let mut likes: Vec<Like> = self
            .likes
            .iter()
            .filter(|l| l.liked_by == user_id)
            .map(|l| l.value().clone())
            .collect();
        likes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: &str, username: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: username.to_uppercase(),
            avatar: format!("https://cdn.example.com/{}.png", username),
            cover_image: None,
            password_hash: "hash".to_string(),
            role: Role::Viewer,
            refresh_token: None,
            watch_history: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_user_enforces_unique_email_and_username() {
        let db = MemoryDb::new();
        db.create_user(&user("1", "alice")).await.unwrap();

        let mut same_email = user("2", "bob");
        same_email.email = "alice@example.com".to_string();
        let err = db.create_user(&same_email).await.unwrap_err();
        assert!(err.is_conflict());

        let mut same_username = user("3", "alice");
        same_username.email = "new@example.com".to_string();
        let err = db.create_user(&same_username).await.unwrap_err();
        assert!(err.is_conflict());

        // The failed username claim must not leave the email reserved.
        let mut other = user("4", "carol");
        other.email = "new@example.com".to_string();
        db.create_user(&other).await.unwrap();
        assert_eq!(
            db.user_by_email("new@example.com").await.unwrap().unwrap().id,
            "4"
        );
    }

    #[tokio::test]
    async fn test_swap_refresh_token_requires_match() {
        let db = MemoryDb::new();
        db.create_user(&user("1", "alice")).await.unwrap();
        db.set_refresh_token("1", Some("r1")).await.unwrap();

        assert!(!db.swap_refresh_token("1", "stale", "r2").await.unwrap());
        assert!(db.swap_refresh_token("1", "r1", "r2").await.unwrap());
        assert!(!db.swap_refresh_token("1", "r1", "r3").await.unwrap());

        let stored = db.user_by_id("1").await.unwrap().unwrap().refresh_token;
        assert_eq!(stored.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_swap_refresh_token_missing_user() {
        let db = MemoryDb::new();
        let err = db.swap_refresh_token("nope", "a", "b").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_subscription_rejects_duplicate() {
        let db = MemoryDb::new();
        db.insert_subscription(&Subscription::new("a", "b"))
            .await
            .unwrap();
        let err = db
            .insert_subscription(&Subscription::new("a", "b"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(db.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_like_pair_is_unique() {
        let db = MemoryDb::new();
        db.insert_like(&Like::new("u1", "v1")).await.unwrap();
        let err = db.insert_like(&Like::new("u1", "v1")).await.unwrap_err();
        assert!(err.is_conflict());

        db.insert_like(&Like::new("u2", "v1")).await.unwrap();
        assert_eq!(db.like_count(), 2);

        assert!(db.delete_like("u1", "v1").await.unwrap());
        assert!(!db.delete_like("u1", "v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_video_published_missing_video() {
        let db = MemoryDb::new();
        let err = db.toggle_video_published("nope").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_channel_stats_counts_both_directions() {
        let db = MemoryDb::new();
        for (s, c) in [("a", "b"), ("c", "b"), ("b", "a"), ("b", "d")] {
            db.insert_subscription(&Subscription::new(s, c)).await.unwrap();
        }

        let stats = db.channel_stats("b", "a").await.unwrap();
        assert_eq!(stats.subscriber_count, 2);
        assert_eq!(stats.subscribed_to_count, 2);
        assert!(stats.is_subscribed);

        let stats = db.channel_stats("b", "d").await.unwrap();
        assert!(!stats.is_subscribed);
    }
}
