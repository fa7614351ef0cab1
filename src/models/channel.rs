// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived views over users, videos and subscription edges.
//!
//! Nothing here is stored; every value is computed on read.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{User, Video};
use crate::time_utils::format_utc_rfc3339;

/// Edge counts for one channel plus the viewer's own edge, from one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub subscriber_count: u64,
    pub subscribed_to_count: u64,
    pub is_subscribed: bool,
}

/// Public channel page.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscriber_count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribed_to_count: u64,
    pub is_subscribed: bool,
}

impl ChannelProfile {
    pub fn new(channel: User, stats: ChannelStats) -> Self {
        Self {
            id: channel.id,
            username: channel.username,
            full_name: channel.full_name,
            email: channel.email,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscriber_count: stats.subscriber_count,
            subscribed_to_count: stats.subscribed_to_count,
            is_subscribed: stats.is_subscribed,
        }
    }
}

/// Short user card used in subscriber and subscription lists.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

impl From<&User> for ChannelSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Owner fields attached to a video. Never includes credentials or tokens.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerSummary {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Video with its owner's summary.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_file: String,
    pub duration_secs: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub is_published: bool,
    pub created_at: String,
    /// `None` if the owner account no longer exists
    pub owner: Option<OwnerSummary>,
}

impl VideoSummary {
    pub fn new(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            thumbnail: video.thumbnail,
            video_file: video.video_file,
            duration_secs: video.duration_secs,
            views: video.views,
            is_published: video.is_published,
            created_at: format_utc_rfc3339(video.created_at),
            owner,
        }
    }
}
