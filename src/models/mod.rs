// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod channel;
pub mod like;
pub mod subscription;
pub mod user;
pub mod video;

pub use channel::{ChannelProfile, ChannelStats, ChannelSummary, OwnerSummary, VideoSummary};
pub use like::{Like, LikeOutcome, LikeState};
pub use subscription::{Subscription, SubscriptionState, ToggleOutcome};
pub use user::{NewUser, Role, User};
pub use video::{Video, VideoFilter};
