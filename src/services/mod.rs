// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod channels;
pub mod credentials;
pub mod likes;
pub mod subscriptions;
pub mod tokens;
pub mod videos;

pub use channels::ChannelService;
pub use credentials::{Argon2Hasher, CredentialHasher, CredentialService};
pub use likes::LikeService;
pub use subscriptions::SubscriptionService;
pub use tokens::{AccessClaims, TokenError, TokenPair, TokenService};
pub use videos::VideoService;
