// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tubeline: accounts, sessions and the subscription graph for a
//! video-sharing backend.
//!
//! This crate provides the HTTP API and the services behind it: token
//! rotation, password login, subscription and like toggles, channel
//! aggregation and video reads.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::SharedDatabase;
use services::{
    Argon2Hasher, ChannelService, CredentialService, LikeService, SubscriptionService,
    TokenService, VideoService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SharedDatabase,
    pub tokens: TokenService,
    pub credentials: CredentialService,
    pub subscriptions: SubscriptionService,
    pub channels: ChannelService,
    pub videos: VideoService,
    pub likes: LikeService,
}

impl AppState {
    /// Wire every service to the same storage backend.
    pub fn new(config: Config, db: SharedDatabase) -> Self {
        let tokens = TokenService::new(&config, db.clone());
        let credentials = CredentialService::new(db.clone(), Arc::new(Argon2Hasher::default()));
        let subscriptions = SubscriptionService::new(db.clone());
        let channels = ChannelService::new(db.clone());
        let videos = VideoService::new(db.clone());
        let likes = LikeService::new(db.clone());

        Self {
            config,
            db,
            tokens,
            credentials,
            subscriptions,
            channels,
            videos,
            likes,
        }
    }
}
