// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Access level carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account. Older records store this as `"user"`.
    #[default]
    #[serde(alias = "user")]
    Viewer,
    Admin,
}

/// User record stored in the `users` collection.
///
/// `refresh_token` holds the single live refresh token for this user and is
/// written only by the token service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    /// Channel handle, stored lowercase
    pub username: String,
    /// Email address, stored lowercase
    pub email: String,
    pub full_name: String,
    /// Avatar image URL
    pub avatar: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// PHC-formatted password hash
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Watched video IDs in the order they were recorded
    #[serde(default)]
    pub watch_history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}
