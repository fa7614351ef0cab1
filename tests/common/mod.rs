// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;
use tubeline::config::Config;
use tubeline::db::{Database, FirestoreDb, MemoryDb};
use tubeline::models::{NewUser, Role, User, Video};
use tubeline::routes::create_router;
use tubeline::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over the in-memory backend.
/// Returns the router, the shared state and the backing store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    let db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(Config::test_default(), db.clone()));
    (create_router(state.clone()), state, db)
}

/// Unique suffix for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Build a user record without hashing a password; it cannot log in.
#[allow(dead_code)]
pub fn test_user(username: &str, role: Role) -> User {
    let now = chrono::Utc::now();
    User {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_lowercase(),
        email: format!("{}@example.com", username.to_lowercase()),
        full_name: format!("{} Test", username),
        avatar: format!("https://cdn.example.com/{}.png", username.to_lowercase()),
        cover_image: None,
        password_hash: "not-a-real-hash".to_string(),
        role,
        refresh_token: None,
        watch_history: vec![],
        created_at: now,
        updated_at: now,
    }
}

/// Store a viewer that cannot log in.
#[allow(dead_code)]
pub async fn seed_user(db: &dyn Database, username: &str) -> User {
    let user = test_user(username, Role::Viewer);
    db.create_user(&user).await.unwrap();
    user
}

/// Register a user through the credential service so it can log in.
#[allow(dead_code)]
pub async fn register(state: &AppState, username: &str, password: &str) -> User {
    state
        .credentials
        .register(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: format!("{} Test", username),
            password: password.to_string(),
            avatar: format!("https://cdn.example.com/{}.png", username),
            cover_image: None,
        })
        .await
        .unwrap()
}

#[allow(dead_code)]
pub fn test_video(owner: &User, title: &str, published: bool) -> Video {
    Video {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.id.clone(),
        title: title.to_string(),
        description: format!("About {}", title),
        video_file: format!("https://cdn.example.com/{}.mp4", title),
        thumbnail: format!("https://cdn.example.com/{}.jpg", title),
        duration_secs: 42.5,
        views: 0,
        is_published: published,
        created_at: chrono::Utc::now(),
    }
}

#[allow(dead_code)]
pub async fn seed_video(db: &dyn Database, owner: &User, title: &str, published: bool) -> Video {
    let video = test_video(owner, title, published);
    db.upsert_video(&video).await.unwrap();
    video
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
