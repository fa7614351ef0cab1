// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh token rotation tests.
//!
//! These tests verify that:
//! 1. Only the most recently issued refresh token can be exchanged
//! 2. A rotated-away or revoked token is rejected as a mismatch
//! 3. Concurrent rotations of the same token produce exactly one winner

use tubeline::db::Database;
use tubeline::error::AppError;
use tubeline::models::Role;
use tubeline::services::TokenError;

mod common;
use common::{create_test_app, seed_user};

fn assert_mismatch(err: AppError) {
    assert!(
        matches!(err, AppError::Token(TokenError::Mismatch)),
        "expected token mismatch, got {:?}",
        err
    );
}

#[tokio::test]
async fn test_issue_stores_refresh_token() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let pair = state.tokens.issue(&user.id, user.role).await.unwrap();

    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));

    let claims = state.tokens.verify_access(&pair.access_token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, Role::Viewer);
}

#[tokio::test]
async fn test_rotate_replaces_stored_token() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let first = state.tokens.issue(&user.id, user.role).await.unwrap();
    let second = state.tokens.rotate(&first.refresh_token).await.unwrap();

    assert_ne!(first.refresh_token, second.refresh_token);
    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(second.refresh_token.as_str()));

    // The new pair is itself usable
    state.tokens.verify_access(&second.access_token).unwrap();
    state.tokens.rotate(&second.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_replayed_refresh_token_is_mismatch() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let first = state.tokens.issue(&user.id, user.role).await.unwrap();
    let second = state.tokens.rotate(&first.refresh_token).await.unwrap();

    // Signature is still valid but the token is no longer the stored one
    assert_mismatch(state.tokens.rotate(&first.refresh_token).await.unwrap_err());

    // The replay attempt did not disturb the live token
    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(second.refresh_token.as_str()));
}

#[tokio::test]
async fn test_revoke_invalidates_refresh_but_not_access() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let pair = state.tokens.issue(&user.id, user.role).await.unwrap();
    state.tokens.revoke(&user.id).await.unwrap();

    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    assert_mismatch(state.tokens.rotate(&pair.refresh_token).await.unwrap_err());
    // Access tokens are stateless and live until expiry
    assert!(state.tokens.verify_access(&pair.access_token).is_ok());
}

#[tokio::test]
async fn test_second_login_invalidates_first_device() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let laptop = state.tokens.issue(&user.id, user.role).await.unwrap();
    let phone = state.tokens.issue(&user.id, user.role).await.unwrap();

    assert_mismatch(state.tokens.rotate(&laptop.refresh_token).await.unwrap_err());
    state.tokens.rotate(&phone.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_access_token_rejected_as_refresh_token() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let pair = state.tokens.issue(&user.id, user.role).await.unwrap();
    let err = state.tokens.rotate(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AppError::Token(TokenError::Malformed)));
}

#[tokio::test]
async fn test_refresh_token_for_deleted_user() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;

    let pair = state.tokens.issue(&user.id, user.role).await.unwrap();
    db.delete_user(&user.id);

    let err = state.tokens.rotate(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_one_winner() {
    let (_, state, db) = create_test_app();
    let user = seed_user(db.as_ref(), "alice").await;
    let pair = state.tokens.issue(&user.id, user.role).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let presented = pair.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            state.tokens.rotate(&presented).await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(new_pair) => winners.push(new_pair),
            Err(e) => assert_mismatch(e),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one rotation must succeed");
    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(winners[0].refresh_token.as_str())
    );
}
