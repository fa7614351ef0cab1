// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST set, e.g.
//! `gcloud emulators firestore start --host-port=localhost:8081`.
//!
//! Every test uses unique usernames so runs against a shared emulator don't
//! collide.

use std::sync::Arc;
use tubeline::db::{Database, FirestoreDb};
use tubeline::models::{Like, Role, Subscription, User, VideoFilter};

mod common;
use common::{test_db, test_user, test_video, unique_suffix};

async fn seed(db: &FirestoreDb, prefix: &str) -> User {
    let user = test_user(&format!("{}{}", prefix, unique_suffix()), Role::Viewer);
    db.create_user(&user).await.unwrap();
    user
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_lookup_by_each_key() {
    require_emulator!();

    let db = test_db().await;
    let user = seed(&db, "lookup").await;

    let by_id = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, user.username);

    let by_email = db.user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let by_name = db.user_by_identifier(&user.username).await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);

    assert!(db.user_by_id("does-not-exist").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unique_email_and_username() {
    require_emulator!();

    let db = test_db().await;
    let user = seed(&db, "unique").await;

    let mut same_email = test_user(&format!("other{}", unique_suffix()), Role::Viewer);
    same_email.email = user.email.clone();
    let err = db.create_user(&same_email).await.unwrap_err();
    assert!(err.is_conflict());

    let mut same_name = test_user(&format!("other{}", unique_suffix()), Role::Viewer);
    same_name.username = user.username.clone();
    let err = db.create_user(&same_name).await.unwrap_err();
    assert!(err.is_conflict());

    // The failed attempt released its email claim
    let mut retry = test_user(&format!("retry{}", unique_suffix()), Role::Viewer);
    retry.email = same_name.email.clone();
    db.create_user(&retry).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// REFRESH TOKEN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_token_swap() {
    require_emulator!();

    let db = test_db().await;
    let user = seed(&db, "swap").await;

    db.set_refresh_token(&user.id, Some("first")).await.unwrap();
    assert!(!db.swap_refresh_token(&user.id, "wrong", "second").await.unwrap());
    assert!(db.swap_refresh_token(&user.id, "first", "second").await.unwrap());
    assert!(!db.swap_refresh_token(&user.id, "first", "third").await.unwrap());

    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("second"));
    // Partial update leaves other fields alone
    assert_eq!(stored.email, user.email);

    db.set_refresh_token(&user.id, None).await.unwrap();
    let stored = db.user_by_id(&user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_concurrent_swaps_have_one_winner() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let user = seed(&db, "race").await;
    db.set_refresh_token(&user.id, Some("shared")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let db = db.clone();
        let user_id = user.id.clone();
        handles.push(tokio::spawn(async move {
            db.swap_refresh_token(&user_id, "shared", &format!("winner-{}", i))
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_subscription_edges() {
    require_emulator!();

    let db = test_db().await;
    let alice = seed(&db, "alice").await;
    let bob = seed(&db, "bob").await;

    let edge = Subscription::new(&alice.id, &bob.id);
    db.insert_subscription(&edge).await.unwrap();

    let err = db.insert_subscription(&edge).await.unwrap_err();
    assert!(err.is_conflict(), "duplicate edge must conflict");

    let found = db.find_subscription(&alice.id, &bob.id).await.unwrap();
    assert!(found.is_some());
    assert!(db.find_subscription(&bob.id, &alice.id).await.unwrap().is_none());

    let to_bob = db.subscriptions_to_channel(&bob.id).await.unwrap();
    assert_eq!(to_bob.len(), 1);
    assert_eq!(to_bob[0].subscriber_id, alice.id);

    let stats = db.channel_stats(&bob.id, &alice.id).await.unwrap();
    assert_eq!(stats.subscriber_count, 1);
    assert_eq!(stats.subscribed_to_count, 0);
    assert!(stats.is_subscribed);

    assert!(db.delete_subscription(&alice.id, &bob.id).await.unwrap());
    assert!(!db.delete_subscription(&alice.id, &bob.id).await.unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════
// VIDEO TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_videos_by_ids_keeps_order() {
    require_emulator!();

    let db = test_db().await;
    let owner = seed(&db, "owner").await;

    let a = test_video(&owner, "a", true);
    let b = test_video(&owner, "b", false);
    db.upsert_video(&a).await.unwrap();
    db.upsert_video(&b).await.unwrap();

    let ids = vec![b.id.clone(), "missing".to_string(), a.id.clone(), b.id.clone()];
    let videos = db.videos_by_ids(&ids).await.unwrap();
    let got: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(got, [b.id.as_str(), a.id.as_str(), b.id.as_str()]);

    let published = db
        .list_videos(
            &VideoFilter::for_role(Role::Viewer).with_owner(Some(owner.id.clone())),
            0,
            10,
        )
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, a.id);
}

#[tokio::test]
async fn test_publish_toggle_and_likes() {
    require_emulator!();

    let db = test_db().await;
    let owner = seed(&db, "liked").await;
    let fan = seed(&db, "fan").await;

    let video = test_video(&owner, "clip", true);
    db.upsert_video(&video).await.unwrap();

    assert!(!db.toggle_video_published(&video.id).await.unwrap());
    assert!(db.toggle_video_published(&video.id).await.unwrap());
    let err = db.toggle_video_published("missing").await.unwrap_err();
    assert!(matches!(err, tubeline::db::DatabaseError::NotFound { .. }));

    let like = Like::new(&fan.id, &video.id);
    db.insert_like(&like).await.unwrap();
    assert!(db.insert_like(&like).await.unwrap_err().is_conflict());
    assert!(db.find_like(&fan.id, &video.id).await.unwrap().is_some());

    let likes = db.likes_by_user(&fan.id).await.unwrap();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0].video_id, video.id);

    assert!(db.delete_like(&fan.id, &video.id).await.unwrap());
    assert!(!db.delete_like(&fan.id, &video.id).await.unwrap());
}
