// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Firestore has no secondary unique indexes, so uniqueness is enforced with
//! create-only documents whose ID is the unique key:
//! - `subscriptions/{subscriber}_{channel}` for edges;
//! - `likes/{user}_{video}` for likes;
//! - `user_handles/email:{email}` and `user_handles/username:{username}`
//!   for user identity fields.
//!
//! The refresh-token swap and the publish flip run in read-write transactions.
//! The channel statistics read runs in a read-only one, so its three reads
//! share a snapshot without locking the edges.

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreTransaction,
    FirestoreTransactionMode, FirestoreTransactionOptions,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::db::{collections, Database, DatabaseError, Result};
use crate::models::like::like_document_id;
use crate::models::subscription::edge_document_id;
use crate::models::{ChannelStats, Like, Subscription, User, Video, VideoFilter};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Claim document reserving a unique user field.
#[derive(Debug, Serialize, Deserialize)]
struct HandleClaim {
    user_id: String,
}

fn db_error(e: FirestoreError) -> DatabaseError {
    DatabaseError::Internal(e.to_string())
}

fn handle_claim_id(field: &str, value: &str) -> String {
    format!("{}:{}", field, urlencoding::encode(value))
}

/// Whether a commit failure means another transaction won the document.
///
/// Only ABORTED counts; UNAVAILABLE and friends are also retryable but say
/// nothing about the stored value.
fn lost_race(e: &FirestoreError) -> bool {
    match e {
        FirestoreError::DataConflictError(_) => true,
        FirestoreError::DatabaseError(e) => e.public.code == "Aborted",
        _ => false,
    }
}

async fn begin(
    client: &firestore::FirestoreDb,
    mode: FirestoreTransactionMode,
) -> Result<FirestoreTransaction<'_>> {
    client
        .begin_transaction_with_options(FirestoreTransactionOptions::new().with_mode(mode))
        .await
        .map_err(|e| DatabaseError::Internal(format!("Failed to begin transaction: {}", e)))
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            DatabaseError::Internal(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            DatabaseError::Internal(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client. Every operation returns an error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            DatabaseError::Internal("Database not connected (offline mode)".to_string())
        })
    }

    async fn user_by_field(&self, field: &'static str, value: &str) -> Result<Option<User>> {
        let value = value.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(users.into_iter().next())
    }

    /// Reserve a unique user field. Fails with `Conflict` if already claimed.
    async fn claim_handle(&self, field: &'static str, value: &str, user_id: &str) -> Result<()> {
        let claim = HandleClaim {
            user_id: user_id.to_string(),
        };

        let result: std::result::Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USER_HANDLES)
            .document_id(handle_claim_id(field, value))
            .object(&claim)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(DatabaseError::Conflict {
                resource: "user",
                field,
                value: value.to_string(),
            }),
            Err(e) => Err(db_error(e)),
        }
    }

    async fn release_handle(&self, field: &'static str, value: &str) -> Result<()> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_HANDLES)
            .document_id(handle_claim_id(field, value))
            .execute()
            .await
            .map_err(db_error)
    }

    async fn query_subscriptions(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<Subscription>> {
        let value = value.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl Database for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(db_error)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_by_field("email", email).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_by_field("username", username).await
    }

    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>> {
        let results: Vec<Result<Option<User>>> = stream::iter(user_ids.to_vec())
            .map(|id| async move { self.user_by_id(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut users = Vec::with_capacity(results.len());
        for result in results {
            if let Some(user) = result? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.claim_handle("email", &user.email, &user.id).await?;

        if let Err(e) = self
            .claim_handle("username", &user.username, &user.id)
            .await
        {
            if let Err(release_err) = self.release_handle("email", &user.email).await {
                tracing::error!(
                    error = %release_err,
                    user_id = %user.id,
                    "Failed to release email claim after username conflict"
                );
            }
            return Err(e);
        }

        let result: std::result::Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(DatabaseError::Conflict {
                resource: "user",
                field: "id",
                value: user.id.clone(),
            }),
            Err(e) => Err(db_error(e)),
        }
    }

    // ─── Refresh Token Operations ────────────────────────────────

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        let mut user = self
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| DatabaseError::user_not_found(user_id))?;

        user.refresh_token = token.map(str::to_string);
        user.updated_at = chrono::Utc::now();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(User::{refresh_token, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Compare-and-swap inside a transaction.
    ///
    /// The read goes through the transaction, so a concurrent commit on the
    /// same document makes ours fail; that failure is reported as a lost race.
    async fn swap_refresh_token(&self, user_id: &str, expected: &str, new: &str) -> Result<bool> {
        let client = self.get_client()?;

        let mut transaction = begin(client, FirestoreTransactionMode::ReadWrite).await?;

        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<User> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                DatabaseError::Internal(format!("Failed to read user in transaction: {}", e))
            })?;

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Err(DatabaseError::user_not_found(user_id));
        };

        if user.refresh_token.as_deref() != Some(expected) {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        user.refresh_token = Some(new.to_string());
        user.updated_at = chrono::Utc::now();

        client
            .fluent()
            .update()
            .fields(firestore::paths!(User::{refresh_token, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                DatabaseError::Internal(format!("Failed to add token swap to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(e) if lost_race(&e) => {
                tracing::warn!(user_id, error = %e, "Refresh token swap lost a race");
                Ok(false)
            }
            Err(e) => Err(DatabaseError::Internal(format!("Transaction commit failed: {}", e))),
        }
    }

    // ─── Video Operations ────────────────────────────────────────

    async fn upsert_video(&self, video: &Video) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn video_by_id(&self, video_id: &str) -> Result<Option<Video>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(video_id)
            .await
            .map_err(db_error)
    }

    /// Read and write in one transaction, so two concurrent flips can't both
    /// start from the same value.
    async fn toggle_video_published(&self, video_id: &str) -> Result<bool> {
        let client = self.get_client()?;
        let mut transaction = begin(client, FirestoreTransactionMode::ReadWrite).await?;

        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<Video> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(video_id)
            .await
            .map_err(db_error)?;

        let Some(mut video) = current else {
            let _ = transaction.rollback().await;
            return Err(DatabaseError::video_not_found(video_id));
        };

        video.is_published = !video.is_published;

        client
            .fluent()
            .update()
            .fields(firestore::paths!(Video::{is_published}))
            .in_col(collections::VIDEOS)
            .document_id(video_id)
            .object(&video)
            .add_to_transaction(&mut transaction)
            .map_err(db_error)?;

        transaction.commit().await.map_err(|e| {
            if lost_race(&e) {
                DatabaseError::Conflict {
                    resource: "video",
                    field: "is_published",
                    value: video_id.to_string(),
                }
            } else {
                DatabaseError::Internal(format!("Transaction commit failed: {}", e))
            }
        })?;

        Ok(video.is_published)
    }

    /// Concurrent point reads; `buffered` keeps the input order.
    async fn videos_by_ids(&self, video_ids: &[String]) -> Result<Vec<Video>> {
        let client = self.get_client()?;

        let results: Vec<std::result::Result<Option<Video>, FirestoreError>> =
            stream::iter(video_ids.to_vec())
                .map(|id| async move {
                    client
                        .fluent()
                        .select()
                        .by_id_in(collections::VIDEOS)
                        .obj()
                        .one(&id)
                        .await
                })
                .buffered(MAX_CONCURRENT_DB_OPS)
                .collect()
                .await;

        let mut videos = Vec::with_capacity(results.len());
        for result in results {
            if let Some(video) = result.map_err(db_error)? {
                videos.push(video);
            }
        }
        Ok(videos)
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Video>> {
        let filter = filter.clone();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::VIDEOS)
            .filter(move |q| {
                q.for_all([
                    filter
                        .published_only
                        .then(|| q.field("is_published").eq(true)),
                    filter
                        .owner_id
                        .clone()
                        .map(|owner| q.field("owner_id").eq(owner)),
                ])
            })
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    // ─── Subscription Operations ─────────────────────────────────

    async fn find_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<Option<Subscription>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&edge_document_id(subscriber_id, channel_id))
            .await
            .map_err(db_error)
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let doc_id = subscription.document_id();

        let result: std::result::Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::SUBSCRIPTIONS)
            .document_id(&doc_id)
            .object(subscription)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(DatabaseError::Conflict {
                resource: "subscription",
                field: "subscriber_id+channel_id",
                value: doc_id,
            }),
            Err(e) => Err(db_error(e)),
        }
    }

    /// Delete guarded by an `exists` precondition, so only one of two racing
    /// deletes reports `true`.
    async fn delete_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        let result = self
            .get_client()?
            .fluent()
            .delete()
            .from(collections::SUBSCRIPTIONS)
            .document_id(edge_document_id(subscriber_id, channel_id))
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(false),
            Err(e) => Err(db_error(e)),
        }
    }

    async fn subscriptions_to_channel(&self, channel_id: &str) -> Result<Vec<Subscription>> {
        self.query_subscriptions("channel_id", channel_id).await
    }

    async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>> {
        self.query_subscriptions("subscriber_id", subscriber_id).await
    }

    /// All three reads share one read-only transaction snapshot.
    async fn channel_stats(&self, channel_id: &str, viewer_id: &str) -> Result<ChannelStats> {
        let client = self.get_client()?;

        let transaction = begin(client, FirestoreTransactionMode::ReadOnly).await?;

        let snapshot = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let count_where = |field: &'static str, value: String| {
            let snapshot = snapshot.clone();
            async move {
                let edges: Vec<Subscription> = snapshot
                    .fluent()
                    .select()
                    .from(collections::SUBSCRIPTIONS)
                    .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
                    .obj()
                    .query()
                    .await?;
                Ok::<_, FirestoreError>(edges.len() as u64)
            }
        };

        let reads = async {
            let subscriber_count = count_where("channel_id", channel_id.to_string()).await?;
            let subscribed_to_count =
                count_where("subscriber_id", channel_id.to_string()).await?;
            let viewer_edge: Option<Subscription> = snapshot
                .fluent()
                .select()
                .by_id_in(collections::SUBSCRIPTIONS)
                .obj()
                .one(&edge_document_id(viewer_id, channel_id))
                .await?;

            Ok::<_, FirestoreError>(ChannelStats {
                subscriber_count,
                subscribed_to_count,
                is_subscribed: viewer_edge.is_some(),
            })
        };

        let result = reads.await;
        let _ = transaction.rollback().await;

        result.map_err(db_error)
    }

    // ─── Like Operations ─────────────────────────────────────────

    async fn find_like(&self, user_id: &str, video_id: &str) -> Result<Option<Like>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LIKES)
            .obj()
            .one(&like_document_id(user_id, video_id))
            .await
            .map_err(db_error)
    }

    async fn insert_like(&self, like: &Like) -> Result<()> {
        let doc_id = like.document_id();

        let result: std::result::Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::LIKES)
            .document_id(&doc_id)
            .object(like)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(DatabaseError::Conflict {
                resource: "like",
                field: "liked_by+video_id",
                value: doc_id,
            }),
            Err(e) => Err(db_error(e)),
        }
    }

    async fn delete_like(&self, user_id: &str, video_id: &str) -> Result<bool> {
        let result = self
            .get_client()?
            .fluent()
            .delete()
            .from(collections::LIKES)
            .document_id(like_document_id(user_id, video_id))
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(false),
            Err(e) => Err(db_error(e)),
        }
    }

    /// Sorted here rather than in the query, which would need a composite index.
    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<Like>> {
        let user_id = user_id.to_string();
        let mut likes: Vec<Like> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LIKES)
            .filter(move |q| q.for_all([q.field("liked_by").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        likes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(likes)
    }
}
