// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription edges between users.
//!
//! The read-then-write in [`SubscriptionService::toggle`] is not atomic by
//! itself. The storage unique key on the pair is what prevents duplicates:
//! when two toggles both see "absent", the second insert gets a conflict and
//! is reported as `Subscribed` instead of failing the request.

use crate::db::SharedDatabase;
use crate::error::{AppError, Result};
use crate::models::{ChannelSummary, Subscription, SubscriptionState, ToggleOutcome, User};

#[derive(Clone)]
pub struct SubscriptionService {
    db: SharedDatabase,
}

impl SubscriptionService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    async fn require_user(&self, user_id: &str, what: &str) -> Result<User> {
        self.db
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", what, user_id)))
    }

    /// Subscribe if no edge exists, unsubscribe otherwise.
    pub async fn toggle(&self, subscriber_id: &str, channel_id: &str) -> Result<ToggleOutcome> {
        if subscriber_id == channel_id {
            return Err(AppError::InvalidOperation(
                "You cannot subscribe to your own channel".to_string(),
            ));
        }

        self.require_user(subscriber_id, "Subscriber").await?;
        self.require_user(channel_id, "Channel").await?;

        let existing = self
            .db
            .find_subscription(subscriber_id, channel_id)
            .await?;

        let outcome = if existing.is_some() {
            let deleted = self
                .db
                .delete_subscription(subscriber_id, channel_id)
                .await?;
            if !deleted {
                tracing::info!(
                    subscriber_id,
                    channel_id,
                    "Edge already removed by a concurrent toggle"
                );
            }
            ToggleOutcome {
                state: SubscriptionState::Unsubscribed,
                reconciled: !deleted,
            }
        } else {
            let edge = Subscription::new(subscriber_id, channel_id);
            match self.db.insert_subscription(&edge).await {
                Ok(()) => ToggleOutcome {
                    state: SubscriptionState::Subscribed,
                    reconciled: false,
                },
                Err(e) if e.is_conflict() => {
                    tracing::info!(
                        subscriber_id,
                        channel_id,
                        "Edge already created by a concurrent toggle"
                    );
                    ToggleOutcome {
                        state: SubscriptionState::Subscribed,
                        reconciled: true,
                    }
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::debug!(
            subscriber_id,
            channel_id,
            state = ?outcome.state,
            reconciled = outcome.reconciled,
            "Subscription toggled"
        );

        Ok(outcome)
    }

    /// Users subscribed to `channel_id`.
    pub async fn subscribers(&self, channel_id: &str) -> Result<Vec<ChannelSummary>> {
        self.require_user(channel_id, "Channel").await?;

        let edges = self.db.subscriptions_to_channel(channel_id).await?;
        let ids: Vec<String> = edges.into_iter().map(|e| e.subscriber_id).collect();
        self.summaries(&ids).await
    }

    /// Channels `subscriber_id` is subscribed to.
    pub async fn subscribed_channels(&self, subscriber_id: &str) -> Result<Vec<ChannelSummary>> {
        self.require_user(subscriber_id, "Subscriber").await?;

        let edges = self.db.subscriptions_by_subscriber(subscriber_id).await?;
        let ids: Vec<String> = edges.into_iter().map(|e| e.channel_id).collect();
        self.summaries(&ids).await
    }

    /// Summaries sorted by username; users that no longer exist are skipped.
    async fn summaries(&self, user_ids: &[String]) -> Result<Vec<ChannelSummary>> {
        let users = self.db.users_by_ids(user_ids).await?;
        let mut summaries: Vec<ChannelSummary> = users.iter().map(ChannelSummary::from).collect();
        summaries.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(summaries)
    }
}
