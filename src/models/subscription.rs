// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription edges between users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Directed edge `subscriber -> channel`.
///
/// Unique per ordered pair; the storage key is derived from both IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(subscriber_id: &str, channel_id: &str) -> Self {
        Self {
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Document ID for this edge.
    pub fn document_id(&self) -> String {
        edge_document_id(&self.subscriber_id, &self.channel_id)
    }
}

/// Deterministic document ID for the `(subscriber, channel)` pair.
///
/// IDs are URL-encoded so a `_` inside an ID can't make two pairs collide.
pub fn edge_document_id(subscriber_id: &str, channel_id: &str) -> String {
    format!(
        "{}_{}",
        urlencoding::encode(subscriber_id).replace('_', "%5F"),
        urlencoding::encode(channel_id).replace('_', "%5F")
    )
}

/// Result of a subscription toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
}

/// Toggle result.
///
/// `reconciled` is set when a concurrent toggle on the same pair won the
/// storage race and the reported state was taken from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub state: SubscriptionState,
    pub reconciled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_document_id_is_ordered() {
        assert_ne!(edge_document_id("a", "b"), edge_document_id("b", "a"));
    }

    #[test]
    fn test_edge_document_id_underscores_do_not_collide() {
        assert_ne!(
            edge_document_id("a_b", "c"),
            edge_document_id("a", "b_c")
        );
    }
}
