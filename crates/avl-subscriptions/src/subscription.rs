// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The durable subscription record and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Heartbeats are arriving within the timeout.
    Live,
    /// Heartbeats stopped; the feed is in outage and under repair.
    Error,
    /// Administratively unsubscribed. Terminal; never evaluated by the
    /// health monitor.
    Inactive,
}

impl SubscriptionStatus {
    /// Stored text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Error => "error",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        match value.as_str() {
            "live" => Ok(Self::Live),
            "error" => Ok(Self::Error),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("Unknown subscription status: {other:?}")),
        }
    }
}

/// Durable record of one feed relationship with a producer.
///
/// Created by the initial subscribe flow in [`SubscriptionStatus::Live`];
/// mutated by the health monitor (status and audit transitions) and by the
/// unsubscribe-on-request flow (to `inactive`). Never deleted here. Every
/// write is a full-record upsert, last writer wins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    /// Stable identifier, used as the wire `SubscriptionIdentifier` /
    /// `SubscriptionRef` and as the store key.
    pub subscription_id: String,
    /// Producer's SIRI endpoint.
    pub url: String,
    /// Current lifecycle status.
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    /// Per-subscription override of the wire requester identity.
    pub requestor_ref: Option<String>,
    /// Token embedded in the callback address; authenticates inbound pushes
    /// and the outbound subscribe call.
    pub api_key: String,
    /// Bus operator/publisher the feed belongs to. Propagated, not
    /// interpreted.
    pub publisher_id: String,
    /// When the subscription was first (re)established. Heartbeat baseline
    /// until the first heartbeat arrives.
    pub service_start_datetime: DateTime<Utc>,
    /// When the subscription ended, if it has.
    pub service_end_datetime: Option<DateTime<Utc>>,
    /// Most recent heartbeat or data push from the producer. Written by the
    /// inbound ingest path; read-only here.
    pub heartbeat_last_received: Option<DateTime<Utc>>,
    /// When this record was last written.
    pub last_modified: Option<DateTime<Utc>>,
    /// When the health monitor last resubscribed this feed.
    pub last_resubscription_time: Option<DateTime<Utc>>,
}

impl Subscription {
    /// The timestamp liveness is judged against: the last heartbeat, or the
    /// service start when no heartbeat has arrived yet.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.heartbeat_last_received
            .unwrap_or(self.service_start_datetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            SubscriptionStatus::Live,
            SubscriptionStatus::Error,
            SubscriptionStatus::Inactive,
        ] {
            let text = status.as_str().to_string();
            assert_eq!(SubscriptionStatus::try_from(text).unwrap(), status);
        }
        assert!(SubscriptionStatus::try_from("paused".to_string()).is_err());
    }

    #[test]
    fn test_last_seen_falls_back_to_service_start() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let heartbeat = Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();
        let mut subscription = Subscription {
            subscription_id: "sub-1".to_string(),
            url: "https://producer.example.com/siri".to_string(),
            status: SubscriptionStatus::Live,
            requestor_ref: None,
            api_key: "key".to_string(),
            publisher_id: "pub-1".to_string(),
            service_start_datetime: start,
            service_end_datetime: None,
            heartbeat_last_received: None,
            last_modified: None,
            last_resubscription_time: None,
        };
        assert_eq!(subscription.last_seen(), start);

        subscription.heartbeat_last_received = Some(heartbeat);
        assert_eq!(subscription.last_seen(), heartbeat);
    }
}
