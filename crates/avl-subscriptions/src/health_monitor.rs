// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker for detecting and repairing dead AVL feed subscriptions.
//!
//! Producers are mandated a 30-second heartbeat interval when they accept a
//! subscription. A feed that has been silent past the configured timeout is
//! treated as dead and repaired: the old subscription is terminated (best
//! effort) and a fresh `SubscriptionRequest` is sent. This recovers feeds
//! when:
//! - The producer restarted and lost its subscription state
//! - The subscription expired on the producer side
//! - A network change left the producer pushing into the void
//!
//! The monitor never marks a feed live on the strength of an accepted
//! resubscription alone; only a real heartbeat observed on a later cycle
//! proves the producer actually resumed sending. Until then the record
//! stays in error.
//!
//! # State machine
//!
//! ```text
//!              heartbeat within timeout
//!            ┌───────────────────────────┐
//!            ▼                           │
//!       ┌────────┐  silence > timeout ┌───────┐
//!       │  LIVE  │───────────────────►│ ERROR │──┐ resubscribe each
//!       └────────┘                    └───────┘◄─┘ cycle until a
//!            ▲      heartbeat resumes     │        heartbeat arrives
//!            └─────────────────────────────┘
//!
//!       ┌──────────┐
//!       │ INACTIVE │  administratively unsubscribed; never evaluated
//!       └──────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use avl_siri::{
    SubscriptionRequest, TerminateSubscriptionRequest, parse_subscription_response,
    parse_terminate_response,
};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::metrics::{Metric, MetricsSink};
use crate::producer::ProducerClient;
use crate::store::SubscriptionStore;
use crate::subscription::{Subscription, SubscriptionStatus};

/// Configuration for the health monitor.
///
/// # Timeout design
///
/// The wire mandates a `PT30S` heartbeat interval, so the default timeout
/// of 90 seconds means three missed heartbeats. Tightening it below two
/// intervals invites false outages from ordinary network jitter.
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// How often to run the health check cycle.
    pub poll_interval: Duration,
    /// Maximum producer silence before a subscription is repaired.
    pub heartbeat_timeout: Duration,
    /// Wire-level expiry requested on each resubscription.
    pub subscription_ttl: Duration,
    /// Base URL producers push data and heartbeats to.
    pub callback_base_url: String,
    /// Requester identity for subscriptions without an override.
    pub requestor_ref: String,
    /// When set, producer exchanges target this URL instead of each
    /// subscription's endpoint. Explicitly injected; the monitor never
    /// consults the process environment.
    pub mock_producer_url: Option<String>,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            heartbeat_timeout: Duration::from_secs(90), // Three missed 30s heartbeats
            subscription_ttl: Duration::from_secs(24 * 3600),
            callback_base_url: "http://localhost:8080/avl".to_string(),
            requestor_ref: avl_siri::DEFAULT_REQUESTOR_REF.to_string(),
            mock_producer_url: None,
        }
    }
}

/// Background worker that monitors subscription heartbeats and repairs dead
/// feeds.
pub struct HealthMonitor {
    store: Arc<dyn SubscriptionStore>,
    credentials: Arc<dyn CredentialStore>,
    producer: ProducerClient,
    metrics: Arc<dyn MetricsSink>,
    config: HealthMonitorConfig,
    shutdown: Arc<Notify>,
}

impl HealthMonitor {
    /// Create a new health monitor.
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        credentials: Arc<dyn CredentialStore>,
        producer: ProducerClient,
        metrics: Arc<dyn MetricsSink>,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            store,
            credentials,
            producer,
            metrics,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the health monitor loop.
    ///
    /// Runs one cycle per poll interval until the shutdown signal is
    /// received. A failed cycle is logged and the loop continues; recovery
    /// is re-running the same evaluation on the next tick.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            heartbeat_timeout_secs = self.config.heartbeat_timeout.as_secs(),
            "Subscription health monitor started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Subscription health monitor received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Health check cycle failed");
                    }
                }
            }
        }

        info!("Subscription health monitor stopped");
    }

    /// Run one health check cycle over all subscriptions.
    ///
    /// Inactive subscriptions are skipped entirely. The rest are evaluated
    /// concurrently and independently; a failing subscription never cancels
    /// its siblings, and side effects of successful ones are committed
    /// regardless of the cycle's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleFailed`] when any subscription's repair failed.
    /// This is for alerting; nothing is rolled back.
    pub async fn run_cycle(&self) -> Result<()> {
        let subscriptions = self.store.list().await?;
        let active: Vec<Subscription> = subscriptions
            .into_iter()
            .filter(|s| s.status != SubscriptionStatus::Inactive)
            .collect();

        if active.is_empty() {
            debug!("No active subscriptions to evaluate");
            return Ok(());
        }

        let total = active.len();
        let results = join_all(active.into_iter().map(|subscription| {
            let subscription_id = subscription.subscription_id.clone();
            async move {
                let result = self.check_subscription(subscription).await;
                if let Err(e) = &result {
                    error!(
                        subscription_id = %subscription_id,
                        error = %e,
                        "Subscription repair failed"
                    );
                }
                result
            }
        }))
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            return Err(Error::CycleFailed { failed, total });
        }

        debug!(total, "Health check cycle completed");
        Ok(())
    }

    /// Evaluate one subscription and repair it if its feed has gone silent.
    async fn check_subscription(&self, mut subscription: Subscription) -> Result<()> {
        let now = Utc::now();
        let deadline = now
            - chrono::Duration::from_std(self.config.heartbeat_timeout)
                .map_err(|e| Error::Other(format!("Invalid heartbeat timeout: {e}")))?;
        let last_seen = subscription.last_seen();

        if last_seen > deadline {
            if subscription.status != SubscriptionStatus::Live {
                info!(
                    subscription_id = %subscription.subscription_id,
                    "Heartbeats resumed, marking subscription live"
                );
                subscription.status = SubscriptionStatus::Live;
                subscription.last_modified = Some(now);
                self.store.upsert(&subscription).await?;
            } else {
                debug!(subscription_id = %subscription.subscription_id, "Subscription healthy");
            }
            return Ok(());
        }

        warn!(
            subscription_id = %subscription.subscription_id,
            last_seen = %last_seen,
            "No heartbeat within timeout, repairing subscription"
        );

        // Persist the outage before attempting repair so it stays visible
        // even when the repair itself fails.
        subscription.status = SubscriptionStatus::Error;
        subscription.last_modified = Some(now);
        self.store.upsert(&subscription).await?;

        self.terminate_subscription(&subscription).await;
        self.resubscribe(&mut subscription).await
    }

    /// Best-effort termination of the old subscription.
    ///
    /// The producer may already consider it dead, so every failure here is
    /// logged and swallowed; termination must never block the resubscribe.
    async fn terminate_subscription(&self, subscription: &Subscription) {
        if let Err(e) = self.try_terminate(subscription).await {
            warn!(
                subscription_id = %subscription.subscription_id,
                error = %e,
                "Terminate failed, continuing with resubscribe"
            );
        }
    }

    async fn try_terminate(&self, subscription: &Subscription) -> Result<()> {
        let credentials = self
            .credentials
            .get(&subscription.subscription_id)
            .await?
            .ok_or_else(|| Error::MissingCredentials(subscription.subscription_id.clone()))?;

        let request = TerminateSubscriptionRequest {
            subscription_id: subscription.subscription_id.clone(),
            request_timestamp: Utc::now(),
            message_identifier: Uuid::new_v4().to_string(),
            requestor_ref: self.requestor_ref(subscription),
        };

        let url = self.target_url(subscription);
        let body = self
            .producer
            .terminate(url, request.to_xml(), &credentials.username, &credentials.password)
            .await?;
        let response = parse_terminate_response(&body)?;
        if !response.status {
            return Err(Error::ProtocolFailure {
                operation: "terminate",
                subscription_id: subscription.subscription_id.clone(),
            });
        }

        debug!(
            subscription_id = %subscription.subscription_id,
            "Old subscription terminated"
        );
        Ok(())
    }

    /// Re-establish the subscription with the producer.
    ///
    /// Credentials are resolved first even though the subscribe call itself
    /// authenticates with the API key: a subscription without credentials
    /// cannot be managed and must surface as a provisioning failure rather
    /// than limp along.
    async fn resubscribe(&self, subscription: &mut Subscription) -> Result<()> {
        if self
            .credentials
            .get(&subscription.subscription_id)
            .await?
            .is_none()
        {
            return Err(Error::MissingCredentials(
                subscription.subscription_id.clone(),
            ));
        }

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.subscription_ttl)
            .map_err(|e| Error::Other(format!("Invalid subscription TTL: {e}")))?;
        let request = SubscriptionRequest {
            subscription_id: subscription.subscription_id.clone(),
            request_timestamp: now,
            initial_termination_time: now + ttl,
            message_identifier: Uuid::new_v4().to_string(),
            callback_base_url: self.config.callback_base_url.clone(),
            requestor_ref: self.requestor_ref(subscription),
        };

        let url = self.target_url(subscription);
        let exchange = async {
            let body = self
                .producer
                .subscribe(url, request.to_xml(), &subscription.api_key)
                .await?;
            let response = parse_subscription_response(&body)?;
            if !response.status {
                return Err(Error::ProtocolFailure {
                    operation: "subscribe",
                    subscription_id: subscription.subscription_id.clone(),
                });
            }
            Ok(())
        };

        match exchange.await {
            Ok(()) => {
                self.metrics
                    .record(Metric::Resubscription, &subscription.subscription_id);
                info!(
                    subscription_id = %subscription.subscription_id,
                    "Resubscription accepted, awaiting first heartbeat"
                );
                // Status stays in error: only a heartbeat observed on a
                // later cycle proves the feed actually resumed.
                subscription.last_resubscription_time = Some(now);
                subscription.last_modified = Some(now);
                self.store.upsert(subscription).await?;
                Ok(())
            }
            Err(e) => {
                self.metrics
                    .record(Metric::Outage, &subscription.subscription_id);
                Err(e)
            }
        }
    }

    /// Requester identity for one subscription's wire messages.
    fn requestor_ref(&self, subscription: &Subscription) -> String {
        subscription
            .requestor_ref
            .clone()
            .unwrap_or_else(|| self.config.requestor_ref.clone())
    }

    /// Endpoint a subscription's exchanges should target.
    fn target_url<'a>(&'a self, subscription: &'a Subscription) -> &'a str {
        self.config
            .mock_producer_url
            .as_deref()
            .unwrap_or(&subscription.url)
    }
}
