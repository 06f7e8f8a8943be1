// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the health_monitor module - heartbeat evaluation, repair
//! sequencing, and batch failure reporting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use avl_subscriptions::credentials::StaticCredentialStore;
use avl_subscriptions::error::Error;
use avl_subscriptions::health_monitor::{HealthMonitor, HealthMonitorConfig};
use avl_subscriptions::metrics::{Metric, RecordingMetrics};
use avl_subscriptions::producer::ProducerClient;
use avl_subscriptions::store::InMemorySubscriptionStore;
use avl_subscriptions::subscription::{Subscription, SubscriptionStatus};

const API_KEY: &str = "test-api-key";

/// Build a subscription with a heartbeat observed the given number of
/// seconds ago (None = no heartbeat yet).
fn subscription(
    id: &str,
    status: SubscriptionStatus,
    heartbeat_secs_ago: Option<i64>,
) -> Subscription {
    let now = Utc::now();
    Subscription {
        subscription_id: id.to_string(),
        url: "https://producer.example.com/siri".to_string(),
        status,
        requestor_ref: None,
        api_key: API_KEY.to_string(),
        publisher_id: "publisher-1".to_string(),
        service_start_datetime: now - ChronoDuration::hours(1),
        service_end_datetime: None,
        heartbeat_last_received: heartbeat_secs_ago.map(|s| now - ChronoDuration::seconds(s)),
        last_modified: None,
        last_resubscription_time: None,
    }
}

fn monitor(
    store: Arc<InMemorySubscriptionStore>,
    credentials: Arc<StaticCredentialStore>,
    metrics: Arc<RecordingMetrics>,
    mock_producer_url: Option<String>,
) -> HealthMonitor {
    HealthMonitor::new(
        store,
        credentials,
        ProducerClient::new(Duration::from_secs(5)).unwrap(),
        metrics,
        HealthMonitorConfig {
            callback_base_url: "https://ingest.example.com/avl".to_string(),
            mock_producer_url,
            ..Default::default()
        },
    )
}

fn subscription_accepted(status: bool) -> String {
    format!(
        r#"<Siri version="2.0" xmlns="http://www.siri.org.uk/siri">
  <SubscriptionResponse>
    <ResponseStatus><Status>{status}</Status></ResponseStatus>
  </SubscriptionResponse>
</Siri>"#
    )
}

fn terminate_acknowledged(status: bool) -> String {
    format!(
        r#"<Siri version="2.0" xmlns="http://www.siri.org.uk/siri">
  <TerminateSubscriptionResponse>
    <TerminationResponseStatus><Status>{status}</Status></TerminationResponseStatus>
  </TerminateSubscriptionResponse>
</Siri>"#
    )
}

/// Mount a producer that accepts both terminate and subscribe.
async fn mount_healthy_producer(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("<TerminateSubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(terminate_acknowledged(true)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<SubscriptionRequest>"))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_string(subscription_accepted(true)))
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn test_healthy_live_subscription_is_not_written() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(10)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    monitor.run_cycle().await.unwrap();

    // Steady state: no store write, no producer contact, no metrics.
    assert!(store.upserts().await.is_empty());
    assert_eq!(request_count(&server).await, 0);
    assert!(metrics.emitted().is_empty());
}

#[tokio::test]
async fn test_new_subscription_uses_service_start_as_baseline() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let mut fresh = subscription("sub-1", SubscriptionStatus::Live, None);
    fresh.service_start_datetime = Utc::now() - ChronoDuration::seconds(10);
    store.insert(fresh).await;

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new()),
        Arc::new(RecordingMetrics::new()),
        None,
    );

    // No heartbeat yet, but the subscription was only just established.
    monitor.run_cycle().await.unwrap();
    assert!(store.upserts().await.is_empty());
}

#[tokio::test]
async fn test_recovered_subscription_is_marked_live() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Error, Some(10)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new()),
        metrics.clone(),
        None,
    );

    monitor.run_cycle().await.unwrap();

    let record = store.get("sub-1").await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::Live);
    assert!(record.last_modified.is_some());
    assert_eq!(store.upserts().await.len(), 1);
    // Recovery via heartbeat is not a resubscription.
    assert!(metrics.emitted().is_empty());
}

#[tokio::test]
async fn test_stale_subscription_is_repaired_but_stays_error() {
    let server = MockServer::start().await;
    mount_healthy_producer(&server).await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    monitor.run_cycle().await.unwrap();

    // The outage was persisted before any repair attempt.
    let upserts = store.upserts().await;
    assert_eq!(upserts.len(), 2);
    assert_eq!(upserts[0].status, SubscriptionStatus::Error);
    assert!(upserts[0].last_resubscription_time.is_none());

    // The accepted resubscription was audited but did not flip the status:
    // only a real heartbeat on a later cycle proves the feed is back.
    let record = store.get("sub-1").await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::Error);
    assert!(record.last_resubscription_time.is_some());

    assert_eq!(metrics.count(Metric::Resubscription), 1);
    assert_eq!(metrics.count(Metric::Outage), 0);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_terminate_failure_does_not_block_resubscribe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TerminateSubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<SubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(subscription_accepted(true)))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    monitor.run_cycle().await.unwrap();

    assert_eq!(metrics.count(Metric::Resubscription), 1);
    assert_eq!(metrics.count(Metric::Outage), 0);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_subscribe_http_error_emits_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TerminateSubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(terminate_acknowledged(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<SubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    let err = monitor.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::CycleFailed { failed: 1, total: 1 }));

    assert_eq!(metrics.count(Metric::Outage), 1);
    assert_eq!(metrics.count(Metric::Resubscription), 0);
    assert_eq!(
        store.get("sub-1").await.unwrap().status,
        SubscriptionStatus::Error
    );
}

#[tokio::test]
async fn test_subscribe_rejection_emits_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TerminateSubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(terminate_acknowledged(true)))
        .mount(&server)
        .await;
    // Well-formed response, but the producer said no.
    Mock::given(method("POST"))
        .and(body_string_contains("<SubscriptionRequest>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(subscription_accepted(false)))
        .mount(&server)
        .await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    let err = monitor.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::CycleFailed { failed: 1, total: 1 }));
    assert_eq!(metrics.count(Metric::Outage), 1);
}

#[tokio::test]
async fn test_missing_credentials_abort_without_http() {
    let server = MockServer::start().await;
    mount_healthy_producer(&server).await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new()),
        metrics.clone(),
        Some(server.uri()),
    );

    let err = monitor.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::CycleFailed { failed: 1, total: 1 }));

    // The outage write from before the repair attempt is still there,
    // but nothing reached the producer and no metric was emitted.
    assert_eq!(
        store.get("sub-1").await.unwrap().status,
        SubscriptionStatus::Error
    );
    assert_eq!(request_count(&server).await, 0);
    assert!(metrics.emitted().is_empty());
}

#[tokio::test]
async fn test_inactive_subscription_is_never_evaluated() {
    let server = MockServer::start().await;
    mount_healthy_producer(&server).await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Inactive, Some(10_000)))
        .await;

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        Arc::new(RecordingMetrics::new()),
        Some(server.uri()),
    );

    monitor.run_cycle().await.unwrap();

    assert!(store.upserts().await.is_empty());
    assert_eq!(request_count(&server).await, 0);
    assert_eq!(
        store.get("sub-1").await.unwrap().status,
        SubscriptionStatus::Inactive
    );
}

#[tokio::test]
async fn test_batch_failure_still_commits_sibling_side_effects() {
    let server = MockServer::start().await;
    mount_healthy_producer(&server).await;

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-ok", SubscriptionStatus::Live, Some(100)))
        .await;
    store
        .insert(subscription("sub-bad", SubscriptionStatus::Live, Some(100)))
        .await;
    let metrics = Arc::new(RecordingMetrics::new());

    // Only sub-ok has credentials; sub-bad's repair must fail.
    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-ok", "user", "pass")),
        metrics.clone(),
        Some(server.uri()),
    );

    let err = monitor.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::CycleFailed { failed: 1, total: 2 }));

    // The healthy sibling's repair went through and was committed.
    let ok_record = store.get("sub-ok").await.unwrap();
    assert!(ok_record.last_resubscription_time.is_some());
    assert_eq!(
        metrics.emitted(),
        vec![(Metric::Resubscription, "sub-ok".to_string())]
    );

    // Both outages were persisted.
    assert_eq!(
        store.get("sub-bad").await.unwrap().status,
        SubscriptionStatus::Error
    );
    assert_eq!(ok_record.status, SubscriptionStatus::Error);
}

#[tokio::test]
async fn test_store_write_failure_fails_the_cycle() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(subscription("sub-1", SubscriptionStatus::Live, Some(100)))
        .await;
    store.fail_writes(true);

    let monitor = monitor(
        store.clone(),
        Arc::new(StaticCredentialStore::new().with("sub-1", "user", "pass")),
        Arc::new(RecordingMetrics::new()),
        None,
    );

    let err = monitor.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::CycleFailed { failed: 1, total: 1 }));
}
