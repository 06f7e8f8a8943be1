// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! AVL Subscriptions - SIRI-VM feed lifecycle management service
//!
//! A background service responsible for:
//! - Monitoring heartbeats from subscribed AVL data producers
//! - Repairing dead feeds (terminate + resubscribe)
//! - Persisting authoritative subscription state

use std::sync::Arc;

use tracing::{info, warn};

use avl_subscriptions::config::Config;
use avl_subscriptions::credentials::PostgresCredentialStore;
use avl_subscriptions::health_monitor::{HealthMonitor, HealthMonitorConfig};
use avl_subscriptions::metrics::RuntimeMetrics;
use avl_subscriptions::producer::ProducerClient;
use avl_subscriptions::store::PostgresSubscriptionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avl_subscriptions=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        callback_base_url = %config.callback_base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        heartbeat_timeout_secs = config.heartbeat_timeout.as_secs(),
        "Starting AVL subscription monitor"
    );

    // Connect to database
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    // Create tables if they don't exist
    sqlx::raw_sql(include_str!("../migrations/schema.sql"))
        .execute(&pool)
        .await?;

    info!("Database schema verified");

    let store = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let credentials = Arc::new(PostgresCredentialStore::new(pool));
    let producer = ProducerClient::new(config.http_timeout)?;

    let monitor = HealthMonitor::new(
        store,
        credentials,
        producer,
        Arc::new(RuntimeMetrics),
        HealthMonitorConfig {
            poll_interval: config.poll_interval,
            heartbeat_timeout: config.heartbeat_timeout,
            subscription_ttl: config.subscription_ttl,
            callback_base_url: config.callback_base_url.clone(),
            requestor_ref: config.requestor_ref.clone(),
            mock_producer_url: config.mock_producer_url.clone(),
        },
    );
    let shutdown = monitor.shutdown_handle();

    let monitor_handle = tokio::spawn(async move { monitor.run().await });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.notify_one();
    monitor_handle.await?;

    Ok(())
}
