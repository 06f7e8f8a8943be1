// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for avl-subscriptions.

use std::time::Duration;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string for the subscription store
    pub database_url: String,
    /// Base URL producers push data and heartbeats to; the subscription id
    /// is appended per subscription
    pub callback_base_url: String,
    /// Default requester identity sent on the wire
    pub requestor_ref: String,
    /// Maximum silence from a producer before a subscription is repaired
    pub heartbeat_timeout: Duration,
    /// How often to run the health check cycle
    pub poll_interval: Duration,
    /// Wire-level expiry requested on (re)subscription
    pub subscription_ttl: Duration,
    /// Bounded timeout for each HTTP exchange with a producer
    pub http_timeout: Duration,
    /// When set, all producer exchanges target this URL instead of each
    /// subscription's own endpoint (pre-production stages)
    pub mock_producer_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let callback_base_url = std::env::var("AVL_CALLBACK_BASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("AVL_CALLBACK_BASE_URL"))?;

        let requestor_ref = std::env::var("AVL_REQUESTOR_REF")
            .unwrap_or_else(|_| avl_siri::DEFAULT_REQUESTOR_REF.to_string());

        let heartbeat_timeout = env_secs("AVL_HEARTBEAT_TIMEOUT_SECS", 90)?;
        let poll_interval = env_secs("AVL_POLL_INTERVAL_SECS", 60)?;
        let subscription_ttl = env_secs("AVL_SUBSCRIPTION_TTL_SECS", 24 * 3600)?;
        let http_timeout = env_secs("AVL_HTTP_TIMEOUT_SECS", 10)?;

        let mock_producer_url = std::env::var("AVL_MOCK_PRODUCER_URL").ok();

        Ok(Self {
            database_url,
            callback_base_url,
            requestor_ref,
            heartbeat_timeout,
            poll_interval,
            subscription_ttl,
            http_timeout,
            mock_producer_url,
        })
    }
}

/// Read a duration in whole seconds from an environment variable.
fn env_secs(var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => {
            let secs: u64 = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var, value })?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// An environment variable holds an unparseable value.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue {
        /// The offending variable.
        var: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}
