// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for avl-subscriptions.

use thiserror::Error;

/// Subscription lifecycle errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network-level failure talking to a producer (connect, timeout,
    /// non-2xx status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Producer answered 2xx with an empty body.
    #[error("Empty response from producer at {0}")]
    EmptyResponse(String),

    /// Producer response could not be parsed as a SIRI envelope.
    #[error("SIRI parse error: {0}")]
    Parse(#[from] avl_siri::ParseError),

    /// Producer answered a well-formed envelope with `Status != true`.
    #[error("Producer rejected {operation} for subscription {subscription_id}")]
    ProtocolFailure {
        /// Which exchange was rejected (`subscribe` or `terminate`).
        operation: &'static str,
        /// The subscription the exchange was for.
        subscription_id: String,
    },

    /// No usable credentials for a subscription. Fatal for that
    /// subscription's cycle; there is no fallback credential.
    #[error("Missing credentials for subscription {0}")]
    MissingCredentials(String),

    /// One or more subscriptions failed repair during a health check cycle.
    #[error("{failed} of {total} subscriptions failed repair")]
    CycleFailed {
        /// Number of subscriptions whose repair failed.
        failed: usize,
        /// Number of subscriptions evaluated.
        total: usize,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type using the subscription lifecycle [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
