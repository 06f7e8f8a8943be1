// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Credential resolution for producer endpoints.
//!
//! Terminate calls authenticate with HTTP Basic auth using per-subscription
//! credentials. A subscription with either field absent has no usable
//! credentials at all; there is no fallback, so resolution returns `None`
//! and the caller treats it as fatal for that subscription's cycle.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::Result;

/// Username/password pair for a producer endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Basic auth username.
    pub username: String,
    /// Basic auth password.
    pub password: String,
}

/// Trait for credential stores.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve the credentials for a subscription. `None` when either field
    /// is absent.
    async fn get(&self, subscription_id: &str) -> Result<Option<Credentials>>;
}

/// Credential store backed by the `avl_subscription_credentials` table.
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Create a new store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn get(&self, subscription_id: &str) -> Result<Option<Credentials>> {
        let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT username, password FROM avl_subscription_credentials WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        // A half-provisioned row is as unusable as a missing one.
        Ok(match row {
            Some((Some(username), Some(password))) => Some(Credentials { username, password }),
            _ => None,
        })
    }
}

/// Fixed in-memory credential store for testing.
#[derive(Default)]
pub struct StaticCredentialStore {
    credentials: HashMap<String, Credentials>,
}

impl StaticCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add credentials for a subscription.
    pub fn with(mut self, subscription_id: &str, username: &str, password: &str) -> Self {
        self.credentials.insert(
            subscription_id.to_string(),
            Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn get(&self, subscription_id: &str) -> Result<Option<Credentials>> {
        Ok(self.credentials.get(subscription_id).cloned())
    }
}
