// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Subscription store gateway.
//!
//! The store holds the authoritative subscription records, keyed by
//! subscription id. The health monitor reads the whole set each cycle and
//! writes full records back at every state transition; writes are
//! last-writer-wins with no optimistic concurrency check, which is safe
//! because only one task touches a given subscription per cycle.

pub mod memory;
pub mod postgres;

pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::subscription::Subscription;

/// Trait for subscription stores.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// List all subscription records, regardless of status.
    async fn list(&self) -> Result<Vec<Subscription>>;

    /// Write a full subscription record, inserting or replacing by
    /// subscription id.
    async fn upsert(&self, subscription: &Subscription) -> Result<()>;
}
