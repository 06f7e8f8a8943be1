// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory subscription store for testing.
//!
//! Keeps records in a map and logs every upsert so tests can assert which
//! writes happened and in what order. Supports failure injection for
//! exercising store-write error paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::SubscriptionStore;
use crate::error::{Error, Result};
use crate::subscription::Subscription;

/// In-memory subscription store.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: Mutex<HashMap<String, Subscription>>,
    upserts: Mutex<Vec<Subscription>>,
    fail_writes: AtomicBool,
}

impl InMemorySubscriptionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without logging it as an upsert.
    pub async fn insert(&self, subscription: Subscription) {
        self.records
            .lock()
            .await
            .insert(subscription.subscription_id.clone(), subscription);
    }

    /// Current record for a subscription id.
    pub async fn get(&self, subscription_id: &str) -> Option<Subscription> {
        self.records.lock().await.get(subscription_id).cloned()
    }

    /// Every upsert performed through the trait, in order.
    pub async fn upserts(&self) -> Vec<Subscription> {
        self.upserts.lock().await.clone()
    }

    /// Make all subsequent upserts fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn list(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> =
            self.records.lock().await.values().cloned().collect();
        subscriptions.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));
        Ok(subscriptions)
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Other("injected store write failure".to_string()));
        }
        self.records
            .lock()
            .await
            .insert(subscription.subscription_id.clone(), subscription.clone());
        self.upserts.lock().await.push(subscription.clone());
        Ok(())
    }
}
