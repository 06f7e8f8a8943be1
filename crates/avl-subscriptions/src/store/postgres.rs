// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed subscription store.

use async_trait::async_trait;
use sqlx::PgPool;

use super::SubscriptionStore;
use crate::error::Result;
use crate::subscription::Subscription;

/// Subscription store backed by the `avl_subscriptions` table.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Create a new store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn list(&self) -> Result<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, url, status, requestor_ref, api_key,
                   publisher_id, service_start_datetime, service_end_datetime,
                   heartbeat_last_received, last_modified, last_resubscription_time
            FROM avl_subscriptions
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subscriptions)
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO avl_subscriptions (
                subscription_id, url, status, requestor_ref, api_key,
                publisher_id, service_start_datetime, service_end_datetime,
                heartbeat_last_received, last_modified, last_resubscription_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (subscription_id) DO UPDATE SET
                url = EXCLUDED.url,
                status = EXCLUDED.status,
                requestor_ref = EXCLUDED.requestor_ref,
                api_key = EXCLUDED.api_key,
                publisher_id = EXCLUDED.publisher_id,
                service_start_datetime = EXCLUDED.service_start_datetime,
                service_end_datetime = EXCLUDED.service_end_datetime,
                heartbeat_last_received = EXCLUDED.heartbeat_last_received,
                last_modified = EXCLUDED.last_modified,
                last_resubscription_time = EXCLUDED.last_resubscription_time
            "#,
        )
        .bind(&subscription.subscription_id)
        .bind(&subscription.url)
        .bind(subscription.status.as_str())
        .bind(&subscription.requestor_ref)
        .bind(&subscription.api_key)
        .bind(&subscription.publisher_id)
        .bind(subscription.service_start_datetime)
        .bind(subscription.service_end_datetime)
        .bind(subscription.heartbeat_last_received)
        .bind(subscription.last_modified)
        .bind(subscription.last_resubscription_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
