// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! AVL Subscriptions - SIRI-VM Feed Lifecycle Management
//!
//! This crate keeps bus location feed subscriptions alive. Producers accept
//! a SIRI-VM subscription, push vehicle locations and heartbeats to our
//! callback address, and sooner or later go silent: they restart, expire
//! the subscription, or lose our address. The health monitor detects the
//! silence and repairs it by terminating the old subscription and
//! subscribing again.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    avl-subscriptions (This Crate)                │
//! │                                                                  │
//! │  ┌──────────────┐   ┌───────────────┐   ┌────────────────────┐  │
//! │  │ Subscription │   │  Credential   │   │   Health Monitor   │  │
//! │  │    Store     │   │    Store      │   │  (periodic cycle)  │  │
//! │  └──────┬───────┘   └──────┬────────┘   └─────────┬──────────┘  │
//! │         │                  │                      │             │
//! │         ▼                  ▼                      ▼             │
//! │  ┌─────────────────────────────┐        ┌────────────────────┐  │
//! │  │         PostgreSQL          │        │  Producer Client   │  │
//! │  │ (subscriptions, credentials)│        │ (reqwest, SIRI XML)│  │
//! │  └─────────────────────────────┘        └─────────┬──────────┘  │
//! └────────────────────────────────────────────────────┼────────────┘
//!                                                      │ subscribe /
//!                                                      ▼ terminate
//!                                          ┌─────────────────────────┐
//!                                          │   AVL Data Producers    │
//!                                          │ (third-party SIRI peers)│
//!                                          └─────────────────────────┘
//! ```
//!
//! Wire messages live in the `avl-siri` crate; heartbeats and location
//! pushes arrive through a separate ingest path that writes
//! `heartbeat_last_received`, which this crate only reads.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `AVL_CALLBACK_BASE_URL` | Yes | - | Base URL producers push to |
//! | `AVL_REQUESTOR_REF` | No | `BODS` | Default wire requester identity |
//! | `AVL_HEARTBEAT_TIMEOUT_SECS` | No | `90` | Silence tolerated before repair |
//! | `AVL_POLL_INTERVAL_SECS` | No | `60` | Health check cadence |
//! | `AVL_SUBSCRIPTION_TTL_SECS` | No | `86400` | Wire-level subscription expiry |
//! | `AVL_HTTP_TIMEOUT_SECS` | No | `10` | Per-request producer timeout |
//! | `AVL_MOCK_PRODUCER_URL` | No | - | Route all exchanges to one endpoint |
//!
//! # Modules
//!
//! - [`config`]: Service configuration from environment variables
//! - [`credentials`]: Per-subscription producer credentials
//! - [`error`]: Error types for subscription lifecycle operations
//! - [`health_monitor`]: The heartbeat evaluation and repair worker
//! - [`metrics`]: Resubscription/outage counters
//! - [`producer`]: Authenticated HTTP exchange with producers
//! - [`store`]: Durable subscription records
//! - [`subscription`]: The subscription model and status state machine

#![deny(missing_docs)]

/// Service configuration loaded from environment variables.
pub mod config;

/// Per-subscription producer credentials.
pub mod credentials;

/// Error types for subscription lifecycle operations.
pub mod error;

/// Background worker for detecting and repairing dead feed subscriptions.
pub mod health_monitor;

/// Counter metrics emitted by the health monitor.
pub mod metrics;

/// Authenticated HTTP exchange with producers.
pub mod producer;

/// Durable subscription records.
pub mod store;

/// The subscription model and status state machine.
pub mod subscription;

pub use config::Config;
pub use error::Error;
pub use health_monitor::{HealthMonitor, HealthMonitorConfig};
