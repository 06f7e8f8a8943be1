// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Counter metrics emitted by the health monitor.

use std::sync::Mutex;

use metrics::counter;

/// Events the health monitor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// A producer accepted a resubscription request.
    Resubscription,
    /// A repair attempt failed against the producer.
    Outage,
}

impl Metric {
    /// Counter name on the metrics backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resubscription => "avl_resubscriptions_total",
            Self::Outage => "avl_feed_outages_total",
        }
    }
}

/// Trait for metric sinks.
pub trait MetricsSink: Send + Sync {
    /// Count one occurrence of `metric` for a subscription.
    fn record(&self, metric: Metric, subscription_id: &str);
}

/// Sink that forwards to the process-wide `metrics` recorder.
pub struct RuntimeMetrics;

impl MetricsSink for RuntimeMetrics {
    fn record(&self, metric: Metric, subscription_id: &str) {
        counter!(metric.name(), "subscription_id" => subscription_id.to_string()).increment(1);
    }
}

/// Sink that captures emissions for assertions in tests.
#[derive(Default)]
pub struct RecordingMetrics {
    emitted: Mutex<Vec<(Metric, String)>>,
}

impl RecordingMetrics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every emission so far, in order.
    pub fn emitted(&self) -> Vec<(Metric, String)> {
        self.emitted.lock().expect("metrics lock poisoned").clone()
    }

    /// Number of emissions of one metric.
    pub fn count(&self, metric: Metric) -> usize {
        self.emitted
            .lock()
            .expect("metrics lock poisoned")
            .iter()
            .filter(|(m, _)| *m == metric)
            .count()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, metric: Metric, subscription_id: &str) {
        self.emitted
            .lock()
            .expect("metrics lock poisoned")
            .push((metric, subscription_id.to_string()));
    }
}
