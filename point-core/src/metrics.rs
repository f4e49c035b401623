//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring point mutations.
//! Each collector owns its registry, so several services can live in one
//! process (tests do this constantly) without name clashes.
//!
//! # Metrics
//!
//! - `point_charges_total` - Committed charges
//! - `point_uses_total` - Committed uses
//! - `point_rejections_total{reason}` - Business-rule rejections by error kind
//! - `point_failures_total{reason}` - Infrastructure failures (storage, lock timeout)
//! - `point_lock_wait_seconds` - Histogram of identity lock waits
//! - `point_tracked_identities` - Identities that own a lock token

use crate::types::TransactionType;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed charges
    pub charges_total: IntCounter,

    /// Committed uses
    pub uses_total: IntCounter,

    /// Rejected mutations, labelled by error kind
    pub rejections_total: IntCounterVec,

    /// Mutations that failed for infrastructure reasons, labelled by error kind
    pub failures_total: IntCounterVec,

    /// Lock wait histogram
    pub lock_wait: Histogram,

    /// Identities with a lock token
    pub tracked_identities: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let charges_total = IntCounter::new("point_charges_total", "Committed charges")?;
        registry.register(Box::new(charges_total.clone()))?;

        let uses_total = IntCounter::new("point_uses_total", "Committed uses")?;
        registry.register(Box::new(uses_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("point_rejections_total", "Business-rule rejections by error kind"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("point_failures_total", "Infrastructure failures by error kind"),
            &["reason"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let lock_wait = Histogram::with_opts(
            HistogramOpts::new("point_lock_wait_seconds", "Identity lock wait time").buckets(
                vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0],
            ),
        )?;
        registry.register(Box::new(lock_wait.clone()))?;

        let tracked_identities = IntGauge::new(
            "point_tracked_identities",
            "Identities that own a lock token",
        )?;
        registry.register(Box::new(tracked_identities.clone()))?;

        Ok(Self {
            charges_total,
            uses_total,
            rejections_total,
            failures_total,
            lock_wait,
            tracked_identities,
            registry,
        })
    }

    /// Record a committed mutation
    pub fn record_commit(&self, kind: TransactionType) {
        match kind {
            TransactionType::Charge => self.charges_total.inc(),
            TransactionType::Use => self.uses_total.inc(),
        }
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Record a mutation that failed in the store or lock layer
    pub fn record_failure(&self, reason: &str) {
        self.failures_total.with_label_values(&[reason]).inc();
    }

    /// Record time spent waiting for an identity lock
    pub fn record_lock_wait(&self, waited: Duration) {
        self.lock_wait.observe(waited.as_secs_f64());
    }

    /// Update the lock token gauge
    pub fn set_tracked_identities(&self, count: usize) {
        self.tracked_identities.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("charges_total", &self.charges_total.get())
            .field("uses_total", &self.uses_total.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.charges_total.get(), 0);
        assert_eq!(metrics.uses_total.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_commit(TransactionType::Charge);
        assert_eq!(a.charges_total.get(), 1);
        assert_eq!(b.charges_total.get(), 0);
    }

    #[test]
    fn test_record_rejection() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("limit_exceeded");
        metrics.record_rejection("limit_exceeded");
        metrics.record_rejection("insufficient_balance");
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["limit_exceeded"])
                .get(),
            2
        );
    }

    #[test]
    fn test_failures_kept_apart_from_rejections() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure("storage");
        assert_eq!(metrics.failures_total.with_label_values(&["storage"]).get(), 1);
        assert_eq!(metrics.rejections_total.with_label_values(&["storage"]).get(), 0);
    }

    #[test]
    fn test_record_lock_wait() {
        let metrics = Metrics::new().unwrap();
        metrics.record_lock_wait(Duration::from_micros(250));
        assert_eq!(metrics.lock_wait.get_sample_count(), 1);
    }
}
