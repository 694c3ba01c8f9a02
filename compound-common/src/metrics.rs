//! Prometheus-style counters and histograms for reconciles, queue depth,
//! backend calls, apply latencies, and errors (spec §6 "Telemetry").

#![cfg(feature = "metrics")]

use prometheus::{
    HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, register_histogram_vec_with_registry,
    register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
};

/// Counters and histograms shared by every `Reconciler` the process hosts,
/// labeled by `(cluster, kind, reconciler)` so one registry covers the
/// Provider reconciler, the Entry reconciler, and the zone reconciler alike.
#[derive(Clone)]
pub struct ControllerMetrics {
    pub registry: Registry,
    pub reconcile_total: IntCounterVec,
    pub reconcile_errors_total: IntCounterVec,
    pub reconcile_duration_seconds: HistogramVec,
    pub queue_depth: IntGaugeVec,
    pub backend_calls_total: IntCounterVec,
    pub backend_apply_duration_seconds: HistogramVec,
}

impl ControllerMetrics {
    pub fn new(namespace: &str) -> Self {
        let registry = Registry::new();
        let labels = &["cluster", "kind", "reconciler"];
        let reconcile_total = register_int_counter_vec_with_registry!(
            Opts::new("reconcile_total", "total reconcile invocations").namespace(namespace),
            labels,
            registry
        )
        .expect("register reconcile_total");
        let reconcile_errors_total = register_int_counter_vec_with_registry!(
            Opts::new("reconcile_errors_total", "reconcile invocations returning Failed")
                .namespace(namespace),
            labels,
            registry
        )
        .expect("register reconcile_errors_total");
        let reconcile_duration_seconds = register_histogram_vec_with_registry!(
            "reconcile_duration_seconds",
            "time spent inside a single reconcile call",
            labels,
            registry
        )
        .expect("register reconcile_duration_seconds");
        let queue_depth = register_int_gauge_vec_with_registry!(
            Opts::new("queue_depth", "items currently queued, including deduplicated re-enqueues")
                .namespace(namespace),
            &["cluster", "kind"],
            registry
        )
        .expect("register queue_depth");
        let backend_calls_total = register_int_counter_vec_with_registry!(
            Opts::new("backend_calls_total", "calls made to a DNS backend handler")
                .namespace(namespace),
            &["provider_type", "operation", "outcome"],
            registry
        )
        .expect("register backend_calls_total");
        let backend_apply_duration_seconds = register_histogram_vec_with_registry!(
            "backend_apply_duration_seconds",
            "latency of a single applyChangeSet call",
            &["provider_type"],
            registry
        )
        .expect("register backend_apply_duration_seconds");
        Self {
            registry,
            reconcile_total,
            reconcile_errors_total,
            reconcile_duration_seconds,
            queue_depth,
            backend_calls_total,
            backend_apply_duration_seconds,
        }
    }
}
