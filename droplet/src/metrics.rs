// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramVec,
    IntCounter, IntCounterVec, IntGauge, Registry,
};

const RPC_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 7.5, 10., 15., 20.,
    30.,
];

#[derive(Clone, Debug)]
pub struct DropletMetrics {
    // Event fetcher
    pub(crate) event_polls: IntCounter,
    pub(crate) event_poll_errors: IntCounter,
    pub(crate) events_ingested: IntCounterVec,
    pub(crate) events_unrecognized: IntCounter,
    pub(crate) stale_responses_discarded: IntCounterVec,
    pub(crate) cache_invalidations: IntCounter,
    pub(crate) cached_events: IntGauge,

    // Resolver
    pub(crate) resolver_calls: IntCounter,
    pub(crate) resolver_cache_hits: IntCounter,
    pub(crate) resolver_not_found: IntCounter,
    pub(crate) decode_faults: IntCounterVec,

    // Transactions
    pub(crate) tx_submitted: IntCounterVec,
    pub(crate) tx_failed: IntCounterVec,

    // RPC
    pub(crate) rpc_queries: IntCounterVec,
    pub(crate) rpc_errors: IntCounterVec,
    pub(crate) rpc_queries_latency: HistogramVec,
}

impl DropletMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            event_polls: register_int_counter_with_registry!(
                "droplet_event_polls",
                "Total number of event poll requests issued",
                registry,
            )
            .unwrap(),
            event_poll_errors: register_int_counter_with_registry!(
                "droplet_event_poll_errors",
                "Total number of event polls that failed and were skipped",
                registry,
            )
            .unwrap(),
            events_ingested: register_int_counter_vec_with_registry!(
                "droplet_events_ingested",
                "Total number of new events added to the session cache",
                &["kind"],
                registry,
            )
            .unwrap(),
            events_unrecognized: register_int_counter_with_registry!(
                "droplet_events_unrecognized",
                "Total number of polled events that could not be decoded",
                registry,
            )
            .unwrap(),
            stale_responses_discarded: register_int_counter_vec_with_registry!(
                "droplet_stale_responses_discarded",
                "Total number of fetch responses dropped because a newer generation or session superseded them",
                &["reason"],
                registry,
            )
            .unwrap(),
            cache_invalidations: register_int_counter_with_registry!(
                "droplet_cache_invalidations",
                "Total number of event cache invalidations",
                registry,
            )
            .unwrap(),
            cached_events: register_int_gauge_with_registry!(
                "droplet_cached_events",
                "Number of events currently held in the session cache",
                registry,
            )
            .unwrap(),
            resolver_calls: register_int_counter_with_registry!(
                "droplet_resolver_calls",
                "Total number of read-only lookups issued by the address resolver",
                registry,
            )
            .unwrap(),
            resolver_cache_hits: register_int_counter_with_registry!(
                "droplet_resolver_cache_hits",
                "Total number of address lookups served from the session cache",
                registry,
            )
            .unwrap(),
            resolver_not_found: register_int_counter_with_registry!(
                "droplet_resolver_not_found",
                "Total number of address lookups that returned no droplet",
                registry,
            )
            .unwrap(),
            decode_faults: register_int_counter_vec_with_registry!(
                "droplet_decode_faults",
                "Total number of malformed return values treated as absent",
                &["value"],
                registry,
            )
            .unwrap(),
            tx_submitted: register_int_counter_vec_with_registry!(
                "droplet_tx_submitted",
                "Total number of transactions handed to the wallet",
                &["action"],
                registry,
            )
            .unwrap(),
            tx_failed: register_int_counter_vec_with_registry!(
                "droplet_tx_failed",
                "Total number of failed transactions by action and error type",
                &["action", "error_type"],
                registry,
            )
            .unwrap(),
            rpc_queries: register_int_counter_vec_with_registry!(
                "droplet_rpc_queries",
                "Total number of JSON-RPC queries by method",
                &["method"],
                registry,
            )
            .unwrap(),
            rpc_errors: register_int_counter_vec_with_registry!(
                "droplet_rpc_errors",
                "Total number of failed JSON-RPC queries by method",
                &["method"],
                registry,
            )
            .unwrap(),
            rpc_queries_latency: register_histogram_vec_with_registry!(
                "droplet_rpc_queries_latency",
                "Latency of JSON-RPC queries by method",
                &["method"],
                RPC_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_in_private_registry() {
        let registry = Registry::new();
        let metrics = DropletMetrics::new(&registry);
        metrics.event_poll_errors.inc();
        metrics.decode_faults.with_label_values(&["option_address"]).inc();

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"droplet_event_poll_errors".to_string()));
        assert!(names.contains(&"droplet_decode_faults".to_string()));
    }

    #[test]
    fn test_new_for_testing_is_isolated() {
        // Two instances must not collide on registration
        let a = DropletMetrics::new_for_testing();
        let b = DropletMetrics::new_for_testing();
        a.resolver_calls.inc();
        assert_eq!(a.resolver_calls.get(), 1);
        assert_eq!(b.resolver_calls.get(), 0);
    }
}
