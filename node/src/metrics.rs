//! Prometheus metrics for the safenode registry.
//!
//! [`RegistryMetrics`] owns a dedicated [`Registry`] that an exporter can
//! encode into the Prometheus text format via [`RegistryMetrics::encode`].

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct RegistryMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub broadcasts_accepted: IntCounter,
    pub broadcasts_rejected: IntCounter,
    pub pings_accepted: IntCounter,
    pub pings_rejected: IntCounter,
    pub verifications_accepted: IntCounter,
    pub verifications_rejected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Records currently in the registry.
    pub nodes_total: IntGauge,
    /// Enabled records at the payment protocol.
    pub nodes_enabled: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("metric names are unique within the registry")
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
        .expect("metric names are unique within the registry")
}

impl RegistryMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let broadcasts_accepted = counter(
            &registry,
            "safenode_broadcasts_accepted_total",
            "Announcements accepted from peers or created locally",
        );
        let broadcasts_rejected = counter(
            &registry,
            "safenode_broadcasts_rejected_total",
            "Announcements rejected as malformed, forged or stale",
        );
        let pings_accepted = counter(&registry, "safenode_pings_accepted_total", "Pings accepted");
        let pings_rejected = counter(&registry, "safenode_pings_rejected_total", "Pings rejected");
        let verifications_accepted = counter(
            &registry,
            "safenode_verifications_accepted_total",
            "Address verifications applied",
        );
        let verifications_rejected = counter(
            &registry,
            "safenode_verifications_rejected_total",
            "Address verifications rejected",
        );

        let nodes_total = gauge(&registry, "safenode_nodes_total", "Records in the registry");
        let nodes_enabled = gauge(&registry, "safenode_nodes_enabled", "Enabled records");

        Self {
            registry,
            broadcasts_accepted,
            broadcasts_rejected,
            pings_accepted,
            pings_rejected,
            verifications_accepted,
            verifications_rejected,
            nodes_total,
            nodes_enabled,
        }
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| NodeError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| NodeError::Metrics(e.to_string()))
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = RegistryMetrics::new();
        metrics.broadcasts_accepted.inc();
        metrics.nodes_total.set(7);
        let text = metrics.encode().unwrap();
        assert!(text.contains("safenode_broadcasts_accepted_total 1"));
        assert!(text.contains("safenode_nodes_total 7"));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        let a = RegistryMetrics::new();
        let b = RegistryMetrics::new();
        a.pings_accepted.inc();
        assert_eq!(b.pings_accepted.get(), 0);
    }
}
