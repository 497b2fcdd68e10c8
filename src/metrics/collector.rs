// src/metrics/collector.rs
use crate::health::HealthStatus;
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Probe metrics
    pub probe_attempts_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,

    // Check outcomes
    pub health_status: IntGaugeVec,

    // Cluster metrics
    pub cluster_nodes_total: IntGauge,
    pub cluster_nodes_up: IntGauge,
    pub cluster_node_status: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probe_attempts_total = IntCounterVec::new(
            Opts::new(
                "arango_health_probe_attempts_total",
                "Total database info probe attempts",
            ),
            &["check", "outcome"],
        )?;
        registry.register(Box::new(probe_attempts_total.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "arango_health_probe_duration_seconds",
                "Duration of a complete probe including retries",
            ),
            &["check"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let health_status = IntGaugeVec::new(
            Opts::new(
                "arango_health_status",
                "Last reported health status (1=UP, 0=DOWN)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let cluster_nodes_total = IntGauge::new(
            "arango_health_cluster_nodes_total",
            "Number of nodes in the last cluster check",
        )?;
        registry.register(Box::new(cluster_nodes_total.clone()))?;

        let cluster_nodes_up = IntGauge::new(
            "arango_health_cluster_nodes_up",
            "Number of UP nodes in the last cluster check",
        )?;
        registry.register(Box::new(cluster_nodes_up.clone()))?;

        let cluster_node_status = IntGaugeVec::new(
            Opts::new(
                "arango_health_cluster_node_status",
                "Status of each node in the last cluster check (1=UP, 0=DOWN)",
            ),
            &["node"],
        )?;
        registry.register(Box::new(cluster_node_status.clone()))?;

        Ok(Self {
            probe_attempts_total,
            probe_duration_seconds,
            health_status,
            cluster_nodes_total,
            cluster_nodes_up,
            cluster_node_status,
        })
    }

    pub fn record_attempt(&self, check: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.probe_attempts_total
            .with_label_values(&[check, outcome])
            .inc();
    }

    pub fn record_probe(&self, check: &str, status: HealthStatus, duration: Duration) {
        self.probe_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());
        self.update_status(check, status);
    }

    pub fn update_status(&self, check: &str, status: HealthStatus) {
        let value = if status.is_up() { 1 } else { 0 };
        self.health_status.with_label_values(&[check]).set(value);
    }

    pub fn update_cluster_counts(&self, up: usize, total: usize) {
        self.cluster_nodes_up.set(up as i64);
        self.cluster_nodes_total.set(total as i64);
    }

    /// Replaces the per-node gauges with the nodes of the latest cluster check,
    /// so members that left the topology stop being exported.
    pub fn update_cluster_nodes<'a, I>(&self, nodes: I)
    where
        I: IntoIterator<Item = (&'a str, HealthStatus)>,
    {
        self.cluster_node_status.reset();
        for (node, status) in nodes {
            let value = if status.is_up() { 1 } else { 0 };
            self.cluster_node_status.with_label_values(&[node]).set(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_recorded_values() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.record_attempt("arangodb", false);
        metrics.record_attempt("arangodb", true);
        metrics.record_probe("arangodb", HealthStatus::Up, Duration::from_millis(12));
        metrics.update_cluster_counts(2, 3);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(
            "arango_health_probe_attempts_total{check=\"arangodb\",outcome=\"failure\"} 1"
        ));
        assert!(text.contains("arango_health_status{check=\"arangodb\"} 1"));
        assert!(text.contains("arango_health_cluster_nodes_up 2"));
        assert!(text.contains("arango_health_cluster_nodes_total 3"));
    }

    #[test]
    fn test_down_sets_gauge_to_zero() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.update_status("arangodb (cluster)", HealthStatus::Down);
        assert_eq!(
            metrics
                .health_status
                .with_label_values(&["arangodb (cluster)"])
                .get(),
            0
        );
    }

    #[test]
    fn test_cluster_nodes_replace_previous_check() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.update_cluster_nodes(vec![("node-a", HealthStatus::Up), ("node-b", HealthStatus::Down)]);
        metrics.update_cluster_nodes(vec![("node-a", HealthStatus::Down)]);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains("arango_health_cluster_node_status{node=\"node-a\"} 0"));
        assert!(!text.contains("node-b"));
        assert!(!text.contains("check=\"node-a\""));
    }
}
