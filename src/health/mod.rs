// src/health/mod.rs
mod checker;
mod cluster;
mod endpoint;
mod indicator;
mod status;

pub use checker::{NodeHealthProber, NAME};
pub use cluster::{ClusterHealthAggregator, CLUSTER_NAME};
pub use endpoint::{HealthEndpoint, HealthReport};
pub use indicator::HealthIndicator;
pub use status::{
    aggregate_status, ClusterHealthResult, Details, HealthResult, HealthStatus, ProbeError,
};

use crate::config::ArangoConfig;
use crate::driver::{ArangoHttpClient, ClusterDiscovery, StaticTopology, TopologyProvider};
use crate::metrics::MetricsCollector;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Build the indicators enabled in `config`: the single node check when
/// `health.enabled`, the cluster check when `health_cluster.enabled`.
pub fn build_indicators(
    config: &ArangoConfig,
    metrics: Option<Arc<MetricsCollector>>,
) -> Result<Vec<Arc<dyn HealthIndicator>>> {
    let client = ArangoHttpClient::new(config)?;
    let mut indicators: Vec<Arc<dyn HealthIndicator>> = Vec::new();

    if config.health.enabled {
        indicators.push(Arc::new(NodeHealthProber::new(
            Arc::new(client.clone()),
            &config.health,
            metrics.clone(),
        )));
    }

    if config.health_cluster.enabled {
        let cluster = &config.health_cluster;
        let topology: Arc<dyn TopologyProvider> = if !cluster.nodes.is_empty() {
            Arc::new(client.static_topology(&cluster.nodes))
        } else if cluster.discover {
            Arc::new(ClusterDiscovery::new(client.clone()))
        } else {
            Arc::new(StaticTopology::default())
        };

        info!(
            "Cluster health enabled with {} topology, deadline {:?}",
            topology.name(),
            cluster.timeout()
        );

        indicators.push(Arc::new(ClusterHealthAggregator::new(
            config.database.clone(),
            topology,
            config.health.clone(),
            cluster.timeout(),
            metrics,
        )));
    }

    info!(
        "Registered {} health indicator(s) for database '{}' at {}",
        indicators.len(),
        config.database,
        client.base_url()
    );

    Ok(indicators)
}
