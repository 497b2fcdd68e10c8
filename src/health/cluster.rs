// src/health/cluster.rs
use super::checker::NodeHealthProber;
use super::indicator::HealthIndicator;
use super::status::{ClusterHealthResult, HealthResult, ProbeError};
use crate::config::HealthConfig;
use crate::driver::{ClusterMember, TopologyProvider};
use crate::metrics::MetricsCollector;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Duration, Instant};
use tracing::{debug, info, warn};

/// Name the cluster-wide check is reported under.
pub const CLUSTER_NAME: &str = "arangodb (cluster)";

/// Probes every member of a cluster topology concurrently and reduces the
/// per-node results into one verdict.
pub struct ClusterHealthAggregator {
    name: String,
    database: String,
    topology: Arc<dyn TopologyProvider>,
    probe: HealthConfig,
    deadline: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ClusterHealthAggregator {
    /// `deadline` bounds the whole check, topology resolution included, and is
    /// independent of the per-node probe timeout in `probe`.
    pub fn new(
        database: impl Into<String>,
        topology: Arc<dyn TopologyProvider>,
        probe: HealthConfig,
        deadline: Duration,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            name: CLUSTER_NAME.to_string(),
            database: database.into(),
            topology,
            probe,
            deadline,
            metrics,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn check(&self) -> ClusterHealthResult {
        let deadline = Instant::now() + self.deadline;

        let result = match timeout(self.deadline, self.topology.members()).await {
            Ok(Ok(members)) if members.is_empty() => {
                // No members configured or discovered. Reported DOWN with an
                // empty node list rather than vacuously UP.
                warn!(
                    "Cluster health '{}' has an empty {} topology",
                    self.name,
                    self.topology.name()
                );
                ClusterHealthResult::new(self.name.clone(), self.database.clone(), Vec::new())
            }
            Ok(Ok(members)) => {
                debug!(
                    "Probing {} cluster members ({} topology)",
                    members.len(),
                    self.topology.name()
                );
                let nodes = self.probe_members(members, deadline).await;
                ClusterHealthResult::new(self.name.clone(), self.database.clone(), nodes)
            }
            Ok(Err(e)) => {
                warn!("Cluster health '{}' could not resolve topology: {}", self.name, e);
                ClusterHealthResult::unavailable(
                    self.name.clone(),
                    self.database.clone(),
                    ProbeError::Topology(e),
                )
            }
            Err(_) => ClusterHealthResult::unavailable(
                self.name.clone(),
                self.database.clone(),
                ProbeError::DeadlineExceeded(self.deadline),
            ),
        };

        info!(
            "Cluster health '{}' reported {}: {}/{} nodes up",
            self.name,
            result.status(),
            result.nodes_up(),
            result.nodes().len()
        );

        if let Some(metrics) = &self.metrics {
            metrics.update_status(&self.name, result.status());
            metrics.update_cluster_counts(result.nodes_up(), result.nodes().len());
            metrics.update_cluster_nodes(result.nodes().iter().map(|n| (n.name(), n.status())));
        }

        result
    }

    async fn probe_members(&self, members: Vec<ClusterMember>, deadline: Instant) -> Vec<HealthResult> {
        // One task per node; nothing is shared between them except the
        // read-only accessors. Node outcomes are exported by `check` under the
        // `node` label, never as a `check`.
        let tasks: Vec<(String, JoinHandle<HealthResult>)> = members
            .into_iter()
            .map(|member| {
                let prober = NodeHealthProber::new(member.accessor, &self.probe, None)
                    .named(member.name.clone());
                let handle = tokio::spawn(async move { prober.check().await });
                (member.name, handle)
            })
            .collect();

        let waits = tasks.into_iter().map(|(name, handle)| {
            let database = self.database.as_str();
            let budget = self.deadline;
            async move { await_node(name, database, handle, deadline, budget).await }
        });

        // join_all keeps topology order regardless of completion order.
        futures::future::join_all(waits).await
    }
}

async fn await_node(
    name: String,
    database: &str,
    mut handle: JoinHandle<HealthResult>,
    deadline: Instant,
    budget: Duration,
) -> HealthResult {
    match timeout_at(deadline, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("Probe task for node '{}' failed: {}", name, e);
            HealthResult::down(name, database, ProbeError::Aborted(e.to_string()))
        }
        Err(_) => {
            handle.abort();
            warn!("Node '{}' did not answer before the cluster deadline", name);
            HealthResult::down(name, database, ProbeError::DeadlineExceeded(budget))
        }
    }
}

#[async_trait]
impl HealthIndicator for ClusterHealthAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn result(&self) -> HealthResult {
        self.check().await.into()
    }
}
