// src/health/status.rs
use crate::driver::{AccessorError, DatabaseInfo};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub type Details = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    pub fn is_up(self) -> bool {
        self == HealthStatus::Up
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Up => write!(f, "UP"),
            HealthStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Why a probe ended DOWN. Cloneable so results stay plain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Accessor(#[from] AccessorError),

    #[error("Invalid database descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Cluster check deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Cluster topology unavailable: {0}")]
    Topology(AccessorError),

    #[error("Cluster topology has no members")]
    EmptyTopology,

    #[error("Probe task aborted: {0}")]
    Aborted(String),
}

/// Outcome of one health check. Built once per invocation and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    name: String,
    status: HealthStatus,
    details: Details,
    #[serde(skip)]
    cause: Option<ProbeError>,
}

impl HealthResult {
    pub fn new(
        name: impl Into<String>,
        status: HealthStatus,
        details: Details,
        cause: Option<ProbeError>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            details,
            cause,
        }
    }

    /// UP result carrying the database name and id.
    pub fn up(name: impl Into<String>, info: &DatabaseInfo) -> Self {
        let mut details = Details::new();
        details.insert("database".into(), Value::String(info.name.clone()));
        details.insert("id".into(), Value::String(info.id.clone()));
        Self::new(name, HealthStatus::Up, details, None)
    }

    /// DOWN result carrying the database name and the error description.
    pub fn down(name: impl Into<String>, database: &str, cause: ProbeError) -> Self {
        let mut details = Details::new();
        details.insert("database".into(), Value::String(database.to_string()));
        details.insert("error".into(), Value::String(cause.to_string()));
        Self::new(name, HealthStatus::Down, details, Some(cause))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn cause(&self) -> Option<&ProbeError> {
        self.cause.as_ref()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "status": self.status,
            "details": self.details,
        })
    }
}

/// Aggregate verdict: UP only when there is at least one node and every node
/// is UP.
///
/// An empty topology is DOWN. Nothing was probed, so nothing can vouch for
/// the cluster, and a misconfigured or undiscoverable topology must not read
/// as healthy.
pub fn aggregate_status(nodes: &[HealthResult]) -> HealthStatus {
    if nodes.is_empty() || nodes.iter().any(|node| !node.is_up()) {
        HealthStatus::Down
    } else {
        HealthStatus::Up
    }
}

/// Cluster-wide outcome. Serializes like a [`HealthResult`] whose details
/// carry the per-node results under `nodes`, in topology order.
#[derive(Debug, Clone)]
pub struct ClusterHealthResult {
    name: String,
    database: String,
    status: HealthStatus,
    nodes: Vec<HealthResult>,
    cause: Option<ProbeError>,
}

impl ClusterHealthResult {
    pub fn new(name: impl Into<String>, database: impl Into<String>, nodes: Vec<HealthResult>) -> Self {
        let status = aggregate_status(&nodes);
        let cause = if nodes.is_empty() {
            Some(ProbeError::EmptyTopology)
        } else {
            None
        };

        Self {
            name: name.into(),
            database: database.into(),
            status,
            nodes,
            cause,
        }
    }

    /// DOWN before any node was probed, e.g. topology discovery failed.
    pub fn unavailable(
        name: impl Into<String>,
        database: impl Into<String>,
        cause: ProbeError,
    ) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            status: HealthStatus::Down,
            nodes: Vec::new(),
            cause: Some(cause),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn nodes(&self) -> &[HealthResult] {
        &self.nodes
    }

    pub fn cause(&self) -> Option<&ProbeError> {
        self.cause.as_ref()
    }

    pub fn nodes_up(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_up()).count()
    }

    pub fn to_health_result(&self) -> HealthResult {
        let mut details = Details::new();
        details.insert("database".into(), Value::String(self.database.clone()));
        details.insert(
            "nodes".into(),
            Value::Array(self.nodes.iter().map(HealthResult::to_json).collect()),
        );
        if let Some(cause) = &self.cause {
            details.insert("error".into(), Value::String(cause.to_string()));
        }

        HealthResult::new(self.name.clone(), self.status, details, self.cause.clone())
    }
}

impl From<ClusterHealthResult> for HealthResult {
    fn from(result: ClusterHealthResult) -> Self {
        result.to_health_result()
    }
}

impl Serialize for ClusterHealthResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_health_result().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info(name: &str, id: &str) -> DatabaseInfo {
        DatabaseInfo {
            name: name.into(),
            id: id.into(),
            path: None,
            is_system: false,
        }
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Down).unwrap(), "\"DOWN\"");
        assert_eq!(HealthStatus::Down.to_string(), "DOWN");
    }

    #[test]
    fn test_up_result_json_shape() {
        let result = HealthResult::up("arangodb", &info("_system", "1"));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(
            json,
            json!({
                "name": "arangodb",
                "status": "UP",
                "details": {"database": "_system", "id": "1"}
            })
        );
        assert!(result.cause().is_none());
    }

    #[test]
    fn test_down_result_keeps_cause_out_of_json() {
        let cause = ProbeError::Timeout(Duration::from_secs(5));
        let result = HealthResult::down("arangodb", "custom", cause.clone());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "DOWN");
        assert_eq!(json["details"]["database"], "custom");
        assert_eq!(json["details"]["error"], "Probe timed out after 5s");
        assert!(json.get("cause").is_none());
        assert_eq!(result.cause(), Some(&cause));
    }

    #[test]
    fn test_cluster_result_nests_nodes_in_order() {
        let nodes = vec![
            HealthResult::up("nodeA", &info("_system", "1")),
            HealthResult::up("nodeB", &info("_system", "1")),
            HealthResult::down(
                "nodeC",
                "_system",
                ProbeError::Accessor(AccessorError::Connection("refused".into())),
            ),
        ];
        let cluster = ClusterHealthResult::new("arangodb (cluster)", "_system", nodes);

        assert_eq!(cluster.status(), HealthStatus::Down);
        assert_eq!(cluster.nodes_up(), 2);
        assert!(cluster.cause().is_none());

        let json = serde_json::to_value(&cluster).unwrap();
        assert_eq!(json["name"], "arangodb (cluster)");
        let names: Vec<_> = json["details"]["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["nodeA", "nodeB", "nodeC"]);
        assert_eq!(json["details"]["nodes"][2]["status"], "DOWN");
    }

    #[test]
    fn test_empty_cluster_is_down() {
        let cluster = ClusterHealthResult::new("arangodb (cluster)", "_system", Vec::new());
        assert_eq!(cluster.status(), HealthStatus::Down);
        assert_eq!(cluster.cause(), Some(&ProbeError::EmptyTopology));

        let result: HealthResult = cluster.into();
        assert_eq!(result.detail("nodes"), Some(&json!([])));
    }

    proptest! {
        #[test]
        fn prop_aggregate_up_iff_all_nodes_up(states in proptest::collection::vec(any::<bool>(), 0..16)) {
            let nodes: Vec<HealthResult> = states
                .iter()
                .enumerate()
                .map(|(i, up)| {
                    let name = format!("node{}", i);
                    if *up {
                        HealthResult::up(name, &info("_system", "1"))
                    } else {
                        HealthResult::down(name, "_system", ProbeError::Timeout(Duration::from_millis(1)))
                    }
                })
                .collect();

            let expected = if !states.is_empty() && states.iter().all(|up| *up) {
                HealthStatus::Up
            } else {
                HealthStatus::Down
            };
            prop_assert_eq!(aggregate_status(&nodes), expected);

            let cluster = ClusterHealthResult::new("arangodb (cluster)", "_system", nodes);
            prop_assert_eq!(cluster.nodes().len(), states.len());
        }
    }
}
