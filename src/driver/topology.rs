// src/driver/topology.rs
use super::accessor::{AccessorError, DatabaseAccessor};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// One node of a cluster topology with an accessor bound to it.
#[derive(Clone)]
pub struct ClusterMember {
    pub name: String,
    pub endpoint: String,
    pub role: Option<String>,
    pub accessor: Arc<dyn DatabaseAccessor>,
}

impl ClusterMember {
    pub fn new(name: impl Into<String>, accessor: Arc<dyn DatabaseAccessor>) -> Self {
        let endpoint = accessor.endpoint();
        Self {
            name: name.into(),
            endpoint,
            role: None,
            accessor,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

impl fmt::Debug for ClusterMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterMember")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("role", &self.role)
            .finish()
    }
}

/// Resolves the ordered member list once per cluster check.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    async fn members(&self) -> Result<Vec<ClusterMember>, AccessorError>;

    fn name(&self) -> &'static str;
}

/// Fixed topology, typically built from configured node endpoints.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    members: Vec<ClusterMember>,
}

impl StaticTopology {
    pub fn new(members: Vec<ClusterMember>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl TopologyProvider for StaticTopology {
    async fn members(&self) -> Result<Vec<ClusterMember>, AccessorError> {
        Ok(self.members.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
