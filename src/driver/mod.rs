// src/driver/mod.rs
mod accessor;
mod http;
mod topology;

pub use accessor::{AccessorError, DatabaseAccessor, DatabaseInfo};
pub use http::{endpoint_to_url, node_name, ArangoHttpClient, ClusterDiscovery};
pub use topology::{ClusterMember, StaticTopology, TopologyProvider};
