// src/driver/http.rs
use super::accessor::{AccessorError, DatabaseAccessor, DatabaseInfo};
use super::topology::{ClusterMember, StaticTopology, TopologyProvider};
use crate::config::ArangoConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const MAX_ERROR_BODY: usize = 256;

/// Minimal ArangoDB REST accessor. Only the read-only calls needed by the
/// health checks are implemented.
#[derive(Debug, Clone)]
pub struct ArangoHttpClient {
    client: Client,
    base_url: Url,
    database: String,
    credentials: Option<(String, Option<String>)>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code: u16,
    #[serde(default)]
    error_num: u32,
    #[serde(default)]
    error_message: String,
}

#[derive(Deserialize)]
struct ClusterHealthBody {
    #[serde(rename = "Health")]
    health: BTreeMap<String, ServerHealth>,
}

#[derive(Deserialize)]
struct ServerHealth {
    #[serde(rename = "Endpoint")]
    endpoint: String,
    #[serde(rename = "Role", default)]
    role: Option<String>,
    #[serde(rename = "ShortName", default)]
    short_name: Option<String>,
}

impl ArangoHttpClient {
    pub fn new(config: &ArangoConfig) -> Result<Self, AccessorError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .no_proxy()
            .build()
            .map_err(|e| AccessorError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            database: config.database.clone(),
            credentials: config
                .user
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    /// Same credentials and database, different node. The underlying
    /// connection pool is shared.
    pub fn for_endpoint(&self, base_url: Url) -> Self {
        Self {
            base_url,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Topology made of the given endpoints, in the given order.
    pub fn static_topology(&self, nodes: &[Url]) -> StaticTopology {
        let members = nodes
            .iter()
            .map(|url| {
                let accessor: Arc<dyn DatabaseAccessor> = Arc::new(self.for_endpoint(url.clone()));
                ClusterMember::new(node_name(url), accessor)
            })
            .collect();
        StaticTopology::new(members)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AccessorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AccessorError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AccessorError> {
        let mut request = self.client.get(url.clone());
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AccessorError::Connection(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AccessorError::Connection(e.to_string()))?;

        debug!("GET {} -> {}", url, status);

        if let Ok(err) = serde_json::from_slice::<ErrorBody>(&body) {
            if err.error {
                return Err(AccessorError::Api {
                    code: if err.code == 0 { status.as_u16() } else { err.code },
                    error_num: err.error_num,
                    message: err.error_message,
                });
            }
        }

        if !status.is_success() {
            let message: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(AccessorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| AccessorError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DatabaseAccessor for ArangoHttpClient {
    fn database(&self) -> &str {
        &self.database
    }

    fn endpoint(&self) -> String {
        self.base_url.to_string()
    }

    async fn database_info(&self) -> Result<DatabaseInfo, AccessorError> {
        let url = self.url(&["_db", &self.database, "_api", "database", "current"])?;
        let envelope: Envelope<DatabaseInfo> = self.get_json(url).await?;
        Ok(envelope.result)
    }
}

/// Discovers cluster members through a coordinator's `/_admin/cluster/health`.
/// Members are ordered by server id so repeated checks report nodes in the
/// same order.
#[derive(Debug, Clone)]
pub struct ClusterDiscovery {
    coordinator: ArangoHttpClient,
}

impl ClusterDiscovery {
    pub fn new(coordinator: ArangoHttpClient) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl TopologyProvider for ClusterDiscovery {
    async fn members(&self) -> Result<Vec<ClusterMember>, AccessorError> {
        let url = self.coordinator.url(&["_admin", "cluster", "health"])?;
        let body: ClusterHealthBody = self.coordinator.get_json(url).await?;

        let members = body
            .health
            .into_iter()
            .map(|(id, server)| {
                let accessor: Arc<dyn DatabaseAccessor> = match endpoint_to_url(&server.endpoint) {
                    Ok(url) => Arc::new(self.coordinator.for_endpoint(url)),
                    Err(e) => {
                        warn!("Cluster member '{}' has an unusable endpoint: {}", id, e);
                        Arc::new(UnusableEndpoint {
                            database: self.coordinator.database.clone(),
                            endpoint: server.endpoint,
                            error: e,
                        })
                    }
                };
                let member = ClusterMember::new(server.short_name.unwrap_or(id), accessor);
                match server.role {
                    Some(role) => member.with_role(role),
                    None => member,
                }
            })
            .collect();

        Ok(members)
    }

    fn name(&self) -> &'static str {
        "discovered"
    }
}

/// Stands in for a discovered member whose endpoint cannot be reached over
/// HTTP. Every call fails, so the member is reported DOWN alongside the rest.
struct UnusableEndpoint {
    database: String,
    endpoint: String,
    error: AccessorError,
}

#[async_trait]
impl DatabaseAccessor for UnusableEndpoint {
    fn database(&self) -> &str {
        &self.database
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn database_info(&self) -> Result<DatabaseInfo, AccessorError> {
        Err(self.error.clone())
    }
}

/// Converts ArangoDB endpoint notation (`tcp://`, `ssl://`) to an HTTP URL.
pub fn endpoint_to_url(endpoint: &str) -> Result<Url, AccessorError> {
    let normalized = if let Some(rest) = endpoint.strip_prefix("tcp://") {
        format!("http://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("ssl://") {
        format!("https://{}", rest)
    } else {
        endpoint.to_string()
    };

    let url = Url::parse(&normalized)
        .map_err(|e| AccessorError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AccessorError::InvalidEndpoint(format!(
            "unsupported scheme '{}' in {}",
            other, endpoint
        ))),
    }
}

pub fn node_name(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or("unknown"),
        url.port_or_known_default().unwrap_or(8529)
    )
}
