// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("database name must not be empty")]
    EmptyDatabase,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("retry max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retry backoff_max_ms ({max}) is lower than backoff_base_ms ({base})")]
    InvalidBackoff { base: u64, max: u64 },

    #[error("metrics path must start with '/': {0}")]
    InvalidMetricsPath(String),

    #[error("invalid server bind address: {0}")]
    InvalidBindAddress(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub arangodb: ArangoConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arangodb.validate()?;

        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }

        self.server
            .bind_address
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;

        Ok(())
    }
}

/// Connection settings of the ArangoDB deployment being checked.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArangoConfig {
    /// Single server endpoint, or the coordinator used for topology discovery.
    pub url: Url,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub health: HealthConfig,
    pub health_cluster: ClusterHealthConfig,
}

impl ArangoConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("arangodb.connect_timeout_ms"));
        }

        self.health.validate()?;

        if self.health_cluster.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("arangodb.health_cluster.timeout_ms"));
        }

        Ok(())
    }
}

impl Default for ArangoConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8529").expect("static url is valid"),
            database: "_system".to_string(),
            user: Some("root".to_string()),
            password: None,
            connect_timeout_ms: 2000,
            health: HealthConfig::default(),
            health_cluster: ClusterHealthConfig::default(),
        }
    }
}

/// Per-probe settings, shared by the single node check and every cluster node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("arangodb.health.timeout_ms"));
        }
        self.retry.validate()
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterHealthConfig {
    pub enabled: bool,
    /// Outer deadline for the whole fan-out, independent of per-node timeouts.
    pub timeout_ms: u64,
    /// Explicit topology. When empty and `discover` is set, members are
    /// discovered through the coordinator at `arangodb.url`.
    pub nodes: Vec<Url>,
    pub discover: bool,
}

impl ClusterHealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClusterHealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 20_000,
            nodes: Vec::new(),
            discover: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::InvalidBackoff {
                base: self.backoff_base_ms,
                max: self.backoff_max_ms,
            });
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}
