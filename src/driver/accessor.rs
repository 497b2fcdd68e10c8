// src/driver/accessor.rs
use async_trait::async_trait;
use serde::Deserialize;

/// Descriptor returned by ArangoDB for the database an accessor is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub is_system: bool,
}

/// Errors are stringly typed so they can be cloned into every health result
/// that captures them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("ArangoDB error {error_num} (HTTP {code}): {message}")]
    Api {
        code: u16,
        error_num: u32,
        message: String,
    },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Read-only view of one database on one endpoint. Shared between concurrent
/// probes, so implementations must be safe for concurrent use.
#[async_trait]
pub trait DatabaseAccessor: Send + Sync {
    /// Name of the database this accessor is bound to.
    fn database(&self) -> &str;

    /// Endpoint the accessor talks to, for logging.
    fn endpoint(&self) -> String;

    async fn database_info(&self) -> Result<DatabaseInfo, AccessorError>;
}
