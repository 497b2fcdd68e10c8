// src/health/indicator.rs
use super::status::HealthResult;
use async_trait::async_trait;

/// A named health check. Implementations absorb every failure into the
/// returned result; there is no error path.
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    fn name(&self) -> &str;

    async fn result(&self) -> HealthResult;
}
