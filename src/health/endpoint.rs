// src/health/endpoint.rs
use super::indicator::HealthIndicator;
use super::status::{HealthResult, HealthStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(rename = "checkedAt")]
    pub checked_at: DateTime<Utc>,
    pub details: BTreeMap<String, HealthResult>,
}

/// Runs every registered indicator and folds the results into one report.
#[derive(Clone, Default)]
pub struct HealthEndpoint {
    indicators: Vec<Arc<dyn HealthIndicator>>,
}

impl HealthEndpoint {
    pub fn new(indicators: Vec<Arc<dyn HealthIndicator>>) -> Self {
        Self { indicators }
    }

    pub fn names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }

    /// With no indicators registered the report is UP: there is nothing
    /// failing to report.
    pub async fn report(&self) -> HealthReport {
        let results =
            futures::future::join_all(self.indicators.iter().map(|i| i.result())).await;

        let status = if results.iter().all(HealthResult::is_up) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };

        HealthReport {
            status,
            checked_at: Utc::now(),
            details: results
                .into_iter()
                .map(|result| (result.name().to_string(), result))
                .collect(),
        }
    }

    pub async fn check(&self, name: &str) -> Option<HealthResult> {
        let indicator = self.indicators.iter().find(|i| i.name() == name)?;
        Some(indicator.result().await)
    }
}
