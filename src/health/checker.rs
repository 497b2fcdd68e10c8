// src/health/checker.rs
use super::indicator::HealthIndicator;
use super::status::{HealthResult, ProbeError};
use crate::config::HealthConfig;
use crate::driver::{DatabaseAccessor, DatabaseInfo};
use crate::metrics::MetricsCollector;
use crate::retry::RetryStrategy;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Name the single node check is reported under.
pub const NAME: &str = "arangodb";

/// Answers "is this database reachable and identifiable right now?" with a
/// bounded-retry loop of timed `database_info` calls.
pub struct NodeHealthProber {
    name: String,
    accessor: Arc<dyn DatabaseAccessor>,
    timeout: Duration,
    retry: RetryStrategy,
    metrics: Option<Arc<MetricsCollector>>,
}

impl NodeHealthProber {
    pub fn new(
        accessor: Arc<dyn DatabaseAccessor>,
        config: &HealthConfig,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            name: NAME.to_string(),
            accessor,
            timeout: config.timeout(),
            retry: RetryStrategy::new(config.retry.clone()),
            metrics,
        }
    }

    /// Report under another name, e.g. a cluster node's name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts()
    }

    /// Never fails: exhausted retries become a DOWN result carrying the last
    /// error.
    pub async fn check(&self) -> HealthResult {
        let start = Instant::now();

        let result = match self.retry.execute(|attempt| self.attempt(attempt)).await {
            Ok(info) => {
                let result = HealthResult::up(self.name.clone(), &info);
                debug!(
                    "Health '{}' reported UP with details: {:?}",
                    self.name,
                    result.details()
                );
                result
            }
            Err(cause) => {
                warn!(
                    "Health '{}' reported DOWN for {}: {}",
                    self.name,
                    self.accessor.endpoint(),
                    cause
                );
                HealthResult::down(self.name.clone(), self.accessor.database(), cause)
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(&self.name, result.status(), start.elapsed());
        }

        result
    }

    async fn attempt(&self, attempt: u32) -> Result<DatabaseInfo, ProbeError> {
        // Dropping the timed-out future abandons the in-flight request.
        let outcome = match timeout(self.timeout, self.accessor.database_info()).await {
            Ok(Ok(info)) => validate(info),
            Ok(Err(e)) => Err(ProbeError::from(e)),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        if let Err(e) = &outcome {
            debug!(
                "Probe '{}' attempt {}/{} failed: {}",
                self.name,
                attempt,
                self.retry.max_attempts(),
                e
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(&self.name, outcome.is_ok());
        }

        outcome
    }
}

fn validate(info: DatabaseInfo) -> Result<DatabaseInfo, ProbeError> {
    if info.name.is_empty() || info.id.is_empty() {
        return Err(ProbeError::InvalidDescriptor(format!(
            "name='{}', id='{}'",
            info.name, info.id
        )));
    }
    Ok(info)
}

#[async_trait]
impl HealthIndicator for NodeHealthProber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn result(&self) -> HealthResult {
        self.check().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::driver::AccessorError;
    use crate::health::HealthStatus;
    use crate::metrics::MetricsRegistry;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory accessor: fails the first `failures` calls, optionally
    /// stalling each call for `delay`.
    pub(crate) struct FakeAccessor {
        pub database: String,
        pub failures: u32,
        pub delay: Option<Duration>,
        pub calls: AtomicU32,
    }

    impl FakeAccessor {
        pub fn healthy(database: &str) -> Self {
            Self {
                database: database.to_string(),
                failures: 0,
                delay: None,
                calls: AtomicU32::new(0),
            }
        }

        pub fn unreachable(database: &str) -> Self {
            Self {
                failures: u32::MAX,
                ..Self::healthy(database)
            }
        }

        pub fn failing_first(database: &str, failures: u32) -> Self {
            Self {
                failures,
                ..Self::healthy(database)
            }
        }

        pub fn stalled(database: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::healthy(database)
            }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatabaseAccessor for FakeAccessor {
        fn database(&self) -> &str {
            &self.database
        }

        fn endpoint(&self) -> String {
            format!("fake://{}", self.database)
        }

        async fn database_info(&self) -> Result<DatabaseInfo, AccessorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call < self.failures {
                return Err(AccessorError::Connection("connection refused".into()));
            }
            Ok(DatabaseInfo {
                name: self.database.clone(),
                id: "4711".into(),
                path: None,
                is_system: self.database == "_system",
            })
        }
    }

    pub(crate) fn probe_config(timeout_ms: u64, max_attempts: u32) -> HealthConfig {
        HealthConfig {
            enabled: true,
            timeout_ms,
            retry: RetryConfig {
                max_attempts,
                backoff_base_ms: 0,
                backoff_max_ms: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_reachable_database_is_up() {
        let accessor = Arc::new(FakeAccessor::healthy("custom"));
        let prober = NodeHealthProber::new(accessor.clone(), &probe_config(1000, 3), None);

        let result = prober.check().await;

        assert_eq!(result.status(), HealthStatus::Up);
        assert_eq!(result.name(), "arangodb");
        assert_eq!(result.detail("database").unwrap(), "custom");
        assert_eq!(result.detail("id").unwrap(), "4711");
        assert!(result.cause().is_none());
        assert_eq!(accessor.calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_down_after_exact_attempts() {
        let accessor = Arc::new(FakeAccessor::unreachable("_system"));
        let prober = NodeHealthProber::new(accessor.clone(), &probe_config(1000, 3), None);

        let result = prober.check().await;

        assert_eq!(result.status(), HealthStatus::Down);
        assert_eq!(result.detail("database").unwrap(), "_system");
        assert!(result.detail("error").is_some());
        assert_eq!(
            result.cause(),
            Some(&ProbeError::Accessor(AccessorError::Connection(
                "connection refused".into()
            )))
        );
        assert_eq!(accessor.calls(), 3);
    }

    #[tokio::test]
    async fn test_recovers_within_retry_budget() {
        let accessor = Arc::new(FakeAccessor::failing_first("_system", 2));
        let prober = NodeHealthProber::new(accessor.clone(), &probe_config(1000, 3), None);

        let result = prober.check().await;

        assert!(result.is_up());
        assert_eq!(accessor.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure_and_retried() {
        let accessor = Arc::new(FakeAccessor::stalled("_system", Duration::from_secs(10)));
        let prober = NodeHealthProber::new(accessor.clone(), &probe_config(50, 2), None);

        let start = Instant::now();
        let result = prober.check().await;

        assert_eq!(result.status(), HealthStatus::Down);
        assert_eq!(
            result.cause(),
            Some(&ProbeError::Timeout(Duration::from_millis(50)))
        );
        assert_eq!(accessor.calls(), 2);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_repeated_checks_are_stable() {
        let accessor = Arc::new(FakeAccessor::healthy("_system"));
        let prober = NodeHealthProber::new(accessor, &probe_config(1000, 3), None);

        let first = prober.check().await;
        let second = prober.check().await;

        assert_eq!(first.status(), second.status());
        assert_eq!(first.details(), second.details());
    }

    #[tokio::test]
    async fn test_named_prober_reports_under_node_name() {
        let accessor = Arc::new(FakeAccessor::healthy("_system"));
        let prober =
            NodeHealthProber::new(accessor, &probe_config(1000, 1), None).named("DBServer0001");

        assert_eq!(HealthIndicator::name(&prober), "DBServer0001");
        assert_eq!(prober.result().await.name(), "DBServer0001");
    }

    #[tokio::test]
    async fn test_records_attempt_metrics() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        let accessor = Arc::new(FakeAccessor::failing_first("_system", 1));
        let prober = NodeHealthProber::new(accessor, &probe_config(1000, 3), Some(metrics.clone()));

        prober.check().await;

        let attempts = &metrics.probe_attempts_total;
        assert_eq!(attempts.with_label_values(&["arangodb", "failure"]).get(), 1);
        assert_eq!(attempts.with_label_values(&["arangodb", "success"]).get(), 1);
        assert_eq!(metrics.health_status.with_label_values(&["arangodb"]).get(), 1);
    }

    #[test]
    fn test_empty_descriptor_is_rejected() {
        let info = DatabaseInfo {
            name: "_system".into(),
            id: String::new(),
            path: None,
            is_system: true,
        };
        assert!(matches!(validate(info), Err(ProbeError::InvalidDescriptor(_))));
    }
}
