//! Exporter self-metrics and registry.

use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry describing the exporter's own polling health.
///
/// Cloning shares the underlying collectors.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,

    polls_total: IntCounter,
    poll_failures_total: IntCounterVec,
    last_success_timestamp: IntGauge,
    poll_duration: Gauge,
    accounts: IntGauge,
}

impl ExporterMetrics {
    /// Creates a new registry with all exporter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let polls_total = IntCounter::new(
            "simplefin_exporter_polls_total",
            "Total number of poll cycles attempted",
        )?;
        let poll_failures_total = IntCounterVec::new(
            Opts::new(
                "simplefin_exporter_poll_failures_total",
                "Total number of failed poll cycles by failure kind",
            ),
            &["kind"],
        )?;
        let last_success_timestamp = IntGauge::new(
            "simplefin_exporter_last_success_timestamp_seconds",
            "Unix time of the last successful poll cycle",
        )?;
        let poll_duration = Gauge::new(
            "simplefin_exporter_poll_duration_seconds",
            "Duration of the most recent poll cycle",
        )?;
        let accounts = IntGauge::new(
            "simplefin_exporter_accounts",
            "Number of accounts in the current snapshot",
        )?;

        registry.register(Box::new(polls_total.clone()))?;
        registry.register(Box::new(poll_failures_total.clone()))?;
        registry.register(Box::new(last_success_timestamp.clone()))?;
        registry.register(Box::new(poll_duration.clone()))?;
        registry.register(Box::new(accounts.clone()))?;

        Ok(Self {
            registry,
            polls_total,
            poll_failures_total,
            last_success_timestamp,
            poll_duration,
            accounts,
        })
    }

    /// Records a cycle that published a snapshot.
    pub fn record_success(&self, accounts: usize, timestamp: i64, elapsed: Duration) {
        self.polls_total.inc();
        self.accounts.set(accounts as i64);
        self.last_success_timestamp.set(timestamp);
        self.poll_duration.set(elapsed.as_secs_f64());
    }

    /// Records a failed cycle under the given failure kind.
    pub fn record_failure(&self, kind: &str, elapsed: Duration) {
        self.polls_total.inc();
        self.poll_failures_total.with_label_values(&[kind]).inc();
        self.poll_duration.set(elapsed.as_secs_f64());
    }

    /// Total cycles attempted so far.
    pub fn polls_total(&self) -> u64 {
        self.polls_total.get()
    }

    /// Failed cycles so far for one failure kind.
    pub fn failures(&self, kind: &str) -> u64 {
        self.poll_failures_total.with_label_values(&[kind]).get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let metrics = ExporterMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_success() {
        let metrics = ExporterMetrics::new().unwrap();

        metrics.record_success(3, 1_700_000_000, Duration::from_millis(250));

        let output = metrics.encode().unwrap();
        assert!(output.contains("simplefin_exporter_polls_total 1"));
        assert!(output.contains("simplefin_exporter_accounts 3"));
        assert!(output.contains("simplefin_exporter_last_success_timestamp_seconds 1700000000"));
        assert!(output.contains("simplefin_exporter_poll_duration_seconds 0.25"));
    }

    #[test]
    fn test_record_failure_by_kind() {
        let metrics = ExporterMetrics::new().unwrap();

        metrics.record_failure("transport", Duration::from_secs(1));
        metrics.record_failure("transport", Duration::from_secs(1));
        metrics.record_failure("decode", Duration::from_secs(1));

        assert_eq!(metrics.polls_total(), 3);
        assert_eq!(metrics.failures("transport"), 2);
        assert_eq!(metrics.failures("decode"), 1);

        let output = metrics.encode().unwrap();
        assert!(output.contains(r#"simplefin_exporter_poll_failures_total{kind="transport"} 2"#));
    }

    #[test]
    fn test_clones_share_collectors() {
        let metrics = ExporterMetrics::new().unwrap();
        let clone = metrics.clone();

        clone.record_failure("decode", Duration::ZERO);
        assert_eq!(metrics.polls_total(), 1);
    }
}
