//! Metric records produced from upstream account data.

use std::collections::BTreeMap;
use std::fmt;

/// Series name of the freshness gauge that leads every metric set.
pub const LAST_UPDATED: &str = "last_updated";

/// Series name of the per-account balance gauge.
pub const SIMPLEFIN_BALANCE: &str = "simplefin_balance";

/// Kind of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// A point-in-time value.
    Gauge,
}

impl MetricType {
    /// Returns the exposition name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single sample.
///
/// The value is kept as the string it arrived as. Balances are decimal
/// strings from upstream and must reach scrapers without any rounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    /// Series name.
    pub name: String,
    /// Metric kind.
    pub metric_type: MetricType,
    /// Labels, sorted by key.
    pub tags: BTreeMap<String, String>,
    /// String-encoded value.
    pub value: String,
}

impl Metric {
    /// Creates an untagged gauge.
    pub fn gauge(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            tags: BTreeMap::new(),
            value: value.into(),
        }
    }

    /// Adds a tag, replacing any previous value for the key.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Ordered metrics produced by one poll cycle.
pub type MetricSet = Vec<Metric>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_has_no_tags() {
        let metric = Metric::gauge(LAST_UPDATED, "1700000000");
        assert_eq!(metric.metric_type, MetricType::Gauge);
        assert!(metric.tags.is_empty());
        assert_eq!(metric.value, "1700000000");
    }

    #[test]
    fn test_tags_are_unique_and_sorted() {
        let metric = Metric::gauge(SIMPLEFIN_BALANCE, "1.00")
            .with_tag("id", "a1")
            .with_tag("account", "Old")
            .with_tag("account", "Checking");

        let keys: Vec<_> = metric.tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["account", "id"]);
        assert_eq!(metric.tags["account"], "Checking");
    }

    #[test]
    fn test_type_display() {
        assert_eq!(MetricType::Gauge.to_string(), "gauge");
    }
}
