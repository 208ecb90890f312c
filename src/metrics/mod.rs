//! Metric model, snapshot publishing and Prometheus exposition.
//!
//! # Metrics Exposed
//!
//! ## Account Metrics
//! - `last_updated` - Unix time at which the snapshot was produced
//! - `simplefin_balance{account,id}` - Account balance, exactly as reported upstream
//!
//! ## Exporter Metrics
//! - `simplefin_exporter_polls_total` - Poll cycles attempted
//! - `simplefin_exporter_poll_failures_total{kind}` - Failed cycles by kind
//! - `simplefin_exporter_last_success_timestamp_seconds` - Time of the last published snapshot
//! - `simplefin_exporter_poll_duration_seconds` - Duration of the latest cycle
//! - `simplefin_exporter_accounts` - Accounts in the current snapshot
//!
//! # Example
//!
//! ```no_run
//! use simplefin_exporter::metrics::{exposition, Metric, SnapshotCache};
//!
//! # async fn demo() {
//! let cache = SnapshotCache::new();
//! cache
//!     .publish(vec![
//!         Metric::gauge("last_updated", "1700000000"),
//!         Metric::gauge("simplefin_balance", "123.45")
//!             .with_tag("account", "Checking")
//!             .with_tag("id", "a1"),
//!     ])
//!     .await;
//!
//! if let Some(snapshot) = cache.latest().await {
//!     print!("{}", exposition::render(&snapshot));
//! }
//! # }
//! ```

mod cache;
mod collector;
pub mod exposition;
mod metric;
mod server;

pub use cache::SnapshotCache;
pub use collector::{ExporterMetrics, MetricsError};
pub use metric::{Metric, MetricSet, MetricType, LAST_UPDATED, SIMPLEFIN_BALANCE};
pub use server::{MetricsServer, MetricsState, ServerError};
