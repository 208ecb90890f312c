//! Shared slot holding the latest published metric set.

use super::MetricSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the most recent successful [`MetricSet`].
///
/// Cloning the cache clones the handle, not the contents. The poller
/// publishes whole sets; readers get an `Arc` to an immutable set, so a
/// read can never observe metrics from two different cycles.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<RwLock<Option<Arc<MetricSet>>>>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot.
    pub async fn publish(&self, metrics: MetricSet) {
        let snapshot = Arc::new(metrics);
        *self.inner.write().await = Some(snapshot);
    }

    /// Returns the current snapshot, or `None` before the first publish.
    pub async fn latest(&self) -> Option<Arc<MetricSet>> {
        self.inner.read().await.clone()
    }
}
