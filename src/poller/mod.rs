//! Fixed-interval polling loop.
//!
//! The poller runs one cycle immediately, then sleeps for the interval
//! after each cycle completes. Cycles never overlap, so the snapshot
//! cache only ever has one writer.

use crate::config::{ExporterConfig, FailurePolicy};
use crate::metrics::{ExporterMetrics, SnapshotCache};
use crate::upstream::{AccountSource, FetchError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Error that stopped the polling loop.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("poll cycle failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Drives fetch cycles and publishes their results.
pub struct Poller<S> {
    source: S,
    cache: SnapshotCache,
    metrics: ExporterMetrics,
    interval: Duration,
    policy: FailurePolicy,
}

impl<S: AccountSource> Poller<S> {
    /// Creates a poller.
    pub fn new(
        source: S,
        cache: SnapshotCache,
        metrics: ExporterMetrics,
        interval: Duration,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            source,
            cache,
            metrics,
            interval,
            policy,
        }
    }

    /// Creates a poller using the interval and failure policy from `config`.
    pub fn from_config(
        source: S,
        cache: SnapshotCache,
        metrics: ExporterMetrics,
        config: &ExporterConfig,
    ) -> Self {
        Self::new(source, cache, metrics, config.interval(), config.failure_policy)
    }

    /// Runs a single cycle, publishing the result on success.
    ///
    /// Returns the number of accounts published. On failure the cache is
    /// left as it was.
    pub async fn run_once(&self) -> Result<usize, FetchError> {
        tracing::debug!("Running poll cycle");
        let started = Instant::now();

        match self.source.fetch().await {
            Ok(metrics) => {
                let accounts = metrics.len().saturating_sub(1);
                self.cache.publish(metrics).await;
                self.metrics.record_success(
                    accounts,
                    chrono::Utc::now().timestamp(),
                    started.elapsed(),
                );

                tracing::info!(accounts, "Published account snapshot");
                Ok(accounts)
            }
            Err(e) => {
                self.metrics.record_failure(e.kind(), started.elapsed());
                Err(e)
            }
        }
    }

    /// Polls until the process stops.
    ///
    /// Under [`FailurePolicy::Skip`] this never returns. Under
    /// [`FailurePolicy::Exit`] it returns the first cycle error.
    pub async fn run(&self) -> Result<(), PollError> {
        loop {
            if let Err(e) = self.run_once().await {
                match self.policy {
                    FailurePolicy::Skip => {
                        tracing::warn!(
                            kind = e.kind(),
                            error = %e,
                            "Poll cycle failed, keeping previous snapshot"
                        );
                    }
                    FailurePolicy::Exit => {
                        tracing::error!(kind = e.kind(), error = %e, "Poll cycle failed");
                        return Err(e.into());
                    }
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

impl<S: AccountSource + 'static> Poller<S> {
    /// Launches the polling loop on a background task.
    pub fn spawn(self) -> JoinHandle<Result<(), PollError>> {
        tokio::spawn(async move { self.run().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Metric, MetricSet};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Replays canned results, then signals and hangs.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<MetricSet, FetchError>>>,
        exhausted: Arc<Notify>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<MetricSet, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                exhausted: Arc::new(Notify::new()),
            }
        }
    }

    impl AccountSource for ScriptedSource {
        async fn fetch(&self) -> Result<MetricSet, FetchError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => {
                    self.exhausted.notify_one();
                    std::future::pending().await
                }
            }
        }
    }

    fn snapshot(tag: &str, accounts: usize) -> MetricSet {
        let mut set = vec![Metric::gauge("last_updated", tag)];
        for i in 0..accounts {
            set.push(
                Metric::gauge("simplefin_balance", format!("{}.00", i))
                    .with_tag("account", format!("acct-{}", i))
                    .with_tag("id", tag),
            );
        }
        set
    }

    fn unavailable() -> FetchError {
        FetchError::UpstreamStatus {
            status: 503,
            body: "service unavailable".into(),
        }
    }

    fn poller(
        script: Vec<Result<MetricSet, FetchError>>,
        policy: FailurePolicy,
    ) -> Poller<ScriptedSource> {
        Poller::new(
            ScriptedSource::new(script),
            SnapshotCache::new(),
            ExporterMetrics::new().unwrap(),
            Duration::from_secs(60),
            policy,
        )
    }

    #[tokio::test]
    async fn test_run_once_publishes() {
        let poller = poller(vec![Ok(snapshot("1", 2))], FailurePolicy::Skip);

        assert_eq!(poller.run_once().await.unwrap(), 2);

        let latest = poller.cache.latest().await.unwrap();
        assert_eq!(*latest, snapshot("1", 2));
        assert_eq!(poller.metrics.polls_total(), 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_snapshot() {
        let poller = poller(
            vec![
                Ok(snapshot("1", 2)),
                Err(FetchError::UpstreamApplication(vec!["auth failed".into()])),
            ],
            FailurePolicy::Skip,
        );

        poller.run_once().await.unwrap();
        let err = poller.run_once().await.unwrap_err();
        assert_eq!(err.kind(), "upstream_application");

        let latest = poller.cache.latest().await.unwrap();
        assert_eq!(*latest, snapshot("1", 2));
        assert_eq!(poller.metrics.polls_total(), 2);
        assert_eq!(poller.metrics.failures("upstream_application"), 1);
    }

    #[tokio::test]
    async fn test_failure_before_first_success_leaves_cache_empty() {
        let poller = poller(vec![Err(unavailable())], FailurePolicy::Skip);

        assert!(poller.run_once().await.is_err());
        assert!(poller.cache.latest().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_retries_next_tick() {
        let poller = poller(
            vec![Ok(snapshot("1", 1)), Err(unavailable()), Ok(snapshot("3", 2))],
            FailurePolicy::Skip,
        );
        let exhausted = Arc::clone(&poller.source.exhausted);
        let cache = poller.cache.clone();
        let metrics = poller.metrics.clone();

        let started = tokio::time::Instant::now();
        let handle = poller.spawn();
        exhausted.notified().await;

        // Three completed cycles, each followed by a full interval.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(180) && elapsed < Duration::from_secs(181));
        assert_eq!(*cache.latest().await.unwrap(), snapshot("3", 2));
        assert_eq!(metrics.polls_total(), 3);
        assert_eq!(metrics.failures("upstream_status"), 1);
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_policy_stops_on_first_failure() {
        let poller = poller(
            vec![Ok(snapshot("1", 1)), Err(unavailable()), Ok(snapshot("3", 2))],
            FailurePolicy::Exit,
        );
        let cache = poller.cache.clone();

        let result = poller.spawn().await.unwrap();

        assert!(matches!(
            result,
            Err(PollError::Fetch(FetchError::UpstreamStatus { status: 503, .. }))
        ));
        assert_eq!(*cache.latest().await.unwrap(), snapshot("1", 1));
    }
}
