// Bucket metrics recorder: gate → resolve provider → fetch bytes and objects → record
// samples → upsert summary. Every failure is logged and returned as an outcome; a
// failed cycle leaves the previous summary in place for the next cycle to replace.

mod error;
mod in_flight;

pub use error::RecorderError;
pub use in_flight::{InFlight, InFlightGuard};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AppConfig, ProviderSettings, RecorderConfig};
use crate::gate;
use crate::metrics_repo::MetricsRepo;
use crate::models::{BucketSummary, Datapoint, MetricKind, Reduced, Trigger};
use crate::normalizer::{self, to_count};
use crate::source::{FetchError, FetchWindow, MetricQuery, MetricSource, MetricSourceFactory};

pub use crate::metrics_repo::SUMMARY_CATEGORY;

/// Result of one `Recorder::run`.
#[derive(Debug)]
pub enum RunOutcome {
    /// Gate rejected the trigger.
    Skipped,
    /// Another run for the same bucket is still in flight.
    Busy,
    Recorded(BucketSummary),
    Failed(RecorderError),
}

/// Per-call timeout and bounded retries around each fetch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub request_timeout: Duration,
    pub max_attempts: u32,
    /// Delay before attempt n+1 is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl From<&RecorderConfig> for RetryPolicy {
    fn from(c: &RecorderConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(c.request_timeout_secs),
            max_attempts: c.max_attempts.max(1),
            retry_backoff: Duration::from_millis(c.retry_backoff_ms),
        }
    }
}

pub struct Recorder {
    config: Arc<AppConfig>,
    factory: Arc<dyn MetricSourceFactory>,
    repo: Arc<MetricsRepo>,
    in_flight: InFlight,
    policy: RetryPolicy,
}

impl Recorder {
    pub fn new(
        config: Arc<AppConfig>,
        factory: Arc<dyn MetricSourceFactory>,
        repo: Arc<MetricsRepo>,
    ) -> Self {
        let policy = RetryPolicy::from(&config.recorder);
        Self {
            config,
            factory,
            repo,
            in_flight: InFlight::default(),
            policy,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn repo(&self) -> &Arc<MetricsRepo> {
        &self.repo
    }

    pub async fn run(&self, trigger: Trigger) -> RunOutcome {
        self.run_at(trigger, Utc::now()).await
    }

    /// As `run`, with the fetch window anchored at `now`.
    pub async fn run_at(&self, trigger: Trigger, now: DateTime<Utc>) -> RunOutcome {
        if !gate::should_run(&trigger) {
            return RunOutcome::Skipped;
        }

        let provider = self.config.recorder.provider;
        info!(provider = %provider, ?trigger, "bucket metrics run");

        let settings = match self.config.provider_settings(provider) {
            Ok(s) => s,
            Err(e) => {
                error!(provider = %provider, error = %e, "bucket metrics configuration missing");
                return RunOutcome::Failed(e);
            }
        };

        let slug = settings.slug();
        let Some(_guard) = self.in_flight.try_acquire(&slug) else {
            info!(slug = %slug, "bucket metrics run already in flight");
            return RunOutcome::Busy;
        };

        match self.record(&settings, &slug, now).await {
            Ok(summary) => {
                info!(
                    slug = %slug,
                    size_current = summary.size_current,
                    objects_current = summary.objects_current,
                    "bucket metrics recorded"
                );
                RunOutcome::Recorded(summary)
            }
            Err(e) => {
                error!(
                    provider = %settings.provider,
                    bucket = %settings.bucket,
                    namespace = %settings.namespace,
                    error = %e,
                    "bucket metrics collection failed"
                );
                RunOutcome::Failed(e)
            }
        }
    }

    #[instrument(skip(self, settings, now), fields(provider = %settings.provider))]
    async fn record(
        &self,
        settings: &ProviderSettings,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<BucketSummary, RecorderError> {
        let source = self
            .factory
            .connect(settings)
            .await
            .map_err(|source| RecorderError::Transport {
                operation: "connect",
                source,
            })?;
        let window = FetchWindow::ending_after(now);

        let bytes = self
            .collect(source.as_ref(), settings, slug, MetricKind::Bytes, window)
            .await?;
        let objects = self
            .collect(source.as_ref(), settings, slug, MetricKind::Objects, window)
            .await?;

        let summary = BucketSummary {
            name: settings.bucket.clone(),
            provider: settings.provider,
            storage_class: settings.storage_class.clone(),
            size_current: to_count(bytes.current),
            size_peak: to_count(bytes.peak),
            objects_current: to_count(objects.current),
            objects_peak: to_count(objects.peak),
        };
        let json = serde_json::to_string(&summary)?;
        self.repo
            .set_summary(SUMMARY_CATEGORY, slug, &json)
            .await
            .map_err(RecorderError::Store)?;
        Ok(summary)
    }

    /// Fetch, normalize, record samples, reduce.
    async fn collect(
        &self,
        source: &dyn MetricSource,
        settings: &ProviderSettings,
        slug: &str,
        kind: MetricKind,
        window: FetchWindow,
    ) -> Result<Reduced, RecorderError> {
        let query = MetricQuery::new(settings, kind, window);
        let raw = self
            .fetch_with_retry(source, &query)
            .await
            .map_err(|source| RecorderError::Transport {
                operation: kind.metric_name(),
                source,
            })?;
        let series = normalizer::normalize(raw);
        let written = self
            .repo
            .record_samples(kind, slug, series.points())
            .await
            .map_err(RecorderError::Store)?;
        debug!(slug, kind = kind.store_type(), written, "samples recorded");
        Ok(normalizer::reduce(&series))
    }

    async fn fetch_with_retry(
        &self,
        source: &dyn MetricSource,
        query: &MetricQuery,
    ) -> Result<Vec<Datapoint>, FetchError> {
        let RetryPolicy {
            request_timeout,
            max_attempts,
            retry_backoff,
        } = self.policy;
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(request_timeout, source.fetch_series(query))
                .await
                .unwrap_or(Err(FetchError::Timeout(request_timeout)));
            match result {
                Ok(points) => return Ok(points),
                Err(e) if attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        metric = %query.metric,
                        error = %e,
                        "metric fetch failed; retrying"
                    );
                    tokio::time::sleep(retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
