// Metric source adapter: one GetMetricStatistics-shaped query per call.
// Sources never retry; the recorder owns timeouts and retry policy.

mod cloudwatch;

pub use cloudwatch::{CloudWatchFactory, CloudWatchSource};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, Utc};

use crate::config::ProviderSettings;
use crate::models::{Datapoint, MetricKind};

/// Days of history requested per query. CloudWatch keeps daily storage metrics this long by default.
pub const LOOKBACK_DAYS: u64 = 14;
/// One datapoint per day.
pub const PERIOD_SECS: i32 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("metrics API request failed: {0}")]
    Api(String),
    #[error("metrics API request timed out after {0:?}")]
    Timeout(Duration),
}

/// Query window in unix seconds: [start, end), sampled every `period_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: i64,
    pub end: i64,
    pub period_secs: i32,
}

impl FetchWindow {
    /// Midnight UTC `LOOKBACK_DAYS` ago up to the next midnight UTC.
    pub fn ending_after(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let midnight = |d: chrono::NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp();
        Self {
            start: midnight(today - Days::new(LOOKBACK_DAYS)),
            end: midnight(today + Days::new(1)),
            period_secs: PERIOD_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric: MetricKind,
    pub bucket: String,
    /// `StorageType` dimension value.
    pub storage_type: String,
    pub window: FetchWindow,
}

impl MetricQuery {
    pub fn new(settings: &ProviderSettings, metric: MetricKind, window: FetchWindow) -> Self {
        Self {
            namespace: settings.namespace.clone(),
            metric,
            bucket: settings.bucket.clone(),
            storage_type: metric.storage_type(&settings.storage_class).to_string(),
            window,
        }
    }
}

/// A provider metrics API.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Raw `Average` datapoints in arrival order.
    async fn fetch_series(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, FetchError>;
}

/// Builds a source per recording cycle from resolved settings.
#[async_trait]
pub trait MetricSourceFactory: Send + Sync {
    async fn connect(&self, settings: &ProviderSettings)
    -> Result<Arc<dyn MetricSource>, FetchError>;
}
