// Time-series models: raw datapoints, normalized series, metric kinds

use serde::{Deserialize, Serialize};

/// One provider sample. `value` is `None` for a data-collection gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Unix seconds.
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl Datapoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    pub fn gap(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}

/// Datapoints sorted ascending by timestamp, at most one per timestamp.
/// Only built by `normalizer::normalize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSeries {
    pub(crate) points: Vec<Datapoint>,
}

impl MetricSeries {
    pub fn points(&self) -> &[Datapoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Datapoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Scalars derived from one series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reduced {
    /// Last non-gap, non-zero value.
    pub current: f64,
    /// Largest non-gap value.
    pub peak: f64,
}

/// The two bucket metrics; serializes to lowercase JSON ("bytes", "objects").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Bytes,
    Objects,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::Bytes, MetricKind::Objects];

    /// Upstream metric name.
    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricKind::Bytes => "BucketSizeBytes",
            MetricKind::Objects => "NumberOfObjects",
        }
    }

    /// Sample type in the metrics store.
    pub fn store_type(&self) -> &'static str {
        match self {
            MetricKind::Bytes => "s3_bytes",
            MetricKind::Objects => "s3_objects",
        }
    }

    /// `StorageType` dimension. Object counts are only published for all storage types.
    pub fn storage_type<'a>(&self, storage_class: &'a str) -> &'a str {
        match self {
            MetricKind::Bytes => storage_class,
            MetricKind::Objects => "AllStorageTypes",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// One stored bucket value, as served to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Bucket start, unix seconds.
    pub timestamp: i64,
    pub value: f64,
}
