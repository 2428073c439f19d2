// Series normalization: sort, dedupe by timestamp, reduce to current/peak.
// Pure; the recorder does all I/O and logging.

use std::collections::BTreeMap;

use crate::models::{Datapoint, MetricSeries, Reduced};

/// Sorts by timestamp; duplicate timestamps keep the last value seen.
/// Non-finite values become gaps.
pub fn normalize(datapoints: impl IntoIterator<Item = Datapoint>) -> MetricSeries {
    let mut by_ts: BTreeMap<i64, Option<f64>> = BTreeMap::new();
    for d in datapoints {
        by_ts.insert(d.timestamp, d.value.filter(|v| v.is_finite()));
    }
    MetricSeries {
        points: by_ts
            .into_iter()
            .map(|(timestamp, value)| Datapoint { timestamp, value })
            .collect(),
    }
}

/// `peak` is the largest non-gap value; `current` is the last non-gap, non-zero value.
pub fn reduce(series: &MetricSeries) -> Reduced {
    let values = series.points().iter().filter_map(|d| d.value);
    let peak = values.clone().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |m| m.max(v)))
    });
    let current = values.filter(|v| *v != 0.0).last();
    Reduced {
        current: current.unwrap_or(0.0),
        peak: peak.unwrap_or(0.0),
    }
}

/// Provider values are averages; summaries store whole bytes/objects.
pub fn to_count(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round() as u64
}
