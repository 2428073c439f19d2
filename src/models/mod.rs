// Domain models: series, bucket summary, triggers

mod bucket;
mod series;
mod trigger;

pub use bucket::{BucketSummary, Provider, slug};
pub use series::{Datapoint, MetricKind, MetricSeries, Reduced, SeriesPoint};
pub use trigger::Trigger;
