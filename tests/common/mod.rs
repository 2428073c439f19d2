// Shared test helpers: scripted metric source, config builder, temp store

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use s3pulse::config::{AppConfig, ProviderSettings};
use s3pulse::metrics_repo::MetricsRepo;
use s3pulse::models::{Datapoint, MetricKind};
use s3pulse::source::{FetchError, MetricQuery, MetricSource, MetricSourceFactory};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_CONFIG: &str = r#"
[server]
port = 8081
host = "127.0.0.1"

[database]
path = "data/test.db"
max_pool_size = 2
"#;

pub fn config(extra: &str) -> Arc<AppConfig> {
    Arc::new(AppConfig::load_from_str(&format!("{BASE_CONFIG}\n{extra}")).unwrap())
}

pub const AWS_CONFIG: &str = r#"
[recorder]
provider = "aws"

[aws]
region = "us-east-1"
bucket = "my-bucket"
class = "StandardStorage"
"#;

/// Unix seconds for midnight UTC of 2024-03-{day}.
pub fn day(day: u32) -> i64 {
    Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap().timestamp()
}

pub async fn temp_repo() -> (TempDir, Arc<MetricsRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let repo = MetricsRepo::connect(path.to_str().unwrap(), 2, 30)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

/// Returns fixed datapoints per metric; can fail, fail a kind, or stall.
#[derive(Default)]
pub struct FakeSource {
    pub bytes: Mutex<Vec<Datapoint>>,
    pub objects: Mutex<Vec<Datapoint>>,
    /// Number of upcoming calls that fail.
    pub fail_next: AtomicU32,
    /// Every call for this kind fails.
    pub fail_kind: Mutex<Option<MetricKind>>,
    pub delay: Mutex<Option<Duration>>,
    pub queries: Mutex<Vec<MetricQuery>>,
}

impl FakeSource {
    pub fn with_series(bytes: Vec<Datapoint>, objects: Vec<Datapoint>) -> Arc<Self> {
        Arc::new(Self {
            bytes: Mutex::new(bytes),
            objects: Mutex::new(objects),
            ..Default::default()
        })
    }

    pub fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSource for FakeSource {
    async fn fetch_series(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, FetchError> {
        self.queries.lock().unwrap().push(query.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_kind.lock().unwrap() == Some(query.metric) {
            return Err(FetchError::Api(format!("{} unavailable", query.metric)));
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FetchError::Api("connection reset".into()));
        }
        let points = match query.metric {
            MetricKind::Bytes => self.bytes.lock().unwrap().clone(),
            MetricKind::Objects => self.objects.lock().unwrap().clone(),
        };
        Ok(points)
    }
}

pub struct FakeFactory {
    pub source: Arc<FakeSource>,
    pub connects: AtomicUsize,
    pub settings: Mutex<Vec<ProviderSettings>>,
}

impl FakeFactory {
    pub fn new(source: Arc<FakeSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            connects: AtomicUsize::new(0),
            settings: Mutex::new(Vec::new()),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSourceFactory for FakeFactory {
    async fn connect(
        &self,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn MetricSource>, FetchError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.settings.lock().unwrap().push(settings.clone());
        let source: Arc<dyn MetricSource> = self.source.clone();
        Ok(source)
    }
}

/// Bytes [1000, 1500] and objects [10, 12] on March 10 and 11.
pub fn two_day_source() -> Arc<FakeSource> {
    FakeSource::with_series(
        vec![Datapoint::new(day(10), 1000.0), Datapoint::new(day(11), 1500.0)],
        vec![Datapoint::new(day(10), 10.0), Datapoint::new(day(11), 12.0)],
    )
}
