// CloudWatch GetMetricStatistics. Also serves OCI, which exposes a CloudWatch-compatible endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::config::retry::RetryConfig;
use aws_sdk_cloudwatch::config::timeout::TimeoutConfig;
use aws_sdk_cloudwatch::config::{Credentials, Region};
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use tracing::{debug, instrument};

use super::{FetchError, MetricQuery, MetricSource, MetricSourceFactory};
use crate::config::ProviderSettings;
use crate::models::Datapoint;

const CREDENTIALS_PROVIDER_NAME: &str = "s3pulse-config";

#[derive(Debug, Clone)]
pub struct CloudWatchSource {
    client: Client,
}

impl CloudWatchSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricSource for CloudWatchSource {
    #[instrument(skip(self, query), fields(namespace = %query.namespace, metric = %query.metric, bucket = %query.bucket))]
    async fn fetch_series(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, FetchError> {
        let output = self
            .client
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(query.metric.metric_name())
            .dimensions(
                Dimension::builder()
                    .name("BucketName")
                    .value(&query.bucket)
                    .build(),
            )
            .dimensions(
                Dimension::builder()
                    .name("StorageType")
                    .value(&query.storage_type)
                    .build(),
            )
            .start_time(DateTime::from_secs(query.window.start))
            .end_time(DateTime::from_secs(query.window.end))
            .period(query.window.period_secs)
            .statistics(Statistic::Average)
            .send()
            .await
            .map_err(|e| FetchError::Api(DisplayErrorContext(&e).to_string()))?;

        // Datapoints without a timestamp cannot be placed in the series.
        let points: Vec<Datapoint> = output
            .datapoints()
            .iter()
            .filter_map(|d| {
                Some(Datapoint {
                    timestamp: d.timestamp()?.secs(),
                    value: d.average(),
                })
            })
            .collect();
        debug!(datapoints = points.len(), "metric statistics fetched");
        Ok(points)
    }
}

/// Builds a CloudWatch client per cycle. SDK retries are off; the operation timeout is explicit.
#[derive(Debug, Clone)]
pub struct CloudWatchFactory {
    operation_timeout: Duration,
}

impl CloudWatchFactory {
    pub fn new(operation_timeout: Duration) -> Self {
        Self { operation_timeout }
    }
}

#[async_trait]
impl MetricSourceFactory for CloudWatchFactory {
    async fn connect(
        &self,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn MetricSource>, FetchError> {
        debug!(
            provider = %settings.provider,
            region = %settings.region,
            endpoint = settings.endpoint.as_deref().unwrap_or("default"),
            "building CloudWatch client"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));
        if let Some(ref creds) = settings.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &creds.key,
                &creds.secret,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_cloudwatch::config::Builder::from(&sdk_config)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout)
                    .build(),
            );
        if let Some(ref endpoint) = settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Arc::new(CloudWatchSource::new(Client::from_conf(
            builder.build(),
        ))))
    }
}
