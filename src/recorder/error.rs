// Recorder error taxonomy: configuration, transport, serialization, store

use crate::models::Provider;
use crate::source::FetchError;

/// Why a recording cycle ended without a summary. Never escapes `Recorder::run`.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("{provider} configuration missing: {field}")]
    ConfigurationMissing {
        provider: Provider,
        field: &'static str,
    },
    /// `operation` is the metric name, or "connect" for client setup.
    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        source: FetchError,
    },
    #[error("summary serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("metrics store write failed: {0:#}")]
    Store(anyhow::Error),
}
