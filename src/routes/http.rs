// JSON handlers: version, bucket summaries, bucket series, manual refresh

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::metrics_repo::buckets;
use crate::models::{BucketSummary, MetricKind, Trigger};
use crate::recorder::{RecorderError, RunOutcome, SUMMARY_CATEGORY};

/// Default series period: 7 days.
const DEFAULT_SERIES_PERIOD: u32 = 10_080;

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

fn parse_summary(key: &str, value: &str) -> Option<BucketSummary> {
    serde_json::from_str(value)
        .inspect_err(|e| tracing::debug!(key, error = %e, "unreadable bucket summary, skipping"))
        .ok()
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/buckets: every stored bucket summary, ordered by slug.
pub(super) async fn list_buckets_handler(State(state): State<AppState>) -> Response {
    match state.repo.list_summaries(SUMMARY_CATEGORY).await {
        Ok(rows) => {
            let summaries: Vec<BucketSummary> = rows
                .iter()
                .filter_map(|(key, value)| parse_summary(key, value))
                .collect();
            Json(summaries).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// GET /api/buckets/{slug}
pub(super) async fn bucket_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    match state.repo.get_summary(SUMMARY_CATEGORY, &slug).await {
        Ok(Some(value)) => match parse_summary(&slug, &value) {
            Some(summary) => Json(summary).into_response(),
            None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "unreadable summary"),
        },
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("unknown bucket {slug}")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SeriesParams {
    kind: Option<MetricKind>,
    /// Minutes; one of the store periods.
    period: Option<u32>,
}

/// GET /api/buckets/{slug}/series?kind=bytes|objects&period=60|360|1440|10080
pub(super) async fn series_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<SeriesParams>,
) -> Response {
    let kind = params.kind.unwrap_or(MetricKind::Bytes);
    let period = params.period.unwrap_or(DEFAULT_SERIES_PERIOD);
    if !buckets::is_period(period) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("period must be one of {:?}", buckets::PERIODS_MINUTES),
        );
    }
    let since = buckets::period_floor(chrono::Utc::now().timestamp(), period);
    match state.repo.get_series(kind, &slug, period, since).await {
        Ok(points) => Json(points).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// POST /api/metrics/refresh: runs one manual cycle and reports its outcome.
pub(super) async fn refresh_handler(State(state): State<AppState>) -> Response {
    match state.recorder.run(Trigger::Manual).await {
        RunOutcome::Recorded(summary) => Json(summary).into_response(),
        RunOutcome::Busy => error_response(StatusCode::CONFLICT, "refresh already in progress"),
        RunOutcome::Failed(e @ RecorderError::ConfigurationMissing { .. }) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e)
        }
        RunOutcome::Failed(e) => error_response(StatusCode::BAD_GATEWAY, e),
        // Manual triggers always pass the gate.
        RunOutcome::Skipped => StatusCode::NO_CONTENT.into_response(),
    }
}
