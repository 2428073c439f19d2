// HTTP routes: dashboard read side and the on-demand refresh trigger

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::metrics_repo::MetricsRepo;
use crate::recorder::Recorder;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) recorder: Arc<Recorder>,
    pub(crate) repo: Arc<MetricsRepo>,
}

pub fn app(recorder: Arc<Recorder>) -> Router {
    let state = AppState {
        repo: recorder.repo().clone(),
        recorder,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/buckets", get(http::list_buckets_handler)) // GET /api/buckets
        .route("/api/buckets/{slug}", get(http::bucket_handler)) // GET /api/buckets/{slug}
        .route("/api/buckets/{slug}/series", get(http::series_handler)) // GET /api/buckets/{slug}/series
        .route("/api/metrics/refresh", post(http::refresh_handler)) // POST /api/metrics/refresh
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
