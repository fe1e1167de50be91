use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::analytics::ScanRecorder;
use crate::ratelimit::RateLimitService;
use crate::storage::Storage;

use super::handlers::{health_check, redirect_scan, RedirectState};

pub fn create_redirect_router(
    storage: Arc<dyn Storage>,
    rate_limiter: RateLimitService,
    base_url: String,
    geo_header: String,
) -> Router {
    let recorder = ScanRecorder::new(Arc::clone(&storage));
    let state = Arc::new(RedirectState {
        storage,
        rate_limiter,
        recorder,
        base_url,
        geo_header,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/go/{code}", get(redirect_scan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
