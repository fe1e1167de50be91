use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::analytics::{AnalyticsAggregator, CsvExporter};
use crate::auth::{require_user, AuthService};
use crate::storage::Storage;

use super::analytics::{export_link_analytics, link_analytics};
use super::handlers::{
    create_link, delete_link, get_link, health_check, list_links, update_link, AppState,
};

pub fn create_api_router(storage: Arc<dyn Storage>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState {
        aggregator: AnalyticsAggregator::new(Arc::clone(&storage)),
        exporter: CsvExporter::new(Arc::clone(&storage)),
        storage,
    });

    let protected_routes = Router::new()
        .route("/api/links", post(create_link))
        .route("/api/links", get(list_links))
        .route("/api/links/{id}", get(get_link))
        .route("/api/links/{id}", patch(update_link))
        .route("/api/links/{id}", delete(delete_link))
        .route("/api/links/{id}/analytics", get(link_analytics))
        .route("/api/links/{id}/analytics/export", get(export_link_analytics))
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            require_user(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
}
