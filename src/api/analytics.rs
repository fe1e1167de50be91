//! Analytics API handlers

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use super::handlers::{load_owned_link, AppState};
use crate::analytics::{parse_date_range, AnalyticsSummary, DateRange};
use crate::auth::AuthUser;
use crate::models::ErrorResponse;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<String>,

    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<String>,
}

fn parse_range_query(
    query: &RangeQuery,
) -> Result<DateRange, (StatusCode, Json<ErrorResponse>)> {
    parse_date_range(query.from.as_deref(), query.to.as_deref())
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))))
}

/// Aggregated scan analytics for one link
pub async fn link_analytics(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<AnalyticsSummary>, (StatusCode, Json<ErrorResponse>)> {
    let link = load_owned_link(&state.storage, &id, &owner_id).await?;
    let range = parse_range_query(&query)?;

    match state.aggregator.aggregate(link.id, range).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(link_id = link.id, error = %e, "Failed to aggregate analytics");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to retrieve analytics")),
            ))
        }
    }
}

/// Stream a link's scan events as a CSV download
pub async fn export_link_analytics(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let link = load_owned_link(&state.storage, &id, &owner_id).await?;
    let range = parse_range_query(&query)?;

    let rx = state.exporter.stream(link.id, range);
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<String, std::io::Error>));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"analytics-{}.csv\"", link.short_code),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(body)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Failed to build export: {}", e))),
            )
        })?;

    Ok(response)
}
