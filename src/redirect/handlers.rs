use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::analytics::{hash_client_id, is_bot, normalize_country, ScanRecorder};
use crate::models::ErrorResponse;
use crate::ratelimit::{RateLimitDecision, RateLimitService};
use crate::storage::Storage;

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub rate_limiter: RateLimitService,
    pub recorder: ScanRecorder,
    pub base_url: String,
    pub geo_header: String,
}

/// Resolve a short code and redirect the scanner.
///
/// Order matters: the rate limit decision comes first and its headers ride
/// on every outcome; the response is fully determined by the limiter and
/// the resolver, never by scan recording.
pub async fn redirect_scan(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identifier = client_identifier(&headers);
    let decision = state.rate_limiter.admit(&identifier).await;
    let mut response_headers = rate_limit_headers(&decision);

    if !decision.admitted {
        let retry_after = retry_after_secs(decision.reset_at_ms, Utc::now().timestamp_millis());
        response_headers.insert("retry-after", retry_after.to_string().parse().unwrap());
        return (
            StatusCode::TOO_MANY_REQUESTS,
            response_headers,
            Json(ErrorResponse::new("Too many requests")),
        )
            .into_response();
    }

    let link = match state.storage.resolve(&code).await {
        Ok(link) => link,
        Err(err) => {
            tracing::warn!(short_code = %code, error = %err, "Failed to resolve short code");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                response_headers,
                Json(ErrorResponse::new("Internal server error")),
            )
                .into_response();
        }
    };

    let link = match link {
        Some(link) => link,
        None => {
            let target = format!("{}/go/{}/not-found", state.base_url, code);
            return found_redirect(&target, response_headers);
        }
    };

    if !link.is_active {
        let target = format!("{}/go/{}/gone", state.base_url, code);
        return found_redirect(&target, response_headers);
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !is_bot(user_agent) {
        let country = headers
            .get(state.geo_header.as_str())
            .and_then(|h| h.to_str().ok())
            .and_then(normalize_country);

        state
            .recorder
            .record(link.id, country, Some(hash_client_id(&identifier)));
    }

    response_headers.insert(header::CACHE_CONTROL, "no-store, max-age=0".parse().unwrap());
    found_redirect(&link.destination_url, response_headers)
}

fn found_redirect(target: &str, mut response_headers: HeaderMap) -> Response {
    // 302 specifically; axum's Redirect constructors only produce 303/307/308.
    match HeaderValue::from_str(target) {
        Ok(location) => {
            response_headers.insert(header::LOCATION, location);
            (StatusCode::FOUND, response_headers).into_response()
        }
        Err(err) => {
            tracing::warn!(target = %target, error = %err, "Redirect target is not a valid header value");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                response_headers,
                Json(ErrorResponse::new("Internal server error")),
            )
                .into_response()
        }
    }
}

fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", decision.limit.to_string().parse().unwrap());
    headers.insert(
        "x-ratelimit-remaining",
        decision.remaining.to_string().parse().unwrap(),
    );
    headers.insert(
        "x-ratelimit-reset",
        decision.reset_at_ms.to_string().parse().unwrap(),
    );
    headers
}

/// First hop of x-forwarded-for, then x-real-ip, then "unknown".
fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}

fn retry_after_secs(reset_at_ms: i64, now_ms: i64) -> i64 {
    ((reset_at_ms - now_ms).max(0) + 999) / 1000
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_identifier_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[test]
    fn client_identifier_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        assert_eq!(client_identifier(&headers), "198.51.100.2");
    }

    #[test]
    fn client_identifier_skips_empty_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", ", 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        assert_eq!(client_identifier(&headers), "198.51.100.2");
    }

    #[test]
    fn client_identifier_defaults_to_unknown() {
        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn retry_after_rounds_up_and_clamps() {
        assert_eq!(retry_after_secs(10_000, 9_500), 1);
        assert_eq!(retry_after_secs(10_000, 8_000), 2);
        assert_eq!(retry_after_secs(10_000, 10_000), 0);
        assert_eq!(retry_after_secs(10_000, 12_000), 0);
    }
}
