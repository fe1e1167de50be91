use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::analytics::{AnalyticsAggregator, CsvExporter};
use crate::auth::AuthUser;
use crate::models::{
    CreateLinkRequest, ErrorResponse, ShortLink, SuccessResponse, UpdateLinkRequest,
};
use crate::storage::{Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub aggregator: AnalyticsAggregator,
    pub exporter: CsvExporter,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

const SHORT_CODE_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SHORT_CODE_LENGTH: usize = 8;
const MAX_GENERATE_ATTEMPTS: usize = 5;

/// Generate a random short code
pub fn generate_short_code() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..SHORT_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..SHORT_CODE_CHARSET.len());
            SHORT_CODE_CHARSET[idx] as char
        })
        .collect()
}

fn is_valid_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));

    match rest {
        Some(remainder) => {
            !remainder.is_empty() && !url.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}

/// Shared id-to-owned-link ladder for the single-link endpoints: 400 on a
/// non-numeric id, 404 on an unknown one, 403 when the caller is not the
/// owner.
pub(crate) async fn load_owned_link(
    storage: &Arc<dyn Storage>,
    id: &str,
    owner_id: &str,
) -> Result<ShortLink, (StatusCode, Json<ErrorResponse>)> {
    let id: i64 = id.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid link ID")),
        )
    })?;

    let link = storage.get_link(id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to load link: {}", e))),
        )
    })?;

    let link = link.ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Link not found")),
    ))?;

    if link.owner_id != owner_id {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Forbidden")),
        ));
    }

    Ok(link)
}

/// Create a new short link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<ShortLink>), (StatusCode, Json<ErrorResponse>)> {
    if !is_valid_url(&payload.url) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "Invalid URL. Must be a valid http or https URL.",
            )),
        ));
    }

    if let Some(custom) = payload.custom_code {
        if custom.is_empty() || custom.len() > 20 {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Custom code must be 1-20 characters")),
            ));
        }

        return match state
            .storage
            .create_link(&custom, &payload.url, &owner_id)
            .await
        {
            Ok(link) => Ok((StatusCode::CREATED, Json(link))),
            Err(StorageError::Conflict) => Err((
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("Short code already exists")),
            )),
            Err(StorageError::Other(e)) => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Failed to create link: {}", e))),
            )),
        };
    }

    // Collisions just mean another roll of the dice; anything else aborts.
    for _ in 0..MAX_GENERATE_ATTEMPTS {
        let code = generate_short_code();

        match state
            .storage
            .create_link(&code, &payload.url, &owner_id)
            .await
        {
            Ok(link) => return Ok((StatusCode::CREATED, Json(link))),
            Err(StorageError::Conflict) => continue,
            Err(StorageError::Other(e)) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(format!("Failed to create link: {}", e))),
                ))
            }
        }
    }

    Err((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "Failed to generate unique short code after multiple attempts",
        )),
    ))
}

/// Get a short link by id
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ShortLink>, (StatusCode, Json<ErrorResponse>)> {
    let link = load_owned_link(&state.storage, &id, &owner_id).await?;
    Ok(Json(link))
}

/// Update a short link's destination and/or active flag
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<ShortLink>, (StatusCode, Json<ErrorResponse>)> {
    if let Some(url) = &payload.url {
        if !is_valid_url(url) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "Invalid URL. Must be a valid http or https URL.",
                )),
            ));
        }
    }

    let link = load_owned_link(&state.storage, &id, &owner_id).await?;

    match state
        .storage
        .update_link(link.id, payload.url.as_deref(), payload.is_active)
        .await
    {
        Ok(Some(updated)) => Ok(Json(updated)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Link not found")),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to update link: {}", e))),
        )),
    }
}

/// Delete a short link and, via cascade, its scan events
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let link = load_owned_link(&state.storage, &id, &owner_id).await?;

    match state.storage.delete_link(link.id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to delete link: {}", e))),
        )),
    }
}

/// List the caller's short links
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(owner_id)): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ShortLink>>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .storage
        .list_links(&owner_id, query.limit, query.offset)
        .await
    {
        Ok(links) => Ok(Json(links)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to list links: {}", e))),
        )),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_the_charset() {
        for _ in 0..20 {
            let code = generate_short_code();
            assert_eq!(code.len(), SHORT_CODE_LENGTH);
            assert!(code.bytes().all(|b| SHORT_CODE_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn url_validation_requires_http_scheme() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/path?q=1"));

        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://exa mple.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }
}
