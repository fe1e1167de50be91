use crate::models::ErrorResponse;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Authenticated owner id, inserted as a request extension by [`require_user`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

pub struct AuthService {
    tokens: HashMap<String, String>,
}

impl AuthService {
    /// Parses `token:user` pairs from a comma-separated list. Malformed
    /// entries are skipped with a warning instead of refusing to start.
    pub fn new(api_tokens: &str) -> Self {
        let mut tokens = HashMap::new();

        for entry in api_tokens.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            match entry.split_once(':') {
                Some((token, user)) if !token.is_empty() && !user.is_empty() => {
                    tokens.insert(token.to_string(), user.to_string());
                }
                _ => {
                    tracing::warn!("Skipping malformed API token entry");
                }
            }
        }

        Self { tokens }
    }

    /// Resolves the bearer token in the Authorization header to an owner id.
    pub fn identify(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))?;

        self.tokens.get(token).cloned()
    }
}

pub async fn require_user(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.identify(&headers) {
        Some(user) => {
            request.extensions_mut().insert(AuthUser(user));
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn parses_token_user_pairs() {
        let auth = AuthService::new("alpha-token:alice,beta-token:bob");

        let headers = headers_with_auth("Bearer alpha-token");
        assert_eq!(auth.identify(&headers), Some("alice".to_string()));

        let headers = headers_with_auth("Bearer beta-token");
        assert_eq!(auth.identify(&headers), Some("bob".to_string()));
    }

    #[test]
    fn skips_malformed_entries() {
        let auth = AuthService::new("no-colon-here, :nouser,notoken: ,good:carol");

        let headers = headers_with_auth("Bearer good");
        assert_eq!(auth.identify(&headers), Some("carol".to_string()));

        let headers = headers_with_auth("Bearer no-colon-here");
        assert_eq!(auth.identify(&headers), None);
    }

    #[test]
    fn rejects_unknown_and_malformed_credentials() {
        let auth = AuthService::new("alpha-token:alice");

        assert_eq!(auth.identify(&HeaderMap::new()), None);
        assert_eq!(auth.identify(&headers_with_auth("Bearer wrong")), None);
        assert_eq!(auth.identify(&headers_with_auth("alpha-token")), None);
        assert_eq!(auth.identify(&headers_with_auth("Basic alpha-token")), None);
    }

    #[test]
    fn empty_configuration_identifies_nobody() {
        let auth = AuthService::new("");

        assert_eq!(auth.identify(&headers_with_auth("Bearer anything")), None);
    }
}
