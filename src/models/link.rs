use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub destination_url: String,
    pub owner_id: String,
    pub is_active: bool,
    /// Denormalized display counter, incremented per recorded scan.
    /// The scan_events table stays authoritative.
    pub scan_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One recorded scan. Append-only; `scanned_at` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanEvent {
    pub id: i64,
    pub link_id: i64,
    pub scanned_at: i64,
    pub country: Option<String>,
    pub client_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    pub custom_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLinkRequest {
    pub url: Option<String>,
    pub is_active: Option<bool>,
}
