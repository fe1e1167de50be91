use crate::analytics::models::{CountryCount, DayCount};
use crate::analytics::range::DateRange;
use crate::models::{ScanEvent, ShortLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Create a new short link with a caller-provided code
    async fn create_link(
        &self,
        short_code: &str,
        destination_url: &str,
        owner_id: &str,
    ) -> StorageResult<ShortLink>;

    /// Get a link by database id
    async fn get_link(&self, id: i64) -> Result<Option<ShortLink>>;

    /// Point lookup by unique short code; the redirect hot path.
    /// Inactive links are returned as-is, the caller decides routing.
    async fn resolve(&self, short_code: &str) -> Result<Option<ShortLink>>;

    /// Update destination and/or active flag; returns the updated record,
    /// or None when the id does not exist
    async fn update_link(
        &self,
        id: i64,
        destination_url: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<ShortLink>>;

    /// Delete a link; scan events go with it (cascade)
    async fn delete_link(&self, id: i64) -> Result<bool>;

    /// List an owner's links, newest first
    async fn list_links(&self, owner_id: &str, limit: i64, offset: i64)
        -> Result<Vec<ShortLink>>;

    /// Append one scan event. `scanned_at` is epoch milliseconds.
    async fn insert_scan_event(
        &self,
        link_id: i64,
        scanned_at: i64,
        country: Option<&str>,
        client_hash: Option<&str>,
    ) -> Result<()>;

    /// Atomic `scan_count = scan_count + 1`; no read-modify-write
    async fn increment_scan_count(&self, link_id: i64) -> Result<()>;

    /// Count of events matching the range filter
    async fn count_scans(&self, link_id: i64, range: DateRange) -> Result<i64>;

    /// Events per UTC calendar date, ascending by date
    async fn scans_by_day(&self, link_id: i64, range: DateRange) -> Result<Vec<DayCount>>;

    /// Events per non-null country, descending by count
    async fn scans_by_country(&self, link_id: i64, range: DateRange)
        -> Result<Vec<CountryCount>>;

    /// One export page, ordered by `scanned_at` ascending
    async fn scan_events_page(
        &self,
        link_id: i64,
        range: DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanEvent>>;
}
