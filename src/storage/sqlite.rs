use crate::analytics::models::{CountryCount, DayCount};
use crate::analytics::range::DateRange;
use crate::models::{ScanEvent, ShortLink};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Cascade delete of scan events needs the foreign_keys pragma,
        // which SQLite applies per connection.
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn epoch_secs() -> Result<i64> {
        Ok(std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                destination_url TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                scan_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scan_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                scanned_at INTEGER NOT NULL,
                country TEXT,
                client_hash TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scan_events_link ON scan_events(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_scan_events_scanned_at ON scan_events(scanned_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_link(
        &self,
        short_code: &str,
        destination_url: &str,
        owner_id: &str,
    ) -> StorageResult<ShortLink> {
        let now = Self::epoch_secs().map_err(StorageError::Other)?;

        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at)
            VALUES (?, ?, ?, 1, 0, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(short_code)
        .bind(destination_url)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            FROM links
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(link)
    }

    async fn get_link(&self, id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            FROM links
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn resolve(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            FROM links
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn update_link(
        &self,
        id: i64,
        destination_url: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<ShortLink>> {
        let now = Self::epoch_secs()?;

        let result = sqlx::query(
            r#"
            UPDATE links
            SET destination_url = COALESCE(?, destination_url),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(destination_url)
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_link(id).await
    }

    async fn delete_link(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_links(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            FROM links
            WHERE owner_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn insert_scan_event(
        &self,
        link_id: i64,
        scanned_at: i64,
        country: Option<&str>,
        client_hash: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_events (link_id, scanned_at, country, client_hash)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(scanned_at)
        .bind(country)
        .bind(client_hash)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn increment_scan_count(&self, link_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE links
            SET scan_count = scan_count + 1
            WHERE id = ?
            "#,
        )
        .bind(link_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_scans(&self, link_id: i64, range: DateRange) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM scan_events
            WHERE link_id = ? AND scanned_at >= ? AND scanned_at < ?
            "#,
        )
        .bind(link_id)
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn scans_by_day(&self, link_id: i64, range: DateRange) -> Result<Vec<DayCount>> {
        let rows = sqlx::query_as::<_, DayCount>(
            r#"
            SELECT date(scanned_at / 1000, 'unixepoch') AS date, COUNT(*) AS count
            FROM scan_events
            WHERE link_id = ? AND scanned_at >= ? AND scanned_at < ?
            GROUP BY date
            ORDER BY date ASC
            "#,
        )
        .bind(link_id)
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn scans_by_country(
        &self,
        link_id: i64,
        range: DateRange,
    ) -> Result<Vec<CountryCount>> {
        let rows = sqlx::query_as::<_, CountryCount>(
            r#"
            SELECT country, COUNT(*) AS count
            FROM scan_events
            WHERE link_id = ? AND country IS NOT NULL AND scanned_at >= ? AND scanned_at < ?
            GROUP BY country
            ORDER BY count DESC
            "#,
        )
        .bind(link_id)
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn scan_events_page(
        &self,
        link_id: i64,
        range: DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanEvent>> {
        let events = sqlx::query_as::<_, ScanEvent>(
            r#"
            SELECT id, link_id, scanned_at, country, client_hash
            FROM scan_events
            WHERE link_id = ? AND scanned_at >= ? AND scanned_at < ?
            ORDER BY scanned_at ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(link_id)
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(events)
    }
}
