use crate::analytics::models::{CountryCount, DayCount};
use crate::analytics::range::DateRange;
use crate::models::{ScanEvent, ShortLink};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
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
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL UNIQUE,
                destination_url TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                scan_count BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
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
                id BIGSERIAL PRIMARY KEY,
                link_id BIGINT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                scanned_at BIGINT NOT NULL,
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

        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO links (short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, 0, $4, $5)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            "#,
        )
        .bind(short_code)
        .bind(destination_url)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        link.ok_or(StorageError::Conflict)
    }

    async fn get_link(&self, id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            FROM links
            WHERE id = $1
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
            WHERE short_code = $1
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

        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            UPDATE links
            SET destination_url = COALESCE($1, destination_url),
                is_active = COALESCE($2, is_active),
                updated_at = $3
            WHERE id = $4
            RETURNING id, short_code, destination_url, owner_id, is_active, scan_count, created_at, updated_at
            "#,
        )
        .bind(destination_url)
        .bind(is_active)
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn delete_link(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
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
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
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
            VALUES ($1, $2, $3, $4)
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
            WHERE id = $1
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
            WHERE link_id = $1 AND scanned_at >= $2 AND scanned_at < $3
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
            SELECT to_char(to_timestamp(scanned_at / 1000.0) AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
                   COUNT(*) AS count
            FROM scan_events
            WHERE link_id = $1 AND scanned_at >= $2 AND scanned_at < $3
            GROUP BY 1
            ORDER BY 1 ASC
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
            WHERE link_id = $1 AND country IS NOT NULL AND scanned_at >= $2 AND scanned_at < $3
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
            WHERE link_id = $1 AND scanned_at >= $2 AND scanned_at < $3
            ORDER BY scanned_at ASC
            LIMIT $4 OFFSET $5
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
