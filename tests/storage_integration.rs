//! Integration tests for storage backends
//!
//! Most tests run against in-memory SQLite. The PostgreSQL lifecycle
//! test needs a real server and is skipped unless DATABASE_URL is set.
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND
//! environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested

use chrono::NaiveDate;
use qrly::analytics::{parse_date_range, DateRange};
use qrly::storage::{SqliteStorage, Storage, StorageError};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<dyn Storage> {
    // A single connection keeps every query on the same in-memory database.
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn ts_ms(date: &str, hour: u32, min: u32) -> i64 {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

#[tokio::test]
async fn test_concurrent_link_creation_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;

    let mut handles = vec![];

    // Try to create the same short code concurrently
    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        let handle = tokio::spawn(async move {
            storage_clone
                .create_link("same-code", "https://example.com", &format!("user{}", i))
                .await
        });
        handles.push(handle);
    }

    // Exactly one should succeed, others should get Conflict error
    let mut success_count = 0;
    let mut conflict_count = 0;

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one creation should succeed");
    assert_eq!(conflict_count, 9, "All others should get conflict");
}

#[tokio::test]
async fn test_create_and_resolve_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;

    let created = storage
        .create_link("promo", "https://example.com/sale", "alice")
        .await
        .unwrap();
    assert_eq!(created.short_code, "promo");
    assert_eq!(created.destination_url, "https://example.com/sale");
    assert_eq!(created.owner_id, "alice");
    assert!(created.is_active);
    assert_eq!(created.scan_count, 0);

    let resolved = storage.resolve("promo").await.unwrap().unwrap();
    assert_eq!(resolved.id, created.id);

    assert!(storage.resolve("missing").await.unwrap().is_none());

    // Deactivated links still resolve; routing is the caller's call.
    storage
        .update_link(created.id, None, Some(false))
        .await
        .unwrap();
    let resolved = storage.resolve("promo").await.unwrap().unwrap();
    assert!(!resolved.is_active);
}

#[tokio::test]
async fn test_update_link_partial_fields_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let link = storage
        .create_link("patchy", "https://example.com/v1", "alice")
        .await
        .unwrap();

    // Destination only
    let updated = storage
        .update_link(link.id, Some("https://example.com/v2"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.destination_url, "https://example.com/v2");
    assert!(updated.is_active);

    // Active flag only
    let updated = storage
        .update_link(link.id, None, Some(false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.destination_url, "https://example.com/v2");
    assert!(!updated.is_active);

    // Both at once
    let updated = storage
        .update_link(link.id, Some("https://example.com/v3"), Some(true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.destination_url, "https://example.com/v3");
    assert!(updated.is_active);

    // Unknown id
    assert!(storage
        .update_link(9999, Some("https://example.com"), None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_delete_link_cascades_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let link = storage
        .create_link("doomed", "https://example.com", "alice")
        .await
        .unwrap();
    storage
        .insert_scan_event(link.id, ts_ms("2024-01-01", 8, 0), Some("US"), Some("h1"))
        .await
        .unwrap();
    storage
        .insert_scan_event(link.id, ts_ms("2024-01-02", 9, 0), None, Some("h2"))
        .await
        .unwrap();
    assert_eq!(
        storage.count_scans(link.id, DateRange::default()).await.unwrap(),
        2
    );

    assert!(storage.delete_link(link.id).await.unwrap());
    assert!(storage.get_link(link.id).await.unwrap().is_none());
    assert_eq!(
        storage.count_scans(link.id, DateRange::default()).await.unwrap(),
        0
    );
    let events = storage
        .scan_events_page(link.id, DateRange::default(), 10, 0)
        .await
        .unwrap();
    assert!(events.is_empty());

    // Second delete is a no-op
    assert!(!storage.delete_link(link.id).await.unwrap());
}

#[tokio::test]
async fn test_increment_scan_count_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let link = storage
        .create_link("counted", "https://example.com", "alice")
        .await
        .unwrap();

    for _ in 0..3 {
        storage.increment_scan_count(link.id).await.unwrap();
    }

    let reloaded = storage.get_link(link.id).await.unwrap().unwrap();
    assert_eq!(reloaded.scan_count, 3);
}

#[tokio::test]
async fn test_list_links_scoping_and_paging_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    for code in ["first", "second", "third"] {
        storage
            .create_link(code, "https://example.com", "alice")
            .await
            .unwrap();
    }
    storage
        .create_link("other", "https://example.com", "bob")
        .await
        .unwrap();

    // Newest first
    let page = storage.list_links("alice", 2, 0).await.unwrap();
    let codes: Vec<&str> = page.iter().map(|l| l.short_code.as_str()).collect();
    assert_eq!(codes, ["third", "second"]);

    let page = storage.list_links("alice", 2, 2).await.unwrap();
    let codes: Vec<&str> = page.iter().map(|l| l.short_code.as_str()).collect();
    assert_eq!(codes, ["first"]);

    let page = storage.list_links("bob", 10, 0).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].short_code, "other");
}

#[tokio::test]
async fn test_scan_events_page_ordering_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let link = storage
        .create_link("paged", "https://example.com", "alice")
        .await
        .unwrap();

    // Inserted out of order to prove the page ordering is by time
    for (day, country) in [
        ("2024-01-03", "FR"),
        ("2024-01-01", "US"),
        ("2024-01-05", "JP"),
        ("2024-01-02", "DE"),
        ("2024-01-04", "GB"),
    ] {
        storage
            .insert_scan_event(link.id, ts_ms(day, 12, 0), Some(country), Some("h"))
            .await
            .unwrap();
    }

    let mut seen = vec![];
    for offset in [0, 2, 4] {
        let page = storage
            .scan_events_page(link.id, DateRange::default(), 2, offset)
            .await
            .unwrap();
        seen.extend(page.into_iter().map(|e| e.country.unwrap()));
    }
    assert_eq!(seen, ["US", "DE", "FR", "JP", "GB"]);
}

#[tokio::test]
async fn test_analytics_rollups_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let link = storage
        .create_link("rolled", "https://example.com", "alice")
        .await
        .unwrap();
    let noise = storage
        .create_link("noise", "https://example.com", "alice")
        .await
        .unwrap();

    for (day, hour, country) in [
        ("2024-01-01", 8, Some("US")),
        ("2024-01-01", 9, Some("DE")),
        ("2024-01-02", 10, Some("US")),
        ("2024-01-03", 11, None),
    ] {
        storage
            .insert_scan_event(link.id, ts_ms(day, hour, 0), country, Some("h"))
            .await
            .unwrap();
    }
    // Another link's traffic must not leak into the rollups
    storage
        .insert_scan_event(noise.id, ts_ms("2024-01-01", 8, 0), Some("US"), Some("h"))
        .await
        .unwrap();

    let all = DateRange::default();
    assert_eq!(storage.count_scans(link.id, all).await.unwrap(), 4);

    let days = storage.scans_by_day(link.id, all).await.unwrap();
    let days: Vec<(&str, i64)> = days.iter().map(|d| (d.date.as_str(), d.count)).collect();
    assert_eq!(
        days,
        [("2024-01-01", 2), ("2024-01-02", 1), ("2024-01-03", 1)]
    );

    // Null countries count toward totals but not the country breakdown
    let countries = storage.scans_by_country(link.id, all).await.unwrap();
    let countries: Vec<(&str, i64)> = countries
        .iter()
        .map(|c| (c.country.as_str(), c.count))
        .collect();
    assert_eq!(countries, [("US", 2), ("DE", 1)]);

    // Range filtering narrows every rollup the same way
    let narrowed = parse_date_range(Some("2024-01-02"), Some("2024-01-03")).unwrap();
    assert_eq!(storage.count_scans(link.id, narrowed).await.unwrap(), 2);
    let days = storage.scans_by_day(link.id, narrowed).await.unwrap();
    assert_eq!(days.len(), 2);
    let countries = storage.scans_by_country(link.id, narrowed).await.unwrap();
    let countries: Vec<(&str, i64)> = countries
        .iter()
        .map(|c| (c.country.as_str(), c.count))
        .collect();
    assert_eq!(countries, [("US", 1)]);
}

#[tokio::test]
async fn test_postgres_link_lifecycle() {
    if !should_test_backend("postgres") {
        return;
    }

    use qrly::storage::PostgresStorage;

    // Skip test if DATABASE_URL is not set
    let db_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            println!("SKIPPED: DATABASE_URL not set");
            return;
        }
    };

    let storage = PostgresStorage::new(&db_url).await.unwrap();
    storage.init().await.unwrap();

    // Unique code so reruns against a persistent database do not collide
    let code = format!("pg-{}", chrono::Utc::now().timestamp_millis());
    let link = storage
        .create_link(&code, "https://example.com", "pg-tester")
        .await
        .unwrap();

    assert!(matches!(
        storage
            .create_link(&code, "https://example.org", "pg-tester")
            .await,
        Err(StorageError::Conflict)
    ));

    storage
        .insert_scan_event(link.id, ts_ms("2024-01-01", 8, 0), Some("US"), Some("h1"))
        .await
        .unwrap();
    storage.increment_scan_count(link.id).await.unwrap();

    let resolved = storage.resolve(&code).await.unwrap().unwrap();
    assert_eq!(resolved.scan_count, 1);
    assert_eq!(
        storage
            .count_scans(link.id, DateRange::default())
            .await
            .unwrap(),
        1
    );
    let days = storage
        .scans_by_day(link.id, DateRange::default())
        .await
        .unwrap();
    assert_eq!(days[0].date, "2024-01-01");

    let updated = storage
        .update_link(link.id, None, Some(false))
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.is_active);

    assert!(storage.delete_link(link.id).await.unwrap());
    assert_eq!(
        storage
            .count_scans(link.id, DateRange::default())
            .await
            .unwrap(),
        0
    );
}
