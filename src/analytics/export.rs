use crate::analytics::range::DateRange;
use crate::models::ScanEvent;
use crate::storage::Storage;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

const EXPORT_PAGE_SIZE: i64 = 1000;
const CSV_HEADER: &str = "timestamp,country\n";

/// Streams scan events as CSV one page at a time, so peak memory stays
/// bounded no matter how many events a link has accumulated.
pub struct CsvExporter {
    storage: Arc<dyn Storage>,
}

impl CsvExporter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Returns a channel of CSV chunks: the header row first, then one
    /// chunk per page of events in ascending scan order. A query failure
    /// ends the stream early; the rows already sent stand.
    pub fn stream(&self, link_id: i64, range: DateRange) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(4);
        let storage = self.storage.clone();

        tokio::spawn(async move {
            if tx.send(CSV_HEADER.to_string()).await.is_err() {
                return;
            }

            let mut offset = 0;
            loop {
                let page = match storage
                    .scan_events_page(link_id, range, EXPORT_PAGE_SIZE, offset)
                    .await
                {
                    Ok(page) => page,
                    Err(err) => {
                        tracing::warn!(link_id, error = %err, "CSV export query failed, ending stream early");
                        return;
                    }
                };

                let fetched = page.len() as i64;
                if fetched > 0 && tx.send(csv_rows(&page)).await.is_err() {
                    return;
                }

                if fetched < EXPORT_PAGE_SIZE {
                    return;
                }
                offset += EXPORT_PAGE_SIZE;
            }
        });

        rx
    }
}

fn csv_rows(events: &[ScanEvent]) -> String {
    let mut rows = String::new();

    for event in events {
        rows.push_str(&format_timestamp(event.scanned_at));
        rows.push(',');
        if let Some(country) = &event.country {
            rows.push_str(country);
        }
        rows.push('\n');
    }

    rows
}

fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_timestamp_renders_utc_millis() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_timestamp(1_705_314_600_000), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn csv_rows_renders_null_country_as_empty_field() {
        let events = vec![
            ScanEvent {
                id: 1,
                link_id: 7,
                scanned_at: 1_705_314_600_000,
                country: Some("DE".to_string()),
                client_hash: Some("abc".to_string()),
            },
            ScanEvent {
                id: 2,
                link_id: 7,
                scanned_at: 1_705_314_660_000,
                country: None,
                client_hash: None,
            },
        ];

        assert_eq!(
            csv_rows(&events),
            "2024-01-15T10:30:00.000Z,DE\n2024-01-15T10:31:00.000Z,\n"
        );
    }
}
