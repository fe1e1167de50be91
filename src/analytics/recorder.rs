use crate::storage::Storage;
use chrono::Utc;
use std::sync::Arc;

/// Records scan events without blocking the caller.
///
/// `record` spawns a detached task and returns immediately; the redirect
/// response never waits on — or learns the outcome of — the writes.
#[derive(Clone)]
pub struct ScanRecorder {
    storage: Arc<dyn Storage>,
}

impl ScanRecorder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn record(&self, link_id: i64, country: Option<String>, client_hash: Option<String>) {
        let storage = self.storage.clone();

        tokio::spawn(async move {
            let scanned_at = Utc::now().timestamp_millis();

            if let Err(err) = storage
                .insert_scan_event(link_id, scanned_at, country.as_deref(), client_hash.as_deref())
                .await
            {
                tracing::warn!(link_id, error = %err, "Failed to record scan event");
                return;
            }

            // The event log stays authoritative if this falls behind; the
            // counter can be recomputed from events.
            if let Err(err) = storage.increment_scan_count(link_id).await {
                tracing::warn!(link_id, error = %err, "Failed to increment scan count");
            }
        });
    }
}

/// Accepts only two-letter country codes from the geo header, uppercased.
/// Anything else ("", "T1", "unknown") is dropped rather than stored.
pub fn normalize_country(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.len() == 2 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_country_uppercases_two_letter_codes() {
        assert_eq!(normalize_country("de"), Some("DE".to_string()));
        assert_eq!(normalize_country("US"), Some("US".to_string()));
        assert_eq!(normalize_country(" fr "), Some("FR".to_string()));
    }

    #[test]
    fn normalize_country_rejects_everything_else() {
        assert_eq!(normalize_country(""), None);
        assert_eq!(normalize_country("USA"), None);
        assert_eq!(normalize_country("T1"), None);
        assert_eq!(normalize_country("unknown"), None);
        assert_eq!(normalize_country("1"), None);
    }
}
