use crate::analytics::models::AnalyticsSummary;
use crate::analytics::range::DateRange;
use crate::storage::Storage;
use anyhow::Result;
use std::sync::Arc;

/// Read-side aggregation of scan events for a single link.
pub struct AnalyticsAggregator {
    storage: Arc<dyn Storage>,
}

impl AnalyticsAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Runs the three aggregate queries concurrently over the same range
    /// filter. Pure read, no side effects, so repeated calls against
    /// unchanged data return identical summaries.
    pub async fn aggregate(&self, link_id: i64, range: DateRange) -> Result<AnalyticsSummary> {
        let (total_scans, scans_by_day, scans_by_country) = tokio::try_join!(
            self.storage.count_scans(link_id, range),
            self.storage.scans_by_day(link_id, range),
            self.storage.scans_by_country(link_id, range),
        )?;

        Ok(AnalyticsSummary {
            total_scans,
            scans_by_day,
            scans_by_country,
        })
    }
}
