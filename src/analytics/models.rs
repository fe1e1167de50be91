//! Wire models for the analytics API

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scans on one UTC calendar date (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

/// Scans attributed to one 2-letter country code. Events without a
/// country are excluded from this breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_scans: i64,
    /// Ascending by date.
    pub scans_by_day: Vec<DayCount>,
    /// Descending by count.
    pub scans_by_country: Vec<CountryCount>,
}
