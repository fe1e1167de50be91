//! Scan analytics
//!
//! Everything between an inbound scan and the numbers shown to a link's
//! owner: bot filtering, client hashing, fire-and-forget event recording,
//! date-range parsing, aggregation, and CSV export.

pub mod aggregator;
pub mod bot;
pub mod export;
pub mod models;
pub mod privacy;
pub mod range;
pub mod recorder;

pub use aggregator::AnalyticsAggregator;
pub use bot::is_bot;
pub use export::CsvExporter;
pub use models::{AnalyticsSummary, CountryCount, DayCount};
pub use privacy::hash_client_id;
pub use range::{parse_date_range, DateRange, DateRangeError};
pub use recorder::{normalize_country, ScanRecorder};
