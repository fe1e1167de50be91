//! Date-range parsing for analytics queries
//!
//! Callers supply optional inclusive `from`/`to` dates as `YYYY-MM-DD`
//! strings. Internally the inclusive `to` becomes an exclusive upper
//! bound of the following midnight UTC, so every timestamp on the `to`
//! date is covered regardless of time-of-day.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("Invalid date format. Expected YYYY-MM-DD.")]
    Format,
    #[error("Invalid date value. Not a real calendar date.")]
    Value,
    #[error("Invalid date range. 'from' must be on or before 'to'.")]
    Order,
}

/// Parsed, validated filter bounds in epoch milliseconds.
/// `from_ms` is inclusive, `until_ms` exclusive; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from_ms: Option<i64>,
    pub until_ms: Option<i64>,
}

impl DateRange {
    /// Lower bound usable directly in a `scanned_at >= ?` predicate.
    pub fn lower_bound(&self) -> i64 {
        self.from_ms.unwrap_or(i64::MIN)
    }

    /// Upper bound usable directly in a `scanned_at < ?` predicate.
    pub fn upper_bound(&self) -> i64 {
        self.until_ms.unwrap_or(i64::MAX)
    }
}

pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DateRange, DateRangeError> {
    let from_date = from.map(parse_ymd).transpose()?;
    let to_date = to.map(parse_ymd).transpose()?;

    if let (Some(lower), Some(upper)) = (from_date, to_date) {
        if lower > upper {
            return Err(DateRangeError::Order);
        }
    }

    let until_date = to_date
        .map(|d| d.succ_opt().ok_or(DateRangeError::Value))
        .transpose()?;

    Ok(DateRange {
        from_ms: from_date.map(midnight_utc_ms),
        until_ms: until_date.map(midnight_utc_ms),
    })
}

/// Strict `YYYY-MM-DD` parse: the shape must match exactly, and the
/// components must form a real calendar date ("2024-02-30" is rejected).
fn parse_ymd(input: &str) -> Result<NaiveDate, DateRangeError> {
    let bytes = input.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(DateRangeError::Format);
    }

    let year = input[0..4].parse::<i32>().map_err(|_| DateRangeError::Format)?;
    let month = input[5..7].parse::<u32>().map_err(|_| DateRangeError::Format)?;
    let day = input[8..10].parse::<u32>().map_err(|_| DateRangeError::Format)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or(DateRangeError::Value)
}

fn midnight_utc_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
