//! Resolution of period tokens ("24h", "7d", "custom", ...) into concrete
//! query ranges.
//!
//! Relative periods are anchored on the latest reading actually stored for
//! the station, never on the wall clock, so stations that report
//! intermittently still get a populated window.

use super::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::InvalidRange(format!(
                "end {} is before start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    LastHour,
    LastDay,
    LastWeek,
    LastMonth,
    Custom,
}

impl Period {
    /// Length of a relative period; `None` for custom ranges.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Period::LastHour => Some(Duration::hours(1)),
            Period::LastDay => Some(Duration::hours(24)),
            Period::LastWeek => Some(Duration::days(7)),
            Period::LastMonth => Some(Duration::days(30)),
            Period::Custom => None,
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "1h" => Ok(Period::LastHour),
            "24h" => Ok(Period::LastDay),
            "7d" => Ok(Period::LastWeek),
            "30d" => Ok(Period::LastMonth),
            "custom" => Ok(Period::Custom),
            other => Err(CoreError::InvalidPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Period::LastHour => "1h",
            Period::LastDay => "24h",
            Period::LastWeek => "7d",
            Period::LastMonth => "30d",
            Period::Custom => "custom",
        };
        f.write_str(token)
    }
}

/// Resolve a period token into a window.
///
/// Returns `Ok(None)` for a relative period when the station has no data at
/// all (`latest` is absent); callers answer that with an empty result
/// instead of querying. Explicit dates are only read for `custom`.
pub fn resolve_window(
    token: &str,
    explicit_start: Option<&str>,
    explicit_end: Option<&str>,
    latest: Option<DateTime<Utc>>,
) -> Result<Option<TimeWindow>, CoreError> {
    let period: Period = token.parse()?;

    match period.duration() {
        Some(duration) => match latest {
            Some(end) => TimeWindow::new(end - duration, end).map(Some),
            None => Ok(None),
        },
        None => custom_window(explicit_start, explicit_end).map(Some),
    }
}

fn custom_window(start: Option<&str>, end: Option<&str>) -> Result<TimeWindow, CoreError> {
    let start = start
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CoreError::InvalidRange("custom period requires a start date".to_string()))?;
    let end = end
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CoreError::InvalidRange("custom period requires an end date".to_string()))?;

    let start = parse_start(start)?;
    let end = end_of_day(parse_date(end)?);
    TimeWindow::new(start, end)
}

/// Date-only input starts at midnight UTC; a full RFC 3339 instant is kept
/// as given.
fn parse_start(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    Ok(parse_date(raw)?.and_time(NaiveTime::MIN).and_utc())
}

fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc).date_naive())
        .map_err(|_| CoreError::InvalidRange(format!("'{}' is not a valid date", raw)))
}

/// 23:59:59.999 on `date`, making whole-day end dates inclusive.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last_milli).and_utc()
}
