use crate::error::{validation_error, AssistantResult};
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::warn;

/// Default length of an event when no end time is given
pub const DEFAULT_EVENT_MINUTES: i64 = 60;
/// Length an inverted or empty range is repaired to
pub const REPAIRED_EVENT_MINUTES: i64 = 30;
/// Default width of a query window
pub const DEFAULT_QUERY_DAYS: i64 = 7;

/// Calendar years accepted from input
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Date-time layouts accepted when the input carries no offset
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A validated time range with `end > start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Format a timestamp the way it is shown to the model and returned to clients
pub fn to_iso(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an IANA timezone label, ignoring free-form labels chrono-tz does not know
pub fn parse_timezone(label: Option<&str>) -> Option<Tz> {
    label.and_then(|name| name.trim().parse::<Tz>().ok())
}

/// Parse a timestamp from user or model input.
///
/// RFC 3339 input is taken as-is. Offset-less date-times and bare dates are
/// read as wall-clock time in `timezone` when it is a known zone, UTC otherwise.
/// Years outside 1..=9999 are rejected.
pub fn parse_timestamp(input: &str, timezone: Option<Tz>) -> Option<DateTime<Utc>> {
    parse_any_year(input, timezone).filter(|dt| SUPPORTED_YEARS.contains(&dt.year()))
}

fn parse_any_year(input: &str, timezone: Option<Tz>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    match timezone {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Parse and repair an event time range.
///
/// A missing end defaults to one hour after start. An end that is not after
/// the start is moved to half an hour after it and only logged.
pub fn normalize_range(
    start: &str,
    end: Option<&str>,
    timezone: Option<Tz>,
) -> AssistantResult<TimeRange> {
    let start = parse_timestamp(start, timezone)
        .ok_or_else(|| validation_error("Invalid start time"))?;

    let end = match end {
        Some(end) => parse_timestamp(end, timezone)
            .ok_or_else(|| validation_error("Invalid end time"))?,
        None => shift(start, Duration::minutes(DEFAULT_EVENT_MINUTES))?,
    };

    repair_range(start, end)
}

/// Add `delta`, failing validation instead of overflowing chrono's range
pub fn shift(time: DateTime<Utc>, delta: Duration) -> AssistantResult<DateTime<Utc>> {
    time.checked_add_signed(delta)
        .ok_or_else(|| validation_error("Time is out of the supported range"))
}

/// Enforce `end > start` on already parsed bounds
pub fn repair_range(start: DateTime<Utc>, end: DateTime<Utc>) -> AssistantResult<TimeRange> {
    if end <= start {
        warn!(
            "End time is not after start time, adjusting: start={}, end={}",
            to_iso(&start),
            to_iso(&end)
        );
        return Ok(TimeRange {
            start,
            end: shift(start, Duration::minutes(REPAIRED_EVENT_MINUTES))?,
        });
    }

    Ok(TimeRange { start, end })
}
