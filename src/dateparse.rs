//! Date parameter parsing (spec §4.7): accepts an ISO-8601 full timestamp, `YYYY-MM-DD`,
//! relative `Nd` (N days ago), `today`/`now`, and `yesterday`. Defaults: `startDate` = 7
//! days ago, `endDate` = now.

use crate::error::{CursorSimError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};

pub fn parse_date_param(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("today") || trimmed.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if trimmed.eq_ignore_ascii_case("yesterday") {
        return Ok(now - Duration::days(1));
    }
    if let Some(days_str) = trimmed.strip_suffix('d') {
        if let Ok(n) = days_str.parse::<i64>() {
            if n >= 0 {
                return Ok(now - Duration::days(n));
            }
        }
        return Err(CursorSimError::InvalidRequest(format!("invalid startDate: {raw}")));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0).expect("midnight is always valid"),
            Utc,
        ));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(CursorSimError::InvalidRequest(format!("invalid startDate: {raw}")))
}

pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parses the `startDate`/`endDate` query pair with spec-mandated defaults.
pub fn parse_date_range(
    start_param: Option<&str>,
    end_param: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateRange> {
    let start = match start_param {
        Some(s) => parse_date_param(s, now).map_err(|_| {
            CursorSimError::InvalidRequest(format!("invalid startDate: {s}"))
        })?,
        None => now - Duration::days(7),
    };
    let end = match end_param {
        Some(s) => parse_date_param(s, now).map_err(|_| {
            CursorSimError::InvalidRequest(format!("invalid endDate: {s}"))
        })?,
        None => now,
    };
    Ok(DateRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_days() {
        let now = Utc::now();
        let parsed = parse_date_param("7d", now).unwrap();
        assert_eq!(parsed, now - Duration::days(7));
    }

    #[test]
    fn parses_today_and_yesterday() {
        let now = Utc::now();
        assert_eq!(parse_date_param("today", now).unwrap(), now);
        assert_eq!(parse_date_param("yesterday", now).unwrap(), now - Duration::days(1));
    }

    #[test]
    fn parses_plain_date() {
        let now = Utc::now();
        let parsed = parse_date_param("2024-01-15", now).unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn rejects_garbage() {
        let now = Utc::now();
        let err = parse_date_param("foo", now).unwrap_err();
        assert!(matches!(err, CursorSimError::InvalidRequest(_)));
    }

    #[test]
    fn defaults_match_spec() {
        let now = Utc::now();
        let range = parse_date_range(None, None, now).unwrap();
        assert_eq!(range.start, now - Duration::days(7));
        assert_eq!(range.end, now);
    }
}
