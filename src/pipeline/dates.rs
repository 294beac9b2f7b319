//! Date parsing for spreadsheet-sourced columns.
//!
//! Source files mix ISO dates, US-style dates and full datetimes in the
//! same column, and Excel encodes some missing values as dates in 1899
//! or 1900. Parsed values in those sentinel years are treated as null.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::constants::EXCEL_SENTINEL_YEARS;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Parse a raw date cell. Returns `None` for empty cells, unparseable
/// values and Excel sentinel years.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.date()))
        })?;
    if EXCEL_SENTINEL_YEARS.contains(&parsed.year()) {
        return None;
    }
    Some(parsed)
}

/// Parse an optional raw date cell, treating `None` as missing.
pub fn parse_opt_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        assert_eq!(parse_date("2023-06-30"), Some(expected));
        assert_eq!(parse_date("6/30/2023"), Some(expected));
        assert_eq!(parse_date("6/30/23"), Some(expected));
        assert_eq!(parse_date("2023-06-30 00:00:00"), Some(expected));
    }

    #[test]
    fn excel_sentinel_years_are_null() {
        assert_eq!(parse_date("1899-12-31"), None);
        assert_eq!(parse_date("1900-01-01"), None);
        assert_eq!(parse_date("1901-01-01").map(|d| d.year()), Some(1901));
    }

    #[test]
    fn garbage_and_empty_are_null() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("TBD"), None);
        assert_eq!(parse_opt_date(None), None);
    }
}
