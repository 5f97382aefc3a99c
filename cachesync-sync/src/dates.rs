//! Spreadsheet date codec.
//!
//! The store keeps dates as day serials counted from 1899-12-30, the day
//! before its epoch origin, so that date cells sort and filter as dates.
//! Every parser here falls back to the input rather than failing: a
//! malformed upstream date must never abort a run.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Format used for the last-updated column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `2024-07-01T00:00:00` → `2024-07-01`. Unparseable input comes back as is.
pub fn display_date(s: &str) -> String {
    match parse_datetime(s) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => s.to_string(),
    }
}

/// Fractional days since the serial epoch, or `None` if `s` is not a date.
pub fn to_serial(s: &str) -> Option<f64> {
    parse_datetime(s).map(datetime_to_serial)
}

pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let elapsed = dt - serial_epoch();
    let secs = elapsed.num_seconds() as f64;
    let nanos = elapsed.subsec_nanos() as f64 / 1e9;
    (secs + nanos) / SECONDS_PER_DAY
}

/// Inverse of [`datetime_to_serial`], to the nearest second.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let secs = (serial * SECONDS_PER_DAY).round();
    if secs > i64::MAX as f64 {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::try_seconds(secs as i64)?)
}

/// Best-effort `YYYY-MM-DD` for anything a date cell may hold: ISO
/// date/time, the sheet's `dd/mm/yyyy` display form, or a day serial.
pub fn normalize_date(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Some(dt) = parse_datetime(trimmed) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return d.format("%Y-%m-%d").to_string();
    }
    if let Some(dt) = trimmed.parse::<f64>().ok().and_then(from_serial) {
        return dt.format("%Y-%m-%d").to_string();
    }
    s.to_string()
}

pub fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// A last-updated cell back as `YYYY-MM-DD HH:MM:SS` when it holds a serial.
pub fn normalize_timestamp(s: &str) -> String {
    match s.trim().parse::<f64>().ok().and_then(from_serial) {
        Some(dt) => format_timestamp(dt),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2024-07-01T00:00:00", "2024-07-01")]
    #[case("2023-12-31T23:59:59", "2023-12-31")]
    #[case("2023-12-31", "2023-12-31")]
    #[case("", "")]
    #[case("notadate", "notadate")]
    fn display_dates(#[case] input: &str, #[case] want: &str) {
        assert_eq!(display_date(input), want);
    }

    #[test]
    fn serials_match_store_epoch() {
        assert_eq!(to_serial("2024-07-01"), Some(45474.0));
        assert_eq!(to_serial("2024-07-01T00:00:00"), Some(45474.0));
        let ts = to_serial("2025-10-11 05:58:35").unwrap();
        assert!((ts - 45941.249_016_203_7).abs() < 1e-9, "got {ts}");
        assert_eq!(to_serial("01/07/2024"), None);
    }

    #[test]
    fn serial_roundtrip_to_the_second() {
        let dt = NaiveDateTime::parse_from_str("2025-10-11 05:58:35", TIMESTAMP_FORMAT).unwrap();
        assert_eq!(from_serial(datetime_to_serial(dt)), Some(dt));
        assert_eq!(from_serial(f64::NAN), None);
        assert_eq!(from_serial(-1.0), None);
    }

    #[rstest]
    #[case("2024-07-01", "2024-07-01")]
    #[case("2024-07-01T10:00:00", "2024-07-01")]
    #[case("01/07/2024", "2024-07-01")]
    #[case("45474", "2024-07-01")]
    #[case("  ", "")]
    #[case("sometime", "sometime")]
    fn normalizes_every_date_shape(#[case] input: &str, #[case] want: &str) {
        assert_eq!(normalize_date(input), want);
    }

    #[test]
    fn timestamps_from_serials() {
        assert_eq!(normalize_timestamp("45941.24901620371"), "2025-10-11 05:58:35");
        assert_eq!(normalize_timestamp("2025-10-11 05:58:35"), "2025-10-11 05:58:35");
    }
}
