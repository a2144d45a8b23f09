//! Calendar-date helpers shared by `pathdate` and `planner`. Dates are
//! exchanged as `YYYYMMDD` integers and epoch/`YYYYMMDD` pairs throughout the
//! catalog (spec data model §3).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::time::SystemTime;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2099;

/// True when (y, m, d) form a real calendar date within [1900-01-01, 2099-12-31].
pub fn is_valid_ymd(y: i32, m: u32, d: u32) -> bool {
    if !(MIN_YEAR..=MAX_YEAR).contains(&y) {
        return false;
    }
    NaiveDate::from_ymd_opt(y, m, d).is_some()
}

pub fn ymd_to_i64(y: i32, m: u32, d: u32) -> i64 {
    y as i64 * 10_000 + m as i64 * 100 + d as i64
}

pub fn i64_to_ymd(v: i64) -> (i32, u32, u32) {
    let y = (v / 10_000) as i32;
    let m = ((v / 100) % 100) as u32;
    let d = (v % 100) as u32;
    (y, m, d)
}

/// Calendar-month span between two `YYYYMMDD` integers, as defined in the
/// glossary: `(max.year - min.year) * 12 + (max.month - min.month)`.
pub fn month_span(min_ymd: i64, max_ymd: i64) -> i64 {
    let (y0, m0, _) = i64_to_ymd(min_ymd);
    let (y1, m1, _) = i64_to_ymd(max_ymd);
    (y1 as i64 - y0 as i64) * 12 + (m1 as i64 - m0 as i64)
}

pub fn epoch_to_ymd(epoch: f64) -> Option<i64> {
    let secs = epoch.floor() as i64;
    let dt = DateTime::<Utc>::from_timestamp(secs, 0)?;
    let d = dt.date_naive();
    Some(ymd_to_i64(d.year(), d.month(), d.day()))
}

pub fn system_time_to_epoch_ymd(t: SystemTime) -> Option<(f64, i64)> {
    let epoch = t
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .ok()?;
    let ymd = epoch_to_ymd(epoch)?;
    Some((epoch, ymd))
}

/// Parse a metadata-tool timestamp of the form `YYYY:MM:DD HH:MM:SS`,
/// optionally suffixed with `Z` or `±HH:MM`, into an epoch/ymd pair.
pub fn parse_metadata_datetime(s: &str) -> Option<(f64, i64)> {
    let s = s.trim();
    let (naive_part, offset_part) = split_offset(s);
    let naive = NaiveDateTime::parse_from_str(naive_part, "%Y:%m:%d %H:%M:%S").ok()?;

    let dt: DateTime<Utc> = match offset_part {
        None => Utc.from_utc_datetime(&naive),
        Some("Z") => Utc.from_utc_datetime(&naive),
        Some(offset) => {
            let sign = if offset.starts_with('-') { -1i64 } else { 1i64 };
            let digits = &offset[1..];
            let mut parts = digits.split(':');
            let hh: i64 = parts.next()?.parse().ok()?;
            let mm: i64 = parts.next().unwrap_or("0").parse().ok()?;
            let offset_secs = sign * (hh * 3600 + mm * 60);
            let utc_naive = naive - chrono::Duration::seconds(offset_secs);
            Utc.from_utc_datetime(&utc_naive)
        }
    };

    let epoch = dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9;
    let ymd = ymd_to_i64(dt.year(), dt.month(), dt.day());
    Some((epoch, ymd))
}

fn split_offset(s: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = s.strip_suffix('Z') {
        return (stripped.trim_end(), Some("Z"));
    }
    // Look for a trailing +HH:MM or -HH:MM after the time portion (position
    // past the first 10 chars, which are the YYYY:MM:DD date).
    if s.len() > 10 {
        let tail = &s[10..];
        if let Some(pos) = tail.rfind(['+', '-']) {
            let (naive, offset) = s.split_at(10 + pos);
            return (naive, Some(offset));
        }
    }
    (s, None)
}
