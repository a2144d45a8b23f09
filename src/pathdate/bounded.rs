use regex::Regex;
use std::sync::OnceLock;

use crate::dateutil::{is_valid_ymd, ymd_to_i64};

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})([-_]?)(\d{2})([-_]?)(\d{2})").unwrap())
}

fn is_boundary_byte(b: u8) -> bool {
    b == b'-' || b == b'_'
}

/// A bounded `YYYY[-_]?MM[-_]?DD` match: begins and ends at a string boundary
/// or a `-`/`_` separator (spec §4.2 Strategy 2/3). Rejects `v20230514` and
/// `photo20230514.jpg`-style inclusions.
pub struct BoundedMatch {
    pub start: usize,
    pub ymd: i64,
    pub source: String,
}

/// All bounded, calendar-valid date matches in `s`, left to right.
pub fn find_bounded_dates(s: &str) -> Vec<BoundedMatch> {
    let mut out = Vec::new();
    for caps in pattern().captures_iter(s) {
        let m = caps.get(0).unwrap();
        let start = m.start();
        let end = m.end();

        let before_ok = start == 0 || is_boundary_byte(s.as_bytes()[start - 1]);
        let after_ok = end == s.len() || is_boundary_byte(s.as_bytes()[end]);
        if !before_ok || !after_ok {
            continue;
        }

        let year: i32 = caps[1].parse().unwrap();
        let month: u32 = caps[3].parse().unwrap();
        let day: u32 = caps[5].parse().unwrap();
        if !is_valid_ymd(year, month, day) {
            continue;
        }

        out.push(BoundedMatch {
            start,
            ymd: ymd_to_i64(year, month, day),
            source: m.as_str().to_string(),
        });
    }
    out
}
