use super::bounded::find_bounded_dates;

/// Strategy 3: the filename (including extension) is tested with the same
/// bounded pattern; the leftmost match wins. Source string is the full
/// filename.
pub fn extract(filename_full: &str) -> Option<(i64, String)> {
    find_bounded_dates(filename_full)
        .into_iter()
        .next()
        .map(|m| (m.ymd, filename_full.to_string()))
}
