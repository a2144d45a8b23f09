use super::bounded::find_bounded_dates;

/// Strategy 2: each directory name along the path is tested for a bounded
/// date substring; the deepest matching name wins. Source string is the full
/// matching directory name.
pub fn extract(directory_path: &str) -> Option<(i64, String)> {
    if directory_path.is_empty() {
        return None;
    }
    let mut best: Option<(i64, String)> = None;
    for component in directory_path.split('/') {
        if let Some(m) = find_bounded_dates(component).into_iter().next() {
            best = Some((m.ymd, component.to_string()));
        }
    }
    best
}
