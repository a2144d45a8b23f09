use crate::dateutil::{is_valid_ymd, ymd_to_i64};

/// Strategy 1: deepest consecutive `yyyy/mm/dd` triple in a directory path.
/// Each component must match its width exactly (4/2/2 digits); the file need
/// not sit directly in the `dd` directory. Source string is `"yyyy/mm/dd"`.
pub fn extract(directory_path: &str) -> Option<(i64, String)> {
    if directory_path.is_empty() {
        return None;
    }
    let components: Vec<&str> = directory_path.split('/').collect();
    let mut best: Option<(i64, String)> = None;

    for window in components.windows(3) {
        let (y, m, d) = (window[0], window[1], window[2]);
        if y.len() != 4 || m.len() != 2 || d.len() != 2 {
            continue;
        }
        if !y.bytes().all(|b| b.is_ascii_digit())
            || !m.bytes().all(|b| b.is_ascii_digit())
            || !d.bytes().all(|b| b.is_ascii_digit())
        {
            continue;
        }
        let (year, month, day) = (
            y.parse::<i32>().unwrap(),
            m.parse::<u32>().unwrap(),
            d.parse::<u32>().unwrap(),
        );
        if !is_valid_ymd(year, month, day) {
            continue;
        }
        best = Some((ymd_to_i64(year, month, day), format!("{}/{}/{}", y, m, d)));
    }

    best
}
