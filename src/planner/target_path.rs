use crate::dateutil::i64_to_ymd;

fn basename(source_folder_path: &str) -> &str {
    source_folder_path.rsplit('/').next().unwrap_or("")
}

/// Strip a leading/embedded date token matching `resolved_date` (plain,
/// `YYYY_MM_DD`, or `YYYY-MM-DD`) from the folder's own name, plus one
/// adjacent separator, to recover an annotation (spec §4.4 Target path
/// construction). Truncated at a UTF-8 character boundary (Open Question 4).
pub fn extract_annotation(annotation_seed: &str, resolved_date: i64, max_len: usize) -> Option<String> {
    let name = annotation_seed;
    let (y, m, d) = i64_to_ymd(resolved_date);
    let plain = format!("{:04}{:02}{:02}", y, m, d);
    let underscore = format!("{:04}_{:02}_{:02}", y, m, d);
    let dash = format!("{:04}-{:02}-{:02}", y, m, d);

    let remainder = [&plain, &underscore, &dash]
        .iter()
        .find_map(|token| {
            name.find(token.as_str()).map(|pos| {
                let before = &name[..pos];
                let after = &name[pos + token.len()..];
                let before = before.strip_suffix(['-', '_']).unwrap_or(before);
                let after = after.strip_prefix(['-', '_']).unwrap_or(after);
                format!("{}{}", before, after)
            })
        })
        .unwrap_or_else(|| name.to_string());

    let trimmed = remainder.trim_matches(['-', '_']);
    if trimmed.is_empty() || trimmed == plain || trimmed == underscore || trimmed == dash {
        return None;
    }
    let truncated: String = trimmed.chars().take(max_len).collect();
    if truncated.is_empty() {
        return None;
    }
    Some(truncated)
}

/// `Y/Y_M/YYYYMMDD[-annotation]` for a date-resolved folder. `annotation_seed`
/// is the matching folder name (the deepest `date_path_folder` match when the
/// folder resolved by `path_folder`, else the folder's own basename).
pub fn date_target_folder(
    resolved_date: i64,
    annotation_seed: &str,
    max_annotation_length: usize,
) -> String {
    let (y, m, d) = i64_to_ymd(resolved_date);
    let base = format!("{:04}/{:04}_{:02}/{:04}{:02}{:02}", y, y, m, y, m, d);
    match extract_annotation(annotation_seed, resolved_date, max_annotation_length) {
        Some(ann) => format!("{}-{}", base, ann),
        None => base,
    }
}

pub fn basename_of(source_folder_path: &str) -> &str {
    basename(source_folder_path)
}

/// `<bucket>/<original_source_folder_path>`, preserving sub-structure verbatim.
pub fn bucket_target_folder(bucket: &str, source_folder_path: &str) -> String {
    format!("{}/{}", bucket, source_folder_path)
}

/// Append the relative path from an inherited parent's source folder to the
/// parent's own resolved target folder, preserving nested structure.
pub fn subfolder_target_folder(
    parent_target_folder: &str,
    parent_source_folder_path: &str,
    child_source_folder_path: &str,
) -> String {
    let relative = if parent_source_folder_path.is_empty() {
        child_source_folder_path
    } else {
        child_source_folder_path
            .strip_prefix(parent_source_folder_path)
            .and_then(|s| s.strip_prefix('/'))
            .unwrap_or(child_source_folder_path)
    };
    format!("{}/{}", parent_target_folder, relative)
}
