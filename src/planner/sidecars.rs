use std::collections::{HashMap, HashSet};

use crate::catalog::model::PlanningFileRow;
use crate::config::PlannerConfig;
use crate::scanner::walker::split_filename;

/// File ids in `files` that are sidecars: extension in the configured
/// sidecar set, with a sibling in the same folder sharing `filename_base`
/// and carrying an image extension (spec §4.4 Sidecar detection).
pub fn detect(files: &[PlanningFileRow], config: &PlannerConfig) -> HashSet<i64> {
    let mut bases_with_image: HashMap<&str, bool> = HashMap::new();
    let bases: Vec<String> = files.iter().map(|f| split_filename(&f.filename_full).0).collect();

    for (file, base) in files.iter().zip(bases.iter()) {
        let is_image = file
            .extension
            .as_deref()
            .map(|ext| config.image_extensions.iter().any(|e| e == ext))
            .unwrap_or(false);
        if is_image {
            bases_with_image.insert(base.as_str(), true);
        }
    }

    files
        .iter()
        .zip(bases.iter())
        .filter_map(|(file, base)| {
            let is_sidecar_ext = file
                .extension
                .as_deref()
                .map(|ext| config.sidecar_extensions.iter().any(|e| e == ext))
                .unwrap_or(false);
            if is_sidecar_ext && bases_with_image.contains_key(base.as_str()) {
                Some(file.id)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: i64, name: &str, ext: &str) -> PlanningFileRow {
        PlanningFileRow {
            id,
            source_path: format!("a/{}", name),
            directory_path: "a".into(),
            filename_full: name.to_string(),
            extension: Some(ext.to_string()),
            date_path_folder: None,
            date_path_folder_source: None,
            date_path_filename: None,
            metadata_date_original_ymd: None,
            mtime_epoch: None,
        }
    }

    #[test]
    fn test_xmp_with_image_sibling_is_sidecar() {
        let files = vec![file(1, "IMG_001.jpg", "jpg"), file(2, "IMG_001.xmp", "xmp")];
        let ids = detect(&files, &PlannerConfig::default());
        assert!(ids.contains(&2));
        assert!(!ids.contains(&1));
    }

    #[test]
    fn test_xmp_without_image_sibling_is_not_sidecar() {
        let files = vec![file(1, "notes.xmp", "xmp")];
        let ids = detect(&files, &PlannerConfig::default());
        assert!(ids.is_empty());
    }
}
