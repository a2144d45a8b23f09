use std::collections::BTreeMap;

use crate::catalog::model::{FolderPlanRow, NewFolderPlan, PlanningFileRow};
use crate::config::PlannerConfig;
use crate::dateutil::month_span;
use crate::planner::file_date;
use crate::planner::target_path::basename_of;

/// One folder's full resolution: the `folder_plan` fields (without
/// `scan_session_id`/thresholds, added by the caller) plus each file's own
/// resolved date, for `file_plan` construction.
pub struct FolderResolution {
    pub plan: NewFolderPlan,
    pub annotation_seed: String,
    pub file_dates: Vec<(i64, Option<(i64, &'static str)>)>,
}

/// This folder's own resolution before the inheritance override (spec §4.4
/// steps 1-8).
struct OwnResolution {
    resolved_date: Option<i64>,
    source: Option<&'static str>,
    bucket: Option<&'static str>,
}

/// Resolve one folder per spec §4.4 steps 1-8, then apply the inheritance
/// override (spec §4.4 Inheritance: applies after own-resolution whenever
/// the own source is not `path_folder` and the parent has a concrete date —
/// this can override even a bucketed own-resolution). `files` must be every
/// File directly within this folder; `parent` is the already-resolved
/// `FolderPlanRow` for its immediate parent, if any (folders are processed
/// in ascending-depth order so the parent is always available by the time a
/// child is considered).
pub fn resolve(
    source_folder_path: &str,
    files: &[PlanningFileRow],
    parent: Option<&FolderPlanRow>,
    config: &PlannerConfig,
) -> FolderResolution {
    let file_dates: Vec<(i64, Option<(i64, &'static str)>)> = files
        .iter()
        .map(|f| (f.id, file_date::resolve(f)))
        .collect();

    let total_file_count = files.len() as i64;
    let is_image = |f: &PlanningFileRow| {
        f.extension
            .as_deref()
            .map(|ext| config.image_extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    };
    let image_file_count = files.iter().filter(|f| is_image(f)).count() as i64;
    let stats = date_stats(files, &file_dates, image_file_count, config);

    let path_folder_match = files.iter().find(|f| f.date_path_folder.is_some());

    let (own, annotation_seed) = if let Some(matched) = path_folder_match {
        let seed = matched
            .date_path_folder_source
            .clone()
            .unwrap_or_else(|| basename_of(source_folder_path).to_string());
        (
            OwnResolution {
                resolved_date: matched.date_path_folder,
                source: Some("path_folder"),
                bucket: None,
            },
            seed,
        )
    } else {
        let seed = basename_of(source_folder_path).to_string();
        let own = if image_file_count == 0 {
            OwnResolution { resolved_date: None, source: None, bucket: Some("non_media") }
        } else if stats.coverage_percent.unwrap_or(0.0) < config.min_coverage {
            OwnResolution { resolved_date: None, source: None, bucket: Some("mixed_dates") }
        } else if stats.date_span_months.unwrap_or(0) >= config.max_date_span_months {
            OwnResolution { resolved_date: None, source: None, bucket: Some("mixed_dates") }
        } else if stats.unique_date_count == Some(1) {
            // Unanimity is the more specific condition: a single unique date
            // always has prevalent_percent == 1.0, which would otherwise
            // always satisfy the prevalence check below first and make this
            // branch unreachable.
            OwnResolution {
                resolved_date: stats.prevalent_date,
                source: Some("metadata_unanimous"),
                bucket: None,
            }
        } else if stats.prevalent_percent.unwrap_or(0.0) >= config.min_prevalence {
            OwnResolution {
                resolved_date: stats.prevalent_date,
                source: Some("metadata_prevalent"),
                bucket: None,
            }
        } else {
            OwnResolution { resolved_date: None, source: None, bucket: Some("mixed_dates") }
        };
        (own, seed)
    };

    // Inheritance: applies whenever the own source is not path_folder and the
    // parent has a concrete date, overriding even a bucketed own-resolution.
    let parent_date = parent.and_then(|p| p.resolved_date);
    let is_path_folder = matches!(own.source, Some("path_folder"));
    let (resolved_date, source, bucket, is_subfolder, inherited_from) =
        if !is_path_folder && parent_date.is_some() {
            (parent_date, Some("inherited"), None, true, parent.map(|p| p.id))
        } else {
            (own.resolved_date, own.source, own.bucket, false, None)
        };

    let plan = NewFolderPlan {
        source_folder_path: source_folder_path.to_string(),
        resolved_date,
        resolved_date_source: source.map(|s| s.to_string()),
        target_folder: None,
        bucket: bucket.map(|b| b.to_string()),
        total_file_count,
        image_file_count,
        images_with_date_count: stats.images_with_date_count,
        coverage_percent: stats.coverage_percent,
        prevalent_date: stats.prevalent_date,
        prevalent_count: stats.prevalent_count,
        prevalent_percent: stats.prevalent_percent,
        unique_date_count: stats.unique_date_count,
        min_date: stats.min_date,
        max_date: stats.max_date,
        date_span_months: stats.date_span_months,
        inherited_from_folder_id: inherited_from,
        is_subfolder,
        min_coverage_threshold: config.min_coverage,
        min_prevalence_threshold: config.min_prevalence,
        max_span_threshold: config.max_date_span_months,
    };

    FolderResolution { plan, annotation_seed, file_dates }
}

struct DateStats {
    images_with_date_count: i64,
    coverage_percent: Option<f64>,
    prevalent_date: Option<i64>,
    prevalent_count: Option<i64>,
    prevalent_percent: Option<f64>,
    unique_date_count: Option<i64>,
    min_date: Option<i64>,
    max_date: Option<i64>,
    date_span_months: Option<i64>,
}

fn date_stats(
    files: &[PlanningFileRow],
    file_dates: &[(i64, Option<(i64, &'static str)>)],
    image_file_count: i64,
    config: &PlannerConfig,
) -> DateStats {
    let image_ids: std::collections::HashSet<i64> = files
        .iter()
        .filter(|f| {
            f.extension
                .as_deref()
                .map(|ext| config.image_extensions.iter().any(|e| e == ext))
                .unwrap_or(false)
        })
        .map(|f| f.id)
        .collect();

    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for (id, resolved) in file_dates {
        if !image_ids.contains(id) {
            continue;
        }
        if let Some((date, _)) = resolved {
            *counts.entry(*date).or_insert(0) += 1;
        }
    }

    let images_with_date_count: i64 = counts.values().sum();
    let coverage_percent = if image_file_count > 0 {
        Some(images_with_date_count as f64 / image_file_count as f64)
    } else {
        None
    };

    if counts.is_empty() {
        return DateStats {
            images_with_date_count,
            coverage_percent,
            prevalent_date: None,
            prevalent_count: None,
            prevalent_percent: None,
            unique_date_count: Some(0),
            min_date: None,
            max_date: None,
            date_span_months: None,
        };
    }

    let (prevalent_date, prevalent_count) = counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(d, c)| (*d, *c))
        .unwrap();
    let prevalent_percent = Some(prevalent_count as f64 / images_with_date_count as f64);
    let min_date = counts.keys().min().copied();
    let max_date = counts.keys().max().copied();
    let date_span_months = match (min_date, max_date) {
        (Some(min), Some(max)) => Some(month_span(min, max)),
        _ => None,
    };

    DateStats {
        images_with_date_count,
        coverage_percent,
        prevalent_date: Some(prevalent_date),
        prevalent_count: Some(prevalent_count),
        prevalent_percent,
        unique_date_count: Some(counts.len() as i64),
        min_date,
        max_date,
        date_span_months,
    }
}
