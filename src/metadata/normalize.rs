use serde_json::Value;

use crate::catalog::model::FileMetadataOutcome;
use crate::dateutil::parse_metadata_datetime;

/// Tags never carried into `metadata_json` regardless of value (spec §4.3).
const DENYLIST: &[&str] = &[
    "EXIF:PreviewImage",
    "EXIF:ThumbnailImage",
    "EXIF:JpgFromRaw",
    "EXIF:OtherImage",
    "ICC_Profile:ICC_Profile",
    "File:ICC_Profile",
];

const ALWAYS_EXCLUDED: &[&str] = &["SourceFile", "File:Directory", "File:FileName"];

fn first_string(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(|v| v.as_str()).map(|s| s.to_string()))
}

fn first_date(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<(f64, i64)> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(|v| v.as_str()).and_then(parse_metadata_datetime))
}

fn first_f64(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_f64))
}

fn first_i64(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_i64))
}

fn is_binary_like(v: &Value) -> bool {
    matches!(v, Value::String(s) if s.starts_with("base64:") || s.starts_with("(Binary data"))
}

fn group_of(key: &str) -> Option<&str> {
    key.split_once(':').map(|(group, _)| group)
}

fn build_metadata_json(obj: &serde_json::Map<String, Value>) -> (String, String) {
    let mut families: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    let mut filtered = serde_json::Map::new();

    for (key, value) in obj {
        if ALWAYS_EXCLUDED.contains(&key.as_str()) || DENYLIST.contains(&key.as_str()) {
            continue;
        }
        if is_binary_like(value) {
            continue;
        }
        if let Some(group) = group_of(key) {
            families.insert(group);
        }
        filtered.insert(key.clone(), value.clone());
    }

    let families_joined = families.into_iter().collect::<Vec<_>>().join(",");
    let json = serde_json::to_string(&filtered).unwrap_or_default();
    (families_joined, json)
}

/// Build a `FileMetadataOutcome` from one raw result object (spec §4.3
/// Normalization). `extractor_version` is stamped by the caller.
pub fn normalize(result: &Value, extractor_version: &str) -> FileMetadataOutcome {
    let empty = serde_json::Map::new();
    let obj = result.as_object().unwrap_or(&empty);

    let (metadata_families, metadata_json) = build_metadata_json(obj);

    FileMetadataOutcome {
        date_original: first_date(
            obj,
            &["EXIF:DateTimeOriginal", "QuickTime:CreateDate", "XMP:DateTimeOriginal"],
        ),
        date_digitized: first_date(
            obj,
            &["EXIF:DateTimeDigitized", "QuickTime:MediaCreateDate", "XMP:CreateDate"],
        ),
        date_modify: first_date(obj, &["EXIF:ModifyDate", "QuickTime:ModifyDate", "XMP:ModifyDate"]),
        make: first_string(obj, &["EXIF:Make", "QuickTime:Make"]),
        model: first_string(obj, &["EXIF:Model", "QuickTime:Model"]),
        lens_model: first_string(obj, &["EXIF:LensModel"]),
        width: first_i64(obj, &["EXIF:ImageWidth", "EXIF:ExifImageWidth", "QuickTime:ImageWidth"]),
        height: first_i64(obj, &["EXIF:ImageHeight", "EXIF:ExifImageHeight", "QuickTime:ImageHeight"]),
        orientation: first_i64(obj, &["EXIF:Orientation"]),
        duration_seconds: first_f64(obj, &["QuickTime:Duration"]),
        video_frame_rate: first_f64(obj, &["QuickTime:VideoFrameRate"]),
        gps_latitude: first_f64(obj, &["EXIF:GPSLatitude", "Composite:GPSLatitude"]),
        gps_longitude: first_f64(obj, &["EXIF:GPSLongitude", "Composite:GPSLongitude"]),
        gps_altitude: first_f64(obj, &["EXIF:GPSAltitude", "Composite:GPSAltitude"]),
        mime_type: first_string(obj, &["File:MIMEType"]),
        metadata_families: Some(metadata_families),
        metadata_json: Some(metadata_json),
        extractor_version: extractor_version.to_string(),
        extraction_error: None,
        skip_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_date_priority() {
        let result = json!({
            "SourceFile": "/a/b.jpg",
            "EXIF:DateTimeOriginal": "2023:05:14 10:00:00",
            "QuickTime:CreateDate": "2022:01:01 00:00:00",
        });
        let outcome = normalize(&result, "12.70");
        let (_, ymd) = outcome.date_original.unwrap();
        assert_eq!(ymd, 20230514);
    }

    #[test]
    fn test_normalize_excludes_binary_and_reserved_keys() {
        let result = json!({
            "SourceFile": "/a/b.jpg",
            "File:Directory": "/a",
            "File:FileName": "b.jpg",
            "EXIF:PreviewImage": "base64:aGVsbG8=",
            "EXIF:Make": "Sony",
        });
        let outcome = normalize(&result, "12.70");
        let json_str = outcome.metadata_json.unwrap();
        assert!(!json_str.contains("SourceFile"));
        assert!(!json_str.contains("PreviewImage"));
        assert!(json_str.contains("Sony"));
    }

    #[test]
    fn test_metadata_families_sorted() {
        let result = json!({
            "QuickTime:Duration": 12.0,
            "EXIF:Make": "Sony",
            "File:MIMEType": "image/jpeg",
        });
        let outcome = normalize(&result, "12.70");
        assert_eq!(outcome.metadata_families.unwrap(), "EXIF,File,QuickTime");
    }

    #[test]
    fn test_normalize_gps_and_dimensions() {
        let result = json!({
            "EXIF:GPSLatitude": 37.123456,
            "EXIF:GPSLongitude": -122.123456,
            "EXIF:ImageWidth": 4000,
            "EXIF:ImageHeight": 3000,
        });
        let outcome = normalize(&result, "12.70");
        assert_eq!(outcome.gps_latitude, Some(37.123456));
        assert_eq!(outcome.width, Some(4000));
        assert_eq!(outcome.height, Some(3000));
    }
}
