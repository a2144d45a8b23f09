use rusqlite::{params, Connection};

use super::model::FileMetadataOutcome;

/// Insert exactly one `file_metadata` row for a file (spec §4.3 contract).
/// `extraction_error` and `skip_reason` are mutually exclusive by construction
/// in the caller (`metadata::extractor`).
pub fn insert_outcome(
    conn: &Connection,
    file_id: i64,
    outcome: &FileMetadataOutcome,
    extracted_at_epoch: f64,
    extracted_at_ymd: i64,
) -> rusqlite::Result<()> {
    let (orig_epoch, orig_ymd) = outcome.date_original.map_or((None, None), |(e, y)| (Some(e), Some(y)));
    let (dig_epoch, dig_ymd) = outcome.date_digitized.map_or((None, None), |(e, y)| (Some(e), Some(y)));
    let (mod_epoch, mod_ymd) = outcome.date_modify.map_or((None, None), |(e, y)| (Some(e), Some(y)));

    conn.execute(
        "INSERT INTO file_metadata (
            file_id, date_original_epoch, date_original_ymd,
            date_digitized_epoch, date_digitized_ymd, date_modify_epoch, date_modify_ymd,
            make, model, lens_model, width, height, orientation,
            duration_seconds, video_frame_rate, gps_latitude, gps_longitude, gps_altitude,
            mime_type, metadata_families, metadata_json,
            extracted_at_epoch, extracted_at_ymd, extractor_version,
            extraction_error, skip_reason
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26)",
        params![
            file_id,
            orig_epoch,
            orig_ymd,
            dig_epoch,
            dig_ymd,
            mod_epoch,
            mod_ymd,
            outcome.make,
            outcome.model,
            outcome.lens_model,
            outcome.width,
            outcome.height,
            outcome.orientation,
            outcome.duration_seconds,
            outcome.video_frame_rate,
            outcome.gps_latitude,
            outcome.gps_longitude,
            outcome.gps_altitude,
            outcome.mime_type,
            outcome.metadata_families,
            outcome.metadata_json,
            extracted_at_epoch,
            extracted_at_ymd,
            outcome.extractor_version,
            outcome.extraction_error,
            outcome.skip_reason,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::session_repository::create_fresh;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use std::path::PathBuf;

    #[test]
    fn test_insert_outcome_success() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        conn.execute(
            "INSERT INTO files (id, scan_session_id, source_path, directory_path, filename_full, filename_base, size, scanned_at_epoch, scanned_at_ymd)
             VALUES (1, ?1, 'a.jpg', '', 'a.jpg', 'a', 20000, 0.0, 20240101)",
            params![session_id],
        )
        .unwrap();

        let outcome = FileMetadataOutcome {
            date_original: Some((1000.0, 20230514)),
            make: Some("Sony".into()),
            extractor_version: "12.70".into(),
            ..Default::default()
        };
        insert_outcome(&conn, 1, &outcome, 10.0, 20240101).unwrap();

        let (make, err, skip): (Option<String>, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT make, extraction_error, skip_reason FROM file_metadata WHERE file_id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(make.as_deref(), Some("Sony"));
        assert!(err.is_none());
        assert!(skip.is_none());
    }

    #[test]
    fn test_insert_outcome_skip_reason() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        conn.execute(
            "INSERT INTO files (id, scan_session_id, source_path, directory_path, filename_full, filename_base, size, scanned_at_epoch, scanned_at_ymd)
             VALUES (1, ?1, 'a.jpg', '', 'a.jpg', 'a', 100, 0.0, 20240101)",
            params![session_id],
        )
        .unwrap();

        let outcome = FileMetadataOutcome {
            skip_reason: Some("file_too_small:100_bytes".into()),
            extractor_version: "12.70".into(),
            ..Default::default()
        };
        insert_outcome(&conn, 1, &outcome, 10.0, 20240101).unwrap();

        let skip: Option<String> = conn
            .query_row(
                "SELECT skip_reason FROM file_metadata WHERE file_id = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(skip.as_deref(), Some("file_too_small:100_bytes"));
    }
}
