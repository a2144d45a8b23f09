use std::collections::HashSet;

use sha2::{Digest, Sha256};

/// First 6 hex characters of SHA-256 over a file's *source folder path*
/// (spec §4.4 Duplicate handling).
fn hash6(source_folder_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_folder_path.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(3).map(|b| format!("{:02x}", b)).collect()
}

/// Resolve the filename a newcomer should be assigned within one target
/// folder, given the set of filenames already claimed there. Returns
/// `(final_filename, is_potential_duplicate, duplicate_source_hash)`.
pub fn resolve_filename(
    claimed: &mut HashSet<String>,
    source_folder_path: &str,
    filename: &str,
) -> (String, bool, Option<String>) {
    if claimed.insert(filename.to_string()) {
        return (filename.to_string(), false, None);
    }
    let hash = hash6(source_folder_path);
    let renamed = format!("pot_dupe_{}_{}", hash, filename);
    claimed.insert(renamed.clone());
    (renamed, true, Some(hash))
}
