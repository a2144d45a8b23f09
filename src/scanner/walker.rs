use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Split a filename into `(filename_base, extension)` per spec §4.1.
///
/// The extension is the substring after the *last* dot, lowercased; it is
/// null when there is no dot, the string ends in a dot, or the only dot is
/// the first character (dotfiles have no extension).
pub fn split_filename(name: &str) -> (String, Option<String>) {
    match name.rfind('.') {
        None => (name.to_string(), None),
        Some(0) => (name.to_string(), None),
        Some(idx) if idx == name.len() - 1 => (name[..idx].to_string(), None),
        Some(idx) => (name[..idx].to_string(), Some(name[idx + 1..].to_lowercase())),
    }
}

/// List a directory's immediate entries sorted by byte-wise ascending entry
/// name, via `walkdir` (never following symlinks — `follow_links(false)` —
/// matching the teacher's own traversal setup) bounded to one level so the
/// caller still controls recursion order itself. `walkdir` caches each
/// entry's file type from the directory read, so no second kernel call is
/// needed to tell files from directories/symlinks. Individual corrupted
/// entries are reported via `errors` and skipped; a failure to read the
/// directory itself propagates to the caller.
pub fn list_sorted_entries(dir: &Path, errors: &mut Vec<String>) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        match entry {
            Ok(e) => entries.push(e),
            // depth() == 0 would mean `dir` itself couldn't be read; that
            // propagates instead of being treated as one corrupted entry.
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => errors.push(format!("corrupted directory entry in {}: {}", dir.display(), e)),
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    Ok(entries)
}
