use std::path::Path;

/// Fragments that mark partial downloads and editor lock files.
const TEMP_PATTERNS: [&str; 4] = [".tmp", ".temp", "~$", ".crdownload"];

pub fn is_temp_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    TEMP_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Remove temporary files below `docs_dir`. Returns how many were removed;
/// files that cannot be removed are logged and skipped.
pub fn cleanup_temp_files(docs_dir: &Path) -> std::io::Result<usize> {
    if !docs_dir.exists() {
        return Ok(0);
    }
    let mut cleaned = 0;
    for path in super::walk_files(docs_dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_temp_file(&name) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(file = %name, "Removed temp file");
                cleaned += 1;
            }
            Err(err) => tracing::warn!(file = %name, error = %err, "Failed to remove temp file"),
        }
    }
    Ok(cleaned)
}
