//! Mirroring a OneDrive folder into the local docs directory.

pub mod cleanup;
pub mod integrity;
pub mod names;
pub mod sync;

pub use cleanup::cleanup_temp_files;
pub use integrity::{check_all, check_file, DocumentKind, Integrity, IntegrityReport};
pub use names::safe_name;
pub use sync::{FixReport, Ingestor, SyncOptions, SyncStats};

use std::path::{Path, PathBuf};

/// All regular files below `root`, sorted.
pub(crate) fn walk_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}
