//! Incremental download of a drive folder into the local docs directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Utc};

use crate::config::ensure_dir;
use crate::error::{DocAgentError, Result};
use crate::graph::{DriveClient, DriveItem};
use crate::util::retry::RetryPolicy;

use super::integrity::{check_all, check_bytes, check_file, sha256_matches, Integrity};
use super::names::{is_protected, safe_name, safe_relative_dir};

/// What to mirror and how.
///
/// ```
/// use docagent::ingest::SyncOptions;
///
/// let options = SyncOptions::builder()
///     .folder_path("/Boeing")
///     .force_redownload(true)
///     .build();
/// assert!(options.recursive);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct SyncOptions {
    #[builder(into, default = "/".to_string())]
    pub folder_path: String,
    #[builder(default)]
    pub force_redownload: bool,
    #[builder(default = true)]
    pub recursive: bool,
}

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub total: usize,
    pub downloaded: usize,
    pub redownloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Sub-folders (relative to the synced root) that contained files.
    pub folders: BTreeSet<String>,
    /// `(relative path, error)` for every failed file.
    pub failures: Vec<(String, String)>,
}

/// Result of [`Ingestor::fix_corrupted`].
#[derive(Debug, Clone, Default)]
pub struct FixReport {
    pub removed: Vec<String>,
    pub sync: SyncStats,
}

/// Local copy state relative to the drive item.
#[derive(Debug)]
enum LocalState {
    Missing,
    Stale,
    Corrupted(String),
    UpToDate,
}

/// Mirrors a drive folder into `docs_dir`.
pub struct Ingestor {
    drive: Arc<DriveClient>,
    docs_dir: PathBuf,
    retry: RetryPolicy,
}

impl Ingestor {
    pub fn new(drive: Arc<DriveClient>, docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            drive,
            docs_dir: docs_dir.into(),
            retry: RetryPolicy::downloads(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Download new, changed and corrupted files. Per-file failures are
    /// counted in the stats; listing or drive access failures are returned.
    pub async fn sync_folder(&self, options: &SyncOptions) -> Result<SyncStats> {
        self.drive.drive_info().await?;
        ensure_dir(&self.docs_dir)?;

        tracing::info!(
            folder = %options.folder_path,
            recursive = options.recursive,
            force = options.force_redownload,
            "Starting sync"
        );
        let items = if options.recursive {
            self.drive.list_folder_recursive(&options.folder_path).await?
        } else {
            self.drive.list_folder(&options.folder_path).await?
        };

        let mut stats = SyncStats::default();
        for item in items {
            if item.is_folder() {
                continue;
            }
            if is_protected(&item.name) {
                tracing::info!(item = %item.name, "Skipping protected item");
                continue;
            }
            stats.total += 1;
            let relative = item.path().to_string();
            let local_path = match self.prepare_local_path(&item, &mut stats) {
                Ok(path) => path,
                Err(err) => {
                    record_failure(&mut stats, &relative, &err);
                    continue;
                }
            };

            let replacing = match local_state(&item, &local_path, options.force_redownload) {
                LocalState::UpToDate => {
                    tracing::debug!(file = %relative, "Up to date");
                    stats.skipped += 1;
                    continue;
                }
                LocalState::Corrupted(reason) => {
                    tracing::warn!(
                        file = %relative,
                        %reason,
                        "Local copy corrupted, re-downloading"
                    );
                    true
                }
                LocalState::Stale => local_path.exists(),
                LocalState::Missing => false,
            };

            match self.download_verified(&item, &local_path).await {
                Ok(detail) => {
                    tracing::info!(file = %relative, %detail, "Downloaded");
                    if replacing {
                        stats.redownloaded += 1;
                    } else {
                        stats.downloaded += 1;
                    }
                }
                Err(err) => record_failure(&mut stats, &relative, &err),
            }
        }

        tracing::info!(
            total = stats.total,
            downloaded = stats.downloaded,
            redownloaded = stats.redownloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            folders = stats.folders.len(),
            "Sync complete"
        );
        Ok(stats)
    }

    /// Delete local files that fail the integrity check, then sync again.
    pub async fn fix_corrupted(&self, options: &SyncOptions) -> Result<FixReport> {
        let report = check_all(&self.docs_dir)?;
        let removed = remove_corrupted(&self.docs_dir, report.corrupted);
        let sync = self.sync_folder(options).await?;
        Ok(FixReport { removed, sync })
    }

    fn prepare_local_path(&self, item: &DriveItem, stats: &mut SyncStats) -> Result<PathBuf> {
        let relative = item.path();
        let parent = relative.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let local_dir = if parent.is_empty() {
            self.docs_dir.clone()
        } else {
            stats.folders.insert(parent.to_string());
            self.docs_dir.join(safe_relative_dir(parent))
        };
        ensure_dir(&local_dir)?;
        Ok(local_dir.join(safe_name(&item.name)))
    }

    /// Download with retries, verify, then write. Returns the integrity detail.
    async fn download_verified(&self, item: &DriveItem, local_path: &Path) -> Result<String> {
        let display = local_path.display().to_string();
        let bytes = self
            .retry
            .execute(|attempt| async move {
                if attempt > 1 {
                    tracing::info!(file = %item.name, attempt, "Retrying download");
                }
                let bytes = self.drive.download(item).await?;
                verify(item, local_path, &bytes)?;
                Ok(bytes)
            })
            .await?;

        tokio::fs::write(local_path, &bytes).await?;
        match check_file(local_path) {
            Integrity::Good(detail) => Ok(detail),
            Integrity::Corrupted(reason) => {
                let _ = std::fs::remove_file(local_path);
                Err(DocAgentError::Corrupted {
                    path: display,
                    reason,
                })
            }
        }
    }
}

/// Reject content whose hash or structure is wrong before it touches disk.
fn verify(item: &DriveItem, local_path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(expected) = item.sha256() {
        if !sha256_matches(bytes, expected) {
            return Err(DocAgentError::Corrupted {
                path: item.path().to_string(),
                reason: "sha256 mismatch".to_string(),
            });
        }
    }
    if let Integrity::Corrupted(reason) = check_bytes(local_path, bytes) {
        return Err(DocAgentError::Corrupted {
            path: item.path().to_string(),
            reason,
        });
    }
    Ok(())
}

fn local_state(item: &DriveItem, local_path: &Path, force: bool) -> LocalState {
    let Ok(metadata) = std::fs::metadata(local_path) else {
        return LocalState::Missing;
    };
    if force {
        return LocalState::Stale;
    }
    if let Integrity::Corrupted(reason) = check_file(local_path) {
        return LocalState::Corrupted(reason);
    }
    let local_modified: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::from);
    match (local_modified, item.last_modified_date_time) {
        (Some(local), Some(remote)) if local < remote => LocalState::Stale,
        _ => LocalState::UpToDate,
    }
}

fn record_failure(stats: &mut SyncStats, relative: &str, err: &DocAgentError) {
    tracing::error!(file = %relative, error = %err, "Failed to download");
    stats.failed += 1;
    stats.failures.push((relative.to_string(), err.to_string()));
}

/// Delete each corrupted file, logging and skipping any that cannot be removed.
fn remove_corrupted(docs_dir: &Path, corrupted: Vec<(String, String)>) -> Vec<String> {
    let mut removed = Vec::new();
    for (relative, reason) in corrupted {
        tracing::warn!(file = %relative, %reason, "Removing corrupted file");
        match std::fs::remove_file(docs_dir.join(&relative)) {
            Ok(()) => removed.push(relative),
            Err(err) => {
                tracing::warn!(file = %relative, error = %err, "Could not remove corrupted file")
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(name: &str, modified: DateTime<Utc>) -> DriveItem {
        DriveItem {
            id: "1".into(),
            name: name.into(),
            last_modified_date_time: Some(modified),
            ..Default::default()
        }
    }

    #[test]
    fn options_default_to_recursive_root() {
        let options = SyncOptions::builder().build();
        assert_eq!(options.folder_path, "/");
        assert!(options.recursive);
        assert!(!options.force_redownload);
    }

    #[test]
    fn missing_file_is_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = local_state(&item("a.txt", Utc::now()), &dir.path().join("a.txt"), false);
        assert!(matches!(state, LocalState::Missing));
    }

    #[test]
    fn newer_local_copy_is_up_to_date() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();
        let remote = Utc::now() - Duration::days(1);
        assert!(matches!(local_state(&item("a.txt", remote), &path, false), LocalState::UpToDate));
        assert!(matches!(local_state(&item("a.txt", remote), &path, true), LocalState::Stale));
    }

    #[test]
    fn older_local_copy_is_stale() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();
        let remote = Utc::now() + Duration::days(1);
        assert!(matches!(local_state(&item("a.txt", remote), &path, false), LocalState::Stale));
    }

    #[test]
    fn corrupted_local_copy_is_flagged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"<html>").unwrap();
        let remote = Utc::now() - Duration::days(1);
        assert!(matches!(
            local_state(&item("a.pdf", remote), &path, false),
            LocalState::Corrupted(_)
        ));
    }

    #[test]
    fn verify_rejects_hash_mismatch() {
        let mut item = item("a.txt", Utc::now());
        item.file = Some(crate::graph::FileFacet {
            mime_type: None,
            hashes: Some(crate::graph::FileHashes {
                sha256_hash: Some("00".into()),
                ..Default::default()
            }),
        });
        let err = verify(&item, Path::new("a.txt"), b"hello").unwrap_err();
        assert!(matches!(err, DocAgentError::Corrupted { .. }));
    }

    #[test]
    fn remove_corrupted_skips_files_it_cannot_delete() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), b"garbage").unwrap();
        let corrupted = vec![
            ("gone.pdf".to_string(), "missing".to_string()),
            ("bad.pdf".to_string(), "no header".to_string()),
        ];

        let removed = remove_corrupted(dir.path(), corrupted);

        assert_eq!(removed, vec!["bad.pdf".to_string()]);
        assert!(!dir.path().join("bad.pdf").exists());
    }
}
