//! Structural checks that catch truncated or corrupted downloads.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::bytes::Regex;
use sha2::{Digest, Sha256};
use strum::Display;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_EOF: &[u8] = b"%%EOF";
/// Trailer search window; writers may append whitespace or junk after `%%EOF`.
const PDF_TRAILER_WINDOW: usize = 2048;
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EOCD: &[u8] = b"PK\x05\x06";
/// End-of-central-directory record (22 bytes) plus the maximum comment length.
const ZIP_EOCD_WINDOW: usize = 22 + 0xFFFF;

static PDF_PAGE: OnceLock<Regex> = OnceLock::new();

/// How a file's integrity is judged, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Office,
    Text,
    Other,
}

impl DocumentKind {
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "docx" | "pptx" | "xlsx" => Self::Office,
            "txt" | "csv" | "html" | "htm" | "md" => Self::Text,
            _ => Self::Other,
        }
    }
}

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integrity {
    Good(String),
    Corrupted(String),
}

impl Integrity {
    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Good(detail) | Self::Corrupted(detail) => detail,
        }
    }
}

/// Check in-memory content as if it were stored under `name`.
pub fn check_bytes(name: &Path, bytes: &[u8]) -> Integrity {
    match DocumentKind::for_path(name) {
        DocumentKind::Pdf => check_pdf(bytes),
        DocumentKind::Office => check_zip(bytes),
        DocumentKind::Text => Integrity::Good("OK - text file".to_string()),
        DocumentKind::Other => Integrity::Good("Skipped - unknown type".to_string()),
    }
}

/// Read and check a file on disk. Unreadable files count as corrupted.
pub fn check_file(path: &Path) -> Integrity {
    match std::fs::read(path) {
        Ok(bytes) => check_bytes(path, &bytes),
        Err(err) => Integrity::Corrupted(format!("unreadable: {err}")),
    }
}

fn check_pdf(bytes: &[u8]) -> Integrity {
    if !bytes.starts_with(PDF_MAGIC) {
        return Integrity::Corrupted("missing %PDF- header".to_string());
    }
    let tail_start = bytes.len().saturating_sub(PDF_TRAILER_WINDOW);
    if find(&bytes[tail_start..], PDF_EOF).is_none() {
        return Integrity::Corrupted("missing %%EOF trailer (truncated?)".to_string());
    }
    let page_re = PDF_PAGE.get_or_init(|| {
        Regex::new(r"/Type\s*/Page[^s]").expect("pdf page regex must compile")
    });
    let pages = page_re.find_iter(bytes).count();
    Integrity::Good(format!("OK - {pages} pages"))
}

fn check_zip(bytes: &[u8]) -> Integrity {
    if !bytes.starts_with(ZIP_LOCAL_HEADER) {
        return Integrity::Corrupted("not a zip archive".to_string());
    }
    let tail_start = bytes.len().saturating_sub(ZIP_EOCD_WINDOW);
    let Some(offset) = rfind(&bytes[tail_start..], ZIP_EOCD).map(|o| o + tail_start) else {
        return Integrity::Corrupted("missing end of central directory (truncated?)".to_string());
    };
    let entries = bytes
        .get(offset + 10..offset + 12)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .unwrap_or(0);
    Integrity::Good(format!("OK - {entries} internal files"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Compare content against a hex SHA-256 reported by the drive.
pub fn sha256_matches(bytes: &[u8], expected_hex: &str) -> bool {
    let digest = Sha256::digest(bytes);
    let actual: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    actual.eq_ignore_ascii_case(expected_hex.trim())
}

/// Outcome of scanning a directory tree.
#[derive(Debug, Default, Clone)]
pub struct IntegrityReport {
    pub good: Vec<(String, String)>,
    pub corrupted: Vec<(String, String)>,
}

/// Check every file below `root`, keyed by path relative to `root`.
pub fn check_all(root: &Path) -> std::io::Result<IntegrityReport> {
    let mut report = IntegrityReport::default();
    if !root.exists() {
        return Ok(report);
    }
    for path in super::walk_files(root)? {
        let rel = relative_display(root, &path);
        match check_file(&path) {
            Integrity::Good(detail) => {
                tracing::debug!(file = %rel, %detail, "File OK");
                report.good.push((rel, detail));
            }
            Integrity::Corrupted(reason) => {
                tracing::warn!(file = %rel, %reason, "Corrupted file");
                report.corrupted.push((rel, reason));
            }
        }
    }
    Ok(report)
}

pub(crate) fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
          2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
          3 0 obj << /Type /Page /Parent 2 0 R >> endobj\ntrailer << >>\n%%EOF\n"
            .to_vec()
    }

    fn minimal_zip(entries: u16) -> Vec<u8> {
        let mut bytes = ZIP_LOCAL_HEADER.to_vec();
        bytes.extend_from_slice(&[0u8; 26]);
        bytes.extend_from_slice(ZIP_EOCD);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 10]);
        bytes
    }

    #[test]
    fn kind_follows_extension_case_insensitively() {
        assert_eq!(DocumentKind::for_path(Path::new("a.PDF")), DocumentKind::Pdf);
        assert_eq!(DocumentKind::for_path(Path::new("a.pptx")), DocumentKind::Office);
        assert_eq!(DocumentKind::for_path(Path::new("a.csv")), DocumentKind::Text);
        assert_eq!(DocumentKind::for_path(Path::new("a.bin")), DocumentKind::Other);
        assert_eq!(DocumentKind::for_path(Path::new("noext")), DocumentKind::Other);
    }

    #[test]
    fn valid_pdf_counts_pages() {
        let result = check_bytes(Path::new("a.pdf"), &minimal_pdf());
        assert_eq!(result, Integrity::Good("OK - 1 pages".to_string()));
    }

    #[test]
    fn truncated_pdf_is_corrupted() {
        let mut pdf = minimal_pdf();
        pdf.truncate(pdf.len() - 8);
        assert!(!check_bytes(Path::new("a.pdf"), &pdf).is_good());
        assert!(!check_bytes(Path::new("a.pdf"), b"<html>error</html>").is_good());
    }

    #[test]
    fn zip_needs_header_and_central_directory() {
        let good = check_bytes(Path::new("a.docx"), &minimal_zip(4));
        assert_eq!(good, Integrity::Good("OK - 4 internal files".to_string()));

        let mut truncated = minimal_zip(4);
        truncated.truncate(30);
        assert!(!check_bytes(Path::new("a.docx"), &truncated).is_good());
        assert!(!check_bytes(Path::new("a.xlsx"), b"plain text").is_good());
    }

    #[test]
    fn sha256_comparison_ignores_case() {
        let expected = "2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824";
        assert!(sha256_matches(b"hello", expected));
        assert!(!sha256_matches(b"hello!", expected));
    }

    #[test]
    fn check_all_splits_good_and_corrupted() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("good.pdf"), minimal_pdf()).unwrap();
        std::fs::write(dir.path().join("sub/bad.docx"), b"nope").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        let report = check_all(dir.path()).unwrap();
        assert_eq!(report.good.len(), 2);
        assert_eq!(report.corrupted.len(), 1);
        assert_eq!(report.corrupted[0].0, "sub/bad.docx");
    }
}
