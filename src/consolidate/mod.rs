//! Merge processed text documents into one file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{DocAgentError, Result};
use crate::ingest::integrity::relative_display;

const RULE_WIDTH: usize = 80;

/// Summary of a consolidation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub documents: usize,
    /// Characters of document text, excluding headers and banners.
    pub total_chars: usize,
    pub output_path: PathBuf,
    /// Size of the written file.
    pub bytes: u64,
}

/// Concatenate every `*.txt` below `processed_dir` into `output_path`.
pub fn consolidate(processed_dir: &Path, output_path: &Path) -> Result<ConsolidationReport> {
    let sources = text_files(processed_dir)?;
    if sources.is_empty() {
        return Err(DocAgentError::NotFound(format!(
            "No processed text files in {}",
            processed_dir.display()
        )));
    }
    tracing::info!(documents = sources.len(), "Consolidating documents");

    let rule = "=".repeat(RULE_WIDTH);
    let total = sources.len();
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "CONSOLIDATED DOCUMENT COLLECTION");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total Documents: {total}");
    let _ = writeln!(out, "{rule}");
    out.push('\n');

    let mut total_chars = 0;
    for (index, path) in sources.iter().enumerate() {
        let name = relative_display(processed_dir, path);
        let body = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "Could not read document");
                format!("[ERROR: Could not read {name}: {err}]")
            }
        };
        let chars = body.chars().count();
        total_chars += chars;

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "DOCUMENT {}/{total}: {name}", index + 1);
        let _ = writeln!(out, "Source: {}", path.display());
        let _ = writeln!(out, "Characters: {chars}");
        let _ = writeln!(out, "{rule}");
        out.push('\n');
        out.push_str(body.trim_end());
        out.push_str("\n\n");
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::config::ensure_dir(parent)?;
    }
    std::fs::write(output_path, &out)?;
    let bytes = std::fs::metadata(output_path)?.len();
    tracing::info!(
        output = %output_path.display(),
        documents = total,
        total_chars,
        bytes,
        "Consolidated file written"
    );

    Ok(ConsolidationReport {
        documents: total,
        total_chars,
        output_path: output_path.to_path_buf(),
        bytes,
    })
}

fn text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    Ok(crate::ingest::walk_files(dir)?
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .collect())
}
