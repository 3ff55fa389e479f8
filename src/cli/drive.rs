//! CLI handlers for ingestion, upload, consolidation, and integrity checks.

use std::sync::Arc;

use crate::config::DocAgentConfig;
use crate::consolidate::consolidate;
use crate::error::Result;
use crate::ingest::{check_all, cleanup_temp_files, Ingestor, SyncOptions, SyncStats};

use super::{ConsolidateArgs, IngestArgs, UploadArgs};

const CONSOLIDATED_FILE: &str = "consolidated_documents.txt";

/// Handle `docagent ingest`.
pub async fn handle_ingest(config: &DocAgentConfig, args: IngestArgs) -> Result<()> {
    config.require_client_id()?;
    config.ensure_dirs()?;

    let docs_dir = config.docs_dir();
    if args.cleanup {
        let removed = cleanup_temp_files(&docs_dir)?;
        println!("Removed {removed} temporary files");
    }

    let provider = super::token_provider(config)?;
    let drive = Arc::new(super::drive_client(config, provider));
    let ingestor = Ingestor::new(drive, &docs_dir);
    let options = SyncOptions::builder()
        .folder_path(config.effective_folder(args.folder.as_deref()))
        .force_redownload(args.force_redownload)
        .recursive(!args.no_recursive)
        .build();

    let stats = if args.fix_corrupted {
        let report = ingestor.fix_corrupted(&options).await?;
        println!("Removed {} corrupted files", report.removed.len());
        report.sync
    } else {
        ingestor.sync_folder(&options).await?
    };
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &SyncStats) {
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("INGESTION SUMMARY");
    println!("{rule}");
    println!("Total files:      {}", stats.total);
    println!("Downloaded:       {}", stats.downloaded);
    println!("Re-downloaded:    {}", stats.redownloaded);
    println!("Skipped:          {}", stats.skipped);
    println!("Failed:           {}", stats.failed);
    if !stats.folders.is_empty() {
        println!("Folders:          {}", stats.folders.len());
        for folder in &stats.folders {
            println!("  - {folder}");
        }
    }
    for (file, error) in &stats.failures {
        println!("❌ {file}: {error}");
    }
}

/// Handle `docagent upload`.
pub async fn handle_upload(config: &DocAgentConfig, args: UploadArgs) -> Result<()> {
    let folder = config.effective_folder(args.folder.as_deref());
    let provider = super::token_provider(config)?;
    let drive = super::drive_client(config, provider);
    drive.ensure_folder(&folder).await?;
    let item = drive.upload(&args.file, &folder, args.name.as_deref()).await?;
    println!("✅ Uploaded {} to {folder}", item.name);
    if let Some(url) = item.web_url.as_deref() {
        println!("   {url}");
    }
    Ok(())
}

/// Handle `docagent consolidate`.
pub async fn handle_consolidate(config: &DocAgentConfig, args: ConsolidateArgs) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| config.data_dir.join(CONSOLIDATED_FILE));
    let report = consolidate(&config.processed_dir(), &output)?;
    println!(
        "✅ Consolidated {} documents ({} characters, {} bytes) into {}",
        report.documents,
        report.total_chars,
        report.bytes,
        report.output_path.display()
    );

    if args.upload {
        let folder = config.effective_folder(args.folder.as_deref());
        let provider = super::token_provider(config)?;
        let drive = super::drive_client(config, provider);
        drive.ensure_folder(&folder).await?;
        let item = drive.upload(&report.output_path, &folder, None).await?;
        println!("✅ Uploaded {} to {folder}", item.name);
    }
    Ok(())
}

/// Handle `docagent check`.
pub async fn handle_check(config: &DocAgentConfig) -> Result<()> {
    let report = check_all(&config.docs_dir())?;
    for (file, detail) in &report.good {
        println!("✅ {file}: {detail}");
    }
    for (file, reason) in &report.corrupted {
        println!("❌ {file}: {reason}");
    }
    println!(
        "\n{} good, {} corrupted",
        report.good.len(),
        report.corrupted.len()
    );
    if !report.corrupted.is_empty() {
        println!("Run `docagent ingest --fix-corrupted` to re-download them");
    }
    Ok(())
}
