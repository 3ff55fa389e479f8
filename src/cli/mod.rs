//! CLI entry point for docagent.

pub mod auth;
pub mod drive;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::auth::{FileTokenCache, GraphTokenProvider, MicrosoftAuth};
use crate::config::DocAgentConfig;
use crate::error::Result;
use crate::graph::DriveClient;

/// OneDrive document agent CLI
#[derive(Parser, Debug)]
#[command(name = "docagent", version, about = "OneDrive document agent CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Microsoft account sign-in and token cache
    Auth(AuthArgs),
    /// Download documents from OneDrive into the local data directory
    Ingest(IngestArgs),
    /// Upload a local file to OneDrive
    Upload(UploadArgs),
    /// Merge processed text documents into one file
    Consolidate(ConsolidateArgs),
    /// Report corrupted files in the local docs directory
    Check,
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with a device code
    Login,
    /// Show the cached account and token expiry
    Status,
    /// Delete the token cache
    Logout,
    /// Acquire a token and call the drive endpoint
    Test(AuthTestArgs),
}

/// Arguments for `docagent auth test`.
#[derive(Parser, Debug)]
pub struct AuthTestArgs {
    /// Delete the token cache first to force a fresh sign-in
    #[arg(long)]
    pub clear_cache: bool,
}

/// Arguments for `docagent ingest`.
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Download every file even if the local copy is current
    #[arg(long)]
    pub force_redownload: bool,

    /// Delete corrupted local files before syncing
    #[arg(long)]
    pub fix_corrupted: bool,

    /// Remove temporary and partial files before syncing
    #[arg(long)]
    pub cleanup: bool,

    /// OneDrive folder (defaults to ONEDRIVE_FOLDER_PATH)
    #[arg(short, long)]
    pub folder: Option<String>,

    /// Only sync the folder itself, not its sub-folders
    #[arg(long)]
    pub no_recursive: bool,
}

/// Arguments for `docagent upload`.
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Target OneDrive folder (defaults to ONEDRIVE_FOLDER_PATH)
    #[arg(short, long)]
    pub folder: Option<String>,

    /// Name to store the file under
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for `docagent consolidate`.
#[derive(Parser, Debug)]
pub struct ConsolidateArgs {
    /// Output file (defaults to <data dir>/consolidated_documents.txt)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Upload the consolidated file afterwards
    #[arg(long)]
    pub upload: bool,

    /// OneDrive folder for the upload (defaults to ONEDRIVE_FOLDER_PATH)
    #[arg(short, long)]
    pub folder: Option<String>,
}

/// Token provider backed by the configured cache file, prompting on stdout
/// when a sign-in is required.
pub fn token_provider(config: &DocAgentConfig) -> Result<Arc<GraphTokenProvider>> {
    let client_id = config.require_client_id()?;
    let cache = Arc::new(FileTokenCache::new(&config.token_cache_path, client_id));
    let auth = MicrosoftAuth::from_config(config, cache)?;
    Ok(Arc::new(
        GraphTokenProvider::new(auth).with_prompt(Arc::new(auth::StdoutPrompt)),
    ))
}

pub fn drive_client(config: &DocAgentConfig, provider: Arc<GraphTokenProvider>) -> DriveClient {
    DriveClient::new(&config.graph_base_url, provider)
}
