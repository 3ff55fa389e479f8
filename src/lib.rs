//! docagent: OneDrive document agent.
//!
//! Signs in to Microsoft Graph with the device-code flow, keeps the token in
//! a local cache, and mirrors a OneDrive folder into a local data directory.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use docagent::auth::{FileTokenCache, GraphTokenProvider, MicrosoftAuth};
//! use docagent::config::DocAgentConfig;
//! use docagent::graph::DriveClient;
//! use docagent::ingest::{Ingestor, SyncOptions};
//!
//! # async fn example() -> docagent::error::Result<()> {
//! let config = DocAgentConfig::from_env();
//! let client_id = config.require_client_id()?.to_string();
//! let cache = Arc::new(FileTokenCache::new(&config.token_cache_path, client_id));
//! let provider = GraphTokenProvider::new(MicrosoftAuth::from_config(&config, cache)?);
//! let drive = Arc::new(DriveClient::new(&config.graph_base_url, Arc::new(provider)));
//!
//! let stats = Ingestor::new(drive, config.docs_dir())
//!     .sync_folder(&SyncOptions::builder().folder_path("/Boeing").build())
//!     .await?;
//! println!("downloaded {}", stats.downloaded);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
