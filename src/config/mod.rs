//! Configuration (layered: code > env > `.env` file > defaults).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DocAgentError, Result};

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_TOKEN_CACHE_FILE: &str = "token.json";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Delegated Graph permissions requested during sign-in.
pub const GRAPH_SCOPES: [&str; 2] = [
    "https://graph.microsoft.com/Files.ReadWrite.All",
    "https://graph.microsoft.com/Files.ReadWrite",
];

/// Resolved runtime configuration.
///
/// # Example
/// ```
/// use docagent::config::DocAgentConfig;
///
/// let config = DocAgentConfig::default()
///     .with_client_id("00000000-0000-0000-0000-000000000000")
///     .with_data_dir("/tmp/docagent");
/// assert_eq!(config.tenant, "common");
/// assert!(config.docs_dir().ends_with("docs"));
/// ```
#[derive(Debug, Clone)]
pub struct DocAgentConfig {
    pub client_id: Option<String>,
    pub tenant: String,
    pub authority_host: String,
    pub graph_base_url: String,
    pub scopes: Vec<String>,
    pub folder_path: String,
    pub token_cache_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for DocAgentConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant: DEFAULT_TENANT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            scopes: GRAPH_SCOPES.iter().map(|s| s.to_string()).collect(),
            folder_path: "/".to_string(),
            token_cache_path: PathBuf::from(DEFAULT_TOKEN_CACHE_FILE),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl DocAgentConfig {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            client_id: get("MICROSOFT_CLIENT_ID"),
            tenant: get("MICROSOFT_TENANT_ID").unwrap_or(defaults.tenant),
            authority_host: get("MICROSOFT_AUTHORITY_HOST")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.authority_host),
            graph_base_url: get("GRAPH_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.graph_base_url),
            scopes: defaults.scopes,
            folder_path: get("ONEDRIVE_FOLDER_PATH").unwrap_or(defaults.folder_path),
            token_cache_path: get("TOKEN_CACHE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_cache_path),
            data_dir: get("DOCAGENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn with_graph_base_url(mut self, url: impl Into<String>) -> Self {
        self.graph_base_url = url.into();
        self
    }

    pub fn with_folder_path(mut self, path: impl Into<String>) -> Self {
        self.folder_path = path.into();
        self
    }

    pub fn with_token_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_cache_path = path.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Client id, or a configuration error telling the user what to set.
    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id.as_deref().ok_or_else(|| {
            DocAgentError::Configuration("Set MICROSOFT_CLIENT_ID in .env file".to_string())
        })
    }

    /// `{authority_host}/{tenant}`.
    pub fn authority(&self) -> String {
        format!("{}/{}", self.authority_host, self.tenant)
    }

    /// Folder path with the root default applied.
    pub fn effective_folder(&self, override_path: Option<&str>) -> String {
        override_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.folder_path)
            .to_string()
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.data_dir.join("docs")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// Create the data directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.docs_dir(), self.processed_dir()] {
            ensure_dir(&dir)?;
        }
        Ok(())
    }
}

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(DocAgentError::Io)
}
