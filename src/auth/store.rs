use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::error::AuthError;
use super::token::Token;

const CACHE_FILE_VERSION: u32 = 1;

/// A token together with the account it was issued to.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub account: Option<Account>,
    pub token: Token,
}

impl CachedToken {
    /// Wrap a token, deriving the account from its id token when present.
    pub fn from_token(token: Token) -> Self {
        let account = token.id_token.as_deref().and_then(Account::from_id_token);
        Self { account, token }
    }
}

/// Storage abstraction for the persisted token cache.
pub trait TokenCache: Send + Sync {
    fn load(&self) -> Result<Option<CachedToken>, AuthError>;
    fn save(&self, entry: &CachedToken) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// JSON token cache file (`token.json` by default).
///
/// # Example
/// ```no_run
/// use docagent::auth::{CachedToken, FileTokenCache, Token, TokenCache};
///
/// let cache = FileTokenCache::new("token.json", "my-client-id");
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     id_token: None,
///     expires_at: None,
///     last_refresh: None,
///     scopes: None,
///     account_id: None,
/// };
/// cache.save(&CachedToken::from_token(token))?;
/// # Ok::<(), docagent::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
    client_id: String,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            client_id: client_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Could not load token cache"
                );
                return Ok(None);
            }
        };
        let file: CacheFile = match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Could not load token cache"
                );
                return Ok(None);
            }
        };
        if file.version != CACHE_FILE_VERSION {
            tracing::warn!(version = file.version, "Ignoring token cache with unsupported version");
            return Ok(None);
        }
        if file.client_id != self.client_id {
            tracing::warn!("Ignoring token cache written for a different client id");
            return Ok(None);
        }
        tracing::info!(path = %self.path.display(), "Loaded token cache");
        Ok(Some(CachedToken {
            account: file.account,
            token: file.token,
        }))
    }

    fn save(&self, entry: &CachedToken) -> Result<(), AuthError> {
        let file = CacheFile {
            version: CACHE_FILE_VERSION,
            client_id: self.client_id.clone(),
            account: entry.account.clone(),
            token: entry.token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;
        atomic_write(&self.path, &serialized)?;
        tracing::info!(path = %self.path.display(), "Token cache saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Cleared token cache file");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account: Option<Account>,
    token: Token,
    saved_at: DateTime<Utc>,
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path.file_name().ok_or_else(|| {
        AuthError::Io(format!("Token cache path {} has no file name", path.display()))
    })?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}
