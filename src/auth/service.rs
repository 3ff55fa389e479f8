use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::account::Account;
use super::device_code::{DeviceCodePoll, DeviceCodeSession};
use super::error::AuthError;
use super::microsoft::MicrosoftAuth;
use super::store::TokenCache;
use super::token::Token;

/// Anything that can hand out a bearer token for Graph requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Return a usable access token, acquiring one if needed.
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Forget the current token (e.g. after the API answered 401).
    async fn invalidate(&self) -> Result<(), AuthError>;
}

/// Receives the device-code instructions that the user must act on.
pub trait DeviceCodePrompt: Send + Sync {
    fn show(&self, session: &DeviceCodeSession);
}

/// Where a returned token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenOrigin {
    Memory,
    Cache,
    Refresh,
    DeviceCode,
}

/// Summary of the cached credentials, computed without network access.
#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub account: Option<Account>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usable: bool,
    pub can_refresh: bool,
}

/// Token acquisition for Microsoft Graph.
///
/// Order: in-memory token, cached token, refresh grant, then the interactive
/// device-code flow. A failed refresh falls through to a new sign-in prompt.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use docagent::auth::{FileTokenCache, GraphTokenProvider, MicrosoftAuth};
/// use docagent::auth::service::AccessTokenSource;
///
/// # async fn example() -> Result<(), docagent::auth::AuthError> {
/// let cache = Arc::new(FileTokenCache::new("token.json", "client-id"));
/// let auth = MicrosoftAuth::new(
///     "client-id",
///     "https://login.microsoftonline.com/common",
///     vec!["https://graph.microsoft.com/Files.ReadWrite".into()],
///     cache,
/// );
/// let provider = GraphTokenProvider::new(auth);
/// let token = provider.access_token().await?;
/// # Ok(())
/// # }
/// ```
pub struct GraphTokenProvider {
    auth: MicrosoftAuth,
    prompt: Option<Arc<dyn DeviceCodePrompt>>,
    current: Mutex<Option<Token>>,
}

impl GraphTokenProvider {
    pub fn new(auth: MicrosoftAuth) -> Self {
        Self {
            auth,
            prompt: None,
            current: Mutex::new(None),
        }
    }

    /// Enable the interactive fallback. Without a prompt, a missing or
    /// unrefreshable token is reported as [`AuthError::NotLoggedIn`].
    pub fn with_prompt(mut self, prompt: Arc<dyn DeviceCodePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    fn cache(&self) -> &Arc<dyn TokenCache> {
        self.auth.cache()
    }

    /// Acquire a token and report where it came from.
    pub async fn acquire(&self) -> Result<(Token, TokenOrigin), AuthError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_usable()) {
            return Ok((token.clone(), TokenOrigin::Memory));
        }

        let (token, origin) = self.acquire_uncached().await?;
        *current = Some(token.clone());
        Ok((token, origin))
    }

    async fn acquire_uncached(&self) -> Result<(Token, TokenOrigin), AuthError> {
        if let Some(cached) = self.cache().load()? {
            let account = cached
                .account
                .as_ref()
                .map(|a| a.display_name().to_string())
                .unwrap_or_else(|| "unknown account".to_string());
            if cached.token.is_usable() {
                tracing::info!(
                    account = %account,
                    "Using cached token (no authentication required)"
                );
                return Ok((cached.token, TokenOrigin::Cache));
            }
            let refresh_token = cached
                .token
                .refresh_token
                .as_deref()
                .filter(|_| cached.token.can_refresh());
            if let Some(refresh_token) = refresh_token {
                tracing::info!(
                    account = %account,
                    "Cached token expired, attempting silent refresh"
                );
                match self.auth.refresh(refresh_token).await {
                    Ok(token) => return Ok((token, TokenOrigin::Refresh)),
                    Err(err) => {
                        tracing::warn!(error = %err, "Silent token acquisition failed");
                    }
                }
            }
        }

        let Some(prompt) = self.prompt.as_ref() else {
            return Err(AuthError::NotLoggedIn);
        };
        tracing::info!("No valid cached token found, starting device-code sign-in");
        let token = self.device_code_login(prompt.as_ref()).await?;
        Ok((token, TokenOrigin::DeviceCode))
    }

    /// Run the device-code flow to completion.
    ///
    /// The poll interval starts at the server's value and only grows: each
    /// `slow_down` adds to it and later pending answers keep it.
    pub async fn device_code_login(
        &self,
        prompt: &dyn DeviceCodePrompt,
    ) -> Result<Token, AuthError> {
        let mut session = self.auth.start_device_code().await?;
        prompt.show(&session);

        loop {
            tokio::time::sleep(Duration::from_secs(session.interval_secs)).await;
            match self.auth.poll_device_code(&session).await? {
                DeviceCodePoll::Authorized { token } => {
                    tracing::info!(
                        "Authentication successful, token cached for subsequent requests"
                    );
                    return Ok(token);
                }
                DeviceCodePoll::Pending { .. } => {
                    tracing::debug!("Authorization pending");
                }
                DeviceCodePoll::SlowDown { interval_secs } => {
                    tracing::debug!(interval_secs, "Identity platform asked to slow down");
                    session.interval_secs = interval_secs;
                }
                DeviceCodePoll::AccessDenied => return Err(AuthError::AccessDenied),
                DeviceCodePoll::Expired => return Err(AuthError::DeviceCodeExpired),
            }
        }
    }

    /// Drop the in-memory token and delete the cache file.
    pub async fn clear_cache(&self) -> Result<(), AuthError> {
        self.current.lock().await.take();
        self.cache().clear()
    }

    /// Cached credential summary (`None` when not logged in).
    pub fn status(&self) -> Result<Option<AuthStatus>, AuthError> {
        Ok(self.cache().load()?.map(|cached| AuthStatus {
            usable: cached.token.is_usable(),
            can_refresh: cached.token.can_refresh(),
            expires_at: cached.token.expires_at,
            account: cached.account,
        }))
    }
}

#[async_trait]
impl AccessTokenSource for GraphTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let (token, origin) = self.acquire().await?;
        tracing::debug!(origin = %origin, "Access token acquired");
        Ok(token.access_token)
    }

    /// Drop the rejected token and redeem the cached refresh token. The cache
    /// is cleared only when no refresh is possible.
    async fn invalidate(&self) -> Result<(), AuthError> {
        let mut current = self.current.lock().await;
        current.take();

        let refresh_token = self
            .cache()
            .load()?
            .and_then(|cached| cached.token.refresh_token.filter(|r| !r.trim().is_empty()));
        if let Some(refresh_token) = refresh_token {
            match self.auth.refresh(&refresh_token).await {
                Ok(token) => {
                    tracing::info!("Token rejected, refreshed silently");
                    *current = Some(token);
                    return Ok(());
                }
                Err(err) => tracing::warn!(error = %err, "Refresh after rejected token failed"),
            }
        }
        tracing::info!("Token rejected, clearing token cache");
        self.cache().clear()
    }
}

/// Fixed bearer token, for tests and pre-provisioned tokens.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }

    async fn invalidate(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{CachedToken, FileTokenCache};
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn provider(dir: &TempDir) -> (Arc<FileTokenCache>, GraphTokenProvider) {
        let cache = Arc::new(FileTokenCache::new(dir.path().join("token.json"), "client"));
        // Unroutable authority: any network call in these tests is a bug.
        let auth = MicrosoftAuth::new(
            "client",
            "http://127.0.0.1:9/common",
            vec!["Files.ReadWrite".into()],
            cache.clone(),
        );
        (cache, GraphTokenProvider::new(auth))
    }

    fn token(access: &str, expires_in_mins: Option<i64>) -> Token {
        Token {
            access_token: access.to_string(),
            refresh_token: None,
            id_token: None,
            expires_at: expires_in_mins.map(|m| Utc::now() + ChronoDuration::minutes(m)),
            last_refresh: None,
            scopes: None,
            account_id: None,
        }
    }

    #[tokio::test]
    async fn cached_usable_token_is_returned_without_network() {
        let dir = TempDir::new().unwrap();
        let (cache, provider) = provider(&dir);
        cache
            .save(&CachedToken::from_token(token("cached", Some(60))))
            .unwrap();

        let (token, origin) = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "cached");
        assert_eq!(origin, TokenOrigin::Cache);

        let (_, origin) = provider.acquire().await.unwrap();
        assert_eq!(origin, TokenOrigin::Memory);
    }

    #[tokio::test]
    async fn missing_cache_without_prompt_is_not_logged_in() {
        let dir = TempDir::new().unwrap();
        let (_cache, provider) = provider(&dir);
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
    }

    #[tokio::test]
    async fn expired_token_without_refresh_is_not_logged_in() {
        let dir = TempDir::new().unwrap();
        let (cache, provider) = provider(&dir);
        cache
            .save(&CachedToken::from_token(token("stale", Some(-5))))
            .unwrap();
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
    }

    #[tokio::test]
    async fn clear_cache_removes_file_and_memory() {
        let dir = TempDir::new().unwrap();
        let (cache, provider) = provider(&dir);
        cache
            .save(&CachedToken::from_token(token("cached", None)))
            .unwrap();
        provider.acquire().await.unwrap();

        provider.clear_cache().await.unwrap();
        assert!(!cache.path().exists());
        assert!(provider.access_token().await.is_err());
    }

    #[test]
    fn status_reports_expiry_and_refreshability() {
        let dir = TempDir::new().unwrap();
        let (cache, provider) = provider(&dir);
        assert!(provider.status().unwrap().is_none());

        let mut t = token("cached", Some(-1));
        t.refresh_token = Some("r".into());
        cache.save(&CachedToken::from_token(t)).unwrap();

        let status = provider.status().unwrap().unwrap();
        assert!(!status.usable);
        assert!(status.can_refresh);
        assert!(status.expires_at.is_some());
    }

    #[tokio::test]
    async fn static_token_always_returns_value() {
        let source = StaticToken("fixed".into());
        assert_eq!(source.access_token().await.unwrap(), "fixed");
        source.invalidate().await.unwrap();
    }
}
