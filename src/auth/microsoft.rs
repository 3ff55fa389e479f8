//! Microsoft identity platform (v2.0) device-code and refresh-token grants.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::device_code::{DeviceCodePoll, DeviceCodeSession};
use crate::auth::error::AuthError;
use crate::auth::store::{CachedToken, TokenCache};
use crate::auth::token::Token;
use crate::config::DocAgentConfig;
use crate::graph::http::shared_client;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Added on the wire so the platform issues an id token and a refresh token.
const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// Public-client OAuth helper for Microsoft Graph.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use docagent::auth::{FileTokenCache, MicrosoftAuth};
///
/// let cache = Arc::new(FileTokenCache::new("token.json", "client-id"));
/// let auth = MicrosoftAuth::new(
///     "client-id",
///     "https://login.microsoftonline.com/common",
///     vec!["https://graph.microsoft.com/Files.ReadWrite".to_string()],
///     cache,
/// );
/// ```
pub struct MicrosoftAuth {
    client: reqwest::Client,
    client_id: String,
    device_code_url: String,
    token_url: String,
    scopes: Vec<String>,
    cache: Arc<dyn TokenCache>,
}

impl MicrosoftAuth {
    pub fn new(
        client_id: impl Into<String>,
        authority: impl AsRef<str>,
        scopes: Vec<String>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        let authority = authority.as_ref().trim_end_matches('/');
        Self {
            client: shared_client(),
            client_id: client_id.into(),
            device_code_url: format!("{authority}/oauth2/v2.0/devicecode"),
            token_url: format!("{authority}/oauth2/v2.0/token"),
            scopes,
            cache,
        }
    }

    /// Build from config; fails when no client id is configured.
    pub fn from_config(
        config: &DocAgentConfig,
        cache: Arc<dyn TokenCache>,
    ) -> Result<Self, AuthError> {
        let client_id = config.client_id.clone().ok_or_else(|| {
            AuthError::NotConfigured("Set MICROSOFT_CLIENT_ID in .env file".into())
        })?;
        Ok(Self::new(
            client_id,
            config.authority(),
            config.scopes.clone(),
            cache,
        ))
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn cache(&self) -> &Arc<dyn TokenCache> {
        &self.cache
    }

    /// Space-separated scope string sent to the token endpoints.
    pub fn scope_param(&self) -> String {
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        for reserved in RESERVED_SCOPES {
            if !scopes.contains(&reserved) {
                scopes.push(reserved);
            }
        }
        scopes.join(" ")
    }

    pub async fn start_device_code(&self) -> Result<DeviceCodeSession, AuthError> {
        let scope = self.scope_param();
        let resp = self
            .client
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        let payload: DeviceCodeResponse = serde_json::from_str(&body).map_err(|_| {
            AuthError::InvalidResponse(format!(
                "Device code request failed with status {status}"
            ))
        })?;

        let (Some(user_code), Some(device_code)) = (payload.user_code, payload.device_code) else {
            let detail = payload
                .error_description
                .or(payload.error)
                .unwrap_or_else(|| format!("status {status}"));
            return Err(AuthError::InvalidResponse(format!(
                "Failed to create device flow: {detail}"
            )));
        };

        let expires_in = payload.expires_in.as_ref().and_then(seconds).unwrap_or(900);
        let interval = payload.interval.as_ref().and_then(seconds).unwrap_or(5);
        Ok(DeviceCodeSession {
            verification_url: payload
                .verification_uri
                .unwrap_or_else(|| "https://microsoft.com/devicelogin".to_string()),
            user_code,
            device_code,
            interval_secs: interval.max(1) as u64,
            expires_at: Utc::now() + Duration::seconds(expires_in),
            message: payload.message,
        })
    }

    pub async fn poll_device_code(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError> {
        if Utc::now() >= session.expires_at {
            return Ok(DeviceCodePoll::Expired);
        }
        let payload = self
            .token_request(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
            ])
            .await?;

        if payload.access_token.is_some() {
            let token = payload.into_token(None);
            self.cache.save(&CachedToken::from_token(token.clone()))?;
            return Ok(DeviceCodePoll::Authorized { token });
        }
        match payload.error.as_deref() {
            Some("authorization_pending") => Ok(DeviceCodePoll::Pending {
                interval_secs: session.interval_secs,
            }),
            Some("slow_down") => Ok(DeviceCodePoll::SlowDown {
                interval_secs: session.interval_secs + SLOW_DOWN_INCREMENT_SECS,
            }),
            Some("authorization_declined") | Some("access_denied") => {
                Ok(DeviceCodePoll::AccessDenied)
            }
            Some("expired_token") | Some("code_expired") | Some("bad_verification_code") => {
                Ok(DeviceCodePoll::Expired)
            }
            Some(other) => Err(AuthError::InvalidResponse(format!(
                "Device code error: {other}: {}",
                payload.error_description.unwrap_or_default()
            ))),
            None => Err(AuthError::InvalidResponse(
                "Device code response missing token and error".to_string(),
            )),
        }
    }

    /// Redeem a refresh token and persist the result. Fields the response
    /// leaves out (refresh token, id token, account) carry over from the cache.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let scope = self.scope_param();
        let payload = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .await?;

        if payload.access_token.is_some() {
            let token = payload.into_token(Some(refresh_token));
            let entry = carry_over_identity(token, self.cache.load()?);
            self.cache.save(&entry)?;
            return Ok(entry.token);
        }
        match payload.error.as_deref() {
            Some("invalid_grant") | Some("interaction_required") | Some("expired_token") => {
                Err(AuthError::ExpiredOrInvalidGrant)
            }
            Some(other) => Err(AuthError::InvalidResponse(format!(
                "Token refresh error: {other}: {}",
                payload.error_description.unwrap_or_default()
            ))),
            None => Err(AuthError::InvalidResponse(
                "Refresh response missing token and error".to_string(),
            )),
        }
    }

    /// POST to the token endpoint. OAuth errors arrive as HTTP 400 with a
    /// JSON body, so the body is parsed before the status is judged.
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            return Err(AuthError::RateLimited { retry_after_ms });
        }
        let body = resp.text().await?;
        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(payload) => Ok(payload),
            Err(_) => Err(AuthError::InvalidResponse(format!(
                "Token request failed with status {status}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: Option<String>,
    user_code: Option<String>,
    verification_uri: Option<String>,
    expires_in: Option<serde_json::Value>,
    interval: Option<serde_json::Value>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id_token: Option<String>,
    scope: Option<String>,
    expires_in: Option<serde_json::Value>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<&str>) -> Token {
        let now = Utc::now();
        let account_id = self
            .id_token
            .as_deref()
            .and_then(crate::auth::Account::from_id_token)
            .and_then(|a| a.object_id);
        Token {
            access_token: self.access_token.unwrap_or_default(),
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            id_token: self.id_token,
            expires_at: self
                .expires_in
                .as_ref()
                .and_then(seconds)
                .map(|secs| now + Duration::seconds(secs)),
            last_refresh: Some(now),
            scopes: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect()),
            account_id,
        }
    }
}

/// Keep the previous id token and account when a refresh response has none.
fn carry_over_identity(mut token: Token, previous: Option<CachedToken>) -> CachedToken {
    let Some(previous) = previous.filter(|_| token.id_token.is_none()) else {
        return CachedToken::from_token(token);
    };
    token.id_token = previous.token.id_token;
    if token.account_id.is_none() {
        token.account_id = previous.token.account_id;
    }
    CachedToken {
        account: previous.account,
        token,
    }
}

/// Durations arrive as numbers, or as strings from older endpoints.
fn seconds(value: &serde_json::Value) -> Option<i64> {
    if let Some(num) = value.as_i64() {
        return Some(num);
    }
    value.as_str().and_then(|text| text.trim().parse().ok())
}
