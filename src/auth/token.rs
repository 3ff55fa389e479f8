use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens this close to expiry are treated as already expired.
pub const EXPIRY_SKEW_SECS: i64 = 300;

/// OAuth token payload stored in the token cache.
///
/// # Example
/// ```
/// use docagent::auth::Token;
/// use chrono::{Duration, Utc};
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     id_token: None,
///     expires_at: Some(Utc::now() + Duration::hours(1)),
///     last_refresh: Some(Utc::now()),
///     scopes: Some(vec!["Files.ReadWrite".to_string()]),
///     account_id: None,
/// };
/// assert!(token.is_usable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
    pub account_id: Option<String>,
}

impl Token {
    /// Whether the access token can still be sent to Graph.
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(exp) => exp - now > Duration::seconds(EXPIRY_SKEW_SECS),
            None => true,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}
