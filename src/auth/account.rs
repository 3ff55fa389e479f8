//! Signed-in account details read from the id token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Account the cached token belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: Option<String>,
    pub name: Option<String>,
    pub object_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl Account {
    /// Decode the claims segment of an id token.
    ///
    /// The signature is not checked; the result only labels the cache entry.
    pub fn from_id_token(id_token: &str) -> Option<Self> {
        let payload = id_token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
        Some(Self {
            username: claims.preferred_username.or(claims.upn).or(claims.email),
            name: claims.name,
            object_id: claims.oid,
            tenant_id: claims.tid,
        })
    }

    /// Best human-readable label.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.name.as_deref())
            .or(self.object_id.as_deref())
            .unwrap_or("unknown account")
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    preferred_username: Option<String>,
    upn: Option<String>,
    email: Option<String>,
    name: Option<String>,
    oid: Option<String>,
    tid: Option<String>,
}
