#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use docagent::auth::{
    AccessTokenSource, AuthError, CachedToken, DeviceCodePrompt, DeviceCodeSession, Token,
    TokenCache,
};

#[derive(Default)]
pub struct InMemoryTokenCache {
    entry: Mutex<Option<CachedToken>>,
    saves: AtomicUsize,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(token: Token) -> Self {
        let cache = Self::default();
        *cache.entry.lock().expect("cache lock poisoned") = Some(CachedToken::from_token(token));
        cache
    }

    pub fn get(&self) -> Option<CachedToken> {
        self.entry.lock().expect("cache lock poisoned").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenCache for InMemoryTokenCache {
    fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        Ok(self.get())
    }

    fn save(&self, entry: &CachedToken) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.entry.lock().expect("cache lock poisoned") = Some(entry.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.entry.lock().expect("cache lock poisoned").take();
        Ok(())
    }
}

/// Hands out `token-1`, `token-2`, ... advancing on every invalidation.
#[derive(Default)]
pub struct CountingTokenSource {
    generation: AtomicUsize,
    invalidations: AtomicUsize,
}

impl CountingTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenSource for CountingTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(format!("token-{}", self.generation.load(Ordering::SeqCst) + 1))
    }

    async fn invalidate(&self) -> Result<(), AuthError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records the user codes it was asked to show.
#[derive(Default)]
pub struct RecordingPrompt {
    pub shown: Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn codes(&self) -> Vec<String> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl DeviceCodePrompt for RecordingPrompt {
    fn show(&self, session: &DeviceCodeSession) {
        self.shown
            .lock()
            .expect("prompt lock poisoned")
            .push(session.user_code.clone());
    }
}

pub fn token(access_token: &str) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: None,
        id_token: None,
        expires_at: Some(Utc::now() + Duration::hours(1)),
        last_refresh: Some(Utc::now()),
        scopes: None,
        account_id: None,
    }
}

pub fn expired_token(access_token: &str, refresh_token: &str) -> Token {
    Token {
        refresh_token: Some(refresh_token.to_string()),
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        ..token(access_token)
    }
}

pub const MINIMAL_PDF: &[u8] =
    b"%PDF-1.4\n1 0 obj << /Type /Page >> endobj\ntrailer << >>\n%%EOF\n";
