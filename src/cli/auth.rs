//! CLI auth command handlers for login, status, logout, and test.

use std::io::Write;

use chrono::Utc;

use crate::auth::{DeviceCodePrompt, DeviceCodeSession, TokenCache, TokenOrigin};
use crate::auth::FileTokenCache;
use crate::config::DocAgentConfig;
use crate::error::Result;

/// Prints device-code instructions to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutPrompt;

impl DeviceCodePrompt for StdoutPrompt {
    fn show(&self, session: &DeviceCodeSession) {
        let rule = "=".repeat(60);
        println!("\n{rule}");
        println!("AUTHENTICATION REQUIRED");
        println!("{rule}");
        println!("{}", session.instructions());
        println!("{rule}\n");
        let _ = std::io::stdout().flush();
    }
}

/// Handle `docagent auth login`: always runs the device-code flow.
pub async fn handle_login(config: &DocAgentConfig) -> Result<()> {
    let provider = super::token_provider(config)?;
    provider.device_code_login(&StdoutPrompt).await?;
    if let Some(status) = provider.status()? {
        let who = status
            .account
            .as_ref()
            .map(|a| a.display_name().to_string())
            .unwrap_or_else(|| "unknown account".to_string());
        println!("✅ Signed in as {who}");
    }
    println!("   Token cached at {}", config.token_cache_path.display());
    Ok(())
}

/// Handle `docagent auth status`.
pub async fn handle_status(config: &DocAgentConfig) -> Result<()> {
    let provider = super::token_provider(config)?;
    let Some(status) = provider.status()? else {
        println!("❌ Not signed in (no token cache at {})", config.token_cache_path.display());
        return Ok(());
    };

    let who = status
        .account
        .as_ref()
        .map(|a| a.display_name().to_string())
        .unwrap_or_else(|| "unknown account".to_string());
    println!("Account: {who}");
    match status.expires_at {
        Some(expires_at) if expires_at > Utc::now() => {
            let minutes = (expires_at - Utc::now()).num_minutes();
            println!("Access token: valid for {minutes} more minutes");
        }
        Some(expires_at) => println!("Access token: expired at {expires_at}"),
        None => println!("Access token: no expiry recorded"),
    }
    if status.usable {
        println!("✅ Ready");
    } else if status.can_refresh {
        println!("⚠️  Will refresh silently on next use");
    } else {
        println!("⚠️  Sign-in required on next use");
    }
    Ok(())
}

/// Handle `docagent auth logout`. Works without a configured client id.
pub async fn handle_logout(config: &DocAgentConfig) -> Result<()> {
    let client_id = config.client_id.clone().unwrap_or_default();
    let cache = FileTokenCache::new(&config.token_cache_path, client_id);
    cache.clear()?;
    println!("✅ Token cache cleared");
    Ok(())
}

/// Handle `docagent auth test`: acquire a token and call `/me/drive`.
pub async fn handle_test(config: &DocAgentConfig, clear_cache: bool) -> Result<()> {
    let provider = super::token_provider(config)?;
    if clear_cache {
        provider.clear_cache().await?;
        println!("Token cache cleared");
    }

    let (_, origin) = provider.acquire().await?;
    match origin {
        TokenOrigin::DeviceCode => println!("✅ Signed in with device code"),
        other => println!("✅ Token acquired ({other}, no sign-in needed)"),
    }

    let drive = super::drive_client(config, provider);
    let info = drive.drive_info().await?;
    println!(
        "✅ Graph access confirmed: {} ({})",
        info.name.as_deref().unwrap_or("Unknown"),
        info.drive_type.as_deref().unwrap_or("Unknown type")
    );
    Ok(())
}
