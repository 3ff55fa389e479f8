use chrono::{DateTime, Utc};

use super::Token;

/// Device-code session returned by the `devicecode` endpoint.
///
/// # Example
/// ```no_run
/// use docagent::auth::DeviceCodeSession;
/// use chrono::{DateTime, Utc};
///
/// let session = DeviceCodeSession {
///     verification_url: "https://microsoft.com/devicelogin".to_string(),
///     user_code: "ABCD1234".to_string(),
///     device_code: "device-code".to_string(),
///     interval_secs: 5,
///     expires_at: DateTime::<Utc>::from(std::time::SystemTime::now()),
///     message: None,
/// };
/// println!("{}", session.instructions());
/// ```
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    pub verification_url: String,
    pub user_code: String,
    pub device_code: String,
    pub interval_secs: u64,
    pub expires_at: DateTime<Utc>,
    /// Localized sign-in instructions supplied by the identity platform.
    pub message: Option<String>,
}

impl DeviceCodeSession {
    /// Text to show the user.
    pub fn instructions(&self) -> String {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                self.verification_url, self.user_code
            ),
        }
    }
}

/// Polling outcome for a device-code session.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending { interval_secs: u64 },
    SlowDown { interval_secs: u64 },
    Authorized { token: Token },
    AccessDenied,
    Expired,
}
