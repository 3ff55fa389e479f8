//! Microsoft Graph sign-in: device-code flow, refresh, and the token cache.

pub mod account;
pub mod device_code;
pub mod error;
pub mod microsoft;
pub mod service;
pub mod store;
pub mod token;

pub use account::Account;
pub use device_code::{DeviceCodePoll, DeviceCodeSession};
pub use error::AuthError;
pub use microsoft::MicrosoftAuth;
pub use service::{
    AccessTokenSource, AuthStatus, DeviceCodePrompt, GraphTokenProvider, StaticToken, TokenOrigin,
};
pub use store::{CachedToken, FileTokenCache, TokenCache};
pub use token::Token;
