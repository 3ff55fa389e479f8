//! Error classification and recovery hints.

use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Server,
    Api,
    NotFound,
    Configuration,
    Serialization,
    FileSystem,
    Integrity,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RecoverySuggestion {
    #[strum(to_string = "retry later")]
    RetryWithBackoff,
    #[strum(to_string = "run `docagent auth test --clear-cache` to sign in again")]
    SignInAgain,
    #[strum(to_string = "check MICROSOFT_CLIENT_ID and related settings in .env")]
    CheckConfiguration,
    #[strum(to_string = "check the OneDrive folder path")]
    CheckPath,
    #[strum(to_string = "run `docagent ingest --force-redownload`")]
    ForceRedownload,
    #[strum(to_string = "re-run with RUST_LOG=docagent=debug for details")]
    InspectLogs,
}
