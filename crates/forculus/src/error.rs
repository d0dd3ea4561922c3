//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use forculus_config::ConfigError;
use forculus_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {source}")]
    #[diagnostic(
        code(forculus::config),
        help(
            "Check the configuration file (default: {path}).\n\
             Run: forculus --validate -c <file>"
        )
    )]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to ZoneMinder at {url}")]
    #[diagnostic(
        code(forculus::connection_failed),
        help(
            "Check that ZoneMinder is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("ZoneMinder request timed out")]
    #[diagnostic(
        code(forculus::timeout),
        help("Increase zoneminder.timeout_secs or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(forculus::auth_failed),
        help(
            "Verify zoneminder.username and the password source\n\
             (password_env, FORCULUS_ZM_PASSWORD, or password)."
        )
    )]
    AuthFailed { message: String },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("ZoneMinder error: {message}")]
    #[diagnostic(code(forculus::api_error))]
    Api { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(forculus::internal))]
    Internal(String),
}

impl From<ConfigError> for CliError {
    fn from(source: ConfigError) -> Self {
        Self::Config {
            source,
            path: forculus_config::config_path().display().to_string(),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => exit_code::CONFIG,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Api { .. } | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::Api { message, status } => Self::Api {
                message: match status {
                    Some(code) => format!("HTTP {code}: {message}"),
                    None => message,
                },
            },
            CoreError::InvalidResponse { message } => Self::Api { message },
            CoreError::Config { message } => Self::Config {
                source: ConfigError::Validation {
                    field: "zoneminder".into(),
                    reason: message,
                },
                path: forculus_config::config_path().display().to_string(),
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
