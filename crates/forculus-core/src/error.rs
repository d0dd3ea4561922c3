// ── Core error types ──
//
// User-facing errors from forculus-core. Consumers never see HTTP status
// codes or JSON parse failures directly; `From<forculus_api::Error>`
// translates transport-layer errors into these variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to ZoneMinder at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("ZoneMinder request timed out")]
    Timeout,

    // ── Upstream errors (wrapped, not exposed raw) ───────────────────
    #[error("ZoneMinder API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Unexpected response from ZoneMinder: {message}")]
    InvalidResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<forculus_api::Error> for CoreError {
    fn from(err: forculus_api::Error) -> Self {
        use forculus_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::NoSession => CoreError::AuthenticationFailed {
                message: "no active session -- login required".into(),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid ZoneMinder URL: {e}"),
            },
            ApiError::InvalidEndpoint(message) | ApiError::Tls(message) => {
                CoreError::Config { message }
            }
            err @ ApiError::InvalidTimeZone(_) => CoreError::Config {
                message: err.to_string(),
            },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, .. } => CoreError::InvalidResponse { message },
            err @ (ApiError::Timestamp { .. }
            | ApiError::NonexistentTime { .. }
            | ApiError::Count { .. }) => {
                CoreError::InvalidResponse {
                    message: err.to_string(),
                }
            }
        }
    }
}
