use thiserror::Error;

/// Top-level error type for the `forculus-api` crate.
///
/// Covers every failure mode of the ZoneMinder HTTP API surface:
/// authentication, transport, non-success responses, and payloads that
/// don't parse. `forculus-core` maps these into its own error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or token refresh was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A refresh was attempted without a live session to refresh.
    #[error("No active session -- login required")]
    NoSession,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured endpoint cannot carry path segments.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Unrecognised server time zone setting.
    #[error("Invalid time zone '{0}': expected 'local', 'utc' or an offset like '+02:00'")]
    InvalidTimeZone(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP response from the API.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A timestamp field did not match the server's date format.
    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A wall-clock time the server's zone skips over.
    #[error("Timestamp '{value}' does not exist in the server time zone")]
    NonexistentTime { value: String },

    /// A numeric field carried as a string did not parse.
    #[error("Invalid count '{value}': {source}")]
    Count {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NoSession)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
