// Login session state for the ZoneMinder token API.
//
// ZoneMinder hands out a short-lived access token and a longer-lived
// refresh token. The session records when it was created and when the
// access token was last renewed; `required_action` turns that into the
// next step the client must take before an authenticated call.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::models::LoginDetails;

/// Username/password pair used for a full login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// What the client must do before its next authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// The session is usable as-is.
    None,
    /// The access token lapsed; exchange the refresh token for a new one.
    Refresh,
    /// The refresh token lapsed (or there is none); log in from scratch.
    Login,
}

/// An authenticated ZoneMinder session.
pub struct LoginSession {
    access_token: SecretString,
    access_lifetime: TimeDelta,
    refresh_token: Option<SecretString>,
    refresh_lifetime: TimeDelta,
    created: DateTime<Utc>,
    last_refresh: DateTime<Utc>,
    api_version: Option<String>,
    server_version: Option<String>,
}

impl LoginSession {
    /// Start a session from a full login response.
    pub fn from_login(details: LoginDetails, now: DateTime<Utc>) -> Self {
        let access_lifetime = lifetime(details.access_token_expires);
        let refresh_lifetime = details
            .refresh_token_expires
            .map_or(access_lifetime, lifetime);

        Self {
            access_token: SecretString::from(details.access_token),
            access_lifetime,
            refresh_token: details.refresh_token.map(SecretString::from),
            refresh_lifetime,
            created: now,
            last_refresh: now,
            api_version: details.api_version,
            server_version: details.version,
        }
    }

    /// Apply a refresh response. The creation time is left untouched so
    /// the refresh-token lifetime keeps counting from the original login.
    pub fn apply_refresh(&mut self, details: LoginDetails, now: DateTime<Utc>) {
        self.access_token = SecretString::from(details.access_token);
        self.access_lifetime = lifetime(details.access_token_expires);
        self.last_refresh = now;
    }

    pub fn required_action(&self, now: DateTime<Utc>) -> SessionAction {
        if self.is_expired(now) {
            return SessionAction::Login;
        }
        if now - self.last_refresh >= self.access_lifetime {
            if self.refresh_token.is_none() {
                return SessionAction::Login;
            }
            return SessionAction::Refresh;
        }
        SessionAction::None
    }

    /// Whether the refresh token has lapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created >= self.refresh_lifetime
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(ExposeSecret::expose_secret)
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn last_refresh(&self) -> DateTime<Utc> {
        self.last_refresh
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("created", &self.created)
            .field("last_refresh", &self.last_refresh)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Seconds from the server into a lifetime. Negative, NaN or infinite
/// values count as already lapsed.
fn lifetime(secs: f64) -> TimeDelta {
    Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .unwrap_or(TimeDelta::zero())
}
