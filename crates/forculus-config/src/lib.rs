//! Configuration for the forculus daemon.
//!
//! TOML file + `FORCULUS_` environment overrides, credential resolution
//! (env + plaintext), validation, and translation to the runtime types of
//! `forculus_api` and `forculus_core`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use forculus_api::{Credentials, Endpoint, ServerTimeZone, TlsMode, TransportConfig};
use forculus_core::WatchConfig;

/// Environment variable consulted for the ZoneMinder password when the
/// config does not name one.
pub const PASSWORD_ENV: &str = "FORCULUS_ZM_PASSWORD";

/// Longest accepted poll or retry interval, in seconds.
const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// Longest accepted look-back or retention span, in seconds.
const MAX_SPAN_SECS: u64 = 366 * 24 * 60 * 60;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no ZoneMinder {missing} configured")]
    NoCredentials { missing: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub zoneminder: ZoneMinder,

    #[serde(default)]
    pub watch: Watch,

    #[serde(default)]
    pub logging: Logging,
}

/// Where ZoneMinder lives and how to log in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneMinder {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub host: String,

    pub port: Option<u16>,

    /// Path ZoneMinder is served under, e.g. "zm".
    pub root_path: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Zone the server records event times in: "local" (default), "utc",
    /// or a fixed offset such as "+02:00".
    pub timezone: Option<String>,
}

impl Default for ZoneMinder {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: String::new(),
            port: None,
            root_path: None,
            username: None,
            password: None,
            password_env: None,
            insecure: false,
            ca_cert: None,
            timeout_secs: default_timeout(),
            timezone: None,
        }
    }
}

fn default_scheme() -> String {
    "https".into()
}
fn default_timeout() -> u64 {
    30
}

/// Watcher timing and bus sizing. All durations in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Watch {
    pub poll_interval_secs: u64,
    pub event_lookback_secs: u64,
    pub seen_event_ttl_secs: u64,
    pub bootstrap_window_secs: u64,
    pub bootstrap_retry_secs: u64,
    pub mailbox_capacity: usize,
}

impl Default for Watch {
    fn default() -> Self {
        let runtime = WatchConfig::default();
        Self {
            poll_interval_secs: runtime.poll_interval.as_secs(),
            event_lookback_secs: runtime.event_lookback.as_secs(),
            seen_event_ttl_secs: runtime.seen_event_ttl.as_secs(),
            bootstrap_window_secs: runtime.bootstrap_window.as_secs(),
            bootstrap_retry_secs: runtime.bootstrap_retry.as_secs(),
            mailbox_capacity: runtime.mailbox_capacity,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Logging {
    #[serde(default)]
    pub format: LogFormat,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "forculus", "forculus").map_or_else(
        || PathBuf::from("forculus.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from file + environment.
///
/// An explicitly given path must exist; the default path may be absent,
/// in which case only defaults and environment apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => {
            if !p.is_file() {
                return Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("config file not found: {}", p.display()),
                )));
            }
            p.to_path_buf()
        }
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("FORCULUS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

impl Config {
    /// Check everything that can be checked without network access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zm = &self.zoneminder;
        if zm.host.trim().is_empty() {
            return Err(invalid("zoneminder.host", "must not be empty"));
        }
        if !matches!(zm.scheme.as_str(), "http" | "https") {
            return Err(invalid(
                "zoneminder.scheme",
                format!("expected 'http' or 'https', got '{}'", zm.scheme),
            ));
        }
        if zm.timeout_secs == 0 {
            return Err(invalid("zoneminder.timeout_secs", "must be greater than zero"));
        }
        if let Some(ca) = &zm.ca_cert {
            if !ca.is_file() {
                return Err(invalid(
                    "zoneminder.ca_cert",
                    format!("{} does not exist", ca.display()),
                ));
            }
        }

        self.time_zone()?;

        let watch = &self.watch;
        for (field, value, min, max) in [
            ("watch.poll_interval_secs", watch.poll_interval_secs, 1, MAX_INTERVAL_SECS),
            ("watch.bootstrap_retry_secs", watch.bootstrap_retry_secs, 1, MAX_INTERVAL_SECS),
            ("watch.event_lookback_secs", watch.event_lookback_secs, 0, MAX_SPAN_SECS),
            ("watch.seen_event_ttl_secs", watch.seen_event_ttl_secs, 1, MAX_SPAN_SECS),
            ("watch.bootstrap_window_secs", watch.bootstrap_window_secs, 1, MAX_SPAN_SECS),
        ] {
            if !(min..=max).contains(&value) {
                return Err(invalid(field, format!("must be between {min} and {max}")));
            }
        }
        if watch.mailbox_capacity == 0 {
            return Err(invalid("watch.mailbox_capacity", "must be greater than zero"));
        }

        self.credentials()?;
        self.endpoint()?;
        Ok(())
    }

    /// Resolve username and password.
    ///
    /// Password order: the variable named by `password_env`, then
    /// `FORCULUS_ZM_PASSWORD`, then the plaintext `password`.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let zm = &self.zoneminder;
        let username = zm
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::NoCredentials {
                missing: "username".into(),
            })?;

        // 1. Config-named env var
        if let Some(ref env_name) = zm.password_env {
            if let Ok(pw) = std::env::var(env_name) {
                return Ok(Credentials::new(username, SecretString::from(pw)));
            }
        }

        // 2. Well-known env var
        if let Ok(pw) = std::env::var(PASSWORD_ENV) {
            return Ok(Credentials::new(username, SecretString::from(pw)));
        }

        // 3. Plaintext in config
        if let Some(ref pw) = zm.password {
            return Ok(Credentials::new(username, SecretString::from(pw.clone())));
        }

        Err(ConfigError::NoCredentials {
            missing: "password".into(),
        })
    }

    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let zm = &self.zoneminder;
        let endpoint = Endpoint {
            scheme: zm.scheme.clone(),
            host: zm.host.trim().to_owned(),
            port: zm.port,
            root_path: zm.root_path.clone().filter(|p| !p.trim_matches('/').is_empty()),
        };
        endpoint
            .base_url()
            .map_err(|e| invalid("zoneminder.host", e.to_string()))?;
        Ok(endpoint)
    }

    /// The server's time zone; "local" when unset.
    pub fn time_zone(&self) -> Result<ServerTimeZone, ConfigError> {
        self.zoneminder
            .timezone
            .as_deref()
            .map_or(Ok(ServerTimeZone::Local), str::parse)
            .map_err(|e| invalid("zoneminder.timezone", e.to_string()))
    }

    pub fn transport(&self) -> TransportConfig {
        let zm = &self.zoneminder;
        let tls = if zm.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = zm.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(zm.timeout_secs),
        }
    }

    pub fn watch_config(&self) -> WatchConfig {
        let w = &self.watch;
        WatchConfig {
            poll_interval: Duration::from_secs(w.poll_interval_secs),
            event_lookback: Duration::from_secs(w.event_lookback_secs),
            seen_event_ttl: Duration::from_secs(w.seen_event_ttl_secs),
            bootstrap_window: Duration::from_secs(w.bootstrap_window_secs),
            bootstrap_retry: Duration::from_secs(w.bootstrap_retry_secs),
            mailbox_capacity: w.mailbox_capacity,
        }
    }

    /// The effective config as TOML, with the plaintext password masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.zoneminder.password.is_some() {
            shown.zoneminder.password = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use figment::Jail;
    use secrecy::ExposeSecret;

    use super::*;

    const BASIC: &str = r#"
        [zoneminder]
        scheme = "http"
        host = "zm.local"
        port = 8080
        root_path = "zm"
        username = "admin"
        password = "from-file"

        [watch]
        poll_interval_secs = 3

        [logging]
        format = "json"
    "#;

    fn load_in_jail(jail: &mut Jail, contents: &str) -> Result<Config, figment::Error> {
        jail.create_file("forculus.toml", contents)?;
        load_config(Some(Path::new("forculus.toml"))).map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn file_values_and_defaults_merge() {
        Jail::expect_with(|jail| {
            let config = load_in_jail(jail, BASIC)?;

            assert_eq!(config.zoneminder.host, "zm.local");
            assert_eq!(config.zoneminder.timeout_secs, 30);
            assert_eq!(config.watch.poll_interval_secs, 3);
            assert_eq!(config.watch.mailbox_capacity, 15);
            assert_eq!(config.watch.seen_event_ttl_secs, 1800);
            assert_eq!(config.logging.format, LogFormat::Json);

            let watch = config.watch_config();
            assert_eq!(watch.poll_interval, Duration::from_secs(3));
            assert_eq!(watch.event_lookback, Duration::from_secs(30));

            let endpoint = config.endpoint().unwrap();
            assert_eq!(
                endpoint.base_url().unwrap().as_str(),
                "http://zm.local:8080/zm"
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.set_env("FORCULUS_ZONEMINDER__HOST", "nvr.example");
            jail.set_env("FORCULUS_WATCH__MAILBOX_CAPACITY", "40");
            let config = load_in_jail(jail, BASIC)?;

            assert_eq!(config.zoneminder.host, "nvr.example");
            assert_eq!(config.watch.mailbox_capacity, 40);
            Ok(())
        });
    }

    #[test]
    fn password_resolution_order() {
        Jail::expect_with(|jail| {
            let mut config = load_in_jail(jail, BASIC)?;
            assert_eq!(config.credentials().unwrap().password.expose_secret(), "from-file");

            jail.set_env(PASSWORD_ENV, "from-well-known-env");
            assert_eq!(
                config.credentials().unwrap().password.expose_secret(),
                "from-well-known-env"
            );

            jail.set_env("MY_ZM_PASS", "from-named-env");
            config.zoneminder.password_env = Some("MY_ZM_PASS".into());
            let creds = config.credentials().unwrap();
            assert_eq!(creds.username, "admin");
            assert_eq!(creds.password.expose_secret(), "from-named-env");
            Ok(())
        });
    }

    #[test]
    fn validation_names_the_field() {
        Jail::expect_with(|jail| {
            let mut config = load_in_jail(jail, BASIC)?;
            assert!(config.validate().is_ok());

            config.watch.poll_interval_secs = 0;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("watch.poll_interval_secs"), "{err}");

            config.watch.poll_interval_secs = 2;
            config.zoneminder.scheme = "ftp".into();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("zoneminder.scheme"), "{err}");

            config.zoneminder.scheme = "https".into();
            config.zoneminder.host = "  ".into();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("zoneminder.host"), "{err}");
            Ok(())
        });
    }

    #[test]
    fn oversized_watch_spans_are_rejected() {
        Jail::expect_with(|jail| {
            let mut config = load_in_jail(jail, BASIC)?;

            config.watch.bootstrap_window_secs = 9_223_372_036_854_775_807;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("watch.bootstrap_window_secs"), "{err}");

            config.watch.bootstrap_window_secs = 1800;
            config.watch.event_lookback_secs = u64::MAX;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("watch.event_lookback_secs"), "{err}");

            config.watch.event_lookback_secs = 0;
            assert!(config.validate().is_ok());

            config.watch.poll_interval_secs = MAX_INTERVAL_SECS + 1;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("watch.poll_interval_secs"), "{err}");
            Ok(())
        });
    }

    #[test]
    fn time_zone_setting_is_parsed_and_validated() {
        Jail::expect_with(|jail| {
            let mut config = load_in_jail(jail, BASIC)?;
            assert_eq!(config.time_zone().unwrap(), ServerTimeZone::Local);

            jail.set_env("FORCULUS_ZONEMINDER__TIMEZONE", "+02:00");
            let config_env = load_config(Some(Path::new("forculus.toml"))).unwrap();
            assert_eq!(config_env.time_zone().unwrap().to_string(), "+02:00");

            config.zoneminder.timezone = Some("Mars/Olympus".into());
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("zoneminder.timezone"), "{err}");
            Ok(())
        });
    }

    #[test]
    fn missing_username_is_reported() {
        Jail::expect_with(|jail| {
            let config = load_in_jail(jail, "[zoneminder]\nhost = \"zm.local\"\npassword = \"x\"\n")?;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::NoCredentials { missing }) if missing == "username"
            ));
            Ok(())
        });
    }

    #[test]
    fn transport_follows_tls_settings() {
        let mut config = Config::default();
        assert!(matches!(config.transport().tls, TlsMode::System));

        config.zoneminder.ca_cert = Some("/etc/zm/ca.pem".into());
        assert!(matches!(config.transport().tls, TlsMode::CustomCa(_)));

        config.zoneminder.insecure = true;
        assert!(matches!(config.transport().tls, TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(load_config(Some(&missing)), Err(ConfigError::Io(_))));
    }

    #[test]
    fn malformed_file_is_a_figment_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[zoneminder\nhost = ").unwrap();
        assert!(matches!(load_config(Some(file.path())), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn redacted_toml_masks_password() {
        let mut config = Config::default();
        config.zoneminder.password = Some("hunter2".into());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("poll_interval_secs = 2"));
    }
}
