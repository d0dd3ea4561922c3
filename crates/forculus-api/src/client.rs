// ZoneMinder API HTTP client
//
// Wraps `reqwest::Client` with ZoneMinder URL construction, token query
// injection and response decoding. Endpoint groups (auth, monitors,
// events) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::models::ServerTimeZone;
use crate::session::{Credentials, LoginSession};
use crate::transport::TransportConfig;

const PREVIEW_CHARS: usize = 200;

/// Where the ZoneMinder web root lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path prefix ZoneMinder is mounted under, e.g. `zm`.
    pub root_path: Option<String>,
}

impl Endpoint {
    /// Resolve to a base URL that API paths are appended to.
    pub fn base_url(&self) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}://{}", self.scheme, self.host))?;
        url.set_port(self.port)
            .map_err(|()| Error::InvalidEndpoint(format!("{} cannot carry a port", self.host)))?;

        if let Some(root) = self.root_path.as_deref() {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidEndpoint(format!("{} is not a base URL", self.host)))?;
            segments.pop_if_empty();
            segments.extend(root.split('/').filter(|s| !s.is_empty()));
        }

        Ok(url)
    }
}

/// Async client for the ZoneMinder JSON API.
///
/// Every authenticated call runs [`ZmClient::check_login`] first, so
/// callers never manage tokens themselves. The session lock is held for
/// the whole login/refresh exchange; concurrent callers wait for it
/// rather than racing a second login.
pub struct ZmClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    time_zone: ServerTimeZone,
    pub(crate) session: Mutex<Option<LoginSession>>,
}

impl ZmClient {
    pub fn new(
        endpoint: &Endpoint,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Self::with_base_url(endpoint.base_url()?, credentials, transport)
    }

    /// Create a client against an already-resolved base URL.
    pub fn with_base_url(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(base_url.to_string()));
        }
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            credentials,
            time_zone: ServerTimeZone::default(),
            session: Mutex::new(None),
        })
    }

    /// Zone the server writes event times in. Defaults to this host's.
    pub fn with_time_zone(mut self, time_zone: ServerTimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn time_zone(&self) -> ServerTimeZone {
        self.time_zone
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`. Segments are percent-encoded, so
    /// ZoneMinder filter expressions like `StartTime >=:...` can be passed
    /// through verbatim.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidEndpoint(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.push("api");
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET: ensures a live session, attaches the access token
    /// and decodes the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let token = self.check_login().await?;

        let mut url = self.api_url(segments)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("token", &token);
        }

        debug!(path = url.path(), "GET");
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        let result = parse_response(resp).await;
        if result.as_ref().is_err_and(Error::is_auth_expired) {
            warn!("server rejected access token, dropping session");
            *self.session.lock().await = None;
        }
        result
    }
}

/// Map the HTTP status and decode the body.
pub(crate) async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "access token expired or invalid credentials".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    decode(&body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

/// First few hundred characters of a body, cut on a char boundary.
pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
