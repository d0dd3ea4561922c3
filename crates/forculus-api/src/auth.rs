// ZoneMinder token authentication
//
// `api/host/login.json` issues an access/refresh token pair for a
// username and password, and a fresh access token when called with
// `?token=<refresh>`. `check_login` decides between the two.

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::client::{ZmClient, decode, preview};
use crate::error::Error;
use crate::models::LoginDetails;
use crate::session::{LoginSession, SessionAction};

impl ZmClient {
    /// Log in with the configured credentials, replacing any session.
    pub async fn login(&self) -> Result<(), Error> {
        let mut session = self.session.lock().await;
        *session = Some(self.request_login().await?);
        Ok(())
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh_login(&self) -> Result<(), Error> {
        let mut session = self.session.lock().await;
        let live = session.as_mut().ok_or(Error::NoSession)?;
        self.request_refresh(live).await
    }

    /// Make sure a usable session exists, logging in or refreshing as
    /// needed, and return the access token to attach to the next request.
    ///
    /// The session lock is held across the decision and the network
    /// exchange.
    pub async fn check_login(&self) -> Result<String, Error> {
        let mut session = self.session.lock().await;
        let now = Utc::now();

        let action = session
            .as_ref()
            .map_or(SessionAction::Login, |s| s.required_action(now));

        match action {
            SessionAction::None => {}
            SessionAction::Refresh => {
                if let Some(live) = session.as_mut() {
                    if let Err(e) = self.request_refresh(live).await {
                        if e.is_auth_expired() {
                            *session = None;
                        }
                        return Err(e);
                    }
                }
            }
            SessionAction::Login => {
                // Drop an expired session before the attempt so a failed
                // login does not leave stale tokens behind.
                *session = None;
                *session = Some(self.request_login().await?);
            }
        }

        session
            .as_ref()
            .map(|s| s.access_token().to_owned())
            .ok_or(Error::NoSession)
    }

    async fn request_login(&self) -> Result<LoginSession, Error> {
        let url = self.api_url(&["host", "login.json"])?;
        let creds = self.credentials();
        debug!(user = %creds.username, "logging in");

        let resp = self
            .http()
            .post(url)
            .form(&[
                ("user", creds.username.as_str()),
                ("pass", creds.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let details = auth_response(resp, "login").await?;
        let session = LoginSession::from_login(details, Utc::now());
        info!(
            api_version = session.api_version().unwrap_or("unknown"),
            server_version = session.server_version().unwrap_or("unknown"),
            "logged in to ZoneMinder"
        );
        Ok(session)
    }

    async fn request_refresh(&self, session: &mut LoginSession) -> Result<(), Error> {
        let refresh = session.refresh_token().ok_or(Error::NoSession)?;

        let mut url = self.api_url(&["host", "login.json"])?;
        url.query_pairs_mut().append_pair("token", refresh);
        debug!("refreshing access token");

        let resp = self
            .http()
            .get(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        let details = auth_response(resp, "token refresh").await?;
        session.apply_refresh(details, Utc::now());
        debug!("access token refreshed");
        Ok(())
    }
}

/// A client-error status on the login endpoint is an authentication error;
/// server errors stay API errors so callers can retry them.
async fn auth_response(resp: reqwest::Response, what: &str) -> Result<LoginDetails, Error> {
    let status = resp.status();
    if status.is_server_error() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: format!("{what} failed: {}", preview(&body)),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("{what} failed (HTTP {status}): {}", preview(&body)),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    decode(&body)
}
