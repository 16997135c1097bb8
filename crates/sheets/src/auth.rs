//! Refresh-token authentication for the Sheets API.
//!
//! Credentials are the `authorized_user` JSON that Google's OAuth tooling
//! writes after a one-time consent. Access tokens are minted from the
//! refresh token on demand and reused until shortly before they expire.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Google's OAuth token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Contents of `token.json`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    #[serde(rename = "type")]
    pub kind: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl AuthorizedUser {
    /// Load and check a token file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::TokenFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse token file contents.
    pub fn parse(content: &str) -> Result<Self> {
        let user: Self = serde_json::from_str(content)
            .map_err(|e| Error::Credentials(format!("malformed token file: {e}")))?;
        if user.kind != "authorized_user" {
            return Err(Error::Credentials(format!(
                "expected an authorized_user token, found {}",
                user.kind
            )));
        }
        if user.refresh_token.trim().is_empty() {
            return Err(Error::Credentials("token file has no refresh_token".into()));
        }
        Ok(user)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A minted access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token can still be sent at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Mints and caches access tokens
pub struct Authenticator {
    agent: ureq::Agent,
    credentials: AuthorizedUser,
    token_url: String,
    cached: Mutex<Option<AccessToken>>,
}

impl Authenticator {
    #[must_use]
    pub fn new(credentials: AuthorizedUser) -> Self {
        Self::with_token_url(credentials, TOKEN_URL)
    }

    /// Create an authenticator against a custom token endpoint (for testing).
    #[must_use]
    pub fn with_token_url(credentials: AuthorizedUser, token_url: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            credentials,
            token_url: token_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// A valid access token, refreshed if the cached one is stale.
    pub fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        if let Some(token) = cached.as_ref()
            && token.is_fresh(now)
        {
            return Ok(token.token.clone());
        }

        let token = self.refresh(now)?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn refresh(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        log::debug!("Refreshing Sheets access token");
        let response: TokenResponse = self
            .agent
            .post(&self.token_url)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])?
            .body_mut()
            .read_json()?;

        if response.access_token.is_empty() {
            return Err(Error::Credentials("token endpoint returned no access token".into()));
        }

        Ok(AccessToken {
            token: response.access_token,
            expires_at: now + TimeDelta::seconds(response.expires_in.unwrap_or(3600)),
        })
    }
}
