//! Authenticated request gateway.
//!
//! [`AuthGateway::fetch`] attaches credentials, sends the request and, when
//! the API answers 401, refreshes the session once and retries once:
//!
//! ```text
//! dispatch ──► status != 401 or retry disabled ──► response
//!    │
//!    └─ 401 ──► POST /api/auth/refresh ──ok──► persist rotated tokens ──► dispatch again ──► response
//!                          │
//!                          └─ failed ──► clear session ──► original 401
//! ```
//!
//! There is never a second refresh or a second retry. Transport errors are
//! returned as [`Error::Http`] and never count as a 401.

mod request;

#[cfg(test)]
mod tests;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value as JsonValue, json};

use crate::config::ApiConfig;
use crate::endpoints::ApiEndpoints;
use crate::error::Error;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::types::{CredentialMode, RefreshResponse};

pub use request::AuthRequest;

/// Credentials returned by a successful refresh. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotatedCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Why a refresh did not produce a usable session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("refresh endpoint unreachable: {0}")]
    Transport(String),
    #[error("refresh rejected with status {0}")]
    Rejected(u16),
    #[error("refresh response unreadable: {0}")]
    InvalidBody(String),
    #[error("rotated credentials not persisted: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Succeeded(RotatedCredentials),
    Failed(RefreshFailure),
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// What happened to the server-side logout notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerNotice {
    /// The caller asked not to notify the server.
    Skipped,
    Acknowledged,
    /// The server answered with a non-success status.
    Rejected(u16),
    /// The request never got a response.
    Unreachable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Tell the API to revoke the session (default `true`).
    pub notify_server: bool,
}

impl Default for LogoutOptions {
    fn default() -> Self {
        Self {
            notify_server: true,
        }
    }
}

/// Result of a logout whose local part succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutReport {
    pub server: ServerNotice,
}

/// HTTP client wrapper that keeps the session alive.
pub struct AuthGateway<K> {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    session: SessionStore<K>,
}

impl<K: KeyValueStore> AuthGateway<K> {
    /// Create a gateway with a cookie-enabled HTTP client and a session
    /// store over `storage` in the configured credential mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, storage: K) -> Result<Self, Error> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let session = SessionStore::new(storage, config.credential_mode());
        Ok(Self::from_parts(config, session, http))
    }

    /// Assemble a gateway from an existing session store and HTTP client
    /// (for connection pool reuse or testing). Cookie-variant sessions need
    /// a client with a cookie store.
    #[must_use]
    pub fn from_parts(config: &ApiConfig, session: SessionStore<K>, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoints: config.endpoints().clone(),
            session,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<K> {
        &self.session
    }

    #[must_use]
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Send `request` with credentials, refreshing and retrying once on 401.
    ///
    /// The returned response is untouched: any status other than a
    /// recoverable 401 is the caller's to handle. When the refresh fails the
    /// session is cleared and the original 401 is returned, so the next
    /// guarded navigation sends the user to the login page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the original or retried request fails at
    /// the transport level, or [`Error::Request`] if a stored access token
    /// is not a valid header value.
    pub async fn fetch(&self, request: &AuthRequest) -> Result<reqwest::Response, Error> {
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !request.retry_on_401() {
            return Ok(response);
        }

        tracing::debug!(url = %request.url(), "Access rejected, refreshing session");
        match self.refresh_session().await {
            RefreshOutcome::Succeeded(_) => {
                tracing::debug!(url = %request.url(), "Session refreshed, retrying request");
                self.dispatch(request).await
            }
            RefreshOutcome::Failed(reason) => {
                tracing::warn!(url = %request.url(), %reason, "Session refresh failed, clearing local session");
                if let Err(e) = self.session.clear() {
                    tracing::warn!(error = %e, "Failed to clear session after refresh failure");
                }
                Ok(response)
            }
        }
    }

    /// Exchange the refresh credential for a new session.
    ///
    /// In the bearer variant rotated tokens are written to the session store
    /// before returning. In the cookie variant the server rotates its cookies
    /// and nothing is stored locally.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        let response = match self
            .http
            .post(self.endpoints.refresh().clone())
            .json(&self.credential_body())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return RefreshOutcome::Failed(RefreshFailure::Rejected(status.as_u16()));
        }

        let payload = match response.json::<RefreshResponse>().await {
            Ok(payload) => payload,
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::InvalidBody(e.to_string())),
        };
        let rotated = RotatedCredentials {
            access_token: payload.token,
            refresh_token: payload.refresh_token,
        };

        if self.session.mode() == CredentialMode::Bearer {
            if let Err(e) = self.session.persist_after_refresh(
                rotated.access_token.as_deref(),
                rotated.refresh_token.as_deref(),
            ) {
                return RefreshOutcome::Failed(RefreshFailure::Storage(e.to_string()));
            }
        }
        RefreshOutcome::Succeeded(rotated)
    }

    /// Log out: optionally tell the server, then clear the local session.
    ///
    /// A failed notification never blocks the local logout; it is reported
    /// in [`LogoutReport::server`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the session store could not be cleared.
    pub async fn logout(&self, options: LogoutOptions) -> Result<LogoutReport, Error> {
        let server = if options.notify_server {
            self.notify_logout().await
        } else {
            ServerNotice::Skipped
        };
        self.session.clear()?;
        Ok(LogoutReport { server })
    }

    async fn notify_logout(&self) -> ServerNotice {
        let result = self
            .http
            .post(self.endpoints.logout().clone())
            .json(&self.credential_body())
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => ServerNotice::Acknowledged,
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::warn!(status, "Server rejected logout notification");
                ServerNotice::Rejected(status)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not notify server of logout");
                ServerNotice::Unreachable(e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: &AuthRequest) -> Result<reqwest::Response, Error> {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(self.request_headers(request.headers())?);
        if let Some(body) = request.body() {
            builder = builder.body(body.to_owned());
        }
        Ok(builder.send().await?)
    }

    fn request_headers(&self, caller: &HeaderMap) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(caller.clone());
        if let Some(token) = self.session.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Request(format!("access token is not a valid header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Body for refresh and logout: the cookie carries the credential in the
    /// cookie variant, the bearer variant sends it explicitly.
    fn credential_body(&self) -> JsonValue {
        match self.session.mode() {
            CredentialMode::Cookie => json!({}),
            CredentialMode::Bearer => json!({ "refreshToken": self.session.refresh_token() }),
        }
    }
}
