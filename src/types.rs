use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Backend user identifier (numeric primary key).
///
/// Only used to decide whether a cached profile belongs to somebody.
/// Authorization is always decided by the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// How credentials travel to the API.
///
/// - `Cookie`: the server sets HTTP-only access/refresh cookies; the client
///   only caches the user profile.
/// - `Bearer`: the client keeps both tokens and sends
///   `Authorization: Bearer <token>` itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    #[default]
    Cookie,
    Bearer,
}

impl std::fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cookie => "cookie",
            Self::Bearer => "bearer",
        })
    }
}

impl std::str::FromStr for CredentialMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "bearer" => Ok(Self::Bearer),
            other => Err(Error::Config(format!(
                "unknown credential mode '{other}' (expected 'cookie' or 'bearer')"
            ))),
        }
    }
}

/// Cached profile of the logged-in user (stored under `userData`).
///
/// A UI hint only: a stale or hand-edited record makes
/// [`is_authenticated`](crate::SessionStore::is_authenticated) report `true`
/// until the next request is rejected by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default, rename = "nombre")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "parejaId")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub has_partner: Option<bool>,
}

impl UserProfile {
    /// Create a profile with only the identifier set.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Body of a successful `POST /api/auth/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default, rename = "nombre")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "mensaje")]
    pub message: Option<String>,
    #[serde(default, rename = "parejaId")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub has_partner: Option<bool>,
}

impl LoginResponse {
    /// Profile portion of the login response.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            partner_id: self.partner_id.clone(),
            has_partner: self.has_partner,
        }
    }
}

/// Body of a successful `POST /api/auth/refresh`. Every field is optional;
/// in the cookie variant the rotated tokens arrive as `Set-Cookie` headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    #[serde(default, rename = "mensaje")]
    pub message: Option<String>,
}

/// Error body returned by the API.
///
/// The current format carries `message` + `code`; older endpoints answer
/// with a bare `error` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct ServerErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ServerErrorBody {
    /// Body in the current `{message, code}` format.
    #[must_use]
    pub fn structured(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Body in the legacy `{error}` format.
    #[must_use]
    pub fn legacy(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
