//! Route guard decisions.
//!
//! Guards only read [`AuthStatus`]; they never touch storage or the network.
//! The router that consumes a [`NavigationDecision`] performs the actual
//! navigation.

use crate::session::SessionStore;
use crate::storage::KeyValueStore;

/// Query parameter carrying the originally requested path to the login page.
pub const REDIRECT_QUERY_PARAM: &str = "redirect";

/// Anything that can answer "does a user look logged in?".
pub trait AuthStatus {
    fn is_authenticated(&self) -> bool;
}

impl<K: KeyValueStore> AuthStatus for SessionStore<K> {
    fn is_authenticated(&self) -> bool {
        SessionStore::is_authenticated(self)
    }
}

impl AuthStatus for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

/// A named route and the path it lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub name: String,
    pub path: String,
}

impl RouteTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Where the guards send users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    /// Public sign-in page (default `Login` at `/`).
    pub login: RouteTarget,
    /// Default page after sign-in (default `Dashboard` at `/dashboard`).
    pub landing: RouteTarget,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            login: RouteTarget::new("Login", "/"),
            landing: RouteTarget::new("Dashboard", "/dashboard"),
        }
    }
}

/// Redirect produced by a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: RouteTarget,
    pub query: Vec<(String, String)>,
}

impl Redirect {
    /// Path plus URL-encoded query string, e.g. `/?redirect=%2Fdashboard`.
    #[must_use]
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.target.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.target.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Redirect(Redirect),
}

impl NavigationDecision {
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Guard for protected pages: anonymous users go to the login page, which
/// receives `target_full_path` so it can send them back afterwards.
#[must_use]
pub fn require_auth(
    status: &impl AuthStatus,
    target_full_path: &str,
    routes: &GuardRoutes,
) -> NavigationDecision {
    if status.is_authenticated() {
        return NavigationDecision::Proceed;
    }
    tracing::debug!(target = target_full_path, "Anonymous navigation to protected route");
    NavigationDecision::Redirect(Redirect {
        target: routes.login.clone(),
        query: vec![(REDIRECT_QUERY_PARAM.to_string(), target_full_path.to_string())],
    })
}

/// Guard for public-only pages (login, register): signed-in users go to the
/// landing page.
#[must_use]
pub fn redirect_if_authenticated(
    status: &impl AuthStatus,
    routes: &GuardRoutes,
) -> NavigationDecision {
    if !status.is_authenticated() {
        return NavigationDecision::Proceed;
    }
    NavigationDecision::Redirect(Redirect {
        target: routes.landing.clone(),
        query: Vec::new(),
    })
}
