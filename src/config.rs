use url::Url;

use crate::endpoints::ApiEndpoints;
use crate::error::Error;
use crate::guard::GuardRoutes;
use crate::types::CredentialMode;

const PRODUCTION_BASE_URL: &str = "https://api.miroma.com";
const DEVELOPMENT_BASE_URL: &str = "https://localhost:8443";

/// Deployment environment, selected by `MIROMA_ENV`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

/// API client configuration.
///
/// The base URL is a constructor parameter; everything else has a default
/// and can be overridden with the `with_*` methods.
///
/// ```rust,ignore
/// use miroma_session::{ApiConfig, CredentialMode};
///
/// let config = ApiConfig::new("https://api.miroma.com".parse()?)
///     .with_credential_mode(CredentialMode::Bearer);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) endpoints: ApiEndpoints,
    pub(crate) credential_mode: CredentialMode,
    pub(crate) routes: GuardRoutes,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            endpoints: ApiEndpoints::new(&base_url),
            base_url,
            credential_mode: CredentialMode::default(),
            routes: GuardRoutes::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `MIROMA_ENV`: `development` or `production` (default)
    /// - `MIROMA_API_BASE_URL`: API origin; always upgraded to `https`
    /// - `MIROMA_AUTH_MODE`: `cookie` (default) or `bearer`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable holds an unknown value or the
    /// base URL does not parse.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let environment = match var("MIROMA_ENV").as_deref().map(str::trim) {
            None | Some("") | Some("production") => Environment::Production,
            Some("development") => Environment::Development,
            Some(other) => {
                return Err(Error::Config(format!("MIROMA_ENV: unknown environment '{other}'")));
            }
        };

        let base_url = match var("MIROMA_API_BASE_URL") {
            Some(raw) if !raw.trim().is_empty() => normalize_base_url(&raw)
                .map_err(|e| Error::Config(format!("MIROMA_API_BASE_URL: {e}")))?,
            _ => Url::parse(environment.default_base_url())
                .map_err(|e| Error::Config(format!("default base URL: {e}")))?,
        };

        let mut config = Self::new(base_url);
        if let Some(mode) = var("MIROMA_AUTH_MODE") {
            config = config.with_credential_mode(mode.parse()?);
        }

        tracing::debug!(
            base_url = %config.base_url,
            credential_mode = %config.credential_mode,
            ?environment,
            "API configuration loaded"
        );
        Ok(config)
    }

    #[must_use]
    pub fn with_credential_mode(mut self, mode: CredentialMode) -> Self {
        self.credential_mode = mode;
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: GuardRoutes) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn credential_mode(&self) -> CredentialMode {
        self.credential_mode
    }

    #[must_use]
    pub fn routes(&self) -> &GuardRoutes {
        &self.routes
    }
}

/// Parse an API origin, forcing the `https` scheme.
///
/// `http://host`, `https://host` and bare `host` all become `https://host`.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            rest
        }
        _ => trimmed,
    };
    Url::parse(&format!("https://{without_scheme}"))
}
