use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::error::Error;

/// One logical API call, reusable verbatim for the retry after a refresh.
///
/// ```rust,ignore
/// let request = AuthRequest::post(endpoints.incomes().clone())
///     .with_json(&new_income)?;
/// let response = gateway.fetch(&request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct AuthRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
    retry_on_401: bool,
}

impl AuthRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            retry_on_401: true,
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    #[must_use]
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a header; replaces any earlier value for the same name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if `value` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_string(value).map_err(|e| Error::Request(e.to_string()))?;
        Ok(self.with_body(body))
    }

    /// Return a 401 to the caller as-is instead of refreshing the session.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry_on_401 = false;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn retry_on_401(&self) -> bool {
        self.retry_on_401
    }
}
