use std::sync::Arc;

use crate::error::Error;
use crate::storage::KeyValueStore;
use crate::types::{CredentialMode, LoginResponse, UserProfile};

pub(crate) const USER_DATA_KEY: &str = "userData";
pub(crate) const ACCESS_TOKEN_KEY: &str = "authToken";
pub(crate) const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub(crate) const REMEMBERED_EMAIL_KEY: &str = "rememberedEmail";

/// Point-in-time view of the client's authentication state.
///
/// In the cookie variant both tokens are always `None`; the real credentials
/// live in HTTP-only cookies the client cannot read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

/// The client's belief about who is logged in.
///
/// Cheap to clone; clones share the same backend. Pass one clone to the
/// gateway and another to the navigation guards.
pub struct SessionStore<K> {
    storage: Arc<K>,
    mode: CredentialMode,
}

// Manual Clone: avoid derive adding a `K: Clone` bound.
impl<K> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            mode: self.mode,
        }
    }
}

impl<K: KeyValueStore> SessionStore<K> {
    #[must_use]
    pub fn new(storage: K, mode: CredentialMode) -> Self {
        Self::from_arc(Arc::new(storage), mode)
    }

    #[must_use]
    pub fn from_arc(storage: Arc<K>, mode: CredentialMode) -> Self {
        Self { storage, mode }
    }

    #[must_use]
    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    #[must_use]
    pub fn storage(&self) -> &K {
        &self.storage
    }

    /// Snapshot of the stored values.
    #[must_use]
    pub fn read(&self) -> Session {
        Session {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            user: self.user(),
        }
    }

    /// Whether a user looks logged in.
    ///
    /// Cookie variant: a cached profile with an id exists. Bearer variant: a
    /// non-empty access token exists. Never use this for authorization.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self.mode {
            CredentialMode::Cookie => self.user().is_some_and(|user| user.id.is_some()),
            CredentialMode::Bearer => self.access_token().is_some(),
        }
    }

    /// Cached profile, if any. An unreadable record counts as absent.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_DATA_KEY)?;
        match serde_json::from_str::<Option<UserProfile>>(&raw) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable user profile record");
                None
            }
        }
    }

    /// Stored access token (bearer variant only).
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.token(ACCESS_TOKEN_KEY)
    }

    /// Stored refresh token (bearer variant only).
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.token(REFRESH_TOKEN_KEY)
    }

    fn token(&self, key: &str) -> Option<String> {
        if self.mode != CredentialMode::Bearer {
            return None;
        }
        self.storage.get(key).filter(|t| !t.is_empty())
    }

    /// Record a successful login.
    ///
    /// The profile is always cached. Tokens are kept only in the bearer
    /// variant; the cookie variant relies on the cookies the server set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects a write.
    pub fn establish(&self, login: &LoginResponse) -> Result<(), Error> {
        let profile = serde_json::to_string(&login.profile())
            .map_err(|e| Error::Storage(e.to_string()))?;
        self.storage.set(USER_DATA_KEY, profile)?;

        if self.mode == CredentialMode::Bearer {
            // A login replaces the whole credential pair; missing tokens are not kept.
            for (key, token) in [
                (ACCESS_TOKEN_KEY, &login.token),
                (REFRESH_TOKEN_KEY, &login.refresh_token),
            ] {
                match token {
                    Some(token) => self.storage.set(key, token.clone())?,
                    None => self.storage.remove(key)?,
                }
            }
        }
        tracing::debug!(user_id = ?login.id, mode = %self.mode, "Session established");
        Ok(())
    }

    /// Overwrite the provided credentials; absent ones keep their value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects a write.
    pub fn persist_after_refresh(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<(), Error> {
        if let Some(token) = access_token {
            self.storage.set(ACCESS_TOKEN_KEY, token.to_owned())?;
        }
        if let Some(token) = refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, token.to_owned())?;
        }
        Ok(())
    }

    /// Forget everything about the current user, including the remembered
    /// login email. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Every key is attempted; the first backend failure is returned.
    pub fn clear(&self) -> Result<(), Error> {
        let mut first_error = None;
        for key in [
            USER_DATA_KEY,
            ACCESS_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            REMEMBERED_EMAIL_KEY,
        ] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
