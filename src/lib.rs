#![doc = include_str!("../README.md")]

pub mod config;
pub mod endpoints;
pub mod error;
pub mod error_message;
#[cfg(feature = "gateway")]
pub mod gateway;
pub mod guard;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports for convenient access
pub use config::{ApiConfig, Environment};
pub use endpoints::ApiEndpoints;
pub use error::Error;
#[cfg(feature = "gateway")]
pub use gateway::{
    AuthGateway, AuthRequest, LogoutOptions, LogoutReport, RefreshFailure, RefreshOutcome,
    RotatedCredentials, ServerNotice,
};
pub use guard::{
    AuthStatus, GuardRoutes, NavigationDecision, Redirect, RouteTarget, redirect_if_authenticated,
    require_auth,
};
pub use session::{Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{
    CredentialMode, LoginResponse, RefreshResponse, ServerErrorBody, UserId, UserProfile,
};
