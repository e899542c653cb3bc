#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[cfg(feature = "gateway")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Storage error: {0}")]
    Storage(String),
}
