//! Error taxonomy for the ranking pipeline.
//!
//! Three failure domains matter operationally: the ranking provider
//! (`Fetch`), the row store (`Store`) and the push provider
//! (`Notification`). A scheduled batch isolates failures per ranking;
//! an on-demand request surfaces them to the HTTP caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("ranking not found: {0}")]
    RankingNotFound(String),

    #[error("unsupported ranking provider type: {0}")]
    UnknownProvider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error came out of the provider fetch path, i.e. the
    /// stored snapshot is guaranteed untouched.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::UnknownProvider(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
