//! Error handling for the musiclab application
//!
//! This module provides a hierarchical error system. Layer-specific errors
//! (database, cache, provider, configuration) roll up into `MusicLabError`,
//! which is what the catalog operations and the CLI surface to callers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MusicLabError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No verse available for page {0}")]
    NoVerseForPage(i64),

    #[error("Failed to fetch lyrics after {attempts} attempt(s): {source}")]
    FetchFailed {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("Lyrics request deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider response invalid: {reason}")]
    InvalidResponse { reason: String },

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Database corruption detected")]
    Corruption,

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Database task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to determine project directories")]
    ProjectDirs,
}

pub type Result<T> = std::result::Result<T, MusicLabError>;

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi::Error { code: ffi::ErrorCode::DatabaseCorrupt, .. }, _) => {
                DatabaseError::Corruption
            }
            _ => DatabaseError::Query(err),
        }
    }
}

use rusqlite::ffi;

impl From<rusqlite::Error> for MusicLabError {
    fn from(err: rusqlite::Error) -> Self {
        MusicLabError::Database(err.into())
    }
}

impl From<toml::de::Error> for MusicLabError {
    fn from(err: toml::de::Error) -> Self {
        MusicLabError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<tokio::task::JoinError> for MusicLabError {
    fn from(err: tokio::task::JoinError) -> Self {
        MusicLabError::Database(DatabaseError::Task(err.to_string()))
    }
}

impl MusicLabError {
    /// Process exit code used by the CLI for this error class
    pub fn exit_code(&self) -> i32 {
        match self {
            MusicLabError::Validation(_) | MusicLabError::NoVerseForPage(_) => 2,
            MusicLabError::NotFound(_) => 3,
            MusicLabError::FetchFailed { .. } | MusicLabError::DeadlineExceeded { .. } => 4,
            MusicLabError::Cancelled => 130,
            _ => 1,
        }
    }
}
