//! Data layer modules
//!
//! This module contains all storage-related functionality:
//! - `Repository` capability consumed by the services
//! - SQLite implementation of the song catalog

pub mod database;
pub mod repository;

// Re-export main types
pub use database::Database;
pub use repository::Repository;
