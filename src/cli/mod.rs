//! Command Line Interface module
//!
//! - `health`: storage and cache reachability (`ping`)
//! - `songs`: create, verse, update and delete a single song
//! - `library`: filtered, paginated listing
//! - `config`: effective configuration and its file path

pub mod config;
pub mod health;
pub mod library;
pub mod songs;

use serde::Serialize;

use crate::error::{MusicLabError, Result};

/// Pretty-print `value` as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| MusicLabError::Internal(e.into()))?;
    println!("{}", rendered);
    Ok(())
}
