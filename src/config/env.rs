use std::env;
use std::path::PathBuf;
use crate::error::{Result, MusicLabError};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const DATABASE_PATH: &'static str = "MUSICLAB_DATABASE_PATH";
    pub const PROVIDER_URL: &'static str = "MUSICLAB_PROVIDER_URL";
    pub const PROVIDER_TIMEOUT_SECS: &'static str = "MUSICLAB_PROVIDER_TIMEOUT_SECS";
    pub const MAX_RETRIES: &'static str = "MUSICLAB_MAX_RETRIES";
    pub const RETRY_DELAY_MS: &'static str = "MUSICLAB_RETRY_DELAY_MS";
    pub const REDIS_URL: &'static str = "MUSICLAB_REDIS_URL";
    pub const SONG_TEXT_CACHE_TTL_SECS: &'static str = "MUSICLAB_SONG_TEXT_CACHE_TTL_SECS";
    pub const DEFAULT_PAGE_LIMIT: &'static str = "MUSICLAB_DEFAULT_PAGE_LIMIT";

    // Special environment variables
    pub const DOCKER: &'static str = "DOCKER";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as string with validation
    pub fn parse_string(var_name: &str, validator: Option<fn(&str) -> Result<()>>) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }

                if let Some(validate_fn) = validator {
                    validate_fn(&trimmed)?;
                }

                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(MusicLabError::Validation(format!(
                    "Environment variable {} contains invalid UTF-8",
                    var_name
                )))
            }
        }
    }

    /// Parse environment variable as PathBuf
    pub fn parse_path(var_name: &str) -> Result<Option<PathBuf>> {
        Ok(Self::parse_string(var_name, None)?.map(PathBuf::from))
    }

    /// Parse environment variable as u64 with range validation
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            let value = value_str.parse::<u64>().map_err(|_| {
                MusicLabError::Validation(format!(
                    "Invalid number in {}: '{}'. Must be a positive integer",
                    var_name, value_str
                ))
            })?;

            if value < min || value > max {
                return Err(MusicLabError::Validation(format!(
                    "Value in {} must be between {} and {}, got {}",
                    var_name, min, max, value
                )));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Check if environment variable is present (for boolean flags)
    pub fn is_present(var_name: &str) -> bool {
        env::var(var_name).is_ok()
    }
}
