use std::path::Path;
use url::Url;
use crate::error::{Result, MusicLabError};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a URL string
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        Url::parse(url).map_err(|e| {
            MusicLabError::Validation(format!("Invalid {} URL '{}': {}", field_name, url, e))
        })?;
        Ok(())
    }

    /// Validate the lyrics provider endpoint (http or https only)
    pub fn validate_provider_url(url: &str) -> Result<()> {
        Self::validate_url(url, "provider")?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(MusicLabError::Validation(format!(
                "Provider URL must start with 'http://' or 'https://', got: {}",
                url
            )));
        }
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(MusicLabError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate Redis URL format
    pub fn validate_redis_url(url: &str) -> Result<()> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(MusicLabError::Validation(format!(
                "Redis URL must start with 'redis://' or 'rediss://', got: {}",
                url
            )));
        }

        Self::validate_url(url, "Redis")?;
        Ok(())
    }

    /// Validate database file extension
    pub fn validate_db_path(path: &Path) -> Result<()> {
        if let Some(ext) = path.extension() {
            if ext != "db" && ext != "sqlite" && ext != "sqlite3" {
                return Err(MusicLabError::Validation(format!(
                    "Database file should have .db, .sqlite, or .sqlite3 extension, got: {}",
                    path.display()
                )));
            }
        } else {
            return Err(MusicLabError::Validation(format!(
                "Database file should have an extension (.db, .sqlite, .sqlite3), got: {}",
                path.display()
            )));
        }
        Ok(())
    }
}
