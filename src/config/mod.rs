pub mod env;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;
use tracing::{debug, warn};

use crate::core::services::{CatalogOptions, RetryPolicy};
use crate::error::{ConfigError, Result};
use self::env::{EnvParser, EnvVars};
use self::validation::ConfigValidator;

fn default_provider_url() -> String {
    "http://localhost:8081/info".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> u64 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_song_text_cache_ttl_secs() -> u64 {
    3600
}

fn default_page_limit() -> u64 {
    10
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "musiclab", "musiclab")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file path
    pub database_path: PathBuf,

    /// Lyrics provider endpoint, queried with `group` and `song` parameters
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Deadline shared by all provider attempts of one creation (seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Provider attempts per creation
    #[serde(default = "default_max_retries")]
    pub max_retries: u64,

    /// Pause between provider attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Redis URL for the song text cache (optional, in-memory when absent)
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_song_text_cache_ttl_secs")]
    pub song_text_cache_ttl_secs: u64,

    /// Library page size when the caller gives none
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        // Use /data only when explicitly running under Docker (DOCKER env var)
        let default_data_path = if EnvParser::is_present(EnvVars::DOCKER) {
            PathBuf::from("/data")
        } else {
            match project_dirs() {
                Some(dirs) => dirs.data_dir().to_path_buf(),
                None => {
                    warn!("ProjectDirs unavailable; falling back to current directory for data path");
                    PathBuf::from(".")
                }
            }
        };

        Self {
            database_path: default_data_path.join("musiclab.db"),
            provider_url: default_provider_url(),
            provider_timeout_secs: default_provider_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            redis_url: None,
            song_text_cache_ttl_secs: default_song_text_cache_ttl_secs(),
            default_page_limit: default_page_limit(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then `MUSICLAB_*` environment variables.
    /// A missing config file is written out with the resolved values.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Try to load .env file if it exists (for Docker and development)
        dotenvy::dotenv().ok();

        let config_file = match config_path {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };

        let mut config = Self::from_file_or_default(&config_file)?;
        config.apply_env()?;
        config.validate()?;

        if !config_file.exists() {
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent).map_err(ConfigError::from)?;
            }
            config.save(&config_file)?;
            debug!("Wrote default configuration to {}", config_file.display());
        }

        Ok(config)
    }

    fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Config = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Environment variables have the highest priority
    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = EnvParser::parse_path(EnvVars::DATABASE_PATH)? {
            self.database_path = path;
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::PROVIDER_URL, Some(ConfigValidator::validate_provider_url))? {
            self.provider_url = url;
        }

        if let Some(secs) = EnvParser::parse_u64(EnvVars::PROVIDER_TIMEOUT_SECS, 1, 300)? {
            self.provider_timeout_secs = secs;
        }

        if let Some(retries) = EnvParser::parse_u64(EnvVars::MAX_RETRIES, 1, 20)? {
            self.max_retries = retries;
        }

        if let Some(delay) = EnvParser::parse_u64(EnvVars::RETRY_DELAY_MS, 0, 60_000)? {
            self.retry_delay_ms = delay;
        }

        // A set-but-blank MUSICLAB_REDIS_URL disables Redis
        if std::env::var_os(EnvVars::REDIS_URL).is_some() {
            self.redis_url = EnvParser::parse_string(EnvVars::REDIS_URL, Some(ConfigValidator::validate_redis_url))?;
        }

        if let Some(ttl) = EnvParser::parse_u64(EnvVars::SONG_TEXT_CACHE_TTL_SECS, 1, 604_800)? {
            self.song_text_cache_ttl_secs = ttl;
        }

        if let Some(limit) = EnvParser::parse_u64(EnvVars::DEFAULT_PAGE_LIMIT, 1, 1000)? {
            self.default_page_limit = limit;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_db_path(&self.database_path)?;
        ConfigValidator::validate_provider_url(&self.provider_url)?;
        ConfigValidator::validate_range(self.provider_timeout_secs, 1, 300, "provider_timeout_secs")?;
        ConfigValidator::validate_range(self.max_retries, 1, 20, "max_retries")?;
        ConfigValidator::validate_range(self.retry_delay_ms, 0, 60_000, "retry_delay_ms")?;
        ConfigValidator::validate_range(self.song_text_cache_ttl_secs, 1, 604_800, "song_text_cache_ttl_secs")?;
        ConfigValidator::validate_range(self.default_page_limit, 1, 1000, "default_page_limit")?;

        if let Some(url) = &self.redis_url {
            ConfigValidator::validate_redis_url(url)?;
        }

        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        fs::write(path, content).map_err(ConfigError::from)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = project_dirs().ok_or(ConfigError::ProjectDirs)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries as u32,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            timeout: Duration::from_secs(self.provider_timeout_secs),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.song_text_cache_ttl_secs)
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            retry: self.retry_policy(),
            cache_ttl: self.cache_ttl(),
            default_page_limit: self.default_page_limit as i64,
        }
    }
}
