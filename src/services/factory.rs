use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::core::data::{Database, Repository};
use crate::core::infrastructure::{open_cache, KeyValueCache};
use crate::core::services::{Catalog, HttpLyricsProvider, LyricsProvider};
use crate::error::{ConfigError, Result};

/// Centralized factory for the catalog's collaborators
pub struct ServiceFactory {
    config: Arc<Config>,
}

impl ServiceFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Open the SQLite store, running migrations off the async runtime
    pub async fn create_repository(&self) -> Result<Arc<dyn Repository>> {
        let path = self.config.database_path.clone();
        let db = tokio::task::spawn_blocking(move || Database::open(&path)).await??;
        Ok(Arc::new(db))
    }

    /// Redis when configured and reachable, in-memory otherwise
    pub fn create_cache(&self) -> Arc<dyn KeyValueCache> {
        Arc::from(open_cache(self.config.redis_url.as_deref()))
    }

    /// Each request is capped by the overall provider deadline
    pub fn create_provider(&self) -> Result<Arc<dyn LyricsProvider>> {
        let provider = HttpLyricsProvider::new(&self.config.provider_url, self.config.retry_policy().timeout)
            .map_err(|e| ConfigError::InvalidValue {
                field: "provider_url".to_string(),
                value: e.to_string(),
            })?;
        Ok(Arc::new(provider))
    }

    pub async fn create_catalog(&self) -> Result<Catalog> {
        let repository = self.create_repository().await?;
        let cache = self.create_cache();
        let provider = self.create_provider()?;

        debug!("Catalog wired with {} cache", cache.backend_name());
        Ok(Catalog::new(repository, cache, provider, self.config.catalog_options()))
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }
}
