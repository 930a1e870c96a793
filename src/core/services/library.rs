use std::sync::Arc;
use tracing::debug;

use crate::core::data::Repository;
use crate::core::models::{LibraryFilter, LibraryPage};
use crate::error::Result;

/// Filtered, paginated listing of the song library
pub struct LibraryQueryService {
    repository: Arc<dyn Repository>,
    default_limit: i64,
}

impl LibraryQueryService {
    pub fn new(repository: Arc<dyn Repository>, default_limit: i64) -> Self {
        Self {
            repository,
            default_limit: default_limit.max(1),
        }
    }

    /// Missing or non-positive `page`/`limit` fall back to 1 and the default limit
    pub async fn list(&self, filter: &LibraryFilter, page: Option<i64>, limit: Option<i64>) -> Result<LibraryPage> {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.default_limit);
        let offset = (page - 1).saturating_mul(limit);

        debug!("Fetching library with filters {:?}, page={}, limit={}", filter, page, limit);

        let (songs, total) = self.repository.list_songs(filter, offset, limit).await?;
        Ok(LibraryPage { songs, total, page, limit })
    }
}
