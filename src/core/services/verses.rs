use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::data::Repository;
use crate::core::infrastructure::{CancelToken, KeyValueCache};
use crate::core::lyrics::{split_stanzas, stanza_for_page};
use crate::core::models::SongId;
use crate::error::{MusicLabError, Result};

pub fn song_cache_key(id: SongId) -> String {
    format!("song:{}", id)
}

/// Paginated verse reads over a read-through song text cache.
///
/// Cache failures never fail a read: a failed lookup is treated as a miss
/// and a failed write is logged and ignored.
pub struct VerseService {
    repository: Arc<dyn Repository>,
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl VerseService {
    pub fn new(repository: Arc<dyn Repository>, cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { repository, cache, ttl }
    }

    /// Stanza number `page` (1-based) of the song's lyrics
    pub async fn get_verse(&self, id: SongId, page: i64, cancel: &CancelToken) -> Result<String> {
        if id < 1 {
            return Err(MusicLabError::Validation(format!("invalid song id {}", id)));
        }

        let text = cancel.guard(self.song_text(id)).await?;
        let stanzas = split_stanzas(&text);
        debug!("Song {} has {} stanza(s), requested page {}", id, stanzas.len(), page);

        stanza_for_page(&stanzas, page).ok_or(MusicLabError::NoVerseForPage(page))
    }

    async fn song_text(&self, id: SongId) -> Result<String> {
        let key = song_cache_key(id);

        match self.cache.get(&key).await {
            Ok(Some(text)) => {
                debug!("Cache hit for key: {}", key);
                return Ok(text);
            }
            Ok(None) => debug!("Cache miss for key: {}. Fetching from database.", key),
            Err(e) => warn!("Error reading {} from cache, using database: {}", key, e),
        }

        let song = self.repository.get_song_by_id(id).await?;

        if let Err(e) = self.cache.set(&key, &song.text, self.ttl).await {
            warn!("Error caching song text for {}: {}", key, e);
        }

        Ok(song.text)
    }

    /// Drop the cached text of a song after it changed
    pub async fn invalidate(&self, id: SongId) {
        let key = song_cache_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!("Failed to invalidate cached text for {}: {}", key, e);
        }
    }
}
