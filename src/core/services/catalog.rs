//! Catalog facade tying together storage, cache and provider collaborators.
//!
//! Every dependency is injected at construction, so the CLI wires real
//! backends and tests wire in-memory ones.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::data::Repository;
use crate::core::infrastructure::{CancelToken, KeyValueCache};
use crate::core::models::{CreatedSong, LibraryFilter, LibraryPage, Song, SongId, SongPatch, SongRequest};
use crate::core::services::enrichment::{EnrichmentPipeline, RetryPolicy};
use crate::core::services::library::LibraryQueryService;
use crate::core::services::provider::LyricsProvider;
use crate::core::services::verses::VerseService;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub default_page_limit: i64,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(3600),
            default_page_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database: String,
    pub cache_backend: &'static str,
    pub cache: String,
}

pub struct Catalog {
    repository: Arc<dyn Repository>,
    cache: Arc<dyn KeyValueCache>,
    pipeline: EnrichmentPipeline,
    verses: VerseService,
    library: LibraryQueryService,
}

impl Catalog {
    pub fn new(
        repository: Arc<dyn Repository>,
        cache: Arc<dyn KeyValueCache>,
        provider: Arc<dyn LyricsProvider>,
        options: CatalogOptions,
    ) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(provider, repository.clone(), options.retry),
            verses: VerseService::new(repository.clone(), cache.clone(), options.cache_ttl),
            library: LibraryQueryService::new(repository.clone(), options.default_page_limit),
            repository,
            cache,
        }
    }

    /// Storage must answer; an unreachable cache is reported but not fatal
    pub async fn ping(&self) -> Result<HealthReport> {
        let (database, cache) = futures::join!(self.repository.ping(), self.cache.ping());
        database?;

        let cache = match cache {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                warn!("Cache ping failed: {}", e);
                format!("unavailable: {}", e)
            }
        };

        Ok(HealthReport {
            database: "ok".to_string(),
            cache_backend: self.cache.backend_name(),
            cache,
        })
    }

    pub async fn create_song(&self, request: &SongRequest, cancel: &CancelToken) -> Result<CreatedSong> {
        self.pipeline.create(request, cancel).await
    }

    pub async fn get_verse(&self, id: SongId, page: i64, cancel: &CancelToken) -> Result<String> {
        self.verses.get_verse(id, page, cancel).await
    }

    // Writes are not raced against the token: once submitted, a write is
    // awaited so the cache invalidation after it always runs.

    /// Apply a partial update and drop the song's cached text
    pub async fn update_song(&self, id: SongId, patch: &SongPatch, cancel: &CancelToken) -> Result<Song> {
        let patch = patch.normalized();
        patch.validate()?;

        cancel.check()?;
        self.repository.update_song(id, &patch).await?;
        self.verses.invalidate(id).await;
        info!("Song {} updated", id);

        self.repository.get_song_by_id(id).await
    }

    pub async fn delete_song(&self, id: SongId, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        self.repository.delete_song(id).await?;
        self.verses.invalidate(id).await;
        info!("Song {} deleted", id);
        Ok(())
    }

    pub async fn delete_song_by_name(&self, group: &str, song: &str, cancel: &CancelToken) -> Result<SongId> {
        let request = SongRequest::new(group, song).validated()?;

        cancel.check()?;
        let id = self.repository.delete_song_by_name(&request.group, &request.song).await?;
        self.verses.invalidate(id).await;
        info!("Song {} - {} deleted (id {})", request.group, request.song, id);
        Ok(id)
    }

    pub async fn list_songs(
        &self,
        filter: &LibraryFilter,
        page: Option<i64>,
        limit: Option<i64>,
        cancel: &CancelToken,
    ) -> Result<LibraryPage> {
        cancel.guard(self.library.list(filter, page, limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::Database;
    use crate::core::infrastructure::MemoryCache;
    use crate::core::models::{CreateOutcome, ProviderSongDetail};
    use crate::error::{MusicLabError, ProviderError};
    use async_trait::async_trait;

    /// Provider echoing the requested names back as lyrics
    struct EchoProvider;

    #[async_trait]
    impl LyricsProvider for EchoProvider {
        async fn fetch(&self, group: &str, song: &str) -> std::result::Result<ProviderSongDetail, ProviderError> {
            Ok(ProviderSongDetail {
                release_date: "01.01.2000".to_string(),
                text: format!("{}\n\n{}", group, song),
                link: None,
            })
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Arc::new(MemoryCache::new()),
            Arc::new(EchoProvider),
            CatalogOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_ping_reports_backends() {
        let report = catalog().ping().await.unwrap();
        assert_eq!(report.database, "ok");
        assert_eq!(report.cache_backend, "memory");
        assert_eq!(report.cache, "ok");
    }

    #[tokio::test]
    async fn test_create_then_read_verses() {
        let catalog = catalog();
        let cancel = CancelToken::new();

        let created = catalog.create_song(&SongRequest::new("Queen", "Innuendo"), &cancel).await.unwrap();
        assert!(matches!(created.outcome, CreateOutcome::Created(_)));

        let id = created.song.id;
        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "Queen");
        assert_eq!(catalog.get_verse(id, 2, &cancel).await.unwrap(), "Innuendo");

        let again = catalog.create_song(&SongRequest::new("Queen", "Innuendo"), &cancel).await.unwrap();
        assert_eq!(again.outcome, CreateOutcome::AlreadyExists(id));
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_text() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;

        // Warm the cache
        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "Queen");

        let patch = SongPatch {
            text: Some("Rewritten\n\nLyrics".to_string()),
            ..Default::default()
        };
        let updated = catalog.update_song(id, &patch, &cancel).await.unwrap();
        assert_eq!(updated.song_name, "Innuendo");

        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "Rewritten");
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let catalog = catalog();
        let result = catalog.update_song(1, &SongPatch::default(), &CancelToken::new()).await;
        assert!(matches!(result, Err(MusicLabError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_song_and_cached_text() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;
        catalog.get_verse(id, 1, &cancel).await.unwrap();

        catalog.delete_song(id, &cancel).await.unwrap();

        assert!(matches!(catalog.get_verse(id, 1, &cancel).await, Err(MusicLabError::NotFound(_))));
        assert!(matches!(catalog.delete_song(id, &cancel).await, Err(MusicLabError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;

        assert_eq!(catalog.delete_song_by_name(" Queen ", "Innuendo", &cancel).await.unwrap(), id);
        assert!(matches!(
            catalog.delete_song_by_name("Queen", "Innuendo", &cancel).await,
            Err(MusicLabError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_songs() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        for song in ["Innuendo", "Bicycle Race", "Radio Ga Ga"] {
            catalog.create_song(&SongRequest::new("Queen", song), &cancel).await.unwrap();
        }

        let filter = LibraryFilter {
            song: Some("ga".to_string()),
            ..Default::default()
        };
        let page = catalog.list_songs(&filter, None, None, &cancel).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.songs[0].song_name, "Radio Ga Ga");
    }

    #[tokio::test]
    async fn test_update_stores_normalized_text() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;

        let patch = SongPatch {
            text: Some("  first line\nsecond line  \n\n\n third ".to_string()),
            ..Default::default()
        };
        let updated = catalog.update_song(id, &patch, &cancel).await.unwrap();

        assert_eq!(updated.text, "first line\nsecond line\n\nthird");
        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "first line\nsecond line");
    }

    #[tokio::test]
    async fn test_cancel_during_delete_still_invalidates_cache() {
        let db = Database::open_in_memory().unwrap();
        let catalog = Catalog::new(
            Arc::new(db.clone()),
            Arc::new(MemoryCache::new()),
            Arc::new(EchoProvider),
            CatalogOptions::default(),
        );
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;
        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "Queen");

        let holder = db.clone();
        let busy = tokio::spawn(async move {
            holder
                .run(|_| {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .await
                .unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let delete_cancel = CancelToken::new();
        let trigger = delete_cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        catalog.delete_song(id, &delete_cancel).await.unwrap();
        busy.await.unwrap();

        assert!(matches!(catalog.get_verse(id, 1, &cancel).await, Err(MusicLabError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_blocks_writes() {
        let catalog = catalog();
        let cancel = CancelToken::new();
        let id = catalog
            .create_song(&SongRequest::new("Queen", "Innuendo"), &cancel)
            .await
            .unwrap()
            .song
            .id;

        let cancelled = CancelToken::new();
        cancelled.cancel();
        assert!(matches!(catalog.delete_song(id, &cancelled).await, Err(MusicLabError::Cancelled)));
        assert_eq!(catalog.get_verse(id, 1, &cancel).await.unwrap(), "Queen");
    }
}
