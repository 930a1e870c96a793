use async_trait::async_trait;

use crate::core::models::{CreatedSong, EnrichmentResult, LibraryFilter, Song, SongId, SongPatch};
use crate::error::Result;

/// Durable storage for songs and groups.
///
/// Implementations must be safe for concurrent use. `create_song` resolves
/// the group with an atomic get-or-insert and is idempotent on an existing
/// (group, song) pair; group resolution, song insert and the read-back of the
/// stored row happen in one transaction.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Fails with `NotFound` when no song has this id
    async fn get_song_by_id(&self, id: SongId) -> Result<Song>;

    async fn create_song(
        &self,
        group_name: &str,
        song_name: &str,
        enrichment: &EnrichmentResult,
    ) -> Result<CreatedSong>;

    /// Fails with `NotFound` when no song has this id
    async fn update_song(&self, id: SongId, patch: &SongPatch) -> Result<()>;

    /// Fails with `NotFound` when no song has this id
    async fn delete_song(&self, id: SongId) -> Result<()>;

    /// Delete by (group, song) name, returning the removed song's id
    async fn delete_song_by_name(&self, group_name: &str, song_name: &str) -> Result<SongId>;

    /// Filtered page of songs ordered by id, plus the total match count
    async fn list_songs(&self, filter: &LibraryFilter, offset: i64, limit: i64) -> Result<(Vec<Song>, i64)>;
}
