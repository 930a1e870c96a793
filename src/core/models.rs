//! Catalog domain types shared by the data and service layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::lyrics::normalize_lyrics;
use crate::error::{MusicLabError, Result};

pub type SongId = i64;
pub type GroupId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub group_id: GroupId,
    pub group_name: String,
    pub song_name: String,
    pub release_date: String,
    pub text: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bare song identity submitted for creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRequest {
    pub group: String,
    pub song: String,
}

impl SongRequest {
    pub fn new(group: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            song: song.into(),
        }
    }

    /// Trimmed copy of the request, rejecting blank names
    pub fn validated(&self) -> Result<Self> {
        let group = self.group.trim();
        let song = self.song.trim();

        if group.is_empty() {
            return Err(MusicLabError::Validation("group name must not be empty".to_string()));
        }
        if song.is_empty() {
            return Err(MusicLabError::Validation("song name must not be empty".to_string()));
        }

        Ok(Self::new(group, song))
    }
}

/// Raw song details as answered by the lyrics provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSongDetail {
    #[serde(default)]
    pub release_date: String,
    /// Required: an answer without lyrics is not a usable answer
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
}

/// Normalized provider answer, merged into a song before it is stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub release_date: String,
    pub text: String,
    pub link: Option<String>,
}

/// Partial song update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPatch {
    pub group_name: Option<String>,
    pub song_name: Option<String>,
    pub release_date: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.group_name.is_none()
            && self.song_name.is_none()
            && self.release_date.is_none()
            && self.text.is_none()
            && self.link.is_none()
    }

    /// Copy with the same cleanup applied to text as at creation time
    pub fn normalized(&self) -> Self {
        let trimmed = |value: &Option<String>| value.as_deref().map(|v| v.trim().to_string());

        Self {
            group_name: trimmed(&self.group_name),
            song_name: trimmed(&self.song_name),
            release_date: trimmed(&self.release_date),
            text: self.text.as_deref().map(normalize_lyrics),
            link: trimmed(&self.link),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(MusicLabError::Validation("update contains no fields".to_string()));
        }
        if matches!(self.group_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(MusicLabError::Validation("group name must not be empty".to_string()));
        }
        if matches!(self.song_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(MusicLabError::Validation("song name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Result of a song creation against the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created(SongId),
    AlreadyExists(SongId),
}

impl CreateOutcome {
    pub fn id(&self) -> SongId {
        match self {
            CreateOutcome::Created(id) | CreateOutcome::AlreadyExists(id) => *id,
        }
    }
}

/// Stored song together with whether this creation inserted it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedSong {
    pub song: Song,
    pub outcome: CreateOutcome,
}

impl CreatedSong {
    pub fn id(&self) -> SongId {
        self.outcome.id()
    }
}

/// Library listing filters. Each field is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFilter {
    pub group: Option<String>,
    pub song: Option<String>,
    pub text: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryPage {
    pub songs: Vec<Song>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
