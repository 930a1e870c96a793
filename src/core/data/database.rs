//! SQLite storage for the song catalog
//!
//! This module implements the `Repository` capability on top of a single
//! SQLite connection. The connection is guarded by a mutex and every query
//! runs on the blocking thread pool. Group resolution, the existence check
//! and the song insert of a creation share one IMMEDIATE transaction, and the
//! UNIQUE constraints on `music_groups.name` and `songs(group_id, song_name)` keep
//! concurrent creators from duplicating rows.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{ToSql, Value};
use rusqlite::{ffi, params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::data::repository::Repository;
use crate::core::models::{CreateOutcome, CreatedSong, EnrichmentResult, GroupId, LibraryFilter, Song, SongId, SongPatch};
use crate::error::{DatabaseError, MusicLabError, Result};

const CURRENT_DB_VERSION: u32 = 1;

const SONG_SELECT: &str = r#"
    SELECT s.id, s.group_id, g.name, s.song_name, s.release_date, s.text, s.link,
           s.created_at, s.updated_at
    FROM songs s
    INNER JOIN music_groups g ON g.id = s.group_id
"#;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("Opening database at: {}", db_path.display());

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MusicLabError::Internal(e.into()))?;
        }

        let conn = Connection::open(db_path).map_err(DatabaseError::Connection)?;

        // Enable WAL mode for better concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let existing_user_version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if existing_user_version < CURRENT_DB_VERSION {
            Self::upgrade_database(&mut conn, existing_user_version)?;
        }

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn upgrade_database(conn: &mut Connection, existing_version: u32) -> Result<()> {
        debug!("Upgrading database from version {} to {}", existing_version, CURRENT_DB_VERSION);

        if existing_version == 0 {
            let tx = conn.transaction()?;

            tx.pragma_update(None, "user_version", CURRENT_DB_VERSION)?;

            tx.execute_batch(r#"
                CREATE TABLE music_groups (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at DATETIME NOT NULL,
                    updated_at DATETIME NOT NULL
                );

                CREATE TABLE songs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    group_id INTEGER NOT NULL REFERENCES music_groups(id) ON DELETE CASCADE,
                    song_name TEXT NOT NULL,
                    release_date TEXT NOT NULL DEFAULT '',
                    text TEXT NOT NULL DEFAULT '',
                    link TEXT,
                    created_at DATETIME NOT NULL,
                    updated_at DATETIME NOT NULL,
                    UNIQUE (group_id, song_name)
                );

                CREATE INDEX idx_songs_release_date ON songs(release_date);
            "#).map_err(|e| DatabaseError::Migration(e.to_string()))?;

            tx.commit()?;
        }

        info!("Database upgraded successfully");
        Ok(())
    }

    pub(crate) async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
            operation(&mut *guard)
        })
        .await?
    }
}

fn map_song(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        group_id: row.get(1)?,
        group_name: row.get(2)?,
        song_name: row.get(3)?,
        release_date: row.get(4)?,
        text: row.get(5)?,
        link: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn song_not_found(id: SongId) -> MusicLabError {
    MusicLabError::NotFound(format!("song {}", id))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(ffi::Error { code: ffi::ErrorCode::ConstraintViolation, .. }, _)
    )
}

/// `%value%` with LIKE wildcards in the value escaped by backslash
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn get_song(conn: &Connection, id: SongId) -> Result<Song> {
    let sql = format!("{} WHERE s.id = ?1", SONG_SELECT);
    conn.query_row(&sql, params![id], map_song)
        .optional()?
        .ok_or_else(|| song_not_found(id))
}

/// Atomic get-or-insert of a group row by its unique name
fn resolve_group(conn: &Connection, name: &str) -> Result<GroupId> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO music_groups (name, created_at, updated_at) VALUES (?1, ?2, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, now],
    )?;

    let id = conn.query_row("SELECT id FROM music_groups WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}

fn create_song(
    conn: &mut Connection,
    group_name: &str,
    song_name: &str,
    enrichment: &EnrichmentResult,
) -> Result<CreatedSong> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let group_id = resolve_group(&tx, group_name)?;

    let existing: Option<SongId> = tx
        .query_row(
            "SELECT id FROM songs WHERE group_id = ?1 AND song_name = ?2",
            params![group_id, song_name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        let song = get_song(&tx, id)?;
        tx.commit()?;
        debug!("Song already exists: {} - {} (id {})", group_name, song_name, id);
        return Ok(CreatedSong {
            song,
            outcome: CreateOutcome::AlreadyExists(id),
        });
    }

    let now = Utc::now();
    tx.execute(
        r#"
        INSERT INTO songs (group_id, song_name, release_date, text, link, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
        params![
            group_id,
            song_name,
            enrichment.release_date,
            enrichment.text,
            enrichment.link,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let song = get_song(&tx, id)?;

    tx.commit()?;
    Ok(CreatedSong {
        song,
        outcome: CreateOutcome::Created(id),
    })
}

fn update_song(conn: &mut Connection, id: SongId, patch: &SongPatch) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    let mut assign = |column: &str, value: Box<dyn ToSql>| {
        values.push(value);
        assignments.push(format!("{} = ?{}", column, values.len()));
    };

    assign("updated_at", Box::new(Utc::now()));

    if let Some(group_name) = patch.group_name.as_deref() {
        let group_id = resolve_group(&tx, group_name.trim())?;
        assign("group_id", Box::new(group_id));
    }
    if let Some(song_name) = patch.song_name.as_deref() {
        assign("song_name", Box::new(song_name.trim().to_string()));
    }
    if let Some(release_date) = patch.release_date.as_deref() {
        assign("release_date", Box::new(release_date.to_string()));
    }
    if let Some(text) = patch.text.as_deref() {
        assign("text", Box::new(text.to_string()));
    }
    if let Some(link) = patch.link.as_deref() {
        assign("link", Box::new(link.to_string()));
    }

    values.push(Box::new(id));
    let sql = format!("UPDATE songs SET {} WHERE id = ?{}", assignments.join(", "), values.len());
    debug!("Executing song update: {}", sql);

    let affected = match tx.execute(&sql, params_from_iter(values.iter())) {
        Ok(affected) => affected,
        Err(e) if is_constraint_violation(&e) => {
            return Err(MusicLabError::Validation(
                "a song with this group and name already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if affected == 0 {
        // Dropping the transaction rolls back any group created above
        return Err(song_not_found(id));
    }

    tx.commit()?;
    Ok(())
}

fn delete_song(conn: &Connection, id: SongId) -> Result<()> {
    let affected = conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(song_not_found(id));
    }
    Ok(())
}

fn delete_song_by_name(conn: &mut Connection, group_name: &str, song_name: &str) -> Result<SongId> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let id: SongId = tx
        .query_row(
            r#"
            SELECT s.id FROM songs s
            INNER JOIN music_groups g ON g.id = s.group_id
            WHERE g.name = ?1 AND s.song_name = ?2
            "#,
            params![group_name, song_name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| MusicLabError::NotFound(format!("song {} - {}", group_name, song_name)))?;

    tx.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(id)
}

fn list_songs(conn: &Connection, filter: &LibraryFilter, offset: i64, limit: i64) -> Result<(Vec<Song>, i64)> {
    let mut conditions: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    let like_filters = [
        ("g.name", non_blank(&filter.group)),
        ("s.song_name", non_blank(&filter.song)),
        ("s.text", non_blank(&filter.text)),
    ];
    for (column, value) in like_filters {
        if let Some(value) = value {
            args.push(Value::Text(like_pattern(value)));
            conditions.push(format!("{} LIKE ?{} ESCAPE '\\'", column, args.len()));
        }
    }

    if let Some(release_date) = non_blank(&filter.release_date) {
        args.push(Value::Text(release_date.to_string()));
        conditions.push(format!("s.release_date = ?{}", args.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!(
        "SELECT COUNT(*) FROM songs s INNER JOIN music_groups g ON g.id = s.group_id{}",
        where_clause
    );
    let total: i64 = conn.query_row(&count_sql, params_from_iter(args.iter()), |row| row.get(0))?;

    let page_sql = format!(
        "{}{} ORDER BY s.id LIMIT ?{} OFFSET ?{}",
        SONG_SELECT,
        where_clause,
        args.len() + 1,
        args.len() + 2
    );
    args.push(Value::Integer(limit));
    args.push(Value::Integer(offset));

    let mut stmt = conn.prepare(&page_sql)?;
    let songs = stmt
        .query_map(params_from_iter(args.iter()), map_song)?
        .collect::<rusqlite::Result<Vec<Song>>>()?;

    Ok((songs, total))
}

#[async_trait]
impl Repository for Database {
    async fn ping(&self) -> Result<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn get_song_by_id(&self, id: SongId) -> Result<Song> {
        self.run(move |conn| get_song(conn, id)).await
    }

    async fn create_song(
        &self,
        group_name: &str,
        song_name: &str,
        enrichment: &EnrichmentResult,
    ) -> Result<CreatedSong> {
        let group_name = group_name.to_string();
        let song_name = song_name.to_string();
        let enrichment = enrichment.clone();
        self.run(move |conn| create_song(conn, &group_name, &song_name, &enrichment)).await
    }

    async fn update_song(&self, id: SongId, patch: &SongPatch) -> Result<()> {
        let patch = patch.clone();
        self.run(move |conn| update_song(conn, id, &patch)).await
    }

    async fn delete_song(&self, id: SongId) -> Result<()> {
        self.run(move |conn| delete_song(conn, id)).await
    }

    async fn delete_song_by_name(&self, group_name: &str, song_name: &str) -> Result<SongId> {
        let group_name = group_name.to_string();
        let song_name = song_name.to_string();
        self.run(move |conn| delete_song_by_name(conn, &group_name, &song_name)).await
    }

    async fn list_songs(&self, filter: &LibraryFilter, offset: i64, limit: i64) -> Result<(Vec<Song>, i64)> {
        let filter = filter.clone();
        self.run(move |conn| list_songs(conn, &filter, offset, limit)).await
    }
}
