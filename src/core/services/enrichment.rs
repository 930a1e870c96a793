//! Song creation: fetch details from the lyrics provider, then persist.
//!
//! Provider calls are retried a bounded number of times with a fixed delay
//! between attempts. All attempts share one deadline. Both the attempts and
//! the waits between them race the deadline and the cancel token, so neither
//! has to run to completion before a timeout or cancellation is observed.
//! Nothing is written until a provider answer is in hand. Cancellation is
//! observed up to the start of the write; once the transaction is submitted
//! it runs to completion and its result is reported.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::data::Repository;
use crate::core::infrastructure::CancelToken;
use crate::core::lyrics::normalize_lyrics;
use crate::core::models::{CreateOutcome, CreatedSong, EnrichmentResult, ProviderSongDetail, SongRequest};
use crate::core::services::provider::LyricsProvider;
use crate::error::{MusicLabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct EnrichmentPipeline {
    provider: Arc<dyn LyricsProvider>,
    repository: Arc<dyn Repository>,
    policy: RetryPolicy,
}

impl EnrichmentPipeline {
    pub fn new(provider: Arc<dyn LyricsProvider>, repository: Arc<dyn Repository>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            repository,
            policy: RetryPolicy {
                max_retries: policy.max_retries.max(1),
                ..policy
            },
        }
    }

    pub async fn create(&self, request: &SongRequest, cancel: &CancelToken) -> Result<CreatedSong> {
        let request = request.validated()?;
        debug!("Creating song: {} - {}", request.group, request.song);

        let enrichment = self.fetch_with_retry(&request, cancel).await?;

        cancel.check()?;
        let created = self
            .repository
            .create_song(&request.group, &request.song, &enrichment)
            .await?;

        let song = &created.song;
        match created.outcome {
            CreateOutcome::Created(id) => info!("Song created: {} - {} (id {})", song.group_name, song.song_name, id),
            CreateOutcome::AlreadyExists(id) => {
                info!("Song already in library: {} - {} (id {})", song.group_name, song.song_name, id)
            }
        }

        Ok(created)
    }

    async fn fetch_with_retry(&self, request: &SongRequest, cancel: &CancelToken) -> Result<EnrichmentResult> {
        let max_retries = self.policy.max_retries;
        let deadline = Instant::now() + self.policy.timeout;

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(MusicLabError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MusicLabError::Cancelled),
                _ = sleep_until(deadline) => {
                    warn!("Lyrics request deadline reached during attempt {}/{}", attempt, max_retries);
                    return Err(MusicLabError::DeadlineExceeded { attempts: attempt });
                }
                result = self.provider.fetch(&request.group, &request.song) => result,
            };

            match result {
                Ok(detail) => {
                    debug!("Provider answered on attempt {}/{}", attempt, max_retries);
                    return Ok(normalize_detail(detail));
                }
                Err(e) if attempt >= max_retries => {
                    warn!("All {} attempts to fetch lyrics failed: {}", max_retries, e);
                    return Err(MusicLabError::FetchFailed { attempts: attempt, source: e });
                }
                Err(e) => {
                    warn!("Attempt {}/{} to fetch lyrics failed: {}", attempt, max_retries, e);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MusicLabError::Cancelled),
                _ = sleep_until(deadline) => {
                    warn!("Lyrics request deadline reached after {} attempt(s)", attempt);
                    return Err(MusicLabError::DeadlineExceeded { attempts: attempt });
                }
                _ = sleep(self.policy.retry_delay) => {}
            }
        }
    }
}

fn normalize_detail(detail: ProviderSongDetail) -> EnrichmentResult {
    let link = detail
        .link
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty());

    EnrichmentResult {
        release_date: detail.release_date.trim().to_string(),
        text: normalize_lyrics(&detail.text),
        link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::Database;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Provider answering from a script of results, one per call
    struct ScriptedProvider {
        script: Mutex<VecDeque<std::result::Result<ProviderSongDetail, u16>>>,
        calls: AtomicU32,
        latency: Duration,
    }

    impl ScriptedProvider {
        fn new(script: Vec<std::result::Result<ProviderSongDetail, u16>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                latency: Duration::ZERO,
            }
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LyricsProvider for ScriptedProvider {
        async fn fetch(&self, _group: &str, _song: &str) -> std::result::Result<ProviderSongDetail, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(detail)) => Ok(detail),
                Some(Err(status)) => Err(ProviderError::Status {
                    status,
                    body: "unavailable".to_string(),
                }),
                None => Err(ProviderError::InvalidResponse {
                    reason: "script exhausted".to_string(),
                }),
            }
        }
    }

    fn detail(text: &str) -> ProviderSongDetail {
        ProviderSongDetail {
            release_date: " 16.07.2006 ".to_string(),
            text: text.to_string(),
            link: Some("https://www.youtube.com/watch?v=Xsp3_a-PMTw".to_string()),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    async fn count(db: &Database, sql: &'static str) -> i64 {
        db.run(move |conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_normalized_result() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(detail("  line one \n\n\n line two "))]));
        let pipeline = EnrichmentPipeline::new(provider.clone(), db.clone(), fast_policy());

        let created = pipeline
            .create(&SongRequest::new("Muse", "Supermassive Black Hole"), &CancelToken::new())
            .await
            .unwrap();

        assert!(matches!(created.outcome, CreateOutcome::Created(_)));
        assert_eq!(created.song.text, "line one\n\nline two");
        assert_eq!(created.song.release_date, "16.07.2006");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_succeeds_on_third_attempt() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(503),
            Err(500),
            Ok(detail("third time lucky")),
        ]));
        let pipeline = EnrichmentPipeline::new(provider.clone(), db.clone(), fast_policy());

        let created = pipeline
            .create(&SongRequest::new("Muse", "Uprising"), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(created.song.text, "third time lucky");
    }

    #[tokio::test]
    async fn test_create_fails_after_all_attempts() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Err(503), Err(502), Err(504)]));
        let pipeline = EnrichmentPipeline::new(provider.clone(), db.clone(), fast_policy());

        let result = pipeline
            .create(&SongRequest::new("Muse", "Uprising"), &CancelToken::new())
            .await;

        match result {
            Err(MusicLabError::FetchFailed { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, ProviderError::Status { status: 504, .. }));
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert_eq!(provider.calls(), 3);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM music_groups").await, 0);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_retries() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Err(503), Err(503), Err(503)]));
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(10),
            timeout: Duration::from_millis(50),
        };
        let pipeline = EnrichmentPipeline::new(provider.clone(), db.clone(), policy);

        let started = std::time::Instant::now();
        let result = pipeline
            .create(&SongRequest::new("Muse", "Uprising"), &CancelToken::new())
            .await;

        assert!(matches!(result, Err(MusicLabError::DeadlineExceeded { attempts: 1 })));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(provider.calls(), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 0);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_attempt() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(
            ScriptedProvider::new(vec![Ok(detail("too late"))]).with_latency(Duration::from_secs(10)),
        );
        let policy = RetryPolicy {
            timeout: Duration::from_millis(50),
            ..fast_policy()
        };
        let pipeline = EnrichmentPipeline::new(provider, db.clone(), policy);

        let result = pipeline
            .create(&SongRequest::new("Muse", "Uprising"), &CancelToken::new())
            .await;

        assert!(matches!(result, Err(MusicLabError::DeadlineExceeded { .. })));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 0);
    }

    /// Keep the connection busy for `hold` so a following write queues behind it
    fn occupy_connection(db: &Database, hold: Duration) -> tokio::task::JoinHandle<()> {
        let db = db.clone();
        tokio::spawn(async move {
            db.run(move |_| {
                std::thread::sleep(hold);
                Ok(())
            })
            .await
            .unwrap();
        })
    }

    #[tokio::test]
    async fn test_cancel_during_write_reports_committed_song() {
        let db = Database::open_in_memory().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(detail("kept"))]));
        let pipeline = EnrichmentPipeline::new(provider, Arc::new(db.clone()), fast_policy());

        let busy = occupy_connection(&db, Duration::from_millis(300));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = pipeline.create(&SongRequest::new("X", "Y"), &cancel).await;
        busy.await.unwrap();

        let created = result.unwrap();
        assert!(matches!(created.outcome, CreateOutcome::Created(_)));
        assert_eq!(created.song.text, "kept");
        assert!(cancel.is_cancelled());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 1);
    }

    #[tokio::test]
    async fn test_cancel_before_write_stores_nothing() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(detail("dropped"))]));
        let pipeline = EnrichmentPipeline::new(provider, db.clone(), fast_policy());

        let cancel = CancelToken::new();
        cancel.cancel();

        let result = pipeline.create(&SongRequest::new("X", "Y"), &cancel).await;
        assert!(matches!(result, Err(MusicLabError::Cancelled)));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retry_wait() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Err(503), Err(503), Err(503)]));
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        };
        let pipeline = EnrichmentPipeline::new(provider.clone(), db.clone(), policy);

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = pipeline.create(&SongRequest::new("Muse", "Uprising"), &cancel).await;

        assert!(matches!(result, Err(MusicLabError::Cancelled)));
        assert_eq!(provider.calls(), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_skips_provider() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(detail("unused"))]));
        let pipeline = EnrichmentPipeline::new(provider.clone(), db, fast_policy());

        let result = pipeline.create(&SongRequest::new("", "Uprising"), &CancelToken::new()).await;

        assert!(matches!(result, Err(MusicLabError::Validation(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_store_one_song() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let script = (0..8).map(|i| Ok(detail(&format!("take {}", i)))).collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let pipeline = Arc::new(EnrichmentPipeline::new(provider, db.clone(), fast_policy()));

        let creates = (0..8).map(|_| {
            let pipeline = pipeline.clone();
            async move {
                pipeline
                    .create(&SongRequest::new("X", "Y"), &CancelToken::new())
                    .await
            }
        });
        let results = futures::future::join_all(creates).await;

        let ids: Vec<i64> = results.into_iter().map(|r| r.unwrap().song.id).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM songs").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM music_groups").await, 1);
    }

    #[test]
    fn test_normalize_detail_drops_blank_link() {
        let normalized = normalize_detail(ProviderSongDetail {
            release_date: "01.03.89".to_string(),
            text: "a\\n\\nb".to_string(),
            link: Some("  ".to_string()),
        });

        assert_eq!(normalized.text, "a\n\nb");
        assert_eq!(normalized.link, None);
    }

    #[test]
    fn test_zero_retries_is_clamped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let pipeline = EnrichmentPipeline::new(
            provider,
            db,
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
        );
        assert_eq!(pipeline.policy.max_retries, 1);
    }
}
