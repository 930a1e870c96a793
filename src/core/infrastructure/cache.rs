use std::collections::HashMap;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::CacheError;

type CacheResult<T> = std::result::Result<T, CacheError>;

// Generic trait for key-value cache backends
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
    async fn ping(&self) -> CacheResult<()>;
    fn backend_name(&self) -> &'static str;
}

// Redis cache implementation
pub struct RedisCache {
    client: RedisClient,
    key_prefix: String,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> CacheResult<Self> {
        let client = RedisClient::open(redis_url)?;

        Ok(Self {
            client,
            key_prefix: "musiclab:".to_string(),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.prefixed(key);
        let mut con = self.client.get_async_connection().await?;
        let value: Option<String> = con.get(&key).await?;

        match value {
            Some(_) => debug!("Redis cache hit for {}", key),
            None => debug!("Redis cache miss for {}", key),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let key = self.prefixed(key);
        let mut con = self.client.get_async_connection().await?;
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = con.set_ex(&key, value, seconds).await?;

        debug!("Cached {} in Redis for {}s", key, seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.prefixed(key);
        let mut con = self.client.get_async_connection().await?;
        let _: () = con.del(&key).await?;

        debug!("Removed {} from Redis", key);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut con = self.client.get_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache used when no Redis URL is configured
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        let value = entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone());

        match value {
            Some(_) => debug!("Memory cache hit for {}", key),
            None => debug!("Memory cache miss for {}", key),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Expired entries are dropped on write
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Open the configured cache backend, falling back to memory when Redis is unusable
pub fn open_cache(redis_url: Option<&str>) -> Box<dyn KeyValueCache> {
    if let Some(url) = redis_url {
        match RedisCache::new(url) {
            Ok(cache) => {
                debug!("Redis cache initialized");
                return Box::new(cache);
            }
            Err(e) => {
                warn!("Failed to initialize Redis cache, falling back to memory: {}", e);
            }
        }
    }

    Box::new(MemoryCache::new())
}
