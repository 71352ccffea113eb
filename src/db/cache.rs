use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

/// Key-value store behind the response and provider caches
///
/// Values are opaque strings (JSON in practice) with a time-to-live in seconds.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value if present and not expired
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Writes a value and waits for the store to acknowledge it
    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()>;

    /// Writes a value only if the key is absent; returns whether it was written
    async fn set_if_absent(&self, key: &str, value: String, ttl: u64) -> AppResult<bool>;

    /// Queues a write without waiting for it. Failures are only logged.
    fn set_in_background(&self, key: &str, value: String, ttl: u64);

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Rendered response for one caller class and one full request path
    Response {
        viewer: Option<i64>,
        path: String,
    },
    TmdbMovie(i64),
    TmdbRecommendations {
        movie_id: i64,
        page: u32,
    },
    TmdbTopRated(u32),
    TmdbUpcoming(u32),
    /// Refresh token id that may no longer be used
    RevokedToken(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Response {
                viewer: Some(user_id),
                path,
            } => write!(f, "resp:user:{}:{}", user_id, path),
            CacheKey::Response { viewer: None, path } => write!(f, "resp:anon:{}", path),
            CacheKey::TmdbMovie(id) => write!(f, "tmdb:movie:{}", id),
            CacheKey::TmdbRecommendations { movie_id, page } => {
                write!(f, "tmdb:recommendations:{}:page:{}", movie_id, page)
            }
            CacheKey::TmdbTopRated(page) => write!(f, "tmdb:top_rated:page:{}", page),
            CacheKey::TmdbUpcoming(page) => write!(f, "tmdb:upcoming:page:{}", page),
            CacheKey::RevokedToken(jti) => write!(f, "jwt:blacklist:{}", jti),
        }
    }
}

/// Expiry pair for a response cache: anonymous callers tolerate staler data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub anonymous: u64,
    pub authenticated: u64,
}

impl CacheTtl {
    pub const fn new(anonymous: u64, authenticated: u64) -> Self {
        Self {
            anonymous,
            authenticated,
        }
    }

    pub fn for_caller(&self, is_authenticated: bool) -> u64 {
        if is_authenticated {
            self.authenticated
        } else {
            self.anonymous
        }
    }
}

/// Typed cache facade over a shared [`CacheStore`]
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Retrieves and deserializes a value from the cache by key
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        match self.store.get(&key.to_string()).await? {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Serializes the value and hands it to the store's background writer
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        match serde_json::to_string(value) {
            Ok(json) => self.store.set_in_background(&key.to_string(), json, ttl),
            Err(e) => tracing::error!(error = %e, key = %key, "Cache serialization error"),
        }
    }

    /// Returns the cached value for `key`, or runs `compute` and caches its result for `ttl` seconds
    ///
    /// A failing cache read counts as a miss. Errors from `compute` are returned and nothing is stored.
    /// Concurrent misses may both compute; the last write wins.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, ttl: u64, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.get_from_cache(key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(cached);
            }
            Ok(None) => tracing::debug!(key = %key, "Cache miss"),
            Err(e) => tracing::warn!(error = %e, key = %key, backend = self.store.name(), "Cache read failed, computing"),
        }

        let value = compute().await?;
        self.set_in_background(key, &value, ttl);
        Ok(value)
    }

    /// Response cache with separate expiry for authenticated and anonymous callers
    pub async fn cached_fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: CacheTtl,
        is_authenticated: bool,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.get_or_compute(key, ttl.for_caller(is_authenticated), compute)
            .await
    }

    /// Atomically stores a marker; `false` means someone else already holds it
    pub async fn mark_once(&self, key: &CacheKey, ttl: u64) -> AppResult<bool> {
        self.store
            .set_if_absent(&key.to_string(), "1".to_string(), ttl.max(1))
            .await
    }
}

/// Process-local store used when no Redis URL is configured
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, key: &str, value: String, ttl: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), (value, expires_at));
    }

    fn write_if_absent(&self, key: &str, value: String, ttl: u64) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(entries.get(key), Some((_, expires_at)) if *expires_at > now) {
            return false;
        }
        entries.insert(key.to_string(), (value, now + Duration::from_secs(ttl)));
        true
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                return Ok(Some(value.clone()))
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        self.write(key, value, ttl);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String, ttl: u64) -> AppResult<bool> {
        Ok(self.write_if_absent(key, value, ttl))
    }

    fn set_in_background(&self, key: &str, value: String, ttl: u64) {
        self.write(key, value, ttl);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
