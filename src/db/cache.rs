use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Fixed TTL for cached catalog lookups
pub const CATALOG_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default entry capacity before eviction kicks in
const DEFAULT_CAPACITY: usize = 256;

/// Keys identifying a cached catalog call by its signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search { query: String, page: u32 },
    Details { tmdb_id: i64, is_tv: bool },
    DiscoverMovies { genre_id: i64, page: u32 },
    DiscoverShows { genre_id: i64, page: u32 },
    PopularMovies { limit: usize },
    PopularShows { limit: usize },
    TopRatedMovies { limit: usize },
    TopRatedShows { limit: usize },
    HighlyRatedMovies { limit: usize },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search { query, page } => {
                write!(f, "search:{}:{}", query.to_lowercase(), page)
            }
            CacheKey::Details { tmdb_id, is_tv } => write!(f, "details:{}:{}", tmdb_id, is_tv),
            CacheKey::DiscoverMovies { genre_id, page } => {
                write!(f, "discover:movie:{}:{}", genre_id, page)
            }
            CacheKey::DiscoverShows { genre_id, page } => {
                write!(f, "discover:tv:{}:{}", genre_id, page)
            }
            CacheKey::PopularMovies { limit } => write!(f, "popular:movie:{}", limit),
            CacheKey::PopularShows { limit } => write!(f, "popular:tv:{}", limit),
            CacheKey::TopRatedMovies { limit } => write!(f, "top_rated:movie:{}", limit),
            CacheKey::TopRatedShows { limit } => write!(f, "top_rated:tv:{}", limit),
            CacheKey::HighlyRatedMovies { limit } => write!(f, "highly_rated:movie:{}", limit),
        }
    }
}

struct CacheEntry {
    expires_at: Instant,
    payload: String,
}

/// Bounded in-process cache for catalog lookups
///
/// Every entry carries its own expiry timestamp. Expired entries are dropped
/// when touched, and inserting at capacity evicts the entry closest to
/// expiry. Concurrent identical misses may both compute and both store;
/// the second write wins and the work is merely duplicated.
#[derive(Clone)]
pub struct CatalogCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, CATALOG_CACHE_TTL)
    }

    pub fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity,
        }
    }

    /// Retrieves a live value for the key, dropping it if expired
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > now => {
                    return match serde_json::from_str(&entry.payload) {
                        Ok(value) => {
                            tracing::debug!(key = %key, "Cache hit");
                            Some(value)
                        }
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "Cache deserialization error");
                            None
                        }
                    };
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale; evict it on this access
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&key) {
            if entry.expires_at <= now {
                entries.remove(&key);
                tracing::debug!(key = %key, "Evicted expired cache entry");
            }
        }
        None
    }

    /// Stores a value under the key with a fresh expiry timestamp
    pub async fn insert<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.to_string();
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            // Still full after dropping stale entries: evict the one closest
            // to expiry
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                tracing::debug!(key = %oldest, "Evicted cache entry at capacity");
            }
        }

        entries.insert(
            key,
            CacheEntry {
                expires_at: now + self.ttl,
                payload,
            },
        );
    }

    /// Drops every cached entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, including not-yet-evicted stale ones
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
