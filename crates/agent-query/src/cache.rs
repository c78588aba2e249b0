//! Response cache with context-sensitive keys
//!
//! Entries expire a fixed TTL after insertion and are evicted in strict
//! insertion order once the cache grows past its bound. Reads never refresh an
//! entry's position.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::QueryConfig;
use crate::followup::{is_context_dependent, is_vague, normalize_query};
use crate::resolver::ResolvedQuery;
use crate::response::Response;
use crate::symbols::extract_safe_symbols;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    inserted_at: Instant,
}

/// Thread-safe FIFO cache of computed responses
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<IndexMap<String, CacheEntry>>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl ResponseCache {
    /// Create a cache with the given TTL and entry bound
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            ttl,
            max_entries,
        }
    }

    /// Create a cache from the query config
    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(config.cache_ttl, config.cache_max_entries)
    }

    /// Derive the cache key for a query
    ///
    /// Vague queries are scoped to the session so one user's resolved context
    /// never answers another user's identical phrasing.
    pub fn key(query: &str, kind: &str, session_id: &str) -> String {
        let base = format!("{kind}:{}", normalize_query(query));
        if is_vague(query) {
            format!("{base}@{session_id}")
        } else {
            base
        }
    }

    /// Look up a fresh entry
    pub async fn get(&self, key: &str) -> Option<Response> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    tracing::debug!("Cache hit for key: {}", key);
                    return Some(entry.response.clone());
                }
                Some(_) => {}
                None => {
                    tracing::debug!("Cache miss for key: {}", key);
                    return None;
                }
            }
        }

        // Expired: drop it so it does not count against the bound
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl)
        {
            entries.shift_remove(key);
        }
        tracing::debug!("Cache entry expired for key: {}", key);
        None
    }

    /// Insert a response, evicting the oldest entry past the bound
    pub async fn set(&self, key: impl Into<String>, response: Response) {
        let key = key.into();
        let mut entries = self.entries.write().await;

        entries.shift_remove(&key);
        entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );

        while entries.len() > self.max_entries {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!("Cache evicted oldest key: {}", evicted);
            }
        }
    }

    /// Whether the response to a resolved query may be written to the cache
    ///
    /// Context-dependent queries are never cached. Neither is a resolution
    /// whose symbols did not all come from the query text itself, since the
    /// analyzer or the context merge may have read them from the session.
    /// Responses built from per-request input are skipped too: errors, trends,
    /// clarifications, date/time, greetings (they mention the active symbol)
    /// and portfolio reviews (they value the caller's holdings).
    pub fn should_cache(resolved: &ResolvedQuery, response: &Response) -> bool {
        let query = resolved.query.as_str();
        if resolved.used_context || is_context_dependent(query) {
            return false;
        }

        if !resolved.symbols.is_empty() {
            let named = extract_safe_symbols(query);
            if !resolved.symbols.iter().all(|symbol| named.contains(symbol)) {
                tracing::debug!(symbols = ?resolved.symbols, "Not caching, symbols not named in query");
                return false;
            }
        }

        !matches!(
            response,
            Response::Error { .. }
                | Response::TrendAnalysis { .. }
                | Response::Clarification { .. }
                | Response::DateTime { .. }
                | Response::Greeting { .. }
                | Response::PortfolioAnalysis { .. }
        )
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
