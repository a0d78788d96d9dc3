// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Search result cache.
//
// Repeated questions within the TTL reuse the previous search results
// instead of spending another search API call.

use super::SearchResult;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// SourceCache trait
// ---------------------------------------------------------------------------

/// Trait for cached search results keyed by question.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait SourceCache: Send + Sync {
    /// Cached results for `question`. Returns None if absent or expired.
    fn get(&self, question: &str) -> Option<Vec<SearchResult>>;

    fn insert(&self, question: &str, results: Vec<SearchResult>);

    /// Remove entries older than the TTL.
    fn purge_expired(&self);

    fn clear(&self);
}

/// Normalized cache key: trimmed and lower-cased.
pub fn cache_key(question: &str) -> String {
    question.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// InMemorySourceCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<SearchResult>,
    inserted_at: DateTime<Utc>,
}

/// In-memory cache backed by `DashMap` for concurrent access.
pub struct InMemorySourceCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl InMemorySourceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now
            .signed_duration_since(entry.inserted_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.ttl
    }
}

impl SourceCache for InMemorySourceCache {
    fn get(&self, question: &str) -> Option<Vec<SearchResult>> {
        let key = cache_key(question);
        let entry = self.entries.get(&key)?;

        if self.is_expired(entry.value(), Utc::now()) {
            drop(entry); // release the read lock before removing
            self.entries.remove(&key);
            return None;
        }

        Some(entry.results.clone())
    }

    fn insert(&self, question: &str, results: Vec<SearchResult>) {
        self.entries.insert(
            cache_key(question),
            CacheEntry {
                results,
                inserted_at: Utc::now(),
            },
        );
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
