// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Web sources for grounding answers
//
// Responsibilities:
// - Search the web for a question (Serper or Bing), with retry and caching
// - Fetch the top result pages and extract readable text
// - Keep only sources with usable content, but never return nothing for a
//   non-empty request

mod cache;
mod extract;
mod retry;
mod search;

pub use cache::{cache_key, InMemorySourceCache, SourceCache};
pub use extract::{clean_text, parse_page, placeholder, ContentExtractor, HtmlExtractor};
pub use retry::{retry_with_backoff, DEFAULT_BASE_DELAY};
pub use search::{build_search_provider, BingSearch, SearchProvider, SerperSearch};

use crate::config::{Config, SourcesConfig};
use crate::proxy::SourceBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fetched pages shorter than this are treated as empty.
const MIN_USEFUL_CONTENT_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// One search hit as returned to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Error,
}

/// A search hit with the page's extracted text attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSource {
    pub name: String,
    pub url: String,
    pub snippet: String,
    pub full_content: String,
    pub title: String,
    pub description: String,
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ParsedSource {
    fn is_useful(&self) -> bool {
        self.status == SourceStatus::Success
            && self.full_content.chars().count() > MIN_USEFUL_CONTENT_CHARS
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no search engine configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SourceService
// ---------------------------------------------------------------------------

pub struct SourceService {
    search: Option<Arc<dyn SearchProvider>>,
    search_retries: u32,
    extractor: Arc<dyn ContentExtractor>,
    cache: Arc<dyn SourceCache>,
    settings: SourcesConfig,
}

impl SourceService {
    pub fn new(
        search: Option<Arc<dyn SearchProvider>>,
        search_retries: u32,
        extractor: Arc<dyn ContentExtractor>,
        cache: Arc<dyn SourceCache>,
        settings: SourcesConfig,
    ) -> Self {
        Self {
            search,
            search_retries,
            extractor,
            cache,
            settings,
        }
    }
}

#[async_trait]
impl SourceBackend for SourceService {
    async fn find_sources(&self, question: &str) -> Result<Vec<SearchResult>, SourceError> {
        let search = self.search.as_ref().ok_or(SourceError::NotConfigured)?;

        if let Some(hit) = self.cache.get(question) {
            tracing::debug!(results = hit.len(), "search cache hit");
            return Ok(hit);
        }

        let query = format!("what is {}", question.trim());
        let results = retry_with_backoff(self.search_retries, DEFAULT_BASE_DELAY, || {
            search.search(&query)
        })
        .await?;

        tracing::info!(results = results.len(), "search completed");
        self.cache.insert(question, results.clone());
        Ok(results)
    }

    async fn parse_sources(
        &self,
        sources: Vec<SearchResult>,
    ) -> Result<Vec<ParsedSource>, SourceError> {
        let total = sources.len();
        let limited: Vec<SearchResult> =
            sources.into_iter().take(self.settings.max_sources).collect();

        let processed = futures_util::future::join_all(
            limited.iter().map(|source| self.extractor.extract(source)),
        )
        .await;

        let useful: Vec<ParsedSource> = processed.iter().filter(|p| p.is_useful()).cloned().collect();
        tracing::info!(
            requested = total,
            processed = processed.len(),
            useful = useful.len(),
            "sources parsed"
        );

        if useful.is_empty() {
            Ok(processed.into_iter().take(1).collect())
        } else {
            Ok(useful)
        }
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default service
// ---------------------------------------------------------------------------

pub fn build_source_service(config: &Config, client: reqwest::Client) -> SourceService {
    let search = config
        .search
        .as_ref()
        .map(|search| build_search_provider(search, client.clone()));
    let (search_retries, cache_ttl) = match &config.search {
        Some(s) => (s.max_retries, s.cache_ttl),
        None => (0, std::time::Duration::ZERO),
    };

    SourceService::new(
        search,
        search_retries,
        Arc::new(HtmlExtractor::new(client, &config.sources)),
        Arc::new(InMemorySourceCache::new(cache_ttl)),
        config.sources.clone(),
    )
}
