// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Web search providers
//
// Serper: POST JSON, results under `organic[]` as { title, link, snippet }.
// Bing:   GET with query string, results under `webPages.value[]` as
//         { name, url, snippet }.

use super::{SearchResult, SourceError};
use crate::config::{SearchConfig, SearchEngine};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SourceError>;
}

pub fn build_search_provider(config: &SearchConfig, client: reqwest::Client) -> Arc<dyn SearchProvider> {
    let common = SearchCommon {
        client,
        base_url: config.base_url.clone(),
        api_key: config.api_key.expose().to_string(),
        result_count: config.result_count,
        excluded_sites: config.excluded_sites.clone(),
    };
    match config.engine {
        SearchEngine::Serper => Arc::new(SerperSearch { common }),
        SearchEngine::Bing => Arc::new(BingSearch { common }),
    }
}

struct SearchCommon {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    result_count: usize,
    excluded_sites: Vec<String>,
}

impl SearchCommon {
    fn is_excluded(&self, url: &str) -> bool {
        self.excluded_sites.iter().any(|site| url.contains(site.as_str()))
    }

    fn keep(&self, results: impl IntoIterator<Item = SearchResult>) -> Vec<SearchResult> {
        results
            .into_iter()
            .filter(|r| !self.is_excluded(&r.url))
            .collect()
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, SourceError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

pub struct SerperSearch {
    common: SearchCommon,
}

#[derive(Deserialize)]
struct SerperResponse {
    organic: Option<Vec<SerperHit>>,
}

#[derive(Deserialize)]
struct SerperHit {
    title: String,
    link: String,
    snippet: Option<String>,
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SourceError> {
        let c = &self.common;
        let body = serde_json::json!({
            "q": query,
            "num": c.result_count,
            "gl": "us",
            "hl": "en",
        });
        let resp = c
            .client
            .post(&c.base_url)
            .header("X-API-KEY", &c.api_key)
            .json(&body)
            .send()
            .await?;

        let data: SerperResponse = read_json(resp).await?;
        let hits = data.organic.unwrap_or_default();
        Ok(c.keep(hits.into_iter().map(|h| SearchResult {
            name: h.title,
            url: h.link,
            snippet: h.snippet.unwrap_or_default(),
        })))
    }
}

// ---------------------------------------------------------------------------
// Bing
// ---------------------------------------------------------------------------

pub struct BingSearch {
    common: SearchCommon,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<BingWebPages>,
}

#[derive(Deserialize)]
struct BingWebPages {
    value: Option<Vec<BingHit>>,
}

#[derive(Deserialize)]
struct BingHit {
    name: String,
    url: String,
    snippet: Option<String>,
}

impl BingSearch {
    /// Bing takes exclusions inline as `-site:` operators.
    fn query_with_exclusions(&self, query: &str) -> String {
        let mut q = query.to_string();
        for site in &self.common.excluded_sites {
            q.push_str(" -site:");
            q.push_str(site);
        }
        q
    }
}

#[async_trait]
impl SearchProvider for BingSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SourceError> {
        let c = &self.common;
        let q = self.query_with_exclusions(query);
        let count = c.result_count.to_string();
        let resp = c
            .client
            .get(&c.base_url)
            .header("Ocp-Apim-Subscription-Key", &c.api_key)
            .query(&[
                ("q", q.as_str()),
                ("mkt", "en-US"),
                ("count", count.as_str()),
                ("safeSearch", "Strict"),
            ])
            .send()
            .await?;

        let data: BingResponse = read_json(resp).await?;
        let hits = data
            .web_pages
            .and_then(|pages| pages.value)
            .unwrap_or_default();
        Ok(c.keep(hits.into_iter().map(|h| SearchResult {
            name: h.name,
            url: h.url,
            snippet: h.snippet.unwrap_or_default(),
        })))
    }
}
