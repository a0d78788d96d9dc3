// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Page fetch and readable-text extraction
//
// Extraction never fails: any fetch or parse problem produces a placeholder
// record with status "error" so the caller can still show the source.

use super::retry::{retry_with_backoff, DEFAULT_BASE_DELAY};
use super::{ParsedSource, SearchResult, SourceError, SourceStatus};
use crate::config::SourcesConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

const UNAVAILABLE_TEXT: &str =
    "Unable to access this source. This may be due to access restrictions or temporary unavailability.";

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, source: &SearchResult) -> ParsedSource;
}

// ---------------------------------------------------------------------------
// HtmlExtractor
// ---------------------------------------------------------------------------

pub struct HtmlExtractor {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    max_content_chars: usize,
}

impl HtmlExtractor {
    pub fn new(client: reqwest::Client, settings: &SourcesConfig) -> Self {
        Self {
            client,
            timeout: settings.fetch_timeout,
            max_retries: settings.max_retries,
            max_content_chars: settings.max_content_chars,
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, SourceError> {
        let resp = self.client.get(url).timeout(self.timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(&self, source: &SearchResult) -> ParsedSource {
        let fetched = retry_with_backoff(self.max_retries, DEFAULT_BASE_DELAY, || {
            self.fetch_html(&source.url)
        })
        .await;

        match fetched {
            Ok(html) => parse_page(&html, source, self.max_content_chars),
            Err(e) => {
                tracing::info!(url = %source.url, error = %e, "source unavailable");
                placeholder(source, &e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract title, description and body text from a fetched page.
pub fn parse_page(html: &str, source: &SearchResult, max_chars: usize) -> ParsedSource {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title")
        .or_else(|| (!source.name.trim().is_empty()).then(|| source.name.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    let description = Selector::parse(r#"meta[name="description"]"#)
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .unwrap_or_default();

    let body = readable_text(&document)
        .map(|text| clean_text(&text, max_chars))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "Content not available".to_string());

    let mut full_content = format!("Title: {title}\n\n");
    if !description.is_empty() {
        full_content.push_str(&format!("Description: {description}\n\n"));
    }
    full_content.push_str(&format!("Content: {body}"));

    ParsedSource {
        name: source.name.clone(),
        url: source.url.clone(),
        snippet: source.snippet.clone(),
        full_content,
        title,
        description,
        status: SourceStatus::Success,
        error: None,
    }
}

/// Record shown when a page could not be fetched or read.
pub fn placeholder(source: &SearchResult, error: &str) -> ParsedSource {
    ParsedSource {
        name: source.name.clone(),
        url: source.url.clone(),
        snippet: source.snippet.clone(),
        full_content: format!("Title: {}\n\nContent: {UNAVAILABLE_TEXT}", source.name),
        title: source.name.clone(),
        description: String::new(),
        status: SourceStatus::Error,
        error: Some(error.to_string()),
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let text = compact_ws(&text_of(document.select(&sel).next()?));
    (!text.is_empty()).then_some(text)
}

/// Article text: `p`/`li` blocks of the first `article`, `main` or `body`,
/// falling back to all text under that root.
fn readable_text(document: &Html) -> Option<String> {
    let root = ["article", "main", "body"].iter().find_map(|name| {
        Selector::parse(name)
            .ok()
            .and_then(|sel| document.select(&sel).next())
    })?;

    let blocks: Vec<String> = Selector::parse("p, li")
        .ok()
        .map(|sel| {
            root.select(&sel)
                .map(|el| compact_ws(&text_of(el)))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if blocks.is_empty() {
        let all = text_of(root);
        return (!all.trim().is_empty()).then_some(all);
    }
    Some(blocks.join("\n"))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn compact_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Text cleaning
// ---------------------------------------------------------------------------

static FOUR_PLUS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("valid regex pattern"));
static THREE_PLUS_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {3,}").expect("valid regex pattern"));
static NEWLINE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+(\s*\n)*").expect("valid regex pattern"));

/// Normalize extracted page text and cap it at `max_chars` characters.
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let s = FOUR_PLUS_NEWLINES.replace_all(text.trim(), "\n\n\n");
    let s = s.replace("\n\n", " ");
    let s = THREE_PLUS_SPACES.replace_all(&s, "  ");
    let s = s.replace('\t', "");
    let s = NEWLINE_RUNS.replace_all(&s, "\n");
    s.chars().take(max_chars).collect()
}
