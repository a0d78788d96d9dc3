// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::stream::{PipelineSettings, ReasoningTags};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated tutorline config.
#[derive(Debug)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub stream: StreamConfig,
    /// Absent when no search provider is configured; the source endpoints
    /// then answer with a 500.
    pub search: Option<SearchConfig>,
    pub sources: SourcesConfig,
    /// Environment label (e.g. "development", "production").
    pub environment: String,
    /// SHA256 of the raw YAML: "sha256:{hex}". Logged so operators can tell
    /// which config a running instance was started with.
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// An API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ---------------------------------------------------------------------------
// Upstream LLM provider
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    pub model: String,
    pub observability: Option<ObservabilityConfig>,
    pub generation: GenerationParams,
}

impl UpstreamConfig {
    /// Base URL requests are actually sent to. The observability gateway,
    /// when configured, sits in front of the provider.
    pub fn effective_base_url(&self) -> &str {
        match &self.observability {
            Some(obs) => &obs.base_url,
            None => &self.base_url,
        }
    }
}

/// Logging gateway placed in front of the provider (Helicone-style).
#[derive(Debug)]
pub struct ObservabilityConfig {
    pub base_url: String,
    pub api_key: ApiKey,
}

/// Sampling parameters forwarded verbatim in every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub reasoning: ReasoningTags,
    pub leading_newline_window: usize,
    /// Bound on one whole chat request: connect, error body and stream.
    pub max_duration: Duration,
}

impl StreamConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            tags: self.reasoning.clone(),
            leading_newline_window: self.leading_newline_window,
        }
    }
}

// ---------------------------------------------------------------------------
// Search and source extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    Serper,
    Bing,
}

#[derive(Debug)]
pub struct SearchConfig {
    pub engine: SearchEngine,
    pub api_key: ApiKey,
    /// Endpoint URL, already defaulted per engine.
    pub base_url: String,
    pub excluded_sites: Vec<String>,
    pub result_count: usize,
    pub max_retries: u32,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub max_sources: usize,
    pub fetch_timeout: Duration,
    pub max_content_chars: usize,
    pub max_retries: u32,
}
