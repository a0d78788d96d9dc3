// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML shapes. Every field is optional here; defaults, interpolation and
// validation happen in the loader when these become the public types.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub tutorline: String,
    pub upstream: RawUpstream,
    pub stream: Option<RawStream>,
    pub search: Option<RawSearch>,
    pub sources: Option<RawSources>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstream {
    pub base_url: Option<String>,
    pub api_key: String,
    pub model: Option<String>,
    pub observability: Option<RawObservability>,
    pub generation: Option<RawGeneration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawObservability {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGeneration {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub repetition_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStream {
    pub reasoning: Option<RawReasoning>,
    pub leading_newline_window: Option<usize>,
    pub max_duration_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReasoning {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSearch {
    pub engine: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub excluded_sites: Option<Vec<String>>,
    pub result_count: Option<usize>,
    pub max_retries: Option<u32>,
    pub cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSources {
    pub max_sources: Option<usize>,
    pub fetch_timeout_ms: Option<u64>,
    pub max_content_chars: Option<usize>,
    pub max_retries: Option<u32>,
}
