// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Built-in defaults applied when tutorline.yaml leaves a field out.

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-R1";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_REPETITION_PENALTY: f32 = 1.1;

pub const DEFAULT_REASONING_START: &str = "<think>";
pub const DEFAULT_REASONING_END: &str = "</think>";

/// Frames at the head of a response whose newline-bearing deltas are dropped.
pub const DEFAULT_LEADING_NEWLINE_WINDOW: usize = 2;

/// Hard ceiling on one streamed response, matching the hosting platform's
/// maximum execution duration for the chat route.
pub const DEFAULT_MAX_STREAM_SECS: u64 = 60;

pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_BING_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
pub const DEFAULT_SEARCH_RESULT_COUNT: usize = 10;
pub const DEFAULT_SEARCH_RETRIES: u32 = 2;
pub const DEFAULT_SEARCH_CACHE_TTL_SECS: u64 = 600;

pub const DEFAULT_MAX_SOURCES: usize = 5;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 100_000;
pub const DEFAULT_FETCH_RETRIES: u32 = 1;

pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Sites whose pages are video/social feeds with no extractable article text.
pub fn default_excluded_sites() -> Vec<String> {
    ["youtube.com", "tiktok.com", "instagram.com"]
        .into_iter()
        .map(String::from)
        .collect()
}
