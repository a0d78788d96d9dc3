// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::stream::ReasoningTags;

use super::defaults::*;
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a tutorline config from the given source.
///
/// Steps:
/// 1. Read raw YAML from the source
/// 2. Hash it (before interpolation, so secrets never feed the hash)
/// 3. Parse into the raw deserialization types
/// 4. Check the version tag
/// 5. Resolve `${VAR}` references in URLs and keys
/// 6. Apply defaults and validate ranges
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.tutorline != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.tutorline
        )));
    }

    let upstream = build_upstream_config(raw.upstream)?;
    let stream = build_stream_config(raw.stream)?;
    let search = raw.search.map(build_search_config).transpose()?;
    let sources = build_sources_config(raw.sources)?;

    Ok(Config {
        upstream,
        stream,
        search,
        sources,
        environment: raw
            .environment
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

fn build_upstream_config(raw: raw::RawUpstream) -> Result<UpstreamConfig, ConfigError> {
    let base_url = match raw.base_url {
        Some(url) => resolve_variables(&url)?,
        None => DEFAULT_UPSTREAM_BASE_URL.to_string(),
    };
    validate_url("upstream.base_url", &base_url)?;

    let api_key = resolve_variables(&raw.api_key)?;
    if api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "upstream.api_key must not be empty".to_string(),
        ));
    }

    let observability = match raw.observability {
        Some(obs) => {
            let base_url = resolve_variables(&obs.base_url)?;
            validate_url("upstream.observability.base_url", &base_url)?;
            Some(ObservabilityConfig {
                base_url,
                api_key: ApiKey::new(resolve_variables(&obs.api_key)?),
            })
        }
        None => None,
    };

    let model = raw.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
    if model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "upstream.model must not be empty".to_string(),
        ));
    }

    Ok(UpstreamConfig {
        base_url,
        api_key: ApiKey::new(api_key),
        model,
        observability,
        generation: build_generation(raw.generation)?,
    })
}

fn build_generation(raw: Option<raw::RawGeneration>) -> Result<GenerationParams, ConfigError> {
    let params = match raw {
        Some(g) => GenerationParams {
            temperature: g.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: g.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: g.top_p.unwrap_or(DEFAULT_TOP_P),
            repetition_penalty: g.repetition_penalty.unwrap_or(DEFAULT_REPETITION_PENALTY),
        },
        None => GenerationParams {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
        },
    };

    for (name, value) in [
        ("temperature", params.temperature),
        ("top_p", params.top_p),
        ("repetition_penalty", params.repetition_penalty),
    ] {
        if !(value > 0.0) {
            return Err(ConfigError::Validation(format!(
                "upstream.generation.{name} must be greater than 0, got {value}"
            )));
        }
    }
    if params.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "upstream.generation.max_tokens must be greater than 0".to_string(),
        ));
    }

    Ok(params)
}

fn build_stream_config(raw: Option<raw::RawStream>) -> Result<StreamConfig, ConfigError> {
    let (reasoning, window, max_secs) = match raw {
        Some(s) => (s.reasoning, s.leading_newline_window, s.max_duration_secs),
        None => (None, None, None),
    };

    let (start, end) = match reasoning {
        Some(r) => (
            r.start.unwrap_or_else(|| DEFAULT_REASONING_START.to_string()),
            r.end.unwrap_or_else(|| DEFAULT_REASONING_END.to_string()),
        ),
        None => (
            DEFAULT_REASONING_START.to_string(),
            DEFAULT_REASONING_END.to_string(),
        ),
    };
    let reasoning = ReasoningTags::new(start, end).map_err(ConfigError::Validation)?;

    let max_secs = max_secs.unwrap_or(DEFAULT_MAX_STREAM_SECS);
    if max_secs == 0 {
        return Err(ConfigError::Validation(
            "stream.max_duration_secs must be greater than 0".to_string(),
        ));
    }

    Ok(StreamConfig {
        reasoning,
        leading_newline_window: window.unwrap_or(DEFAULT_LEADING_NEWLINE_WINDOW),
        max_duration: Duration::from_secs(max_secs),
    })
}

fn build_search_config(raw: raw::RawSearch) -> Result<SearchConfig, ConfigError> {
    let engine = match raw.engine.as_deref() {
        Some("serper") | None => SearchEngine::Serper,
        Some("bing") => SearchEngine::Bing,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "unknown search engine \"{other}\", expected \"serper\" or \"bing\""
            )));
        }
    };

    let base_url = match raw.base_url {
        Some(url) => resolve_variables(&url)?,
        None => match engine {
            SearchEngine::Serper => DEFAULT_SERPER_URL.to_string(),
            SearchEngine::Bing => DEFAULT_BING_URL.to_string(),
        },
    };
    validate_url("search.base_url", &base_url)?;

    let result_count = raw.result_count.unwrap_or(DEFAULT_SEARCH_RESULT_COUNT);
    if result_count == 0 {
        return Err(ConfigError::Validation(
            "search.result_count must be greater than 0".to_string(),
        ));
    }

    Ok(SearchConfig {
        engine,
        api_key: ApiKey::new(resolve_variables(&raw.api_key)?),
        base_url,
        excluded_sites: raw.excluded_sites.unwrap_or_else(default_excluded_sites),
        result_count,
        max_retries: raw.max_retries.unwrap_or(DEFAULT_SEARCH_RETRIES),
        cache_ttl: Duration::from_secs(
            raw.cache_ttl_secs.unwrap_or(DEFAULT_SEARCH_CACHE_TTL_SECS),
        ),
    })
}

fn build_sources_config(raw: Option<raw::RawSources>) -> Result<SourcesConfig, ConfigError> {
    let config = match raw {
        Some(s) => SourcesConfig {
            max_sources: s.max_sources.unwrap_or(DEFAULT_MAX_SOURCES),
            fetch_timeout: Duration::from_millis(
                s.fetch_timeout_ms.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
            ),
            max_content_chars: s.max_content_chars.unwrap_or(DEFAULT_MAX_CONTENT_CHARS),
            max_retries: s.max_retries.unwrap_or(DEFAULT_FETCH_RETRIES),
        },
        None => SourcesConfig {
            max_sources: DEFAULT_MAX_SOURCES,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            max_retries: DEFAULT_FETCH_RETRIES,
        },
    };

    if config.max_sources == 0 {
        return Err(ConfigError::Validation(
            "sources.max_sources must be greater than 0".to_string(),
        ));
    }
    if config.fetch_timeout.is_zero() {
        return Err(ConfigError::Validation(
            "sources.fetch_timeout_ms must be greater than 0".to_string(),
        ));
    }

    Ok(config)
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{field} must be an http(s) URL, got \"{value}\""
        )))
    }
}
