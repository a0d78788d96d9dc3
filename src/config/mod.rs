// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads tutorline.yaml, applies defaults, resolves ${VAR} references from
// the environment, validates values, and computes a deterministic hash of
// the raw file for startup logging.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::default_excluded_sites;
pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{
    ApiKey, Config, GenerationParams, ObservabilityConfig, SearchConfig, SearchEngine,
    SourcesConfig, StreamConfig, UpstreamConfig,
};
