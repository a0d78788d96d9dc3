// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::error::ConfigError;

static VARIABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static interpolation regex"));

/// Resolves `${VAR_NAME}` references from the process environment.
///
/// Unterminated or empty references (`${`, `${}`) are left as literal text.
/// A reference to an unset variable is an error rather than an empty string,
/// so a missing API key fails at startup instead of at the first request.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    resolve_with(input, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_with(
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;
    let resolved = VARIABLE_REF.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::UndefinedVariable { name }),
        None => Ok(resolved.into_owned()),
    }
}
