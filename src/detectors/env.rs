// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Environment variable detector

use super::{EnvSource, ProcessEnv};
use crate::error::{Error, Result};
use crate::types::{Dependency, DependencyStatus, DependencyType, EnvRequirement};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shown instead of a sensitive value
pub const SENSITIVE_MASK: &str = "[SET]";

/// Characters of a non-sensitive value echoed back
const PREVIEW_CHARS: usize = 10;

/// Checks declared environment variables against an [`EnvSource`]
#[derive(Clone)]
pub struct EnvDetector {
    source: Arc<dyn EnvSource>,
}

impl Default for EnvDetector {
    fn default() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }
}

impl EnvDetector {
    /// Detector reading from `source`
    #[must_use]
    pub fn new(source: Arc<dyn EnvSource>) -> Self {
        Self { source }
    }

    /// One finding per declared variable, in key order
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when a declared `pattern` is not a
    /// valid regex. Missing or malformed values are findings, not errors.
    pub fn detect(&self, requirements: &BTreeMap<String, EnvRequirement>) -> Result<Vec<Dependency>> {
        requirements
            .iter()
            .map(|(name, requirement)| self.check(name, requirement))
            .collect()
    }

    /// Check a single variable
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a malformed `pattern`.
    pub fn check(&self, name: &str, requirement: &EnvRequirement) -> Result<Dependency> {
        let pattern = requirement
            .pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|source| Error::InvalidPattern {
                    name: name.to_string(),
                    source,
                })
            })
            .transpose()?;

        let finding = |status| {
            Dependency::new(DependencyType::Env, name, requirement.required, status)
                .with_required_value(requirement.pattern.clone())
        };

        let Some(value) = self.source.var(name).filter(|v| !v.is_empty()) else {
            tracing::debug!(name, "environment variable not set");
            return Ok(finding(DependencyStatus::Missing).with_suggestion(missing_suggestion(name, requirement)));
        };

        if let Some(re) = &pattern {
            if !re.is_match(&value) {
                tracing::debug!(name, "environment variable does not match pattern");
                return Ok(finding(DependencyStatus::Invalid)
                    .with_current(redact(&value, requirement.sensitive))
                    .with_suggestion(format!(
                        "{name} is set but does not match the expected format ({})",
                        re.as_str()
                    )));
            }
        }

        Ok(finding(DependencyStatus::Present).with_current(redact(&value, requirement.sensitive)))
    }
}

/// Mask sensitive values; truncate everything else
#[must_use]
pub fn redact(value: &str, sensitive: bool) -> String {
    if sensitive {
        SENSITIVE_MASK.to_string()
    } else {
        let preview: String = value.chars().take(PREVIEW_CHARS).collect();
        format!("{preview}...")
    }
}

fn missing_suggestion(name: &str, requirement: &EnvRequirement) -> String {
    match (&requirement.setup_url, &requirement.description) {
        (Some(url), _) => format!("Set {name} in your environment. Get it from: {url}"),
        (None, Some(desc)) => format!("Set {name} in your environment ({desc})"),
        (None, None) => format!("Set {name} in your environment: export {name}=<value>"),
    }
}
