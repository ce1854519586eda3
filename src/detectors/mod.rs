// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Dependency detectors
//!
//! Each detector turns declared requirements plus live system state into
//! [`Dependency`](crate::types::Dependency) findings. An unmet requirement
//! is a normal finding, never an error; subprocess failures are downgraded
//! to `missing`.

pub mod credential;
pub mod env;
pub mod npm;
pub mod system;

pub use credential::CredentialDetector;
pub use env::{EnvDetector, SENSITIVE_MASK};
pub use npm::NpmDetector;
pub use system::SystemDetector;

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Read access to environment variables
pub trait EnvSource: Send + Sync {
    /// Value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// The live process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

fn semver_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").ok()).as_ref()
}

fn major_minor_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?").ok()).as_ref()
}

/// First `x.y.z` in `output`, else the first 50 characters of it
#[must_use]
pub fn extract_version(output: &str) -> String {
    match semver_regex().and_then(|re| re.find(output)) {
        Some(m) => m.as_str().to_string(),
        None => output.trim().chars().take(50).collect(),
    }
}

/// Leading `(major, minor)` of a version or range such as `^5.2.0` or `>=18`
#[must_use]
pub fn parse_major_minor(version: &str) -> Option<(u64, u64)> {
    let caps = major_minor_regex()?.captures(version)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some((major, minor))
}
