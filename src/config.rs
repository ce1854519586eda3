// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides (`STACK_BUILDER_BASE_PATH`, ...)
pub const ENV_PREFIX: &str = "STACK_BUILDER";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root holding the `.claude/` directory
    pub base_path: PathBuf,
    /// Deadline for `git clone`
    pub clone_timeout_secs: u64,
    /// Deadline for `<tool> --version` probes
    pub probe_timeout_secs: u64,
    /// Deadline for a component's `post-install.sh`
    pub post_install_timeout_secs: u64,
    /// Command listing top-level npm packages as JSON
    pub npm_list_command: Vec<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            clone_timeout_secs: 60,
            probe_timeout_secs: 5,
            post_install_timeout_secs: 30,
            npm_list_command: vec![
                "npm".into(),
                "ls".into(),
                "--json".into(),
                "--depth=0".into(),
            ],
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Config rooted at `base_path` with default timeouts
    #[must_use]
    pub fn for_project(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// `<base_path>/.claude`
    #[must_use]
    pub fn claude_dir(&self) -> PathBuf {
        self.base_path.join(".claude")
    }

    /// `<base_path>/.claude/settings.json`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.claude_dir().join("settings.json")
    }

    /// Clone deadline
    #[must_use]
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    /// Probe deadline
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Post-install deadline
    #[must_use]
    pub fn post_install_timeout(&self) -> Duration {
        Duration::from_secs(self.post_install_timeout_secs)
    }
}

/// Default config file location, if the platform has one
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "stack-builder")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration: defaults, then the TOML file, then `STACK_BUILDER_*`
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();

    match path {
        Some(explicit) => {
            builder = builder.add_source(config::File::from(explicit.to_path_buf()).required(true));
        }
        None => {
            if let Some(default) = default_config_path() {
                builder = builder.add_source(config::File::from(default).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(" ")
            .with_list_parse_key("npm_list_command"),
    );

    let loaded: Config = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    tracing::debug!(base_path = %loaded.base_path.display(), "configuration loaded");
    Ok(loaded)
}
