// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Stack installation facade
//!
//! Components install one at a time, in order. Each is gated by a
//! dependency check unless the caller opts out. Stack-level settings are
//! merged once, after every component has been attempted.

use crate::config::Config;
use crate::config_merger::ConfigMerger;
use crate::detectors::{EnvSource, ProcessEnv};
use crate::installer::Installer;
use crate::phase0::Phase0;
use crate::process::{CommandRunner, SystemRunner};
use crate::types::{Component, InstallResult, PreInstallCheck, Stack};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Cumulative progress after each component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProgress {
    /// Components in this call
    pub total: usize,
    /// Components attempted so far
    pub completed: usize,
    /// Successes so far
    pub succeeded: usize,
    /// Failures so far
    pub failed: usize,
    /// Id of the component just attempted
    pub current: String,
}

/// Progress callback
pub type ProgressFn = Box<dyn Fn(&InstallProgress) + Send + Sync>;

/// Options for [`StackBuilder::install`]
#[derive(Default)]
pub struct InstallOptions {
    /// Reinstall components that already exist
    pub force: bool,
    /// Skip the pre-install dependency check
    pub skip_dependency_check: bool,
    /// Called after every component, success or failure
    pub on_progress: Option<ProgressFn>,
}

/// Outcome of [`StackBuilder::install_stack`]
#[derive(Debug, Clone)]
pub struct StackReport {
    /// Per-component results, in stack order
    pub results: Vec<InstallResult>,
    /// Stack settings were written
    pub settings_merged: bool,
    /// Why the settings merge failed, if it did
    pub settings_error: Option<String>,
}

impl StackReport {
    /// Every component installed and settings (if any) merged
    #[must_use]
    pub fn success(&self) -> bool {
        self.settings_error.is_none() && self.results.iter().all(|r| r.success)
    }
}

/// Composes detection, installation and settings merging
pub struct StackBuilder {
    phase0: Phase0,
    installer: Installer,
    merger: ConfigMerger,
}

impl StackBuilder {
    /// Builder operating on `config.base_path` against the live machine
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_sources(config, Arc::new(SystemRunner), Arc::new(ProcessEnv))
    }

    /// Builder using the given process runner and environment
    #[must_use]
    pub fn with_sources(config: &Config, runner: Arc<dyn CommandRunner>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            phase0: Phase0::with_sources(config, Arc::clone(&runner), env),
            installer: Installer::with_runner(config, runner),
            merger: ConfigMerger::new(config.settings_path()),
        }
    }

    /// Detection facade
    #[must_use]
    pub fn phase0(&self) -> &Phase0 {
        &self.phase0
    }

    /// Installer
    #[must_use]
    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    /// Settings merger
    #[must_use]
    pub fn merger(&self) -> &ConfigMerger {
        &self.merger
    }

    /// Install `components` sequentially
    ///
    /// A component with unsatisfied required dependencies gets a failed
    /// result and is never handed to the installer.
    pub async fn install(&self, components: &[Component], options: &InstallOptions) -> Vec<InstallResult> {
        let mut results = Vec::with_capacity(components.len());
        let mut progress = InstallProgress {
            total: components.len(),
            completed: 0,
            succeeded: 0,
            failed: 0,
            current: String::new(),
        };

        for component in components {
            let result = self.install_one(component, options).await;

            progress.completed += 1;
            if result.success {
                progress.succeeded += 1;
            } else {
                progress.failed += 1;
            }
            progress.current.clone_from(&component.id);
            if let Some(callback) = &options.on_progress {
                callback(&progress);
            }
            results.push(result);
        }

        tracing::info!(
            total = progress.total,
            succeeded = progress.succeeded,
            failed = progress.failed,
            "install finished"
        );
        results
    }

    /// Install a stack's components, then merge its settings once
    pub async fn install_stack(&self, stack: &Stack, options: &InstallOptions) -> StackReport {
        tracing::info!(stack = %stack.name, components = stack.components.len(), "installing stack");
        let results = self.install(&stack.components, options).await;

        if stack.settings.is_empty() {
            return StackReport {
                results,
                settings_merged: false,
                settings_error: None,
            };
        }

        match self.merger.merge_settings(&stack.settings).await {
            Ok(_) => StackReport {
                results,
                settings_merged: true,
                settings_error: None,
            },
            Err(e) => {
                tracing::warn!(stack = %stack.name, error = %e, "failed to merge stack settings");
                StackReport {
                    results,
                    settings_merged: false,
                    settings_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Dependency check for a single component
    ///
    /// A component whose manifest cannot be evaluated (malformed env
    /// pattern) cannot be installed.
    pub async fn pre_install_check(&self, component: &Component) -> PreInstallCheck {
        match self.phase0.detect(&component.manifest()).await {
            Ok(result) => PreInstallCheck {
                can_install: result.all_satisfied,
                missing_dependencies: result.missing_required.iter().map(|d| d.key()).collect(),
                suggestions: result
                    .missing_required
                    .iter()
                    .filter_map(|d| d.suggestion.clone())
                    .collect(),
            },
            Err(e) => PreInstallCheck {
                can_install: false,
                missing_dependencies: Vec::new(),
                suggestions: vec![e.to_string()],
            },
        }
    }

    /// Installed state of each component, keyed by id
    pub async fn check_installed(&self, components: &[Component]) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for component in components {
            status.insert(component.id.clone(), self.installer.is_installed(component).await);
        }
        status
    }

    async fn install_one(&self, component: &Component, options: &InstallOptions) -> InstallResult {
        if !options.skip_dependency_check {
            let started = Instant::now();
            let check = self.pre_install_check(component).await;
            if !check.can_install {
                let error = if check.missing_dependencies.is_empty() {
                    format!("Dependency check failed: {}", check.suggestions.join("; "))
                } else {
                    format!("Missing dependencies: {}", check.missing_dependencies.join(", "))
                };
                tracing::warn!(component = %component.id, %error, "dependency check failed");
                return InstallResult::failed(
                    &component.id,
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    error,
                    None,
                );
            }
        }

        if options.force {
            self.installer.reinstall(component).await
        } else {
            self.installer.install(component).await
        }
    }
}
