// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Phase 0 - pre-installation dependency detection
//!
//! Runs every detector against a manifest and aggregates the findings.
//! Nothing is cached here: each call is a fresh probe, so an environment
//! variable exported mid-session shows up on the next call. The npm
//! detector's package listing is the only cached state.

use crate::config::Config;
use crate::detectors::{CredentialDetector, EnvDetector, EnvSource, NpmDetector, ProcessEnv, SystemDetector};
use crate::error::Result;
use crate::process::{CommandRunner, SystemRunner};
use crate::resolver::Resolver;
use crate::types::{ComponentManifest, DetectionResult, ResolutionPlan};
use std::sync::Arc;

/// Detection facade
pub struct Phase0 {
    env: EnvDetector,
    npm: NpmDetector,
    system: SystemDetector,
    credentials: CredentialDetector,
    resolver: Resolver,
}

impl Phase0 {
    /// Probe the live machine
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_sources(config, Arc::new(SystemRunner), Arc::new(ProcessEnv))
    }

    /// Probe through the given process runner and environment
    #[must_use]
    pub fn with_sources(config: &Config, runner: Arc<dyn CommandRunner>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            env: EnvDetector::new(Arc::clone(&env)),
            npm: NpmDetector::new(
                Arc::clone(&runner),
                config.npm_list_command.clone(),
                Some(config.base_path.clone()),
                crate::detectors::npm::LIST_TIMEOUT,
            ),
            system: SystemDetector::new(runner, config.probe_timeout()),
            credentials: CredentialDetector::new(env),
            resolver: Resolver::new(),
        }
    }

    /// Run all detectors: env, npm, system, runtime, then credentials
    ///
    /// # Errors
    ///
    /// Fails only when the manifest carries a malformed env `pattern`.
    pub async fn detect(&self, manifest: &ComponentManifest) -> Result<DetectionResult> {
        let deps = &manifest.dependencies;
        let mut findings = self.env.detect(&deps.env)?;
        findings.extend(self.npm.detect(&deps.npm).await);
        findings.extend(self.system.detect(&deps.system).await);
        if let Some(node) = deps.runtime.as_ref().and_then(|r| r.node.as_deref()) {
            findings.push(self.system.check_node_version(node).await);
        }
        findings.extend(self.credentials.detect(&deps.credentials));

        let result = DetectionResult::from_dependencies(&manifest.name, findings);
        tracing::debug!(
            component = %manifest.name,
            checked = result.dependencies.len(),
            missing = result.missing_required.len(),
            "detection complete"
        );
        Ok(result)
    }

    /// True when every required dependency is present
    ///
    /// # Errors
    ///
    /// See [`Phase0::detect`].
    pub async fn check(&self, manifest: &ComponentManifest) -> Result<bool> {
        Ok(self.detect(manifest).await?.all_satisfied)
    }

    /// Detect, then plan resolution of the missing required dependencies
    ///
    /// # Errors
    ///
    /// See [`Phase0::detect`].
    pub async fn get_resolution_plan(&self, manifest: &ComponentManifest) -> Result<ResolutionPlan> {
        let result = self.detect(manifest).await?;
        Ok(self.resolver.create_plan(&result.component, &result.missing_required))
    }

    /// Detect, plan and render the install script
    ///
    /// # Errors
    ///
    /// See [`Phase0::detect`].
    pub async fn generate_install_script(&self, manifest: &ComponentManifest) -> Result<String> {
        let plan = self.get_resolution_plan(manifest).await?;
        Ok(self.resolver.generate_install_script(&plan))
    }

    /// Forget the npm detector's package listing
    pub fn clear_cache(&self) {
        self.npm.clear_cache();
    }
}
