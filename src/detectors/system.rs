// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! System tool and runtime detector

use super::{extract_version, parse_major_minor};
use crate::process::{CommandRunner, SystemRunner};
use crate::types::{Dependency, DependencyStatus, DependencyType, SystemRequirement};
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for a version probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Official Node.js download page
pub const NODE_DOWNLOAD_URL: &str = "https://nodejs.org/";

/// Remediation hints for common tools
const INSTALL_HINTS: &[(&str, &str)] = &[
    ("git", "Install git from https://git-scm.com/downloads"),
    ("node", "Install Node.js from https://nodejs.org/"),
    ("npm", "npm ships with Node.js: https://nodejs.org/"),
    ("pnpm", "Install pnpm: npm install -g pnpm"),
    ("yarn", "Install yarn: npm install -g yarn"),
    ("docker", "Install Docker from https://docs.docker.com/get-docker/"),
    ("claude", "Install Claude Code: npm install -g @anthropic-ai/claude-code"),
    ("gh", "Install the GitHub CLI from https://cli.github.com/"),
];

/// Remediation hint for `tool`
#[must_use]
pub fn install_hint(tool: &str) -> String {
    INSTALL_HINTS
        .iter()
        .find(|(name, _)| *name == tool)
        .map_or_else(
            || format!("Install {tool} and ensure it's in your PATH"),
            |(_, hint)| (*hint).to_string(),
        )
}

/// Probes binaries with `<tool> --version`
pub struct SystemDetector {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl Default for SystemDetector {
    fn default() -> Self {
        Self::new(Arc::new(SystemRunner), DEFAULT_PROBE_TIMEOUT)
    }
}

impl SystemDetector {
    /// Detector probing through `runner` with `timeout` per probe
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// One finding per declared tool, in order
    pub async fn detect(&self, tools: &[SystemRequirement]) -> Vec<Dependency> {
        let mut findings = Vec::with_capacity(tools.len());
        for tool in tools {
            findings.push(self.check(tool).await);
        }
        findings
    }

    /// Probe a single tool
    pub async fn check(&self, tool: &SystemRequirement) -> Dependency {
        let name = tool.name();
        match self.probe(name, tool.version_flag()).await {
            Some(version) => {
                Dependency::new(DependencyType::System, name, tool.required(), DependencyStatus::Present)
                    .with_current(version)
            }
            None => {
                Dependency::new(DependencyType::System, name, tool.required(), DependencyStatus::Missing)
                    .with_suggestion(install_hint(name))
            }
        }
    }

    /// Version reported by `tool flag`, or `None` if the probe failed for any reason
    pub async fn probe(&self, tool: &str, flag: &str) -> Option<String> {
        match self
            .runner
            .run(tool, &[flag.to_string()], None, self.timeout)
            .await
        {
            Ok(output) if output.success => {
                let text = if output.stdout.is_empty() {
                    &output.stderr
                } else {
                    &output.stdout
                };
                let version = extract_version(text);
                tracing::debug!(tool, %version, "probe succeeded");
                Some(version)
            }
            Ok(output) => {
                tracing::debug!(tool, error = %output.failure_message(), "probe failed");
                None
            }
            Err(e) => {
                tracing::debug!(tool, error = %e, "probe failed");
                None
            }
        }
    }

    /// Compare the installed node major version against `required` (e.g. `">=18"`)
    pub async fn check_node_version(&self, required: &str) -> Dependency {
        let base = |status| {
            Dependency::new(DependencyType::Runtime, "node", true, status)
                .with_required_value(Some(required.to_string()))
        };

        let Some(current) = self.probe("node", "--version").await else {
            return base(DependencyStatus::Missing).with_suggestion(format!(
                "Node.js {required} is required. Download it from {NODE_DOWNLOAD_URL}"
            ));
        };

        let floor = parse_major_minor(required).map(|(major, _)| major);
        let actual = parse_major_minor(&current).map(|(major, _)| major);

        match (actual, floor) {
            (Some(actual), Some(floor)) if actual < floor => base(DependencyStatus::Outdated)
                .with_current(current.clone())
                .with_suggestion(format!(
                    "Node.js {current} is older than {required}. Upgrade from {NODE_DOWNLOAD_URL}"
                )),
            _ => base(DependencyStatus::Present).with_current(current),
        }
    }
}
