// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Stack builder library - dependency detection and component installation
//!
//! This crate checks whether a component's prerequisites (environment
//! variables, npm packages, system tools, runtime version, credentials) are
//! satisfied, explains how to resolve what is missing, and installs
//! components (agents, MCP servers, hooks, commands, skills, settings) into
//! a project's `.claude/` tree with shared settings merged into
//! `.claude/settings.json`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod config_merger;
pub mod detectors;
pub mod error;
pub mod installer;
pub mod manifest;
pub mod phase0;
pub mod process;
pub mod resolver;
pub mod stack_builder;

pub use error::{Error, Result};

/// Core data types shared by detection, resolution and installation
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};
    use std::collections::BTreeMap;
    use std::fmt;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn default_true() -> bool {
        true
    }

    // =========================================================================
    // Dependency findings
    // =========================================================================

    /// Which detector produced a finding, and which resolution strategy applies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DependencyType {
        /// Environment variable
        Env,
        /// npm package
        Npm,
        /// System binary on PATH
        System,
        /// Runtime version floor
        Runtime,
        /// Provider credential
        Credential,
        /// Authored by a newer manifest format; resolved generically
        #[serde(other)]
        Unknown,
    }

    impl DependencyType {
        /// Wire name of this type
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Env => "env",
                Self::Npm => "npm",
                Self::System => "system",
                Self::Runtime => "runtime",
                Self::Credential => "credential",
                Self::Unknown => "unknown",
            }
        }
    }

    impl fmt::Display for DependencyType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Outcome of a live check
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DependencyStatus {
        /// The live check succeeded
        Present,
        /// Not found at all
        Missing,
        /// Found but malformed
        Invalid,
        /// Found but older than required
        Outdated,
    }

    impl fmt::Display for DependencyStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Present => "present",
                Self::Missing => "missing",
                Self::Invalid => "invalid",
                Self::Outdated => "outdated",
            })
        }
    }

    /// A single checked requirement
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Dependency {
        /// Detector that produced this finding
        #[serde(rename = "type")]
        pub dep_type: DependencyType,
        /// Variable, package or binary name
        pub name: String,
        /// Non-required findings never block installation
        pub required: bool,
        /// Result of the live check
        pub status: DependencyStatus,
        /// Observed value, always masked or truncated
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub current_value: Option<String>,
        /// Requested version or constraint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub required_value: Option<String>,
        /// Human-actionable remediation hint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub suggestion: Option<String>,
    }

    impl Dependency {
        /// Create a finding with no values or suggestion attached
        #[must_use]
        pub fn new(
            dep_type: DependencyType,
            name: impl Into<String>,
            required: bool,
            status: DependencyStatus,
        ) -> Self {
            Self {
                dep_type,
                name: name.into(),
                required,
                status,
                current_value: None,
                required_value: None,
                suggestion: None,
            }
        }

        /// Attach the observed value
        #[must_use]
        pub fn with_current(mut self, value: impl Into<String>) -> Self {
            self.current_value = Some(value.into());
            self
        }

        /// Attach the requested value, if any
        #[must_use]
        pub fn with_required_value(mut self, value: Option<String>) -> Self {
            self.required_value = value;
            self
        }

        /// Attach a remediation hint
        #[must_use]
        pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
            self.suggestion = Some(suggestion.into());
            self
        }

        /// True when this finding prevents installation
        #[must_use]
        pub fn is_blocking(&self) -> bool {
            self.required && self.status != DependencyStatus::Present
        }

        /// `type:name` identifier used in failure messages
        #[must_use]
        pub fn key(&self) -> String {
            format!("{}:{}", self.dep_type, self.name)
        }
    }

    /// Aggregate detection over one manifest (a point-in-time snapshot)
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DetectionResult {
        /// Manifest name
        pub component: String,
        /// Findings in detector order: env, npm, system, runtime, credential
        pub dependencies: Vec<Dependency>,
        /// No required finding is unsatisfied
        pub all_satisfied: bool,
        /// The blocking subset of `dependencies`
        pub missing_required: Vec<Dependency>,
        /// Capture time
        pub timestamp: DateTime<Utc>,
    }

    impl DetectionResult {
        /// Aggregate findings and stamp the capture time
        #[must_use]
        pub fn from_dependencies(component: impl Into<String>, dependencies: Vec<Dependency>) -> Self {
            let missing_required: Vec<Dependency> = dependencies
                .iter()
                .filter(|d| d.is_blocking())
                .cloned()
                .collect();
            Self {
                component: component.into(),
                all_satisfied: missing_required.is_empty(),
                dependencies,
                missing_required,
                timestamp: Utc::now(),
            }
        }
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    /// Declared environment variable requirement
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EnvRequirement {
        /// Defaults to true
        #[serde(default = "default_true")]
        pub required: bool,
        /// Regex the value must match
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub pattern: Option<String>,
        /// Never echo the value, not even truncated
        #[serde(default)]
        pub sensitive: bool,
        /// Where to obtain the value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub setup_url: Option<String>,
        /// Free-form description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
    }

    impl Default for EnvRequirement {
        fn default() -> Self {
            Self {
                required: true,
                pattern: None,
                sensitive: false,
                setup_url: None,
                description: None,
            }
        }
    }

    /// Detailed system tool declaration
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SystemTool {
        /// Binary name
        pub name: String,
        /// Flag used instead of `--version`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub version_flag: Option<String>,
        /// Defaults to true
        #[serde(default = "default_true")]
        pub required: bool,
    }

    /// A system tool, either by bare name or with options
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum SystemRequirement {
        /// `"git"`
        Name(String),
        /// `{"name": "docker", "versionFlag": "version"}`
        Tool(SystemTool),
    }

    impl SystemRequirement {
        /// Binary name
        #[must_use]
        pub fn name(&self) -> &str {
            match self {
                Self::Name(name) => name,
                Self::Tool(tool) => &tool.name,
            }
        }

        /// Flag passed to probe the version
        #[must_use]
        pub fn version_flag(&self) -> &str {
            match self {
                Self::Tool(SystemTool { version_flag: Some(flag), .. }) => flag,
                _ => "--version",
            }
        }

        /// Whether a missing tool blocks installation
        #[must_use]
        pub fn required(&self) -> bool {
            match self {
                Self::Name(_) => true,
                Self::Tool(tool) => tool.required,
            }
        }
    }

    /// Runtime version floors
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RuntimeRequirement {
        /// Minimum node version, e.g. `">=18.0.0"`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub node: Option<String>,
    }

    /// Everything a component needs before it can be installed
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ManifestDependencies {
        /// Environment variables by name
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        pub env: BTreeMap<String, EnvRequirement>,
        /// npm packages by name, mapped to a version range
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        pub npm: BTreeMap<String, String>,
        /// System binaries
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub system: Vec<SystemRequirement>,
        /// Runtime floors
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub runtime: Option<RuntimeRequirement>,
        /// Credential service ids (see the credential table)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub credentials: Vec<String>,
    }

    impl ManifestDependencies {
        /// True when nothing is declared
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.env.is_empty()
                && self.npm.is_empty()
                && self.system.is_empty()
                && self.runtime.as_ref().map_or(true, |r| r.node.is_none())
                && self.credentials.is_empty()
        }
    }

    /// Declarative description of a component's dependencies
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ComponentManifest {
        /// Component name
        pub name: String,
        /// Component version
        #[serde(default)]
        pub version: String,
        /// Free-form description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        /// Declared requirements
        #[serde(default)]
        pub dependencies: ManifestDependencies,
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// What a resolution step asks for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ActionKind {
        /// Scriptable package install
        Install,
        /// Set a variable or credential
        Configure,
        /// Needs a human
        Manual,
    }

    /// One step of a resolution plan
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResolutionAction {
        /// Finding this step resolves
        pub dependency: Dependency,
        /// Kind of step
        pub action: ActionKind,
        /// Ready-to-run shell command
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub command: Option<String>,
        /// Human-readable instructions
        pub instructions: String,
        /// Documentation or download page
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub url: Option<String>,
    }

    impl ResolutionAction {
        /// Only package installs with a command may run unattended
        #[must_use]
        pub fn is_automatic(&self) -> bool {
            self.action == ActionKind::Install && self.command.is_some()
        }
    }

    /// Actionable projection of a detection's missing requirements
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResolutionPlan {
        /// Manifest name
        pub component: String,
        /// Every step, in finding order
        pub actions: Vec<ResolutionAction>,
        /// Steps safe to script
        pub auto_steps: Vec<ResolutionAction>,
        /// Steps needing a human
        pub manual_steps: Vec<ResolutionAction>,
        /// No manual step remains
        pub can_auto_resolve: bool,
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Installable component kinds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ComponentType {
        /// Skill bundle
        Skill,
        /// Agent definition
        Agent,
        /// Subagent definition, stored alongside agents
        Subagent,
        /// MCP server
        Mcp,
        /// Slash command
        Command,
        /// Hook
        Hook,
        /// Settings bundle
        Setting,
        /// A kind this build does not know; never installed
        #[serde(other)]
        Unknown,
    }

    impl ComponentType {
        /// All installable kinds, in display order
        pub const ALL: [Self; 7] = [
            Self::Skill,
            Self::Agent,
            Self::Subagent,
            Self::Mcp,
            Self::Command,
            Self::Hook,
            Self::Setting,
        ];

        /// Directory under `.claude/` holding this kind
        #[must_use]
        pub fn dir_name(&self) -> &'static str {
            match self {
                Self::Skill => "skills",
                Self::Agent | Self::Subagent => "agents",
                Self::Mcp => "mcps",
                Self::Command => "commands",
                Self::Hook => "hooks",
                Self::Setting => "settings",
                Self::Unknown => "components",
            }
        }

        /// Wire name
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Skill => "skill",
                Self::Agent => "agent",
                Self::Subagent => "subagent",
                Self::Mcp => "mcp",
                Self::Command => "command",
                Self::Hook => "hook",
                Self::Setting => "setting",
                Self::Unknown => "unknown",
            }
        }
    }

    impl fmt::Display for ComponentType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for ComponentType {
        type Err = String;

        /// Accepts the wire name or the directory name (`agent` or `agents`)
        fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
            let lower = s.trim().to_ascii_lowercase();
            Self::ALL
                .into_iter()
                .find(|t| t.as_str() == lower || (t.dir_name() == lower && *t != Self::Subagent))
                .ok_or_else(|| {
                    format!(
                        "Unknown component type: {s}. Valid: skill, agent, subagent, mcp, command, hook, setting"
                    )
                })
        }
    }

    /// An installable unit distributed as a git repository
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Component {
        /// Directory name under the type directory
        pub id: String,
        /// Display name
        pub name: String,
        /// Component kind
        #[serde(rename = "type")]
        pub component_type: ComponentType,
        /// Git URL
        pub repository: String,
        /// Version
        #[serde(default)]
        pub version: String,
        /// Free-form description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        /// Prerequisites checked before install
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub dependencies: Option<ManifestDependencies>,
    }

    impl Component {
        /// Manifest view used for pre-install detection
        #[must_use]
        pub fn manifest(&self) -> ComponentManifest {
            ComponentManifest {
                name: self.name.clone(),
                version: self.version.clone(),
                description: self.description.clone(),
                dependencies: self.dependencies.clone().unwrap_or_default(),
            }
        }
    }

    /// Outcome of an install, uninstall or reinstall
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InstallResult {
        /// Whether the operation completed
        pub success: bool,
        /// Component id
        pub component: String,
        /// Elapsed milliseconds, measured on every path
        pub duration: u64,
        /// Failure reason
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
        /// Target path
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub path: Option<PathBuf>,
    }

    impl InstallResult {
        /// Successful outcome
        #[must_use]
        pub fn ok(component: impl Into<String>, duration: u64, path: PathBuf) -> Self {
            Self {
                success: true,
                component: component.into(),
                duration,
                error: None,
                path: Some(path),
            }
        }

        /// Failed outcome
        #[must_use]
        pub fn failed(
            component: impl Into<String>,
            duration: u64,
            error: impl Into<String>,
            path: Option<PathBuf>,
        ) -> Self {
            Self {
                success: false,
                component: component.into(),
                duration,
                error: Some(error.into()),
                path,
            }
        }
    }

    /// Ordered components plus shared settings, installed as a unit
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Stack {
        /// Stack name
        pub name: String,
        /// Free-form description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        /// Components in install order
        #[serde(default)]
        pub components: Vec<Component>,
        /// Merged into the settings file after all components
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        pub settings: Map<String, Value>,
    }

    /// Entry under the `mcps` settings key
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct McpServerConfig {
        /// Executable
        pub command: String,
        /// Arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub args: Vec<String>,
        /// Extra environment
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        pub env: BTreeMap<String, String>,
    }

    /// Caller-friendly view of a pre-install detection
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PreInstallCheck {
        /// Nothing required is missing
        pub can_install: bool,
        /// `type:name` of each blocking finding
        pub missing_dependencies: Vec<String>,
        /// Suggestions of the blocking findings
        pub suggestions: Vec<String>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::config_merger::ConfigMerger;
    pub use crate::installer::Installer;
    pub use crate::phase0::Phase0;
    pub use crate::resolver::Resolver;
    pub use crate::stack_builder::{InstallOptions, InstallProgress, StackBuilder};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
