// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for detection, resolution and installation
//!
//! These tests verify critical invariants:
//! 1. Failed installs leave nothing behind and never touch existing installs
//! 2. Sensitive values are never echoed
//! 3. Resolution never scripts anything but package installs
//! 4. Settings merges are unions and idempotent
//! 5. A failed dependency check short-circuits installation

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use stack_builder::config::Config;
use stack_builder::config_merger::{deep_merge, ConfigMerger};
use stack_builder::detectors::{EnvDetector, SENSITIVE_MASK};
use stack_builder::installer::Installer;
use stack_builder::process::{CommandOutput, CommandRunner, ProcessError, SystemRunner};
use stack_builder::resolver::Resolver;
use stack_builder::stack_builder::{InstallOptions, StackBuilder};
use stack_builder::types::{
    ActionKind, Component, ComponentType, Dependency, DependencyStatus, DependencyType,
    EnvRequirement, ManifestDependencies,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn make_component(id: &str, component_type: ComponentType, repository: &str) -> Component {
    Component {
        id: id.into(),
        name: id.into(),
        component_type,
        repository: repository.into(),
        version: "0.1.0".into(),
        description: None,
        dependencies: None,
    }
}

fn env_source(vars: &[(&str, &str)]) -> Arc<HashMap<String, String>> {
    Arc::new(
        vars.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    )
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Counts every subprocess it is asked to run and fails them all
#[derive(Default)]
struct Refuser {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for Refuser {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: Option<&Path>,
        _timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{program} {}", args.join(" ")));
        Ok(CommandOutput::failed("refused"))
    }
}

// =============================================================================
// Installer
// =============================================================================

#[tokio::test]
async fn test_failed_install_is_idempotent_and_non_destructive() {
    let dir = TempDir::new().unwrap();
    let installer = Installer::with_runner(&Config::for_project(dir.path()), Arc::new(Refuser::default()));
    let component = make_component("existing", ComponentType::Hook, "https://example.invalid/x.git");

    let target = installer.get_target_path(&component);
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("hook.sh"), "echo mine").unwrap();

    for _ in 0..2 {
        let result = installer.install(&component).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("already exists"));
    }

    let entries: Vec<_> = std::fs::read_dir(&target).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(std::fs::read_to_string(target.join("hook.sh")).unwrap(), "echo mine");
}

#[tokio::test]
async fn test_unreachable_repository_leaves_no_directory() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::for_project(dir.path());
    config.clone_timeout_secs = 20;
    let installer = Installer::with_runner(&config, Arc::new(SystemRunner));

    let missing_repo = dir.path().join("no-such-repo.git");
    let component = make_component(
        "ghost",
        ComponentType::Skill,
        &missing_repo.to_string_lossy(),
    );

    let result = installer.install(&component).await;
    assert!(!result.success);
    assert!(!installer.is_installed(&component).await);
    assert!(installer.list_installed(ComponentType::Skill).await.is_empty());
}

#[test]
fn test_type_to_path_mapping() {
    let dir = TempDir::new().unwrap();
    let installer = Installer::new(&Config::for_project(dir.path()));
    let claude = dir.path().join(".claude");

    let table = [
        (ComponentType::Skill, "skills"),
        (ComponentType::Agent, "agents"),
        (ComponentType::Subagent, "agents"),
        (ComponentType::Mcp, "mcps"),
        (ComponentType::Command, "commands"),
        (ComponentType::Hook, "hooks"),
        (ComponentType::Setting, "settings"),
    ];
    for (component_type, dir_name) in table {
        let component = make_component("c", component_type, "unused");
        assert_eq!(installer.get_target_path(&component), claude.join(dir_name).join("c"));
    }

    let agent = make_component("same", ComponentType::Agent, "unused");
    let subagent = make_component("same", ComponentType::Subagent, "unused");
    assert_eq!(installer.get_target_path(&agent), installer.get_target_path(&subagent));
}

// =============================================================================
// Env detection
// =============================================================================

#[test]
fn test_env_detector_round_trip() {
    let requirement = EnvRequirement {
        pattern: Some("^sk-ant-.+".into()),
        ..EnvRequirement::default()
    };

    let unset = EnvDetector::new(env_source(&[]));
    assert_eq!(
        unset.check("ANTHROPIC_API_KEY", &requirement).unwrap().status,
        DependencyStatus::Missing
    );

    let good = EnvDetector::new(env_source(&[("ANTHROPIC_API_KEY", "sk-ant-api03-xyz")]));
    let dep = good.check("ANTHROPIC_API_KEY", &requirement).unwrap();
    assert_eq!(dep.dep_type, DependencyType::Env);
    assert!(dep.required);
    assert_eq!(dep.status, DependencyStatus::Present);
    assert_eq!(dep.current_value.as_deref(), Some("sk-ant-api..."));

    let bad = EnvDetector::new(env_source(&[("ANTHROPIC_API_KEY", "nope")]));
    assert_eq!(
        bad.check("ANTHROPIC_API_KEY", &requirement).unwrap().status,
        DependencyStatus::Invalid
    );
}

#[test]
fn test_sensitive_values_always_masked() {
    let requirement = EnvRequirement {
        sensitive: true,
        ..EnvRequirement::default()
    };
    for value in ["x", "short", "a-very-long-secret-value-that-would-be-truncated"] {
        let detector = EnvDetector::new(env_source(&[("SECRET", value)]));
        let dep = detector.check("SECRET", &requirement).unwrap();
        assert_eq!(dep.current_value.as_deref(), Some(SENSITIVE_MASK));
    }
}

#[test]
fn test_malformed_pattern_is_an_error() {
    let requirement = EnvRequirement {
        pattern: Some("([unclosed".into()),
        ..EnvRequirement::default()
    };
    let detector = EnvDetector::new(env_source(&[("X", "anything")]));
    assert!(detector.check("X", &requirement).is_err());
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_env_plus_npm_is_never_auto_resolvable() {
    let missing = vec![
        Dependency::new(DependencyType::Npm, "typescript", true, DependencyStatus::Missing)
            .with_required_value(Some("^5.0.0".into())),
        Dependency::new(DependencyType::Env, "OPENAI_API_KEY", true, DependencyStatus::Missing),
    ];
    let plan = Resolver::new().create_plan("demo", &missing);

    assert!(!plan.manual_steps.is_empty());
    assert!(!plan.can_auto_resolve);
    assert_eq!(plan.auto_steps.len() + plan.manual_steps.len(), plan.actions.len());
    assert_eq!(plan.auto_steps[0].action, ActionKind::Install);
    assert_eq!(
        plan.auto_steps[0].command.as_deref(),
        Some("npm install typescript@^5.0.0")
    );
    assert!(plan
        .auto_steps
        .iter()
        .all(|s| s.dependency.dep_type == DependencyType::Npm));
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_merge_laws_on_disk() {
    let dir = TempDir::new().unwrap();
    let merger = ConfigMerger::new(dir.path().join(".claude/settings.json"));

    let merged = merger.merge_settings(&object(json!({"a": 1}))).await.unwrap();
    assert_eq!(Value::Object(merged), json!({"a": 1}));

    assert_eq!(
        deep_merge(json!({"arr": [1, 2]}), json!({"arr": [2, 3]})),
        json!({"arr": [1, 2, 3]})
    );

    let patch = object(json!({"arr": [2, 3], "nested": {"k": ["x"]}}));
    let first = merger.merge_settings(&patch).await.unwrap();
    let second = merger.merge_settings(&patch).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(merger.get_settings().await, second);
}

// =============================================================================
// Stack installation
// =============================================================================

#[tokio::test]
async fn test_unmet_dependency_short_circuits_clone() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(Refuser::default());
    let builder = StackBuilder::with_sources(
        &Config::for_project(dir.path()),
        runner.clone(),
        env_source(&[]),
    );

    let mut env = BTreeMap::new();
    env.insert("STACKS_REQUIRED_TOKEN".to_string(), EnvRequirement::default());
    let mut component = make_component("gated", ComponentType::Mcp, "https://example.invalid/g.git");
    component.dependencies = Some(ManifestDependencies {
        env,
        ..ManifestDependencies::default()
    });

    let results = builder.install(&[component.clone()], &InstallOptions::default()).await;
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("env:STACKS_REQUIRED_TOKEN"));
    assert!(runner.calls.lock().unwrap().iter().all(|c| !c.starts_with("git")));
    assert!(!builder.installer().is_installed(&component).await);
}
