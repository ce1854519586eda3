// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the stack-builder CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const UNSET_VAR: &str = "STACK_BUILDER_IT_SURELY_UNSET_TOKEN";

/// stack-builder rooted at `project`, isolated from user config and colour
fn stack_builder(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stack-builder").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove(UNSET_VAR)
        .env("STACK_BUILDER_CONFIG", write_config(project))
        .arg("--no-color")
        .arg("--base-path")
        .arg(project.path());
    cmd
}

fn write_config(project: &TempDir) -> PathBuf {
    let path = project.path().join("stack-builder.toml");
    if !path.exists() {
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();
    }
    path
}

fn write(project: &TempDir, rel: &str, body: &str) -> PathBuf {
    let path = project.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}

fn manifest_requiring(project: &TempDir, var: &str) -> PathBuf {
    write(
        project,
        "organized.json",
        &format!(r#"{{"name": "demo", "version": "1.0.0", "dependencies": {{"env": {{"{var}": {{"required": true}}}}}}}}"#),
    )
}

fn component_file(project: &TempDir, needs: Option<&str>) -> PathBuf {
    let deps = needs
        .map(|var| format!(r#", "dependencies": {{"env": {{"{var}": {{}}}}}}"#))
        .unwrap_or_default();
    write(
        project,
        "component.json",
        &format!(
            r#"{{"id": "reviewer", "name": "Reviewer", "type": "agent", "repository": "{}"{deps}}}"#,
            project.path().join("missing-repo.git").display()
        ),
    )
}

fn settings(project: &TempDir) -> serde_json::Value {
    let text = std::fs::read_to_string(project.path().join(".claude/settings.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn agents_dir(project: &TempDir) -> PathBuf {
    project.path().join(".claude").join("agents")
}

fn exists(path: &Path) -> bool {
    path.exists()
}

#[test]
fn test_check_exit_status_follows_environment() {
    let project = TempDir::new().unwrap();
    manifest_requiring(&project, UNSET_VAR);

    stack_builder(&project)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!("missing env:{UNSET_VAR}")));

    stack_builder(&project)
        .env(UNSET_VAR, "value")
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo: ok"));
}

#[test]
fn test_detect_json_reports_detection_result() {
    let project = TempDir::new().unwrap();
    manifest_requiring(&project, UNSET_VAR);

    let output = stack_builder(&project)
        .args(["--json", "detect"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(result["component"], "demo");
    assert_eq!(result["allSatisfied"], false);
    assert_eq!(result["missingRequired"][0]["type"], "env");
    assert_eq!(result["missingRequired"][0]["status"], "missing");
    assert!(result["timestamp"].is_string());
}

#[test]
fn test_missing_manifest_is_reported() {
    let project = TempDir::new().unwrap();
    stack_builder(&project)
        .arg("detect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No manifest found"));
}

#[test]
fn test_script_lists_manual_steps() {
    let project = TempDir::new().unwrap();
    manifest_requiring(&project, UNSET_VAR);
    let out = project.path().join("install.sh");

    stack_builder(&project)
        .arg("script")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#!/usr/bin/env bash"))
        .stdout(predicate::str::contains("# Manual steps required:"))
        .stdout(predicate::str::contains(UNSET_VAR));

    stack_builder(&project)
        .args(["script", "-o"])
        .arg(&out)
        .assert()
        .success();
    assert!(std::fs::read_to_string(&out).unwrap().contains("set -euo pipefail"));
}

#[test]
fn test_install_blocked_by_dependency_touches_nothing() {
    let project = TempDir::new().unwrap();
    let file = component_file(&project, Some(UNSET_VAR));

    stack_builder(&project)
        .arg("install")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!("Missing dependencies: env:{UNSET_VAR}")));

    assert!(!exists(&agents_dir(&project).join("reviewer")));
}

#[test]
fn test_install_unreachable_repo_cleans_up() {
    let project = TempDir::new().unwrap();
    let file = component_file(&project, None);

    stack_builder(&project).arg("install").arg(&file).assert().failure();
    assert!(!exists(&agents_dir(&project).join("reviewer")));
}

#[test]
fn test_dry_run_has_no_side_effects() {
    let project = TempDir::new().unwrap();
    let file = component_file(&project, None);

    stack_builder(&project)
        .args(["install", "--dry-run"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("would install"));

    assert!(!exists(&project.path().join(".claude")));
}

#[test]
fn test_list_and_status() {
    let project = TempDir::new().unwrap();

    stack_builder(&project)
        .args(["list", "agent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No agents installed"));

    std::fs::create_dir_all(agents_dir(&project).join("reviewer")).unwrap();
    std::fs::create_dir_all(agents_dir(&project).join("planner")).unwrap();

    stack_builder(&project)
        .args(["list", "subagents"])
        .assert()
        .failure();
    stack_builder(&project)
        .args(["list", "subagent"])
        .assert()
        .success()
        .stdout("planner\nreviewer\n");

    let file = component_file(&project, None);
    stack_builder(&project)
        .arg("status")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("reviewer (agent): installed"));
}

#[test]
fn test_uninstall() {
    let project = TempDir::new().unwrap();
    let file = component_file(&project, None);

    stack_builder(&project)
        .arg("uninstall")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("not found"));

    std::fs::create_dir_all(agents_dir(&project).join("reviewer")).unwrap();
    stack_builder(&project).arg("uninstall").arg(&file).assert().success();
    assert!(!exists(&agents_dir(&project).join("reviewer")));
}

#[test]
fn test_settings_lifecycle() {
    let project = TempDir::new().unwrap();

    stack_builder(&project)
        .args(["settings", "backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to back up"));

    stack_builder(&project)
        .args(["settings", "add-mcp", "files", "npx", "--env", "ROOT=/srv", "--", "-y", "@acme/files"])
        .assert()
        .success();
    stack_builder(&project)
        .args(["settings", "allow", "reviewer", "Read", "Grep"])
        .assert()
        .success();
    stack_builder(&project)
        .args(["settings", "allow", "reviewer", "Grep", "Bash"])
        .assert()
        .success();

    let doc = settings(&project);
    assert_eq!(doc["mcps"]["files"]["command"], "npx");
    assert_eq!(doc["mcps"]["files"]["args"], serde_json::json!(["-y", "@acme/files"]));
    assert_eq!(doc["mcps"]["files"]["env"]["ROOT"], "/srv");
    assert_eq!(doc["permissions"]["reviewer"], serde_json::json!(["Read", "Grep", "Bash"]));

    stack_builder(&project)
        .args(["settings", "remove-mcp", "files"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed MCP server files"));
    assert!(settings(&project)["mcps"].get("files").is_none());

    stack_builder(&project)
        .args(["settings", "restore"])
        .arg(project.path().join("nope.backup.1"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup not found"));
}

#[test]
fn test_config_shows_effective_values() {
    let project = TempDir::new().unwrap();

    stack_builder(&project)
        .args(["config", "clone_timeout_secs"])
        .assert()
        .success()
        .stdout("60\n");

    stack_builder(&project)
        .args(["config", "base_path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(project.path().to_string_lossy().as_ref()));

    stack_builder(&project)
        .args(["config", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_completions() {
    let project = TempDir::new().unwrap();
    stack_builder(&project)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stack-builder"));
}
