// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Resolution planning
//!
//! Turns unsatisfied findings into steps. Only package installs are ever
//! scripted; configuring credentials, installing system tools and upgrading
//! runtimes are explained, never executed.

use crate::detectors::system::NODE_DOWNLOAD_URL;
use crate::types::{ActionKind, Dependency, DependencyStatus, DependencyType, ResolutionAction, ResolutionPlan};
use std::borrow::Cow;

/// Where to obtain well-known environment values
const ENV_SETUP_URLS: &[(&str, &str)] = &[
    ("ANTHROPIC_API_KEY", "https://console.anthropic.com/settings/keys"),
    ("OPENAI_API_KEY", "https://platform.openai.com/api-keys"),
    ("GITHUB_TOKEN", "https://github.com/settings/tokens"),
    ("SUPABASE_URL", "https://supabase.com/dashboard/project/_/settings/api"),
    ("SUPABASE_ANON_KEY", "https://supabase.com/dashboard/project/_/settings/api"),
];

/// Where to download well-known system tools
const SYSTEM_INSTALL_URLS: &[(&str, &str)] = &[
    ("git", "https://git-scm.com/downloads"),
    ("node", "https://nodejs.org/"),
    ("docker", "https://docs.docker.com/get-docker/"),
    ("claude", "https://docs.anthropic.com/en/docs/claude-code"),
    ("gh", "https://cli.github.com/"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<String> {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, url)| (*url).to_string())
}

/// Builds resolution plans and install scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    /// Create a resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plan for `missing`, partitioned into automatic and manual steps
    #[must_use]
    pub fn create_plan(&self, component: &str, missing: &[Dependency]) -> ResolutionPlan {
        let actions: Vec<ResolutionAction> = missing.iter().map(resolve).collect();
        let (auto_steps, manual_steps): (Vec<_>, Vec<_>) =
            actions.iter().cloned().partition(ResolutionAction::is_automatic);

        ResolutionPlan {
            component: component.to_string(),
            can_auto_resolve: manual_steps.is_empty(),
            actions,
            auto_steps,
            manual_steps,
        }
    }

    /// Shell script running the automatic steps, with manual steps as comments
    ///
    /// Manifest-supplied text only ever reaches the script quoted or behind
    /// a `#` on every line it spans.
    #[must_use]
    pub fn generate_install_script(&self, plan: &ResolutionPlan) -> String {
        let mut lines = vec!["#!/usr/bin/env bash".to_string()];
        push_comment(&mut lines, "# ", "# ", &format!("Install script for {}", plan.component));
        lines.push("set -euo pipefail".to_string());
        lines.push(String::new());

        let mut scripted = 0;
        for step in &plan.auto_steps {
            let Some(command) = &step.command else { continue };
            match shlex::try_quote(&format!("Installing {}...", step.dependency.name)) {
                Ok(message) => lines.push(format!("echo {message}")),
                Err(_) => lines.push("echo 'Installing package...'".to_string()),
            }
            lines.push(command.clone());
            scripted += 1;
        }
        if scripted == 0 {
            lines.push("echo 'Nothing to install automatically.'".to_string());
        }

        if !plan.manual_steps.is_empty() {
            lines.push(String::new());
            lines.push("# Manual steps required:".to_string());
            for step in &plan.manual_steps {
                let text = match &step.url {
                    Some(url) => format!("{} ({url})", step.instructions),
                    None => step.instructions.clone(),
                };
                push_comment(&mut lines, "# - ", "#   ", &text);
            }
        }

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }
}

/// `word` as a single bash argument
///
/// Plain package specs such as `@scope/pkg@^1.2.0` stay as written; `^` and
/// a non-leading `~` are inert in a non-interactive script. Anything else is
/// quoted. `None` when `word` holds a NUL.
fn shell_word(word: &str) -> Option<Cow<'_, str>> {
    let plain = !word.is_empty()
        && !word.starts_with('~')
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '/' | '.' | '_' | '-' | '+' | ':' | '^' | '~'));
    if plain {
        Some(Cow::Borrowed(word))
    } else {
        shlex::try_quote(word).ok()
    }
}

/// Append `text` as shell comment lines, one per line of input
fn push_comment(lines: &mut Vec<String>, first: &str, rest: &str, text: &str) {
    // bash ends a comment at \n only; \r stays inside it
    for (i, line) in text.split('\n').enumerate() {
        let prefix = if i == 0 { first } else { rest };
        lines.push(format!("{prefix}{line}").trim_end().to_string());
    }
}

/// Resolution step for a single finding
#[must_use]
pub fn resolve(dep: &Dependency) -> ResolutionAction {
    let action = |kind, command, instructions, url| ResolutionAction {
        dependency: dep.clone(),
        action: kind,
        command,
        instructions,
        url,
    };

    match dep.dep_type {
        DependencyType::Npm => {
            let spec = match dep.required_value.as_deref() {
                Some(version) if !version.is_empty() => format!("{}@{version}", dep.name),
                _ => dep.name.clone(),
            };
            match shell_word(&spec) {
                Some(quoted) => action(
                    ActionKind::Install,
                    Some(format!("npm install {quoted}")),
                    format!("Install npm package {spec}"),
                    None,
                ),
                // NUL cannot be passed through a shell word
                None => action(
                    ActionKind::Manual,
                    None,
                    format!("Install npm package {} by hand; its name cannot be scripted", spec.escape_debug()),
                    None,
                ),
            }
        }
        DependencyType::System => action(
            ActionKind::Manual,
            None,
            format!("Install {} and make sure it is on your PATH", dep.name),
            lookup(SYSTEM_INSTALL_URLS, &dep.name),
        ),
        DependencyType::Env => {
            let instructions = if dep.status == DependencyStatus::Invalid {
                format!("Fix the value of {}; it does not match the expected format", dep.name)
            } else {
                format!("Set the {} environment variable", dep.name)
            };
            action(ActionKind::Configure, None, instructions, lookup(ENV_SETUP_URLS, &dep.name))
        }
        DependencyType::Credential => action(
            ActionKind::Configure,
            None,
            format!("Add the {} credential", dep.name),
            lookup(ENV_SETUP_URLS, &dep.name),
        ),
        DependencyType::Runtime => {
            let required = dep.required_value.as_deref().unwrap_or("a supported version");
            let instructions = match dep.current_value.as_deref() {
                Some(current) => format!("Upgrade {} from {current} to {required}", dep.name),
                None => format!("Install {} {required}", dep.name),
            };
            action(ActionKind::Manual, None, instructions, Some(NODE_DOWNLOAD_URL.to_string()))
        }
        DependencyType::Unknown => action(
            ActionKind::Manual,
            None,
            dep.suggestion
                .clone()
                .unwrap_or_else(|| format!("Resolve {} manually", dep.key())),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(dep_type: DependencyType, name: &str) -> Dependency {
        Dependency::new(dep_type, name, true, DependencyStatus::Missing)
    }

    #[test]
    fn test_npm_becomes_auto_install() {
        let dep = missing(DependencyType::Npm, "typescript").with_required_value(Some("^5.0.0".into()));
        let plan = Resolver::new().create_plan("demo", &[dep]);

        assert_eq!(plan.auto_steps.len(), 1);
        assert!(plan.manual_steps.is_empty());
        assert!(plan.can_auto_resolve);
        assert_eq!(plan.auto_steps[0].action, ActionKind::Install);
        assert_eq!(
            plan.auto_steps[0].command.as_deref(),
            Some("npm install typescript@^5.0.0")
        );
    }

    #[test]
    fn test_env_is_never_auto() {
        let deps = vec![
            missing(DependencyType::Env, "ANTHROPIC_API_KEY"),
            missing(DependencyType::Npm, "zod"),
        ];
        let plan = Resolver::new().create_plan("demo", &deps);

        assert_eq!(plan.manual_steps.len(), 1);
        assert_eq!(plan.manual_steps[0].action, ActionKind::Configure);
        assert_eq!(
            plan.manual_steps[0].url.as_deref(),
            Some("https://console.anthropic.com/settings/keys")
        );
        assert!(!plan.can_auto_resolve);
        assert_eq!(plan.actions.len(), 2);
    }

    #[test]
    fn test_system_and_runtime_are_manual() {
        let git = resolve(&missing(DependencyType::System, "git"));
        assert_eq!(git.action, ActionKind::Manual);
        assert_eq!(git.url.as_deref(), Some("https://git-scm.com/downloads"));

        let unknown_tool = resolve(&missing(DependencyType::System, "frob"));
        assert!(unknown_tool.url.is_none());

        let node = resolve(
            &Dependency::new(DependencyType::Runtime, "node", true, DependencyStatus::Outdated)
                .with_current("16.0.0")
                .with_required_value(Some(">=18".into())),
        );
        assert_eq!(node.action, ActionKind::Manual);
        assert!(node.instructions.contains("16.0.0"));
        assert_eq!(node.url.as_deref(), Some(NODE_DOWNLOAD_URL));
    }

    #[test]
    fn test_unknown_type_falls_back_to_suggestion() {
        let dep = missing(DependencyType::Unknown, "thing").with_suggestion("Do the thing");
        let action = resolve(&dep);
        assert_eq!(action.action, ActionKind::Manual);
        assert_eq!(action.instructions, "Do the thing");

        let bare = resolve(&missing(DependencyType::Unknown, "thing"));
        assert_eq!(bare.instructions, "Resolve unknown:thing manually");
    }

    #[test]
    fn test_install_script() {
        let deps = vec![
            missing(DependencyType::Npm, "typescript").with_required_value(Some("^5.0.0".into())),
            missing(DependencyType::Env, "ANTHROPIC_API_KEY"),
            missing(DependencyType::System, "frob"),
        ];
        let resolver = Resolver::new();
        let script = resolver.generate_install_script(&resolver.create_plan("demo", &deps));

        insta::assert_snapshot!(script, @r###"
        #!/usr/bin/env bash
        # Install script for demo
        set -euo pipefail

        echo 'Installing typescript...'
        npm install typescript@^5.0.0

        # Manual steps required:
        # - Set the ANTHROPIC_API_KEY environment variable (https://console.anthropic.com/settings/keys)
        # - Install frob and make sure it is on your PATH
        "###);
    }

    #[test]
    fn test_hostile_names_never_become_commands() {
        let deps = vec![
            missing(DependencyType::Env, "TOKEN\ntouch /tmp/stack-builder-env #"),
            missing(DependencyType::Npm, "zod; touch /tmp/stack-builder-npm"),
            missing(DependencyType::Npm, "left-pad").with_required_value(Some(">=1.0.0 $(id)".into())),
            missing(DependencyType::Unknown, "x").with_suggestion("line one\nrm -rf ~"),
        ];
        let resolver = Resolver::new();
        let plan = resolver.create_plan("demo\nreboot", &deps);
        let script = resolver.generate_install_script(&plan);

        let executable: Vec<&str> = script
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        assert_eq!(
            executable,
            [
                "set -euo pipefail",
                "echo 'Installing zod; touch /tmp/stack-builder-npm...'",
                "npm install 'zod; touch /tmp/stack-builder-npm'",
                "echo 'Installing left-pad...'",
                "npm install 'left-pad@>=1.0.0 $(id)'",
            ]
        );
        assert!(script.contains("\n#   touch /tmp/stack-builder-env #"));
        assert!(script.contains("\n#   rm -rf ~"));
        assert!(script.contains("\n# reboot\n"));
    }

    #[test]
    fn test_plain_specs_stay_unquoted() {
        for (name, version, expected) in [
            ("@scope/pkg", "~1.2.3", "npm install @scope/pkg@~1.2.3"),
            ("react", "", "npm install react"),
            ("react", "18 || 19", "npm install 'react@18 || 19'"),
            ("~evil", "", "npm install '~evil'"),
        ] {
            let dep = missing(DependencyType::Npm, name).with_required_value(Some(version.into()));
            assert_eq!(resolve(&dep).command.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_nul_in_package_name_is_manual() {
        let action = resolve(&missing(DependencyType::Npm, "bad\0name"));
        assert_eq!(action.action, ActionKind::Manual);
        assert!(action.command.is_none());
        assert!(action.instructions.contains("bad\\0name"));
    }

    #[test]
    fn test_script_without_auto_steps() {
        let resolver = Resolver::new();
        let plan = resolver.create_plan("demo", &[missing(DependencyType::Env, "X")]);
        let script = resolver.generate_install_script(&plan);
        assert!(script.contains("Nothing to install automatically."));
        assert!(!script.lines().any(|l| l.starts_with("npm ")));
    }
}
