// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Install command - install the components of a component or stack file

use super::Ctx;
use crate::installer::Installer;
use crate::manifest::load_components;
use crate::stack_builder::{InstallOptions, InstallProgress, StackBuilder};
use crate::types::Stack;
use anyhow::Result;
use owo_colors::Style;
use serde_json::json;
use std::path::Path;

/// Flags accepted by `install` and `reinstall`
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    /// Replace existing installs
    pub force: bool,
    /// Skip pre-install dependency checks
    pub skip_deps: bool,
    /// Report what would happen without touching disk
    pub dry_run: bool,
}

/// Run the install command; returns whether everything succeeded
pub async fn run(ctx: &Ctx, file: &Path, flags: Flags) -> Result<bool> {
    let stack = load_components(file)?;
    let builder = StackBuilder::new(&ctx.config);

    if flags.dry_run {
        return dry_run(ctx, &builder, &stack, flags).await;
    }

    let on_progress = (!ctx.json).then(|| {
        let printer = ctx.clone();
        Box::new(move |p: &InstallProgress| {
            println!("[{}/{}] {}", p.completed, p.total, printer.paint(&p.current, Style::new().bold()));
        }) as crate::stack_builder::ProgressFn
    });
    let options = InstallOptions {
        force: flags.force,
        skip_dependency_check: flags.skip_deps,
        on_progress,
    };

    let report = builder.install_stack(&stack, &options).await;

    if ctx.json {
        ctx.print_json(&json!({
            "stack": stack.name,
            "results": report.results,
            "settingsMerged": report.settings_merged,
            "settingsError": report.settings_error,
        }))?;
        return Ok(report.success());
    }

    println!();
    for result in &report.results {
        match (&result.path, &result.error) {
            (_, Some(error)) => println!("  {} {}: {error}", ctx.outcome(false), result.component),
            (Some(path), None) => println!(
                "  {} {} -> {} ({}ms)",
                ctx.outcome(true),
                result.component,
                path.display(),
                result.duration
            ),
            (None, None) => println!("  {} {}", ctx.outcome(true), result.component),
        }
    }
    if report.settings_merged {
        println!("  settings merged into {}", builder.merger().settings_path().display());
    }
    if let Some(error) = &report.settings_error {
        println!("  {} settings: {error}", ctx.outcome(false));
    }

    let succeeded = report.results.iter().filter(|r| r.success).count();
    println!();
    println!("{succeeded}/{} components installed", report.results.len());
    Ok(report.success())
}

async fn dry_run(ctx: &Ctx, builder: &StackBuilder, stack: &Stack, flags: Flags) -> Result<bool> {
    let mut rows = Vec::with_capacity(stack.components.len());
    let mut all_ok = true;

    for component in &stack.components {
        let target = builder.installer().get_target_path(component);
        let rejected = Installer::validate(component).err().map(|e| e.to_string());
        let installed = builder.installer().is_installed(component).await;
        let check = if flags.skip_deps || rejected.is_some() {
            None
        } else {
            Some(builder.pre_install_check(component).await)
        };
        let would_install = rejected.is_none()
            && (!installed || flags.force)
            && check.as_ref().map_or(true, |c| c.can_install);
        all_ok &= would_install;
        rows.push((component, target, rejected, installed, check, would_install));
    }

    if ctx.json {
        let rows: Vec<_> = rows
            .iter()
            .map(|(component, target, rejected, installed, check, would_install)| {
                json!({
                    "component": component.id,
                    "type": component.component_type,
                    "path": target,
                    "error": rejected,
                    "installed": installed,
                    "check": check,
                    "wouldInstall": would_install,
                })
            })
            .collect();
        ctx.print_json(&rows)?;
        return Ok(all_ok);
    }

    println!("Dry run for {}", ctx.paint(&stack.name, Style::new().bold()));
    for (component, target, rejected, installed, check, would_install) in &rows {
        let verdict = if *would_install {
            ctx.paint("would install", Style::new().green())
        } else {
            ctx.paint("would fail", Style::new().red())
        };
        println!("  {} ({}) -> {}: {verdict}", component.id, component.component_type, target.display());
        if let Some(reason) = rejected {
            println!("      {reason}");
        }
        if *installed {
            println!(
                "      already installed{}",
                if flags.force { "; would replace" } else { "" }
            );
        }
        if let Some(check) = check {
            for missing in &check.missing_dependencies {
                println!("      missing {missing}");
            }
        }
    }
    if !stack.settings.is_empty() {
        println!(
            "  would merge {} settings keys into {}",
            stack.settings.len(),
            builder.merger().settings_path().display()
        );
    }
    Ok(all_ok)
}
