// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Plan command - show how to resolve missing dependencies

use super::Ctx;
use crate::manifest::load_manifest;
use crate::phase0::Phase0;
use crate::types::ResolutionAction;
use anyhow::{Context, Result};
use owo_colors::Style;
use std::path::PathBuf;

/// Run the plan command
pub async fn run(ctx: &Ctx, manifest: Option<PathBuf>) -> Result<()> {
    let (manifest, path) = load_manifest(manifest.as_deref(), &ctx.config.base_path)?;
    let plan = Phase0::new(&ctx.config)
        .get_resolution_plan(&manifest)
        .await
        .with_context(|| format!("Failed to evaluate {}", path.display()))?;

    if ctx.json {
        return ctx.print_json(&plan);
    }

    if plan.actions.is_empty() {
        println!("{}: nothing to resolve", plan.component);
        return Ok(());
    }

    println!("Resolution plan for {}", ctx.paint(&plan.component, Style::new().bold()));

    if !plan.auto_steps.is_empty() {
        println!();
        println!("Automatic ({}):", plan.auto_steps.len());
        for step in &plan.auto_steps {
            print_step(step);
        }
    }

    if !plan.manual_steps.is_empty() {
        println!();
        println!("Manual ({}):", plan.manual_steps.len());
        for step in &plan.manual_steps {
            print_step(step);
        }
    }

    println!();
    if plan.can_auto_resolve {
        println!("Run `stack-builder script` to generate an install script.");
    } else {
        println!("{}", ctx.paint("Manual steps remain.", Style::new().yellow()));
    }
    Ok(())
}

fn print_step(step: &ResolutionAction) {
    println!("  - {}", step.instructions);
    if let Some(command) = &step.command {
        println!("      $ {command}");
    }
    if let Some(url) = &step.url {
        println!("      {url}");
    }
}
