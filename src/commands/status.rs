// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status command - which components of a file are installed

use super::Ctx;
use crate::manifest::load_components;
use crate::stack_builder::StackBuilder;
use anyhow::Result;
use owo_colors::Style;
use std::path::Path;

/// Run the status command
pub async fn run(ctx: &Ctx, file: &Path) -> Result<()> {
    let stack = load_components(file)?;
    let status = StackBuilder::new(&ctx.config).check_installed(&stack.components).await;

    if ctx.json {
        return ctx.print_json(&status);
    }

    for component in &stack.components {
        let installed = status.get(&component.id).copied().unwrap_or(false);
        let label = if installed {
            ctx.paint("installed", Style::new().green())
        } else {
            ctx.paint("not installed", Style::new().dimmed())
        };
        println!("{} ({}): {label}", component.id, component.component_type);
    }
    Ok(())
}
