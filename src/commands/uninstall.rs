// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Uninstall command

use super::Ctx;
use crate::installer::Installer;
use crate::manifest::load_components;
use anyhow::Result;
use std::path::Path;

/// Remove every component listed in `file`; returns whether all were removed
pub async fn run(ctx: &Ctx, file: &Path) -> Result<bool> {
    let stack = load_components(file)?;
    let installer = Installer::new(&ctx.config);

    let mut results = Vec::with_capacity(stack.components.len());
    for component in &stack.components {
        results.push(installer.uninstall(component).await);
    }

    if ctx.json {
        ctx.print_json(&results)?;
    } else {
        for result in &results {
            match &result.error {
                Some(error) => println!("{} {}: {error}", ctx.outcome(false), result.component),
                None => println!("{} removed {}", ctx.outcome(true), result.component),
            }
        }
    }
    Ok(results.iter().all(|r| r.success))
}
