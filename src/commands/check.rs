// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Check command - succeed only when every required dependency is present

use super::Ctx;
use anyhow::Result;
use std::path::PathBuf;

/// Run the check command; returns whether the manifest is satisfied
pub async fn run(ctx: &Ctx, manifest: Option<PathBuf>) -> Result<bool> {
    let result = super::detect::detect(ctx, manifest).await?;

    if ctx.json {
        ctx.print_json(&serde_json::json!({
            "component": result.component,
            "allSatisfied": result.all_satisfied,
            "missingRequired": result.missing_required.iter().map(|d| d.key()).collect::<Vec<_>>(),
        }))?;
    } else if result.all_satisfied {
        println!("{}: {}", result.component, ctx.outcome(true));
    } else {
        println!("{}: {}", result.component, ctx.outcome(false));
        for dep in &result.missing_required {
            println!("  missing {}", dep.key());
        }
    }

    Ok(result.all_satisfied)
}
