// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Detect command - report every declared dependency and its status

use super::Ctx;
use crate::manifest::load_manifest;
use crate::phase0::Phase0;
use crate::types::DetectionResult;
use anyhow::{Context, Result};
use owo_colors::Style;
use std::path::PathBuf;

/// Run the detect command
pub async fn run(ctx: &Ctx, manifest: Option<PathBuf>) -> Result<()> {
    let result = detect(ctx, manifest).await?;
    if ctx.json {
        return ctx.print_json(&result);
    }
    print_result(ctx, &result);
    Ok(())
}

/// Load the manifest and run detection
pub(crate) async fn detect(ctx: &Ctx, manifest: Option<PathBuf>) -> Result<DetectionResult> {
    let (manifest, path) = load_manifest(manifest.as_deref(), &ctx.config.base_path)?;
    tracing::debug!(path = %path.display(), "using manifest");

    Phase0::new(&ctx.config)
        .detect(&manifest)
        .await
        .with_context(|| format!("Failed to evaluate {}", path.display()))
}

fn print_result(ctx: &Ctx, result: &DetectionResult) {
    println!("{}", ctx.paint(&result.component, Style::new().bold()));

    if result.dependencies.is_empty() {
        println!("  no dependencies declared");
        return;
    }

    for dep in &result.dependencies {
        let mut line = format!("  {} {}", ctx.status_tag(dep.status), dep.key());
        if let Some(current) = &dep.current_value {
            line.push_str(&format!("  {current}"));
        }
        if let Some(required) = &dep.required_value {
            line.push_str(&format!("  (want {required})"));
        }
        if !dep.required {
            line.push_str("  optional");
        }
        println!("{line}");
        if dep.is_blocking() {
            if let Some(suggestion) = &dep.suggestion {
                println!("             {suggestion}");
            }
        }
    }

    println!();
    if result.all_satisfied {
        println!("{}", ctx.paint("All required dependencies satisfied", Style::new().green()));
    } else {
        println!(
            "{}",
            ctx.paint(
                &format!("{} required dependencies unsatisfied", result.missing_required.len()),
                Style::new().red()
            )
        );
    }
}
