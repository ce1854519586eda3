// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Script command - render the install script

use super::Ctx;
use crate::manifest::load_manifest;
use crate::phase0::Phase0;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the script command
pub async fn run(ctx: &Ctx, manifest: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let (manifest, path) = load_manifest(manifest.as_deref(), &ctx.config.base_path)?;
    let script = Phase0::new(&ctx.config)
        .generate_install_script(&manifest)
        .await
        .with_context(|| format!("Failed to evaluate {}", path.display()))?;

    match output {
        Some(out) => {
            std::fs::write(&out, &script)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o755))
                    .with_context(|| format!("Failed to make {} executable", out.display()))?;
            }
            println!("Install script written to {}", out.display());
        }
        None => print!("{script}"),
    }
    Ok(())
}
