// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! List command - installed components of one type

use super::Ctx;
use crate::installer::Installer;
use crate::types::ComponentType;
use anyhow::Result;

/// Run the list command
pub async fn run(ctx: &Ctx, component_type: ComponentType) -> Result<()> {
    let installer = Installer::new(&ctx.config);
    let ids = installer.list_installed(component_type).await;

    if ctx.json {
        return ctx.print_json(&ids);
    }

    if ids.is_empty() {
        println!(
            "No {} installed in {}",
            component_type.dir_name(),
            installer.type_dir(component_type).display()
        );
        return Ok(());
    }
    for id in &ids {
        println!("{id}");
    }
    Ok(())
}
