// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - print the effective configuration

use super::Ctx;
use anyhow::{anyhow, Context, Result};

/// Print the whole configuration, or one key
pub fn run(ctx: &Ctx, key: Option<&str>) -> Result<()> {
    if ctx.json {
        let value = serde_json::to_value(&ctx.config).context("Failed to serialize configuration")?;
        return match key {
            Some(key) => ctx.print_json(value.get(key).ok_or_else(|| unknown_key(key))?),
            None => ctx.print_json(&value),
        };
    }

    match key {
        None => {
            let text = toml::to_string_pretty(&ctx.config).context("Failed to serialize configuration")?;
            print!("{text}");
        }
        Some(key) => {
            let table = toml::Value::try_from(&ctx.config).context("Failed to serialize configuration")?;
            match table.get(key).ok_or_else(|| unknown_key(key))? {
                toml::Value::String(s) => println!("{s}"),
                other => println!("{other}"),
            }
        }
    }
    Ok(())
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {key}. Valid: base_path, clone_timeout_secs, probe_timeout_secs, post_install_timeout_secs, npm_list_command, log_level"
    )
}
