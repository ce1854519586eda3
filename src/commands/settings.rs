// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Settings commands - inspect and edit `.claude/settings.json`

use super::Ctx;
use crate::config_merger::ConfigMerger;
use crate::types::McpServerConfig;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Settings subcommands
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,

    /// Copy the settings file to a timestamped backup
    Backup,

    /// Overwrite the settings file from a backup
    Restore {
        /// Backup file
        path: PathBuf,
    },

    /// Register an MCP server
    ///
    /// Arguments for the server go after `--`, e.g.
    /// `add-mcp files npx --env ROOT=/srv -- -y @acme/files`
    AddMcp {
        /// Server name
        name: String,

        /// Executable
        command: String,

        /// Arguments passed to the executable (after `--`)
        #[arg(last = true)]
        args: Vec<String>,

        /// Extra environment, as KEY=VALUE (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Remove an MCP server
    RemoveMcp {
        /// Server name
        name: String,
    },

    /// Grant permissions to a component
    Allow {
        /// Component id
        id: String,

        /// Permissions to add
        #[arg(required = true)]
        permissions: Vec<String>,
    },
}

/// Run a settings subcommand
pub async fn run(ctx: &Ctx, action: SettingsAction) -> Result<()> {
    let merger = ConfigMerger::new(ctx.config.settings_path());

    match action {
        SettingsAction::Show => {
            let settings = merger.get_settings().await;
            ctx.print_json(&settings)?;
        }

        SettingsAction::Backup => match merger.backup().await? {
            Some(path) => println!("Backed up to {}", path.display()),
            None => println!("Nothing to back up: {} does not exist", merger.settings_path().display()),
        },

        SettingsAction::Restore { path } => {
            merger
                .restore(&path)
                .await
                .with_context(|| format!("Failed to restore from {}", path.display()))?;
            println!("Restored {} from {}", merger.settings_path().display(), path.display());
        }

        SettingsAction::AddMcp { name, command, args, env } => {
            let server = McpServerConfig {
                command,
                args,
                env: parse_env_pairs(&env)?,
            };
            merger.add_mcp_server(&name, &server).await?;
            println!("Added MCP server {name}");
        }

        SettingsAction::RemoveMcp { name } => {
            if merger.remove_mcp_server(&name).await? {
                println!("Removed MCP server {name}");
            } else {
                println!("No MCP server named {name}");
            }
        }

        SettingsAction::Allow { id, permissions } => {
            merger.add_permissions(&id, &permissions).await?;
            println!("Granted {} permission(s) to {id}", permissions.len());
        }
    }
    Ok(())
}

fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got: {pair}"))
        })
        .collect()
}
