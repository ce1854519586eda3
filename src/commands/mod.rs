// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod check;
pub mod completions;
pub mod config;
pub mod detect;
pub mod install;
pub mod list;
pub mod plan;
pub mod script;
pub mod settings;
pub mod status;
pub mod uninstall;

use crate::config::Config;
use crate::types::DependencyStatus;
use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Ctx {
    /// Effective configuration
    pub config: Config,
    /// Emit JSON instead of text
    pub json: bool,
    /// Colour text output
    pub color: bool,
}

impl Ctx {
    /// Apply `style` unless colour is disabled
    #[must_use]
    pub fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Coloured status tag padded to a fixed width, e.g. `[missing] `
    #[must_use]
    pub fn status_tag(&self, status: DependencyStatus) -> String {
        let style = match status {
            DependencyStatus::Present => Style::new().green(),
            DependencyStatus::Missing => Style::new().red().bold(),
            DependencyStatus::Invalid => Style::new().red(),
            DependencyStatus::Outdated => Style::new().yellow(),
        };
        self.paint(&format!("{:<10}", format!("[{status}]")), style)
    }

    /// `ok` / `failed` marker
    #[must_use]
    pub fn outcome(&self, success: bool) -> String {
        if success {
            self.paint("ok", Style::new().green())
        } else {
            self.paint("failed", Style::new().red().bold())
        }
    }

    /// Pretty-print `value` as JSON on stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{text}");
        Ok(())
    }
}
