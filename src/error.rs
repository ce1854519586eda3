// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Library error type
//!
//! Unsatisfied requirements and failed installs are reported as data
//! (`Dependency::status`, `InstallResult::success`). These variants cover
//! the remaining cases where no structured outcome makes sense.

use std::path::PathBuf;

/// Errors surfaced by the core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manifest supplied a regex that does not compile
    #[error("invalid pattern for {name}: {source}")]
    InvalidPattern {
        /// Variable the pattern belongs to
        name: String,
        /// Compile error
        #[source]
        source: regex::Error,
    },

    /// Restore was asked to read a backup that does not exist
    #[error("backup not found: {}", .0.display())]
    BackupNotFound(PathBuf),

    /// The settings document (or a patch) is not a JSON object
    #[error("settings must be a JSON object")]
    SettingsNotObject,

    /// Filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias for the core
pub type Result<T> = std::result::Result<T, Error>;
