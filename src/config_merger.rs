// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Shared settings file
//!
//! Every write is a whole-file read-modify-write of `.claude/settings.json`.
//! Reads are forgiving: a missing or malformed file reads as `{}`.

use crate::error::{Error, Result};
use crate::types::McpServerConfig;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Top-level key holding MCP server entries
pub const MCPS_KEY: &str = "mcps";

/// Top-level key holding per-component permission lists
pub const PERMISSIONS_KEY: &str = "permissions";

/// Reads, merges and backs up the settings document
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    settings_path: PathBuf,
}

impl ConfigMerger {
    /// Merger for the settings file at `settings_path`
    #[must_use]
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
        }
    }

    /// Settings file location
    #[must_use]
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Current settings; `{}` when the file is missing, unreadable or not an object
    pub async fn get_settings(&self) -> Map<String, Value> {
        let Ok(text) = fs::read_to_string(&self.settings_path).await else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!(path = %self.settings_path.display(), "settings file is not an object; treating as empty");
                Map::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.settings_path.display(), error = %e, "malformed settings file; treating as empty");
                Map::new()
            }
        }
    }

    /// Deep-merge `patch` into the current settings and write the result
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub async fn merge_settings(&self, patch: &Map<String, Value>) -> Result<Map<String, Value>> {
        let current = Value::Object(self.get_settings().await);
        let Value::Object(merged) = deep_merge(current, Value::Object(patch.clone())) else {
            return Err(Error::SettingsNotObject);
        };
        self.write(&merged).await?;
        tracing::debug!(keys = patch.len(), path = %self.settings_path.display(), "settings merged");
        Ok(merged)
    }

    /// Register an MCP server under `mcps.<name>`
    ///
    /// # Errors
    ///
    /// See [`ConfigMerger::merge_settings`].
    pub async fn add_mcp_server(&self, name: &str, server: &McpServerConfig) -> Result<()> {
        let patch = json!({ MCPS_KEY: { name: serde_json::to_value(server)? } });
        self.merge_value(patch).await
    }

    /// Remove `mcps.<name>`; returns whether an entry was removed
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub async fn remove_mcp_server(&self, name: &str) -> Result<bool> {
        let mut settings = self.get_settings().await;
        let removed = settings
            .get_mut(MCPS_KEY)
            .and_then(Value::as_object_mut)
            .and_then(|servers| servers.remove(name))
            .is_some();
        if removed {
            self.write(&settings).await?;
            tracing::debug!(server = name, "mcp server removed");
        }
        Ok(removed)
    }

    /// Union `permissions` into `permissions.<component_id>`
    ///
    /// # Errors
    ///
    /// See [`ConfigMerger::merge_settings`].
    pub async fn add_permissions(&self, component_id: &str, permissions: &[String]) -> Result<()> {
        let patch = json!({ PERMISSIONS_KEY: { component_id: permissions } });
        self.merge_value(patch).await
    }

    /// Copy the settings file to `<settings>.backup.<epoch-ms>`
    ///
    /// Returns `None` when there is no settings file to back up.
    ///
    /// # Errors
    ///
    /// Fails if the copy fails.
    pub async fn backup(&self) -> Result<Option<PathBuf>> {
        if !fs::try_exists(&self.settings_path).await.unwrap_or(false) {
            return Ok(None);
        }
        let mut name = self.settings_path.as_os_str().to_owned();
        name.push(format!(".backup.{}", chrono::Utc::now().timestamp_millis()));
        let backup = PathBuf::from(name);

        fs::copy(&self.settings_path, &backup).await?;
        tracing::info!(path = %backup.display(), "settings backed up");
        Ok(Some(backup))
    }

    /// Overwrite the settings file with the contents of `backup`
    ///
    /// # Errors
    ///
    /// [`Error::BackupNotFound`] if `backup` does not exist.
    pub async fn restore(&self, backup: &Path) -> Result<()> {
        if !fs::try_exists(backup).await.unwrap_or(false) {
            return Err(Error::BackupNotFound(backup.to_path_buf()));
        }
        self.ensure_parent().await?;
        fs::copy(backup, &self.settings_path).await?;
        tracing::info!(from = %backup.display(), "settings restored");
        Ok(())
    }

    async fn merge_value(&self, patch: Value) -> Result<()> {
        match patch {
            Value::Object(map) => self.merge_settings(&map).await.map(|_| ()),
            _ => Err(Error::SettingsNotObject),
        }
    }

    async fn write(&self, settings: &Map<String, Value>) -> Result<()> {
        self.ensure_parent().await?;
        let mut text = serde_json::to_string_pretty(settings)?;
        text.push('\n');
        fs::write(&self.settings_path, text).await?;
        Ok(())
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Merge `incoming` into `existing`
///
/// Objects merge key by key, arrays union (existing order first, duplicates
/// dropped), anything else in `incoming` replaces the existing value. An
/// incoming object or array meeting a value of another kind merges into an
/// empty container, so the result never depends on what it replaced and
/// merging the same patch twice is a no-op.
#[must_use]
pub fn deep_merge(existing: Value, incoming: Value) -> Value {
    match incoming {
        Value::Object(patch) => {
            let mut base = match existing {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            for (key, value) in patch {
                let current = base.remove(&key).unwrap_or(Value::Null);
                base.insert(key, deep_merge(current, value));
            }
            Value::Object(base)
        }
        Value::Array(items) => {
            let base = match existing {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            let mut union: Vec<Value> = Vec::with_capacity(base.len() + items.len());
            for item in base.into_iter().chain(items) {
                if !union.contains(&item) {
                    union.push(item);
                }
            }
            Value::Array(union)
        }
        scalar => scalar,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-5i64..5).prop_map(Value::from),
            "[a-c]{0,2}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn json_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-d]", json_value(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_merge_is_idempotent(base in json_object(), patch in json_object()) {
            let once = deep_merge(base, patch.clone());
            let twice = deep_merge(once.clone(), patch);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merge_into_empty_keeps_patch_keys(patch in json_object()) {
            let merged = deep_merge(json!({}), patch.clone());
            let merged = merged.as_object().unwrap();
            for key in patch.as_object().unwrap().keys() {
                prop_assert!(merged.contains_key(key));
            }
        }

        #[test]
        fn prop_existing_keys_survive(base in json_object(), patch in json_object()) {
            let merged = deep_merge(base.clone(), patch);
            let merged = merged.as_object().unwrap();
            for key in base.as_object().unwrap().keys() {
                prop_assert!(merged.contains_key(key));
            }
        }
    }
}
