// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Manifest and component file loading for the CLI

use crate::types::{Component, ComponentManifest, Stack};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Standalone manifest at the project root
pub const ORGANIZED_FILE: &str = "organized.json";

/// Section of `package.json` holding the manifest
pub const PACKAGE_SECTION: &str = "claude";

/// Find and parse the component manifest for `root`
///
/// An explicit path wins. Otherwise `organized.json`, then the `"claude"`
/// section of `package.json`, then `.claude/manifest.json`.
///
/// # Errors
///
/// Fails when nothing is found or the file found does not parse.
pub fn load_manifest(explicit: Option<&Path>, root: &Path) -> Result<(ComponentManifest, PathBuf)> {
    if let Some(path) = explicit {
        return Ok((read_manifest(path)?, path.to_path_buf()));
    }

    let organized = root.join(ORGANIZED_FILE);
    if organized.is_file() {
        return Ok((read_manifest(&organized)?, organized));
    }

    let package = root.join("package.json");
    if package.is_file() {
        if let Some(manifest) = read_package_section(&package)? {
            return Ok((manifest, package));
        }
    }

    let nested = root.join(".claude").join("manifest.json");
    if nested.is_file() {
        return Ok((read_manifest(&nested)?, nested));
    }

    bail!(
        "No manifest found in {}. Looked for {ORGANIZED_FILE}, package.json (\"{PACKAGE_SECTION}\" section) and .claude/manifest.json",
        root.display()
    )
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_manifest(path: &Path) -> Result<ComponentManifest> {
    serde_json::from_value(read_json(path)?)
        .with_context(|| format!("Invalid manifest in {}", path.display()))
}

/// The `"claude"` section, with name and version falling back to the package's own
fn read_package_section(path: &Path) -> Result<Option<ComponentManifest>> {
    let package = read_json(path)?;
    let Some(Value::Object(section)) = package.get(PACKAGE_SECTION) else {
        return Ok(None);
    };

    let mut section = section.clone();
    for key in ["name", "version"] {
        if !section.contains_key(key) {
            if let Some(value) = package.get(key) {
                section.insert(key.to_string(), value.clone());
            }
        }
    }

    serde_json::from_value(Value::Object(section))
        .map(Some)
        .with_context(|| format!("Invalid \"{PACKAGE_SECTION}\" section in {}", path.display()))
}

/// Read a component file as a stack
///
/// Accepts a single component, an array of components, or a full stack.
///
/// # Errors
///
/// Fails when the file is unreadable or matches none of those shapes.
pub fn load_components(path: &Path) -> Result<Stack> {
    let value = read_json(path)?;
    let invalid = || format!("{} is not a component, component list or stack", path.display());

    match value {
        Value::Array(_) => {
            let components: Vec<Component> = serde_json::from_value(value).with_context(invalid)?;
            let name = path
                .file_stem()
                .map_or_else(|| "components".to_string(), |s| s.to_string_lossy().into_owned());
            Ok(Stack {
                name,
                components,
                ..Stack::default()
            })
        }
        Value::Object(map) if map.contains_key("components") => {
            serde_json::from_value(Value::Object(map)).with_context(invalid)
        }
        _ => {
            let component: Component = serde_json::from_value(value).with_context(invalid)?;
            Ok(Stack {
                name: component.name.clone(),
                components: vec![component],
                ..Stack::default()
            })
        }
    }
}
