// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Component installation
//!
//! Components live at `<base>/.claude/<type-dir>/<id>`. The filesystem is
//! the only record of what is installed. Installs are vendored snapshots:
//! a shallow clone with `.git` stripped. A failed install never leaves a
//! partial directory behind.

use crate::config::Config;
use crate::process::{CommandRunner, SystemRunner};
use crate::types::{Component, ComponentType, InstallResult};
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;

/// Optional hook run from the root of a freshly cloned component
pub const POST_INSTALL_SCRIPT: &str = "post-install.sh";

/// Installs, removes and lists components under a project root
pub struct Installer {
    base_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    clone_timeout: Duration,
    post_install_timeout: Duration,
}

impl Installer {
    /// Installer for `config.base_path`, cloning with the system `git`
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Installer running subprocesses through `runner`
    #[must_use]
    pub fn with_runner(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            base_path: config.base_path.clone(),
            runner,
            clone_timeout: config.clone_timeout(),
            post_install_timeout: config.post_install_timeout(),
        }
    }

    /// Project root
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding every component of `component_type`
    #[must_use]
    pub fn type_dir(&self, component_type: ComponentType) -> PathBuf {
        self.base_path.join(".claude").join(component_type.dir_name())
    }

    /// Deterministic install location of `component`
    #[must_use]
    pub fn get_target_path(&self, component: &Component) -> PathBuf {
        self.type_dir(component.component_type).join(&component.id)
    }

    /// Whether `component` is currently on disk
    ///
    /// Always false for a component [`Installer::validate`] rejects.
    pub async fn is_installed(&self, component: &Component) -> bool {
        if Self::validate(component).is_err() {
            return false;
        }
        fs::try_exists(self.get_target_path(component))
            .await
            .unwrap_or(false)
    }

    /// Reject components that must never reach the filesystem
    ///
    /// # Errors
    ///
    /// Fails for a component type this build does not know, and for ids
    /// that are empty, `.`, `..`, or contain a path separator.
    pub fn validate(component: &Component) -> Result<()> {
        if component.component_type == ComponentType::Unknown {
            bail!("Unsupported component type for {}", component.id);
        }
        validate_id(&component.id)
    }

    /// Clone `component` into its target path
    ///
    /// Fails without touching anything when the target already exists.
    pub async fn install(&self, component: &Component) -> InstallResult {
        let started = Instant::now();
        let target = self.get_target_path(component);

        if let Err(e) = Self::validate(component) {
            return InstallResult::failed(&component.id, elapsed_ms(started), e.to_string(), None);
        }

        if fs::try_exists(&target).await.unwrap_or(false) {
            tracing::debug!(component = %component.id, path = %target.display(), "already installed");
            return InstallResult::failed(
                &component.id,
                elapsed_ms(started),
                format!("Component {} already exists at {}", component.id, target.display()),
                Some(target),
            );
        }

        tracing::info!(
            component = %component.id,
            repository = %component.repository,
            path = %target.display(),
            "installing"
        );

        if let Err(e) = self.fetch(component, &target).await {
            remove_partial(&target).await;
            tracing::warn!(component = %component.id, error = %e, "install failed");
            return InstallResult::failed(&component.id, elapsed_ms(started), format!("{e:#}"), None);
        }

        if let Err(e) = self.run_post_install(component, &target).await {
            remove_partial(&target).await;
            tracing::warn!(component = %component.id, error = %e, "post-install setup failed");
            return InstallResult::failed(&component.id, elapsed_ms(started), format!("{e:#}"), None);
        }

        let duration = elapsed_ms(started);
        tracing::info!(component = %component.id, duration_ms = duration, "installed");
        InstallResult::ok(&component.id, duration, target)
    }

    /// Remove `component` from disk
    pub async fn uninstall(&self, component: &Component) -> InstallResult {
        let started = Instant::now();
        let target = self.get_target_path(component);

        if let Err(e) = Self::validate(component) {
            return InstallResult::failed(&component.id, elapsed_ms(started), e.to_string(), None);
        }

        if !fs::try_exists(&target).await.unwrap_or(false) {
            return InstallResult::failed(
                &component.id,
                elapsed_ms(started),
                format!("Component {} not found at {}", component.id, target.display()),
                Some(target),
            );
        }

        match fs::remove_dir_all(&target).await {
            Ok(()) => {
                tracing::info!(component = %component.id, path = %target.display(), "uninstalled");
                InstallResult::ok(&component.id, elapsed_ms(started), target)
            }
            Err(e) => InstallResult::failed(
                &component.id,
                elapsed_ms(started),
                format!("Failed to remove {}: {e}", target.display()),
                Some(target),
            ),
        }
    }

    /// Remove any existing copy, then install fresh
    ///
    /// If the fresh install fails the component ends up not installed; the
    /// error says so.
    pub async fn reinstall(&self, component: &Component) -> InstallResult {
        let started = Instant::now();
        let target = self.get_target_path(component);

        if let Err(e) = Self::validate(component) {
            return InstallResult::failed(&component.id, elapsed_ms(started), e.to_string(), None);
        }

        let had_previous = fs::try_exists(&target).await.unwrap_or(false);
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&target).await {
                return InstallResult::failed(
                    &component.id,
                    elapsed_ms(started),
                    format!("Failed to remove existing install at {}: {e}", target.display()),
                    Some(target),
                );
            }
        }

        let mut result = self.install(component).await;
        result.duration = elapsed_ms(started);
        if had_previous && !result.success {
            if let Some(error) = result.error.take() {
                result.error = Some(format!("Previous install was removed; {error}"));
            }
        }
        result
    }

    /// Ids of installed components of `component_type`, sorted
    pub async fn list_installed(&self, component_type: ComponentType) -> Vec<String> {
        let dir = self.type_dir(component_type);
        let Ok(mut entries) = fs::read_dir(&dir).await else {
            return Vec::new();
        };

        let mut ids = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    if is_dir {
                        ids.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                    break;
                }
            }
        }
        ids.sort();
        ids
    }

    /// Shallow-clone into `target` and strip VCS metadata
    async fn fetch(&self, component: &Component, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            component.repository.clone(),
            target.to_string_lossy().into_owned(),
        ];
        let output = self
            .runner
            .run("git", &args, None, self.clone_timeout)
            .await
            .map_err(|e| anyhow!("Failed to clone {}: {e}", component.repository))?;
        if !output.success {
            bail!(
                "Failed to clone {}: {}",
                component.repository,
                output.failure_message()
            );
        }

        let git_dir = target.join(".git");
        if fs::try_exists(&git_dir).await.unwrap_or(false) {
            fs::remove_dir_all(&git_dir)
                .await
                .with_context(|| format!("Failed to remove {}", git_dir.display()))?;
        }
        Ok(())
    }

    /// Run `post-install.sh` if present; a failing script only warns
    async fn run_post_install(&self, component: &Component, target: &Path) -> Result<()> {
        let script = target.join(POST_INSTALL_SCRIPT);
        if !fs::try_exists(&script).await.unwrap_or(false) {
            return Ok(());
        }

        #[cfg(unix)]
        let (program, args) = {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
                .await
                .with_context(|| format!("Failed to make {} executable", script.display()))?;
            (script.to_string_lossy().into_owned(), Vec::new())
        };
        #[cfg(not(unix))]
        let (program, args) = ("sh".to_string(), vec![script.to_string_lossy().into_owned()]);

        tracing::debug!(component = %component.id, "running post-install hook");
        match self
            .runner
            .run(&program, &args, Some(target), self.post_install_timeout)
            .await
        {
            Ok(output) if output.success => {}
            Ok(output) => tracing::warn!(
                component = %component.id,
                error = %output.failure_message(),
                "post-install script failed; component kept"
            ),
            Err(e) => tracing::warn!(
                component = %component.id,
                error = %e,
                "post-install script failed; component kept"
            ),
        }
        Ok(())
    }
}

/// Ids become directory names; reject anything that could escape the type directory
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        bail!("Invalid component id: {id:?}");
    }
    Ok(())
}

async fn remove_partial(target: &Path) {
    match fs::remove_dir_all(target).await {
        Ok(()) => tracing::debug!(path = %target.display(), "removed partial install"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %target.display(), error = %e, "failed to remove partial install"),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
