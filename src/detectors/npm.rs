// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! npm package detector
//!
//! The installed package set is loaded once per detector instance and
//! reused until [`NpmDetector::clear_cache`] is called.

use super::parse_major_minor;
use crate::process::{CommandRunner, SystemRunner};
use crate::types::{Dependency, DependencyStatus, DependencyType};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Deadline for the package listing
pub const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Installed top-level packages: name to version
pub type PackageSet = HashMap<String, String>;

/// Checks declared npm packages against the project's installed set
pub struct NpmDetector {
    runner: Arc<dyn CommandRunner>,
    list_command: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Duration,
    cache: Mutex<Option<Arc<PackageSet>>>,
}

impl Default for NpmDetector {
    fn default() -> Self {
        let config = crate::config::Config::default();
        Self::new(Arc::new(SystemRunner), config.npm_list_command, None, LIST_TIMEOUT)
    }
}

impl NpmDetector {
    /// Detector running `list_command` (program then args) in `cwd`
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        list_command: Vec<String>,
        cwd: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            list_command,
            cwd,
            timeout,
            cache: Mutex::new(None),
        }
    }

    /// One finding per declared package, in key order
    pub async fn detect(&self, packages: &BTreeMap<String, String>) -> Vec<Dependency> {
        if packages.is_empty() {
            return Vec::new();
        }
        let installed = self.installed().await;
        packages
            .iter()
            .map(|(name, required)| check_package(&installed, name, required))
            .collect()
    }

    /// Forget the cached package set
    pub fn clear_cache(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Installed package set, loaded on first use
    pub async fn installed(&self) -> Arc<PackageSet> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(cached) = cached {
            return cached;
        }

        let loaded = Arc::new(self.load().await);
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&loaded));
        loaded
    }

    async fn load(&self) -> PackageSet {
        let Some((program, args)) = self.list_command.split_first() else {
            tracing::warn!("npm list command is empty; treating all packages as missing");
            return PackageSet::new();
        };

        match self
            .runner
            .run(program, args, self.cwd.as_deref(), self.timeout)
            .await
        {
            // `npm ls` exits non-zero on extraneous or peer problems but still prints the tree
            Ok(output) => {
                let packages = parse_package_list(&output.stdout);
                tracing::debug!(count = packages.len(), "loaded installed npm packages");
                packages
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list npm packages");
                PackageSet::new()
            }
        }
    }
}

/// Parse `npm ls --json` output; anything unreadable yields an empty set
#[must_use]
pub fn parse_package_list(json: &str) -> PackageSet {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
        return PackageSet::new();
    };
    value
        .get("dependencies")
        .and_then(serde_json::Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter_map(|(name, info)| {
                    let version = info.get("version")?.as_str()?;
                    Some((name.clone(), version.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Simplified major.minor comparison; unparseable versions count as present
#[must_use]
pub fn compare_versions(current: &str, required: &str) -> DependencyStatus {
    let (Some((cur_major, cur_minor)), Some((req_major, req_minor))) =
        (parse_major_minor(current), parse_major_minor(required))
    else {
        return DependencyStatus::Present;
    };

    if cur_major < req_major || (cur_major == req_major && cur_minor < req_minor) {
        DependencyStatus::Outdated
    } else {
        DependencyStatus::Present
    }
}

fn install_command(name: &str, required: &str) -> String {
    if required.is_empty() {
        format!("npm install {name}")
    } else {
        format!("npm install {name}@{required}")
    }
}

fn check_package(installed: &PackageSet, name: &str, required: &str) -> Dependency {
    let required_value = (!required.is_empty()).then(|| required.to_string());
    let base = |status| {
        Dependency::new(DependencyType::Npm, name, true, status).with_required_value(required_value.clone())
    };

    match installed.get(name) {
        None => base(DependencyStatus::Missing)
            .with_suggestion(format!("Run: {}", install_command(name, required))),
        Some(current) => match compare_versions(current, required) {
            DependencyStatus::Outdated => base(DependencyStatus::Outdated)
                .with_current(current.clone())
                .with_suggestion(format!(
                    "{name} {current} is older than {required}. Run: {}",
                    install_command(name, required)
                )),
            status => base(status).with_current(current.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, ProcessError};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRunner {
        calls: AtomicUsize,
        stdout: String,
    }

    #[async_trait]
    impl CommandRunner for CountingRunner {
        async fn run(
            &self,
            _program: &str,
            _args: &[String],
            _cwd: Option<&Path>,
            _timeout: Duration,
        ) -> Result<CommandOutput, ProcessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CommandOutput::ok(self.stdout.clone()))
        }
    }

    fn detector(stdout: &str) -> (NpmDetector, Arc<CountingRunner>) {
        let runner = Arc::new(CountingRunner {
            calls: AtomicUsize::new(0),
            stdout: stdout.to_string(),
        });
        let det = NpmDetector::new(
            runner.clone(),
            vec!["npm".into(), "ls".into()],
            None,
            Duration::from_secs(1),
        );
        (det, runner)
    }

    const LISTING: &str = r#"{"name":"proj","dependencies":{"typescript":{"version":"4.9.5"},"zod":{"version":"3.22.4"}}}"#;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("4.9.5", "^5.0.0"), DependencyStatus::Outdated);
        assert_eq!(compare_versions("5.1.0", "^5.2.0"), DependencyStatus::Outdated);
        assert_eq!(compare_versions("5.2.0", "^5.2.0"), DependencyStatus::Present);
        assert_eq!(compare_versions("6.0.0", "^5.9.0"), DependencyStatus::Present);
        assert_eq!(compare_versions("1.0.0", "latest"), DependencyStatus::Present);
    }

    #[test]
    fn test_parse_package_list_tolerates_garbage() {
        assert!(parse_package_list("npm ERR! not json").is_empty());
        assert!(parse_package_list("{}").is_empty());
        assert_eq!(parse_package_list(LISTING).len(), 2);
    }

    #[tokio::test]
    async fn test_detect_statuses() {
        let (det, _) = detector(LISTING);
        let mut packages = BTreeMap::new();
        packages.insert("typescript".to_string(), "^5.0.0".to_string());
        packages.insert("zod".to_string(), "^3.0.0".to_string());
        packages.insert("react".to_string(), "^18.0.0".to_string());

        let deps = det.detect(&packages).await;
        let by_name: HashMap<_, _> = deps.iter().map(|d| (d.name.as_str(), d)).collect();

        assert_eq!(by_name["typescript"].status, DependencyStatus::Outdated);
        assert_eq!(by_name["zod"].status, DependencyStatus::Present);
        assert_eq!(by_name["react"].status, DependencyStatus::Missing);
        assert!(by_name["react"]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("npm install react@^18.0.0"));
    }

    #[tokio::test]
    async fn test_listing_is_cached_until_cleared() {
        let (det, runner) = detector(LISTING);
        let mut packages = BTreeMap::new();
        packages.insert("zod".to_string(), String::new());

        det.detect(&packages).await;
        det.detect(&packages).await;
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        det.clear_cache();
        det.detect(&packages).await;
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_packages_skips_listing() {
        let (det, runner) = detector(LISTING);
        assert!(det.detect(&BTreeMap::new()).await.is_empty());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}
