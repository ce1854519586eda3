// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Credential detector
//!
//! Presence checks like the env detector, but tagged `credential` so callers
//! can route them to a credential manager instead of "export this".

use super::env::SENSITIVE_MASK;
use super::{EnvSource, ProcessEnv};
use crate::types::{Dependency, DependencyStatus, DependencyType};
use std::sync::Arc;

/// A well-known provider credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    /// Service id used in manifests
    pub service: &'static str,
    /// Variable holding the credential
    pub env_var: &'static str,
    /// Display label
    pub label: &'static str,
    /// Where to create it
    pub setup_url: &'static str,
}

/// Built-in credential requirements
pub const KNOWN_CREDENTIALS: &[CredentialSpec] = &[
    CredentialSpec {
        service: "anthropic",
        env_var: "ANTHROPIC_API_KEY",
        label: "Anthropic API key",
        setup_url: "https://console.anthropic.com/settings/keys",
    },
    CredentialSpec {
        service: "openai",
        env_var: "OPENAI_API_KEY",
        label: "OpenAI API key",
        setup_url: "https://platform.openai.com/api-keys",
    },
    CredentialSpec {
        service: "github",
        env_var: "GITHUB_TOKEN",
        label: "GitHub personal access token",
        setup_url: "https://github.com/settings/tokens",
    },
    CredentialSpec {
        service: "supabase",
        env_var: "SUPABASE_URL",
        label: "Supabase project URL",
        setup_url: "https://supabase.com/dashboard/project/_/settings/api",
    },
    CredentialSpec {
        service: "supabase",
        env_var: "SUPABASE_ANON_KEY",
        label: "Supabase anon key",
        setup_url: "https://supabase.com/dashboard/project/_/settings/api",
    },
];

/// Checks provider credentials
#[derive(Clone)]
pub struct CredentialDetector {
    source: Arc<dyn EnvSource>,
}

impl Default for CredentialDetector {
    fn default() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }
}

impl CredentialDetector {
    /// Detector reading from `source`
    #[must_use]
    pub fn new(source: Arc<dyn EnvSource>) -> Self {
        Self { source }
    }

    /// Findings for each service id, in order
    ///
    /// Unknown services are checked under `<SERVICE>_API_KEY`.
    #[must_use]
    pub fn detect(&self, services: &[String]) -> Vec<Dependency> {
        services
            .iter()
            .flat_map(|service| {
                let known: Vec<_> = lookup(service).collect();
                if known.is_empty() {
                    let env_var = format!(
                        "{}_API_KEY",
                        service.to_ascii_uppercase().replace('-', "_")
                    );
                    vec![self.check(&env_var, &format!("{service} credential"), None)]
                } else {
                    known
                        .into_iter()
                        .map(|spec| self.check(spec.env_var, spec.label, Some(spec.setup_url)))
                        .collect()
                }
            })
            .collect()
    }

    fn check(&self, env_var: &str, label: &str, setup_url: Option<&str>) -> Dependency {
        let present = self.source.var(env_var).is_some_and(|v| !v.is_empty());
        if present {
            Dependency::new(DependencyType::Credential, env_var, true, DependencyStatus::Present)
                .with_current(SENSITIVE_MASK)
        } else {
            let suggestion = match setup_url {
                Some(url) => format!("Add your {label} ({env_var}). Create one at: {url}"),
                None => format!("Add your {label} ({env_var})"),
            };
            Dependency::new(DependencyType::Credential, env_var, true, DependencyStatus::Missing)
                .with_suggestion(suggestion)
        }
    }
}

/// Table entries for a service id
pub fn lookup(service: &str) -> impl Iterator<Item = &'static CredentialSpec> + '_ {
    KNOWN_CREDENTIALS
        .iter()
        .filter(move |spec| spec.service.eq_ignore_ascii_case(service))
}
