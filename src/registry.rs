//! Runtime Registry & Dispatch (C4).
//!
//! Built once from `AppConfig` at startup and never mutated afterward, the
//! same "immutable after load" discipline the teacher applies to
//! `ResourceLimits`/`ImportPolicy`.

use crate::config::AppConfig;
use crate::errors::{Result, SandboxError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Coarse classification that selects a static filter and an rlimit profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFamily {
    PythonLike,
    JsLike,
}

/// A named execution backend. Immutable after startup.
#[derive(Debug, Clone)]
pub struct RuntimeDescriptor {
    pub name: String,
    pub family: RuntimeFamily,
    pub command: String,
    pub enabled: bool,
    pub allowed_modules: Arc<HashSet<String>>,
}

fn family_for(name: &str) -> RuntimeFamily {
    if name == "nodejs" || name.starts_with("node") {
        RuntimeFamily::JsLike
    } else {
        RuntimeFamily::PythonLike
    }
}

/// The set of enabled runtimes, resolved once from configuration.
pub struct RuntimeRegistry {
    descriptors: HashMap<String, RuntimeDescriptor>,
}

impl RuntimeRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut descriptors = HashMap::new();
        for (name, entry) in &config.runtimes {
            descriptors.insert(
                name.clone(),
                RuntimeDescriptor {
                    name: name.clone(),
                    family: family_for(name),
                    command: entry.command.clone(),
                    enabled: entry.enabled,
                    allowed_modules: Arc::new(entry.allowed_packages.iter().cloned().collect()),
                },
            );
        }
        Self { descriptors }
    }

    /// `resolve(language) -> RuntimeDescriptor | not-found`.
    ///
    /// Aliasing rule: `python` resolves to `python3` when `python3` exists
    /// and is enabled. Otherwise exact match on `name`, filtered by
    /// `enabled`. A disabled descriptor is invisible to dispatch.
    pub fn resolve(&self, language: &str) -> Result<&RuntimeDescriptor> {
        if language == "python" {
            if let Some(python3) = self.descriptors.get("python3") {
                if python3.enabled {
                    return Ok(python3);
                }
            }
        }

        match self.descriptors.get(language) {
            Some(descriptor) if descriptor.enabled => Ok(descriptor),
            _ => Err(SandboxError::UnknownRuntime(language.to_string())),
        }
    }

    /// Enabled registry entries, for the health-check response.
    pub fn enabled_entries(&self) -> HashMap<String, bool> {
        self.descriptors
            .values()
            .filter(|d| d.enabled)
            .map(|d| (d.name.clone(), d.enabled))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfigEntry;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.runtimes.insert(
            "python310".to_string(),
            RuntimeConfigEntry {
                command: "/usr/bin/python3.10".to_string(),
                enabled: false,
                allowed_packages: vec![],
            },
        );
        config
    }

    #[test]
    fn python_aliases_to_python3() {
        let registry = RuntimeRegistry::from_config(&test_config());
        let resolved = registry.resolve("python").unwrap();
        assert_eq!(resolved.name, "python3");
    }

    #[test]
    fn disabled_runtime_is_invisible() {
        let registry = RuntimeRegistry::from_config(&test_config());
        let err = registry.resolve("python310").unwrap_err();
        assert!(matches!(err, SandboxError::UnknownRuntime(name) if name == "python310"));
        assert!(!registry.enabled_entries().contains_key("python310"));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let registry = RuntimeRegistry::from_config(&test_config());
        assert!(registry.resolve("ruby").is_err());
    }

    #[test]
    fn family_inference() {
        let registry = RuntimeRegistry::from_config(&test_config());
        assert_eq!(
            registry.resolve("nodejs").unwrap().family,
            RuntimeFamily::JsLike
        );
        assert_eq!(
            registry.resolve("python3").unwrap().family,
            RuntimeFamily::PythonLike
        );
    }
}
