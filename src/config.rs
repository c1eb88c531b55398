//! Configuration loading (C9).
//!
//! Mirrors the original service's `config.py`: a typed default tree, a YAML
//! override read from `SANDBOX_CONFIG_PATH` (default `config.yaml`), merged
//! recursively onto the defaults. Any read or parse error is logged and
//! silently falls back to the built-in defaults. The service always starts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const CONFIG_PATH_ENV: &str = "SANDBOX_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub workers: usize,
    pub max_concurrent_requests: usize,
    pub max_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            workers: 4,
            max_concurrent_requests: 10,
            max_queue_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimitsConfig {
    pub cpu_time_limit: u64,
    pub memory_limit_mb: u64,
    pub file_size_limit_kb: u64,
    pub timeout: u64,
}

impl Default for ResourceLimitsConfig {
    fn default() -> Self {
        Self {
            cpu_time_limit: 10,
            memory_limit_mb: 512,
            file_size_limit_kb: 1024,
            timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfigEntry {
    pub command: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_packages: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub resource_limits: ResourceLimitsConfig,
    pub runtimes: HashMap<String, RuntimeConfigEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut runtimes = HashMap::new();
        runtimes.insert(
            "python3".to_string(),
            RuntimeConfigEntry {
                command: "/usr/bin/python3".to_string(),
                enabled: true,
                allowed_packages: vec![
                    "json".to_string(),
                    "base64".to_string(),
                    "math".to_string(),
                    "time".to_string(),
                    "re".to_string(),
                    "ast".to_string(),
                ],
            },
        );
        runtimes.insert(
            "nodejs".to_string(),
            RuntimeConfigEntry {
                command: "/usr/bin/node".to_string(),
                enabled: true,
                allowed_packages: vec![
                    "fs".to_string(),
                    "path".to_string(),
                    "crypto".to_string(),
                    "buffer".to_string(),
                    "util".to_string(),
                ],
            },
        );

        Self {
            server: ServerConfig::default(),
            resource_limits: ResourceLimitsConfig::default(),
            runtimes,
        }
    }
}

impl AppConfig {
    /// Load configuration from `SANDBOX_CONFIG_PATH` (default `config.yaml`),
    /// merged onto the built-in defaults. Falls back to defaults on any
    /// error. A missing or malformed config file must never prevent
    /// startup.
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    fn load_from(path: &Path) -> Self {
        let config = Self::default();

        if !path.exists() {
            return config;
        }

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read config file, using defaults"
                );
                return config;
            }
        };

        let override_value: serde_yaml::Value = match serde_yaml::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                return config;
            }
        };

        let mut base_value = match serde_yaml::to_value(&config) {
            Ok(v) => v,
            Err(_) => return config,
        };

        merge_yaml(&mut base_value, &override_value);

        match serde_yaml::from_value(base_value) {
            Ok(merged) => merged,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "config file did not match expected shape, using defaults"
                );
                config
            }
        }
    }
}

/// Recursive merge: nested maps deep-merge, scalars and sequences replace
/// wholesale, matching the original `merge_configs`.
fn merge_yaml(base: &mut serde_yaml::Value, overlay: &serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_yaml(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_two_enabled_runtimes() {
        let config = AppConfig::default();
        assert!(config.runtimes["python3"].enabled);
        assert!(config.runtimes["nodejs"].enabled);
        assert_eq!(config.server.max_concurrent_requests, 10);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn malformed_yaml_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("sandbox-core-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "server: [this is not a mapping").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.server.port, 8000);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn nested_override_merges_without_dropping_siblings() {
        let dir = std::env::temp_dir().join(format!("sandbox-core-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  max_queue_size: 5\nruntimes:\n  python3:\n    enabled: false\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.server.max_queue_size, 5);
        assert_eq!(config.server.max_concurrent_requests, 10);
        assert!(!config.runtimes["python3"].enabled);
        assert!(config.runtimes["nodejs"].enabled);

        std::fs::remove_dir_all(&dir).ok();
    }
}
