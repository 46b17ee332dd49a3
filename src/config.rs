// src/config.rs
use crate::error::{ErrorContext, Result};
use crate::sources::{all_source_names, find_descriptor, registry};
use crate::types::{FinderOptions, Keys, SessionConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Suffix of the per-source environment override, e.g. `GITHUB_API_KEYS`.
const ENV_SUFFIX: &str = "_API_KEYS";

/// Source list and credential pools, as stored in the YAML provider file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    #[serde(default)]
    pub keys: BTreeMap<String, Vec<String>>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_sources() -> Vec<String> {
    all_source_names().into_iter().map(String::from).collect()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let keys = registry()
            .iter()
            .filter(|d| d.needs_key)
            .map(|d| (d.name.to_string(), Vec::new()))
            .collect();

        Self {
            version: default_version(),
            sources: default_sources(),
            keys,
        }
    }
}

impl ProviderConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let mut config: ProviderConfig =
            serde_yaml::from_str(contents).with_context(|| "Failed to parse provider config".to_string())?;

        config.keys = config
            .keys
            .into_iter()
            .map(|(name, pool)| (name.to_lowercase(), pool))
            .collect();
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&contents)?
        } else {
            debug!("{} not found, using default provider config", path.display());
            Self::default()
        };

        config.apply_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Replaces the pool of every source whose `<SOURCE>_API_KEYS` is set.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for descriptor in registry() {
            let var = format!("{}{}", descriptor.name.to_uppercase(), ENV_SUFFIX);
            if let Some(value) = lookup(&var) {
                let pool: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect();
                debug!("{} overrides {} key(s) for {}", var, pool.len(), descriptor.name);
                self.keys.insert(descriptor.name.to_string(), pool);
            }
        }
    }

    /// Credential pools keyed by lowercase source name, blank entries dropped.
    pub fn credentials(&self) -> Keys {
        self.keys
            .iter()
            .filter_map(|(name, pool)| {
                let pool: Vec<String> = pool
                    .iter()
                    .map(|k| k.trim())
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect();
                (!pool.is_empty()).then(|| (name.to_lowercase(), pool))
            })
            .collect()
    }

    /// Registered sources that have a credential field in this file.
    pub fn credential_sources(&self) -> Vec<String> {
        self.keys
            .keys()
            .filter_map(|name| find_descriptor(name))
            .map(|d| d.name.to_string())
            .collect()
    }

    /// Orchestrator input: command-line selection wins over the file's list.
    pub fn finder_options(&self, use_sources: &[String], exclude: &[String], session: SessionConfig) -> FinderOptions {
        let sources_to_use = if use_sources.is_empty() {
            self.sources.clone()
        } else {
            use_sources.to_vec()
        };

        FinderOptions {
            sources_to_use,
            sources_to_exclude: exclude.to_vec(),
            keys: self.credentials(),
            session,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).with_context(|| "Failed to serialize provider config".to_string())
    }

    /// Writes the config, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_yaml()?).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// `$HOME/.config/subscout/provider-config.yaml`, or a relative path
/// when `HOME` is unset.
pub fn default_config_path() -> PathBuf {
    let base = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    base.join(".config").join("subscout").join("provider-config.yaml")
}
