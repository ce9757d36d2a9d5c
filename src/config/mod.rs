//! Configuration management for `branchdef`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::define::OutputFormat;
use crate::core::plugin::PluginOptions;
use crate::core::watcher::WatcherConfig;

/// Directory holding project-local configuration.
pub const PROJECT_CONFIG_DIR: &str = ".branchdef";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin options.
    pub plugin: PluginOptions,

    /// Git invocation.
    pub git: GitConfig,

    /// File watching.
    pub watch: WatcherConfig,

    /// Rendered output.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration for a project directory.
    ///
    /// Loads global config first, then merges `.branchdef/config.toml` from
    /// `project_dir` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed.
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let global_path = Self::config_path()?;
        Self::load_from(&global_path, &Self::project_config_path(project_dir))
    }

    /// Load from explicit global and project paths; missing files are skipped.
    ///
    /// Every key present in the project file overrides the global one, even
    /// when it restates the default (`silent = false`).
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(global_path: &Path, project_path: &Path) -> anyhow::Result<Self> {
        let mut table = if global_path.exists() {
            Self::read(global_path)?
        } else {
            toml::Table::new()
        };

        if project_path.exists() {
            merge_tables(&mut table, Self::read(project_path)?);
        }

        Ok(toml::Value::Table(table).try_into::<Self>()?)
    }

    /// Read one file as a table, checking it against the config schema.
    fn read(path: &Path) -> anyhow::Result<toml::Table> {
        let contents = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;

        toml::Value::Table(table.clone())
            .try_into::<Self>()
            .map_err(|e| anyhow::anyhow!("invalid config in {}: {e}", path.display()))?;

        Ok(table)
    }

    /// Get the project-local configuration file path.
    #[must_use]
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_CONFIG_DIR).join("config.toml")
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/branchdef/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("branchdef"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("branchdef"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("branchdef"))
    }
}

/// Overlay `other` onto `base`; nested tables merge key by key.
fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        if let toml::Value::Table(overlay) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, overlay);
                continue;
            }
            base.insert(key, toml::Value::Table(overlay));
        } else {
            base.insert(key, value);
        }
    }
}

/// Git invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Git executable to run.
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

/// Rendered output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format.
    pub format: OutputFormat,

    /// File to write; stdout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
