//! Layered configuration file resolution.
//!
//! Configuration files are loaded from two levels with increasing priority:
//!
//! 1. **User** - `{config_dir}/ralph-loop/config.toml`
//! 2. **Project** - `.ralph-loop.toml` in the working directory
//!
//! Tables are deep-merged, so a project file only needs the keys it
//! overrides. Command-line flags and environment variables are applied on
//! top by the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::config::ConfigLoader;
//! use std::path::Path;
//!
//! let (file_config, sources) = ConfigLoader::new().load_with_sources(Path::new("."))?;
//! ```

use super::FileConfig;
use crate::error::{LoopError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project-level config file.
pub const PROJECT_CONFIG_FILE: &str = ".ralph-loop.toml";

// ============================================================================
// Configuration Level
// ============================================================================

/// Configuration level in the inheritance hierarchy.
///
/// # Example
///
/// ```
/// use ralph_loop::config::ConfigLevel;
///
/// assert!(ConfigLevel::User < ConfigLevel::Project);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLevel {
    /// User-specific configuration (lowest priority).
    User,
    /// Project-specific configuration.
    Project,
}

impl std::fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLevel::User => write!(f, "user"),
            ConfigLevel::Project => write!(f, "project"),
        }
    }
}

/// A config file that contributed to the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub level: ConfigLevel,
    pub path: PathBuf,
}

// ============================================================================
// Config Loader
// ============================================================================

/// Configuration loader with inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader using the platform's user config directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_config_path: Self::default_user_path(),
        }
    }

    /// The default user config path, `{config_dir}/ralph-loop/config.toml`,
    /// or `None` if the platform has no config directory.
    #[must_use]
    pub fn default_user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ralph-loop").join("config.toml"))
    }

    /// Project config path inside `project_dir`.
    #[must_use]
    pub fn project_path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_CONFIG_FILE)
    }

    /// Set a custom user config path.
    #[must_use]
    pub fn with_user_config_path(mut self, path: PathBuf) -> Self {
        self.user_config_path = Some(path);
        self
    }

    /// Ignore any user-level config file.
    #[must_use]
    pub fn without_user_config(mut self) -> Self {
        self.user_config_path = None;
        self
    }

    /// Get the current user config path.
    #[must_use]
    pub fn user_config_path(&self) -> Option<&PathBuf> {
        self.user_config_path.as_ref()
    }

    /// Load and merge the user and project config files.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Config`] if a config file exists but cannot be
    /// read or parsed. Missing files are ignored.
    pub fn load(&self, project_dir: &Path) -> Result<FileConfig> {
        self.load_with_sources(project_dir).map(|(config, _)| config)
    }

    /// Load the merged config and list the files that contributed to it.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Config`] if a config file exists but cannot be
    /// read or parsed.
    pub fn load_with_sources(&self, project_dir: &Path) -> Result<(FileConfig, Vec<ConfigSource>)> {
        let mut sources = Vec::new();
        let mut merged = toml::Table::new();

        if let Some(ref user_path) = self.user_config_path {
            if load_and_merge(&mut merged, user_path)? {
                sources.push(ConfigSource {
                    level: ConfigLevel::User,
                    path: user_path.clone(),
                });
            }
        }

        let project_path = Self::project_path(project_dir);
        if load_and_merge(&mut merged, &project_path)? {
            sources.push(ConfigSource {
                level: ConfigLevel::Project,
                path: project_path,
            });
        }

        for source in &sources {
            debug!("Loaded {} config from {}", source.level, source.path.display());
        }

        let config: FileConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e| LoopError::config(format!("Invalid configuration: {e}")))?;
        Ok((config, sources))
    }
}

/// Load a config file and merge it into the accumulated table.
///
/// Returns true if the file was loaded, false if it doesn't exist.
fn load_and_merge(accumulated: &mut toml::Table, path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        LoopError::config_with_path(format!("Failed to read config: {e}"), path.to_path_buf())
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| {
        LoopError::config_with_path(
            format!("Failed to parse {}: {e}", path.display()),
            path.to_path_buf(),
        )
    })?;

    deep_merge(accumulated, table);
    Ok(true)
}

/// Deep merge two tables, with `child` overriding `parent`.
fn deep_merge(parent: &mut toml::Table, child: toml::Table) {
    for (key, child_value) in child {
        match (parent.get_mut(&key), child_value) {
            (Some(toml::Value::Table(parent_table)), toml::Value::Table(child_table)) => {
                deep_merge(parent_table, child_table);
            }
            (_, child_value) => {
                parent.insert(key, child_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader_with_user(dir: &TempDir, content: Option<&str>) -> ConfigLoader {
        let user_path = dir.path().join("user").join("config.toml");
        if let Some(content) = content {
            std::fs::create_dir_all(user_path.parent().unwrap()).unwrap();
            std::fs::write(&user_path, content).unwrap();
        }
        ConfigLoader::new().with_user_config_path(user_path)
    }

    #[test]
    fn test_no_files_yields_empty_config() {
        let dir = TempDir::new().unwrap();
        let (config, sources) = loader_with_user(&dir, None)
            .load_with_sources(dir.path())
            .unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(sources.is_empty());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = TempDir::new().unwrap();
        let loader = loader_with_user(&dir, Some("model = \"user-agent\"\nmax_iterations = 5\n"));
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "model = \"project-agent\"\n",
        )
        .unwrap();

        let (config, sources) = loader.load_with_sources(dir.path()).unwrap();
        assert_eq!(config.model.as_deref(), Some("project-agent"));
        assert_eq!(config.max_iterations, Some(5));
        assert_eq!(
            sources.iter().map(|s| s.level).collect::<Vec<_>>(),
            vec![ConfigLevel::User, ConfigLevel::Project]
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "model = [unclosed").unwrap();

        let err = ConfigLoader::new()
            .without_user_config()
            .load(dir.path())
            .unwrap_err();
        match err {
            LoopError::Config { path, .. } => {
                assert_eq!(path, Some(dir.path().join(PROJECT_CONFIG_FILE)));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "max_iterations = \"ten\"\n",
        )
        .unwrap();

        let err = ConfigLoader::new()
            .without_user_config()
            .load(dir.path())
            .unwrap_err();
        assert!(matches!(err, LoopError::Config { .. }));
    }

    #[test]
    fn test_deep_merge_nested_tables() {
        let mut parent: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let child: toml::Table = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        deep_merge(&mut parent, child);

        let a = parent["a"].as_table().unwrap();
        assert_eq!(a["x"].as_integer(), Some(1));
        assert_eq!(a["y"].as_integer(), Some(3));
        assert_eq!(a["z"].as_integer(), Some(4));
    }
}
