use crate::planner::SharedDepPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Project-level configuration, loaded from `.repomod/config.toml` under
/// the project root if present, defaulting otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Source file extension, without the leading dot.
    #[serde(default = "default_extension")]
    pub source_extension: String,

    /// Directory names the project walker skips outright, on top of
    /// anything starting with `.`.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Policy applied to shared dependencies during a move when the
    /// caller doesn't pick one explicitly.
    #[serde(default)]
    pub shared_dep_policy: SharedDepPolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_extension: default_extension(),
            excluded_dirs: default_excluded_dirs(),
            shared_dep_policy: SharedDepPolicy::default(),
        }
    }
}

fn default_extension() -> String {
    "py".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    vec![
        "__pycache__".to_string(),
        "node_modules".to_string(),
        ".git".to_string(),
        "venv".to_string(),
        ".venv".to_string(),
    ]
}

impl Config {
    /// Loads config from `<root>/.repomod/config.toml` if it exists, else
    /// returns the default config.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(".repomod").join("config.toml");
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }
        Ok(Self::default())
    }

    /// Loads config from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves config to `<root>/.repomod/config.toml`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(".repomod");
        fs::create_dir_all(&config_dir)?;
        self.save_to_path(&config_dir.join("config.toml"))
    }

    /// Saves config to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_py_extension() {
        let config = Config::default();
        assert_eq!(config.defaults.source_extension, "py");
        assert_eq!(config.defaults.shared_dep_policy, SharedDepPolicy::Reject);
        assert!(config
            .defaults
            .excluded_dirs
            .contains(&"__pycache__".to_string()));
    }

    #[test]
    fn load_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.defaults.source_extension = "pyi".to_string();
        config.defaults.shared_dep_policy = SharedDepPolicy::PullIn;

        config.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(loaded.defaults.source_extension, "pyi");
        assert_eq!(loaded.defaults.shared_dep_policy, SharedDepPolicy::PullIn);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_content = r#"
[defaults]
source_extension = "pyi"
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.defaults.source_extension, "pyi");
        assert_eq!(config.defaults.shared_dep_policy, SharedDepPolicy::Reject);
        assert!(!config.defaults.excluded_dirs.is_empty());
    }

    #[test]
    fn load_without_config_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path()).unwrap();
        assert_eq!(config.defaults.source_extension, "py");
    }
}
