//! Project configuration file support for promptloops.
//!
//! Loads configuration from `promptloops.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project-level configuration loaded from `promptloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// `pretty`, `json` or `compact`
    pub log_format: Option<String>,
    /// tracing filter directive, e.g. `info` or `promptloops_core=debug`
    pub log_level: Option<String>,
    /// Append every event as a JSON line to this file
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub refine: RefineSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    /// Path or name of the model CLI
    pub binary: Option<PathBuf>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RefineSection {
    pub max_rounds: Option<usize>,
    /// `full` or `light`
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub db_path: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "promptloops.toml";

/// Rounds of critique-and-rewrite when neither flag nor file sets one
pub const DEFAULT_MAX_ROUNDS: usize = 2;

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Priority: flag > file > default
    pub fn max_rounds(&self, flag: Option<usize>) -> usize {
        flag.or(self.refine.max_rounds).unwrap_or(DEFAULT_MAX_ROUNDS)
    }

    /// Priority: flag > file > None
    pub fn model<'a>(&'a self, flag: Option<&'a str>) -> Option<&'a str> {
        flag.or(self.generator.model.as_deref())
    }

    /// Database location relative to the working directory, if configured
    pub fn db_path(&self, working_dir: &Path) -> Option<PathBuf> {
        self.storage
            .db_path
            .as_deref()
            .map(|p| resolve_path(working_dir, p))
    }

    /// Event log file. Priority: flag > file > None.
    /// Relative paths resolve against the working directory.
    pub fn log_file(&self, flag: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
        flag.or(self.log_file.as_deref())
            .map(|p| resolve_path(working_dir, p))
    }
}

fn resolve_path(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) {
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
log_format = "json"
log_level = "debug"
log_file = "logs/events.jsonl"

[generator]
binary = "/usr/local/bin/claude"
model = "sonnet"
timeout_secs = 90

[refine]
max_rounds = 3
mode = "light"

[storage]
db_path = "runs/promptloops.db"
"#,
        );

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.log_format.as_deref(), Some("json"));
        assert_eq!(config.generator.timeout_secs, Some(90));
        assert_eq!(config.refine.mode.as_deref(), Some("light"));
        assert_eq!(config.max_rounds(None), 3);
        assert_eq!(config.max_rounds(Some(1)), 1);
        assert_eq!(config.model(None), Some("sonnet"));
        assert_eq!(config.model(Some("opus")), Some("opus"));
        assert_eq!(
            config.db_path(dir.path()),
            Some(dir.path().join("runs/promptloops.db"))
        );
        assert_eq!(
            config.log_file(None, dir.path()),
            Some(dir.path().join("logs/events.jsonl"))
        );
    }

    #[test]
    fn test_log_file_flag_wins() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "log_file = \"events.jsonl\"\n");

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        let flag = Path::new("/tmp/override.jsonl");
        assert_eq!(
            config.log_file(Some(flag), dir.path()),
            Some(PathBuf::from("/tmp/override.jsonl"))
        );
        assert!(ProjectConfig::default().log_file(None, dir.path()).is_none());
    }

    #[test]
    fn test_defaults_when_sections_absent() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "log_level = \"warn\"\n");

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_rounds(None), DEFAULT_MAX_ROUNDS);
        assert!(config.db_path(dir.path()).is_none());
        assert!(config.model(None).is_none());
        assert!(config.log_file(None, dir.path()).is_none());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[refine]\nrounds = 3\n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "log_format = \n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
