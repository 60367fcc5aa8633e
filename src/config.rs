//! Global configuration for bmlquery

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global bmlquery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database holding the catalog and saved queries
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Schema file imported by `load-schema` when no file is given
    #[serde(default)]
    pub schema: Option<PathBuf>,

    /// Tracing filter, e.g. "bmlq=debug"
    #[serde(default)]
    pub log: Option<String>,
}

impl Config {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Get default config file path
    /// Checks ~/.config/bmlquery/config.toml first (XDG style),
    /// then falls back to OS-specific location
    pub fn default_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("bmlquery").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bmlquery")
            .join("config.toml")
    }

    /// Database path, falling back to the per-user data directory
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bmlquery")
                .join("bmlquery.db")
        })
    }

    /// Create default config file if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        Self::create_default_at(&Self::default_path())
    }

    pub fn create_default_at(config_path: &Path) -> Result<PathBuf> {
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let default_config = r#"# bmlquery configuration

# SQLite database for the entity catalog and saved queries
# database = "/path/to/bmlquery.db"

# Schema file imported by `bmlq load-schema` when no file is given
# schema = "/path/to/DBSchemaFile.cdm"

# Log filter (overridden by RUST_LOG and -v)
# log = "bmlq=info"
"#;

        std::fs::write(config_path, default_config)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

        Ok(config_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses_to_defaults() {
        let dir = tempdir().unwrap();
        let path = Config::create_default_at(&dir.path().join("bmlquery").join("config.toml")).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.database.is_none());
        assert!(config.log.is_none());
    }

    #[test]
    fn test_create_default_keeps_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database = \"/tmp/q.db\"\n").unwrap();

        Config::create_default_at(&path).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/q.db"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
