//! Database configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for [`Database::open`](super::Database::open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Threads in the commit-time validation pool. `0` uses one per core.
    pub validation_threads: usize,
    /// Create the abstract root types when opening.
    pub bootstrap: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            validation_threads: 0,
            bootstrap: true,
        }
    }
}

impl DatabaseConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_take_defaults() {
        let config = DatabaseConfig::from_toml_str("validation_threads = 2").unwrap();
        assert_eq!(config.validation_threads, 2);
        assert!(config.bootstrap);
        assert_eq!(DatabaseConfig::from_toml_str("").unwrap(), DatabaseConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = DatabaseConfig::from_toml_str("threads = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bootstrap = false").unwrap();
        let config = DatabaseConfig::from_file(file.path()).unwrap();
        assert!(!config.bootstrap);

        let missing = DatabaseConfig::from_file(Path::new("/nonexistent/conceptdb.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn toml_round_trip() {
        let config = DatabaseConfig {
            validation_threads: 4,
            bootstrap: false,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(DatabaseConfig::from_toml_str(&text).unwrap(), config);
    }
}
