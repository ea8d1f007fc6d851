use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;

const CONFIG_FILE: &str = "sheath.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config validation failed: {message}")]
    Validation { message: String },
}

impl Config {
    /// Returns the user-level configuration path,
    /// `~/.config/sheath/config.toml` on Unix via `dirs::config_dir()`.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("sheath").join("config.toml")
    }

    /// Find a config file. Preference order: `sheath.toml` in the
    /// current working directory, then the user-level path.
    pub fn find() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        let user = Self::config_path();
        user.exists().then_some(user)
    }

    /// Load configuration.
    ///
    /// - With an explicit `path`, the file must exist and parse.
    /// - Otherwise the discovered file is used, falling back to
    ///   `Config::default()` when none exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::find() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
history_size = 42

[[prompt_rules]]
command = "bash"
pattern = "\\$ $"
description = "bash default"

[log]
level = "debug"
"#
        )
        .expect("write config");

        let config = Config::load(Some(file.path())).expect("load config");
        assert_eq!(config.history_size, 42);
        assert_eq!(config.prompt_rules.len(), 1);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.rules_for("bash").map(|r| r.len()).ok(), Some(1));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/sheath.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn bad_pattern_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[[prompt_rules]]
command = "sh"
pattern = "([unclosed"
"#
        )
        .expect("write config");

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Pattern { .. })));
    }
}
