//! TOML configuration.

mod loader;

pub use loader::ConfigError;

use regex::Regex;
use serde::Deserialize;

/// Configuration for a wrapped session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of actions and lifecycle events retained in memory.
    pub history_size: usize,
    /// Extra prompt patterns, keyed by the wrapped command.
    pub prompt_rules: Vec<PromptRule>,
    pub log: LogConfig,
}

/// A prompt pattern that applies when the wrapped command matches
/// `command`. `pattern` is matched against the text of the current
/// screen line with escape sequences stripped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptRule {
    pub command: String,
    pub pattern: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_size: 1000,
            prompt_rules: vec![PromptRule {
                command: "zsh".to_string(),
                pattern: r"[%#] $".to_string(),
                description: "zsh default prompt".to_string(),
            }],
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Compile the prompt rules that apply to `command` (matched against
    /// the executable's basename).
    pub fn rules_for(&self, command: &str) -> Result<Vec<Regex>, ConfigError> {
        let name = std::path::Path::new(command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(command);

        let mut rules = Vec::new();
        for rule in &self.prompt_rules {
            let command_re = compile(&rule.command)?;
            if !command_re.is_match(name) {
                continue;
            }
            rules.push(compile(&rule.pattern)?);
        }
        Ok(rules)
    }

    /// Validate without building: every rule must compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.prompt_rules {
            compile(&rule.command)?;
            compile(&rule.pattern)?;
        }
        if self.history_size == 0 {
            return Err(ConfigError::Validation {
                message: "history_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_size, 1000);
    }

    #[test]
    fn rules_match_on_basename() {
        let config = Config::default();
        assert_eq!(
            config.rules_for("/usr/bin/zsh").map(|r| r.len()).ok(),
            Some(1)
        );
        assert_eq!(config.rules_for("bash").map(|r| r.len()).ok(), Some(0));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let config = Config {
            prompt_rules: vec![PromptRule {
                command: "sh".to_string(),
                pattern: "([unclosed".to_string(),
                description: String::new(),
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
