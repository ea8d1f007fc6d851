use std::path::PathBuf;

use clap::Parser;

/// Transparent shell wrapper that lexes the session in real time.
#[derive(Debug, Parser)]
#[command(name = "sheath", version, about)]
pub struct Cli {
    /// Path to a config file (discovered automatically when omitted).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Command to wrap with its arguments; defaults to $SHELL.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Resolve the command to wrap: the trailing arguments, or the
    /// user's shell.
    pub fn wrap_command(&self) -> (String, Vec<String>) {
        wrap_command_from(&self.command)
    }
}

fn wrap_command_from(args: &[String]) -> (String, Vec<String>) {
    match args.split_first() {
        Some((command, rest)) => (command.clone(), rest.to_vec()),
        None => {
            let shell = std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string());
            (shell, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_command_with_args() {
        let args = vec![
            "bash".to_string(),
            "--norc".to_string(),
            "-i".to_string(),
        ];
        let (command, rest) = wrap_command_from(&args);
        assert_eq!(command, "bash");
        assert_eq!(rest, vec!["--norc".to_string(), "-i".to_string()]);
    }

    #[test]
    fn empty_command_falls_back_to_shell() {
        let (command, rest) = wrap_command_from(&[]);
        assert!(!command.is_empty());
        assert!(rest.is_empty());
    }

    #[test]
    fn cli_parses_config_flag() {
        let cli = Cli::parse_from(["sheath", "--config", "/tmp/sheath.toml", "zsh", "-l"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sheath.toml")));
        assert_eq!(cli.command, vec!["zsh".to_string(), "-l".to_string()]);
    }
}
