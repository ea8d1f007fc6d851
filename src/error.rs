use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can abort a wrapped session.
///
/// Resource errors (`PtyAllocate`, `Spawn`) are reported before the real
/// terminal is switched to raw mode, so a failed wrap attempt leaves the
/// user's terminal untouched.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The wrapper needs an interactive controlling terminal to proxy.
    #[error("standard input is not a terminal")]
    NotATty,

    #[error("failed to allocate pty: {0}")]
    PtyAllocate(#[source] anyhow::Error),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to resize pty: {0}")]
    Resize(#[source] anyhow::Error),

    #[error("terminal mode error: {0}")]
    Terminal(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
