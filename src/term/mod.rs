//! Terminal mode control for the real (controlling) terminal.
//!
//! Raw mode is global process state; it is held through a scoped guard
//! so restoration happens on every exit path, including panics. The pty
//! slave keeps echo enabled, so the user still sees their keystrokes
//! exactly as in an unwrapped terminal.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size as terminal_size};

use crate::error::SessionError;

/// Current terminal dimensions as `(cols, rows)`, with the classic
/// 80x24 fallback when the query fails.
pub fn window_size() -> (u16, u16) {
    terminal_size().unwrap_or((80, 24))
}

/// Scoped raw-mode acquisition.
///
/// Restoration is idempotent: it runs once whether triggered by drop,
/// panic, or an explicit `restore`.
pub struct RawModeGuard {
    restored: Arc<AtomicBool>,
}

impl RawModeGuard {
    pub fn new() -> Result<Self, SessionError> {
        enable_raw_mode().map_err(SessionError::Terminal)?;

        let restored = Arc::new(AtomicBool::new(false));
        let hook_restored = Arc::clone(&restored);
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if !hook_restored.swap(true, Ordering::SeqCst) {
                let _ = disable_raw_mode();
            }
            default_hook(info);
        }));

        Ok(Self { restored })
    }

    /// Explicitly restore the saved mode ahead of drop.
    pub fn restore(&self) {
        if !self.restored.swap(true, Ordering::SeqCst) {
            if let Err(err) = disable_raw_mode() {
                tracing::warn!(error = %err, "failed to restore terminal mode");
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Whether the process is attached to an interactive terminal.
pub fn stdin_is_tty() -> bool {
    use crossterm::tty::IsTty;
    io::stdin().is_tty()
}
