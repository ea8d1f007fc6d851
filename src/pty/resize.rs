use std::io;
use std::thread;

use crate::pty::session::SharedMaster;
use crate::term::window_size;

#[cfg(unix)]
use portable_pty::PtySize;
#[cfg(unix)]
use signal_hook::consts::signal::SIGWINCH;
#[cfg(unix)]
use signal_hook::iterator::Signals;

/// Watches SIGWINCH and propagates the real terminal's dimensions onto
/// the pty slave. Bursts coalesce: pending signals collapse into one
/// query of the current size, and a size equal to the last applied one
/// is skipped.
pub struct ResizeWatcher {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    #[cfg(unix)]
    thread: thread::JoinHandle<()>,
}

impl ResizeWatcher {
    pub fn start(master: SharedMaster) -> io::Result<Option<Self>> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGWINCH])?;
            let handle = signals.handle();
            let thread = thread::spawn(move || {
                let mut applied: Option<(u16, u16)> = None;
                for _ in signals.forever() {
                    let size = window_size();
                    if !needs_apply(applied, size) {
                        continue;
                    }
                    let (cols, rows) = size;
                    let result = master.lock().resize(PtySize {
                        rows,
                        cols,
                        pixel_width: 0,
                        pixel_height: 0,
                    });
                    match result {
                        // A failed resize only costs rendering fidelity.
                        Err(err) => tracing::warn!(error = %err, "pty resize failed"),
                        Ok(()) => applied = Some(size),
                    }
                }
            });
            return Ok(Some(Self { handle, thread }));
        }

        #[cfg(not(unix))]
        {
            let _ = master;
            Ok(None)
        }
    }

    pub fn stop(self) {
        #[cfg(unix)]
        {
            self.handle.close();
            let _ = self.thread.join();
        }
    }
}

/// A size equal to the last applied one is a no-op; only changes reach
/// the pty.
fn needs_apply(applied: Option<(u16, u16)>, size: (u16, u16)) -> bool {
    applied != Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_size_is_applied_once() {
        let mut applied = None;
        let mut applications = 0;
        for size in [(80, 24), (80, 24), (100, 40), (100, 40), (100, 40)] {
            if needs_apply(applied, size) {
                applications += 1;
                applied = Some(size);
            }
        }
        assert_eq!(applications, 2);
    }
}
