//! PTY session management.

mod resize;
mod session;

pub use resize::ResizeWatcher;
pub use session::{write_retrying, PtySession, SharedMaster};
