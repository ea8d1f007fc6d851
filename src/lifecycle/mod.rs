//! Layered lifecycle state machines over the token stream.
//!
//! Three cooperating machines track each shell-stack level: the prompt
//! machine, the command machine, and the shell machine (the stack
//! itself). All are purely reactive to tokens; subshell boundaries are
//! decided by the fingerprint engine.

mod fingerprint;
mod machine;
mod stack;

pub use fingerprint::{classify, Classification, Fingerprint, SpawnEvidence};
pub use machine::{Analyzer, CommandState};
pub use stack::{Shell, ShellStack};
