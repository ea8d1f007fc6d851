//! sheath: a transparent shell wrapper that lexes the session in real time.
//!
//! The wrapper spawns the user's shell on a pty slave, mirrors every byte
//! between the real terminal and the pty master, and feeds a copy of the
//! output stream through a streaming ANSI tokenizer and a set of layered
//! lifecycle state machines. The result is an ordered event feed that
//! classifies the session into prompt, command-input, command-output and
//! shell-boundary regions — including subshell enter/exit detection via
//! prompt fingerprinting.

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lex;
pub mod lifecycle;
pub mod pty;
pub mod relay;
pub mod term;
pub mod trace;
