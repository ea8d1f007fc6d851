//! Shell fingerprinting heuristics.
//!
//! A fingerprint is derived from the text of a prompt line and compared
//! against the shell stack to decide whether a prompt belongs to the
//! current shell, a new subshell, or an ancestor we have returned to.
//! The matcher is deliberately conservative: a wrong `NewChild` corrupts
//! the stack for the rest of the session, while a missed one only
//! mislabels nesting depth.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lifecycle::stack::{Shell, ShellStack};

/// Trailing segment that marks the end of a typical interactive prompt.
/// The trailing space is required: a bare `$` or `%` at end of line is
/// far more often ordinary output than a prompt.
static PROMPT_TERMINATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([$#%>❯] )$").expect("builtin prompt terminator regex"));

/// Longest line still plausibly a prompt.
const MAX_PROMPT_LEN: usize = 256;

/// Derived signature of one shell context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint {
    /// Leading whitespace-delimited word of the prompt with the
    /// terminator stripped — typically `user@host`. Empty for bare
    /// prompts like `"$ "`.
    pub prefix: String,
    /// Trailing terminator segment, e.g. `"$ "`.
    pub suffix: String,
    /// Full prompt line as last observed (the middle portion may drift
    /// with the working directory).
    pub full: String,
    /// Window title from the most recent OSC title sequence, if any.
    pub title: Option<String>,
}

impl Fingerprint {
    /// Derive a candidate fingerprint from one screen line. Returns
    /// `None` when the line does not look like a prompt. `rules` are the
    /// configured prompt patterns applicable to the wrapped command.
    pub fn derive(line: &str, rules: &[Regex]) -> Option<Self> {
        if line.is_empty() || line.len() > MAX_PROMPT_LEN {
            return None;
        }

        let matched_rule = rules.iter().any(|rule| rule.is_match(line));
        let terminator = PROMPT_TERMINATOR
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if !matched_rule && terminator.is_none() {
            return None;
        }

        let suffix = terminator.unwrap_or_default();
        let body = line
            .strip_suffix(suffix.as_str())
            .unwrap_or(line)
            .trim_end();
        let prefix = body
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        Some(Self {
            prefix,
            suffix,
            full: line.to_string(),
            title: None,
        })
    }

    /// Whether two fingerprints plausibly belong to the same shell. The
    /// middle of the prompt is ignored so a changing working directory
    /// does not read as a shell boundary.
    pub fn same_shell(&self, other: &Fingerprint) -> bool {
        self.prefix == other.prefix && self.suffix == other.suffix
    }

    /// Human-readable label for logs and action records.
    pub fn label(&self) -> &str {
        &self.full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The prompt belongs to the shell currently on top of the stack.
    Same,
    /// The prompt announces a nested shell: push a new level.
    NewChild,
    /// The prompt matches an ancestor: pop back to that depth.
    ReturnToAncestor(usize),
}

/// Optional out-of-band evidence from the host environment that a child
/// process was spawned since the previous prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnEvidence {
    #[default]
    Unknown,
    Spawned,
}

/// Decide how a freshly observed prompt relates to the shell stack.
///
/// Ambiguous candidates (a bare prompt with no stable prefix that matches
/// nothing on the stack) default to `Same`: false subshell detection is
/// the unrecoverable failure mode.
pub fn classify(
    candidate: &Fingerprint,
    stack: &ShellStack,
    evidence: SpawnEvidence,
) -> Classification {
    let top = stack.top();
    let Some(current) = top.fingerprint() else {
        // First prompt at this level establishes the fingerprint.
        return Classification::Same;
    };

    if candidate.same_shell(current) {
        return Classification::Same;
    }

    // Nearest matching ancestor wins.
    for depth in (0..stack.depth()).rev() {
        if let Some(ancestor) = stack.get(depth).and_then(Shell::fingerprint) {
            if candidate.same_shell(ancestor) {
                return Classification::ReturnToAncestor(depth);
            }
        }
    }

    if candidate.prefix.is_empty() && evidence != SpawnEvidence::Spawned {
        tracing::debug!(
            candidate = %candidate.full,
            current = %current.full,
            "low-confidence prompt change, keeping current shell"
        );
        return Classification::Same;
    }

    Classification::NewChild
}
