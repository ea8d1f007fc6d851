//! Prompt and command state machines driving the event feed.
//!
//! The analyzer is the single consumer of the token stream. It keeps the
//! text of the current screen line, stages raw bytes until a line
//! resolves to prompt or output, and reacts to prompt detection by
//! consulting the fingerprint engine for shell-boundary decisions.

use std::time::SystemTime;

use regex::Regex;
use uuid::Uuid;

use crate::actions::{ActionLog, ActionRecord};
use crate::events::{EventKind, EventSink, LifecycleEvent};
use crate::lex::{EscapeKind, EscapeSeq, Token};
use crate::lifecycle::fingerprint::{classify, Classification, Fingerprint, SpawnEvidence};
use crate::lifecycle::stack::ShellStack;

const BS: u8 = 0x08;
const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Cap on the tracked screen line; anything longer cannot be a prompt.
const MAX_LINE: usize = 1024;

/// Cap on captured bytes per cycle buffer. Passthrough to the real
/// terminal is unaffected; only the in-memory capture stops growing.
const MAX_CAPTURE: usize = 1 << 20;

fn capture_byte(buf: &mut Vec<u8>, byte: u8) {
    if buf.len() < MAX_CAPTURE {
        buf.push(byte);
    }
}

fn capture_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    let room = MAX_CAPTURE.saturating_sub(buf.len());
    buf.extend_from_slice(&bytes[..bytes.len().min(room)]);
}

/// Command-machine states for one shell level. Exactly one holds at any
/// token boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    InputActive,
    OutputActive,
}

pub struct Analyzer {
    stack: ShellStack,
    sink: EventSink,
    actions: ActionLog,
    /// Configured prompt patterns applicable to the wrapped command.
    rules: Vec<Regex>,
    /// Escape-stripped text of the current screen line.
    line: Vec<u8>,
    /// Raw bytes of the current line, staged until the line resolves to
    /// prompt render or command output.
    staged: Vec<u8>,
    /// Total bytes consumed from the output stream.
    offset: u64,
    pending_title: Option<String>,
    evidence: SpawnEvidence,
}

impl Analyzer {
    pub fn new(sink: EventSink, actions: ActionLog, rules: Vec<Regex>) -> Self {
        Self {
            stack: ShellStack::new(),
            sink,
            actions,
            rules,
            line: Vec::new(),
            staged: Vec::new(),
            offset: 0,
            pending_title: None,
            evidence: SpawnEvidence::Unknown,
        }
    }

    pub fn stack(&self) -> &ShellStack {
        &self.stack
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Record out-of-band evidence that a child process was spawned; it
    /// biases the next prompt classification toward `NewChild`.
    pub fn note_spawn(&mut self) {
        self.evidence = SpawnEvidence::Spawned;
    }

    pub fn consume(&mut self, tokens: &[Token]) {
        for token in tokens {
            self.handle(token);
        }
    }

    pub fn handle(&mut self, token: &Token) {
        let at = self.offset;
        self.offset += token.len() as u64;
        match token {
            Token::Text(bytes) => self.on_text(bytes, at),
            Token::Control(byte) => self.on_control(*byte, at),
            Token::Escape(seq) => self.on_escape(seq),
        }
    }

    /// End of stream: flush staged bytes and close any open command
    /// cycle so the final action is captured. A trailing idle prompt
    /// produces no further events.
    pub fn finish(&mut self) {
        let at = self.offset;
        let staged = std::mem::take(&mut self.staged);
        if !staged.is_empty() {
            let top = self.stack.top_mut();
            if top.prompt_active() {
                capture_bytes(&mut top.cycle.prompt, &staged);
            } else {
                match top.command_state() {
                    CommandState::InputActive => capture_bytes(&mut top.cycle.input, &staged),
                    CommandState::OutputActive => capture_bytes(&mut top.cycle.output, &staged),
                    CommandState::Idle => capture_bytes(&mut top.cycle.prompt, &staged),
                }
            }
        }
        self.close_cycle(at);
    }

    /// Text is examined byte by byte: prompt and input can share one
    /// token when a chunk arrives late, and the detection point decides
    /// where the split falls.
    fn on_text(&mut self, bytes: &[u8], at: u64) {
        for (i, &byte) in bytes.iter().enumerate() {
            let at = at + i as u64;
            if self.stack.top().prompt_active() {
                self.push_line(byte);
                if incomplete_utf8(&self.line) {
                    // Mid-character; absorb and decide when it completes.
                    capture_byte(&mut self.stack.top_mut().cycle.prompt, byte);
                    continue;
                }
                let line = String::from_utf8_lossy(&self.line).into_owned();
                match Fingerprint::derive(&line, &self.rules) {
                    Some(mut fp) => {
                        // Still promptish: one more segment of a
                        // multi-part prompt render.
                        fp.title = self.pending_title.clone();
                        let top = self.stack.top_mut();
                        capture_byte(&mut top.cycle.prompt, byte);
                        top.learn(fp);
                    }
                    None => {
                        // First echoed input byte ends the prompt.
                        self.emit(EventKind::PromptEnd, at);
                        self.emit(EventKind::CommandInputBegin, at);
                        let top = self.stack.top_mut();
                        top.cycle.prompt_active = false;
                        top.cycle.command = CommandState::InputActive;
                        top.cycle.started = SystemTime::now();
                        capture_byte(&mut top.cycle.input, byte);
                    }
                }
                continue;
            }

            match self.stack.top().command_state() {
                CommandState::InputActive => {
                    self.push_line(byte);
                    capture_byte(&mut self.stack.top_mut().cycle.input, byte);
                }
                CommandState::OutputActive | CommandState::Idle => {
                    self.push_line(byte);
                    capture_byte(&mut self.staged, byte);
                    if !incomplete_utf8(&self.line) {
                        self.detect_prompt(at);
                    }
                }
            }
        }
    }

    fn on_control(&mut self, byte: u8, at: u64) {
        if self.stack.top().prompt_active() {
            match byte {
                // The echoed carriage return of Enter on an empty command
                // line opens (and the following LF closes) input.
                CR => {
                    self.emit(EventKind::PromptEnd, at);
                    self.emit(EventKind::CommandInputBegin, at);
                    let top = self.stack.top_mut();
                    top.cycle.prompt_active = false;
                    top.cycle.command = CommandState::InputActive;
                    top.cycle.started = SystemTime::now();
                    capture_byte(&mut top.cycle.input, byte);
                }
                // A bare LF at the prompt is a full degenerate cycle.
                LF => {
                    self.emit(EventKind::PromptEnd, at);
                    self.emit(EventKind::CommandInputBegin, at);
                    self.emit(EventKind::CommandInputEnd, at);
                    self.emit(EventKind::CommandOutputBegin, at);
                    let top = self.stack.top_mut();
                    top.cycle.prompt_active = false;
                    top.cycle.command = CommandState::OutputActive;
                    top.cycle.started = SystemTime::now();
                    capture_byte(&mut top.cycle.input, byte);
                }
                _ => capture_byte(&mut self.stack.top_mut().cycle.prompt, byte),
            }
            self.track_line_control(byte);
            return;
        }

        match self.stack.top().command_state() {
            CommandState::InputActive => {
                capture_byte(&mut self.stack.top_mut().cycle.input, byte);
                if byte == LF {
                    // The echoed newline terminates command input.
                    self.emit(EventKind::CommandInputEnd, at);
                    self.emit(EventKind::CommandOutputBegin, at);
                    self.stack.top_mut().cycle.command = CommandState::OutputActive;
                }
            }
            CommandState::OutputActive | CommandState::Idle => {
                capture_byte(&mut self.staged, byte);
                if byte == LF || byte == CR {
                    self.flush_staged();
                }
            }
        }
        self.track_line_control(byte);
    }

    fn on_escape(&mut self, seq: &EscapeSeq) {
        {
            let top = self.stack.top_mut();
            if top.prompt_active() {
                capture_bytes(&mut top.cycle.prompt, &seq.raw);
            } else {
                match top.command_state() {
                    CommandState::InputActive => capture_bytes(&mut top.cycle.input, &seq.raw),
                    CommandState::OutputActive | CommandState::Idle => {
                        capture_bytes(&mut self.staged, &seq.raw)
                    }
                }
            }
        }

        match seq.kind {
            EscapeKind::Title => {
                self.pending_title = Some(String::from_utf8_lossy(&seq.payload).into_owned());
            }
            // Erases and absolute cursor moves start a fresh line as far
            // as prompt matching is concerned.
            EscapeKind::Erase => self.line.clear(),
            EscapeKind::Cursor if matches!(seq.final_byte, b'G' | b'H' | b'f') => {
                self.line.clear()
            }
            _ => {}
        }
    }

    fn push_line(&mut self, byte: u8) {
        if self.line.len() < MAX_LINE {
            self.line.push(byte);
        }
    }

    fn track_line_control(&mut self, byte: u8) {
        match byte {
            LF | CR => self.line.clear(),
            BS => {
                self.line.pop();
            }
            _ => {}
        }
    }

    /// Move staged bytes of a completed line into the buffer they belong
    /// to: command output while a command runs, prompt preamble before
    /// the first prompt.
    fn flush_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        let top = self.stack.top_mut();
        match top.command_state() {
            CommandState::OutputActive => capture_bytes(&mut top.cycle.output, &staged),
            _ => capture_bytes(&mut top.cycle.prompt, &staged),
        }
    }

    /// Check whether the current line has become a prompt, and if so run
    /// the shell-boundary decision.
    fn detect_prompt(&mut self, at: u64) {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        let Some(mut candidate) = Fingerprint::derive(&line, &self.rules) else {
            return;
        };
        candidate.title = self.pending_title.clone();

        match classify(&candidate, &self.stack, self.evidence) {
            Classification::Same => {
                self.close_cycle(at);
            }
            Classification::NewChild => {
                self.close_cycle(at);
                self.stack.push(None);
                self.emit(EventKind::ShellEnter(candidate.clone()), at);
            }
            Classification::ReturnToAncestor(depth) => {
                self.close_cycle(at);
                while self.stack.depth() > depth {
                    let Some(popped) = self.stack.pop() else {
                        break;
                    };
                    let fp = popped.fingerprint().cloned().unwrap_or_default();
                    self.emit_at_depth(EventKind::ShellExit(fp), at, popped.depth());
                }
            }
        }
        self.evidence = SpawnEvidence::Unknown;
        self.begin_prompt(candidate, at);
    }

    /// Close the top level's open command cycle, emitting the matching
    /// end events and finalizing the action record.
    fn close_cycle(&mut self, at: u64) {
        match self.stack.top().command_state() {
            CommandState::Idle => {}
            CommandState::InputActive => {
                // Input never saw its newline (the stream moved on); end
                // the cycle through a degenerate output phase.
                self.emit(EventKind::CommandInputEnd, at);
                self.emit(EventKind::CommandOutputBegin, at);
                self.emit(EventKind::CommandOutputEnd, at);
                self.finalize_action();
            }
            CommandState::OutputActive => {
                self.emit(EventKind::CommandOutputEnd, at);
                self.finalize_action();
            }
        }
    }

    fn finalize_action(&mut self) {
        let depth = self.stack.depth();
        let top = self.stack.top_mut();
        let shell = top
            .fingerprint()
            .map(|fp| fp.label().to_string())
            .unwrap_or_default();
        let cycle = &mut top.cycle;
        cycle.command = CommandState::Idle;
        let elapsed = SystemTime::now()
            .duration_since(cycle.started)
            .unwrap_or_default();
        let record = ActionRecord {
            id: Uuid::new_v4(),
            prompt: std::mem::take(&mut cycle.prompt),
            input: std::mem::take(&mut cycle.input),
            output: std::mem::take(&mut cycle.output),
            started: cycle.started,
            elapsed,
            shell,
            depth,
        };
        self.actions.push(record);
    }

    /// The staged line is a prompt render: adopt it, learn the
    /// fingerprint, and raise `PromptStart`.
    fn begin_prompt(&mut self, candidate: Fingerprint, at: u64) {
        let staged = std::mem::take(&mut self.staged);
        let top = self.stack.top_mut();
        capture_bytes(&mut top.cycle.prompt, &staged);
        top.cycle.prompt_active = true;
        top.learn(candidate);
        self.emit(EventKind::PromptStart, at);
    }

    fn emit(&self, kind: EventKind, offset: u64) {
        self.emit_at_depth(kind, offset, self.stack.depth());
    }

    fn emit_at_depth(&self, kind: EventKind, offset: u64, depth: usize) {
        self.sink.emit(LifecycleEvent {
            kind,
            timestamp: SystemTime::now(),
            offset,
            depth,
        });
    }
}

/// Whether `bytes` ends in the middle of a multi-byte UTF-8 character.
/// Only the tail is examined, so the check is constant-time.
fn incomplete_utf8(bytes: &[u8]) -> bool {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xc0 != 0x80 {
            let needed = match byte {
                0xf0.. => 4,
                0xe0.. => 3,
                0xc0.. => 2,
                _ => return false,
            };
            return needed > back;
        }
    }
    false
}
