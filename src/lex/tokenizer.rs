//! Byte-level streaming lexer for interleaved text and escape sequences.
//!
//! The lexer never blocks on more input and never drops a byte: a
//! sequence split across read chunks is carried over as pending state,
//! and a malformed sequence is reclassified as plain text with the
//! offending byte replayed from the ground state.

use crate::lex::token::{EscapeKind, EscapeSeq, Token};

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const ST: u8 = 0x9c;
const DEL: u8 = 0x7f;

/// Cap on the bytes a single sequence may collect before the lexer gives
/// up and resyncs. Real sequences are far shorter; an unbounded collector
/// would let a hostile stream pin memory.
const MAX_SEQUENCE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    /// Saw ESC, deciding which sequence family follows.
    EscapeStart,
    Csi,
    Osc,
    /// ESC inside an OSC string — either the start of ST (ESC \) or a
    /// brand new sequence.
    OscEsc,
    Ss3,
}

pub struct Tokenizer {
    state: State,
    /// Printable run accumulated in `Ground`.
    text: Vec<u8>,
    /// Raw bytes of the sequence currently being collected.
    pending: Vec<u8>,
    params: Vec<u16>,
    current_param: Option<u16>,
    intermediates: Vec<u8>,
    payload: Vec<u8>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            text: Vec::new(),
            pending: Vec::new(),
            params: Vec::with_capacity(16),
            current_param: None,
            intermediates: Vec::with_capacity(4),
            payload: Vec::new(),
        }
    }

    /// Lex one chunk. The completed text run is flushed at the end of the
    /// chunk so downstream consumers see input promptly; an unterminated
    /// escape sequence stays pending until the next chunk or `finish`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Token> {
        let mut out = Vec::new();
        for &byte in bytes {
            self.step(byte, &mut out);
        }
        self.flush_text(&mut out);
        out
    }

    /// Flush everything at end of stream. Pending partial-sequence bytes
    /// are reclassified as text so nothing is silently dropped.
    pub fn finish(&mut self) -> Vec<Token> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.text.extend_from_slice(&pending);
        }
        self.state = State::Ground;
        self.flush_text(&mut out);
        out
    }

    fn step(&mut self, byte: u8, out: &mut Vec<Token>) {
        if self.pending.len() >= MAX_SEQUENCE {
            self.resync(byte, out);
            return;
        }

        match self.state {
            State::Ground => self.ground(byte, out),
            State::EscapeStart => self.escape_start(byte, out),
            State::Csi => self.csi(byte, out),
            State::Osc => self.osc(byte, out),
            State::OscEsc => self.osc_esc(byte, out),
            State::Ss3 => self.ss3(byte, out),
        }
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Token>) {
        match byte {
            ESC => {
                self.flush_text(out);
                self.begin_sequence();
            }
            0x00..=0x1f | DEL => {
                self.flush_text(out);
                out.push(Token::Control(byte));
            }
            _ => self.text.push(byte),
        }
    }

    fn escape_start(&mut self, byte: u8, out: &mut Vec<Token>) {
        match byte {
            b'[' => {
                self.pending.push(byte);
                self.state = State::Csi;
            }
            b']' => {
                self.pending.push(byte);
                self.payload.clear();
                self.state = State::Osc;
            }
            b'O' => {
                self.pending.push(byte);
                self.state = State::Ss3;
            }
            0x20..=0x2f => {
                self.pending.push(byte);
                self.intermediates.push(byte);
            }
            0x30..=0x7e => {
                self.pending.push(byte);
                self.emit_simple(byte, out);
            }
            _ => self.resync(byte, out),
        }
    }

    fn csi(&mut self, byte: u8, out: &mut Vec<Token>) {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
                self.pending.push(byte);
            }
            b';' | b':' => {
                self.params.push(self.current_param.take().unwrap_or(0));
                self.pending.push(byte);
            }
            b'?' | b'>' | b'<' | b'=' | 0x20..=0x2f => {
                self.intermediates.push(byte);
                self.pending.push(byte);
            }
            0x40..=0x7e => {
                if let Some(param) = self.current_param.take() {
                    self.params.push(param);
                }
                self.pending.push(byte);
                self.emit_csi(byte, out);
            }
            _ => self.resync(byte, out),
        }
    }

    fn osc(&mut self, byte: u8, out: &mut Vec<Token>) {
        match byte {
            BEL => {
                self.pending.push(byte);
                self.emit_osc(out);
            }
            ESC => {
                self.pending.push(byte);
                self.state = State::OscEsc;
            }
            ST => {
                self.pending.push(byte);
                self.emit_osc(out);
            }
            0x00..=0x1f => self.resync(byte, out),
            _ => {
                self.payload.push(byte);
                self.pending.push(byte);
            }
        }
    }

    fn osc_esc(&mut self, byte: u8, out: &mut Vec<Token>) {
        if byte == b'\\' {
            self.pending.push(byte);
            self.emit_osc(out);
        } else {
            // Not ST: the OSC was never terminated. Reclassify everything
            // up to (but not including) the ESC, then replay ESC + byte as
            // the start of a new sequence.
            let pending = std::mem::take(&mut self.pending);
            self.text.extend_from_slice(&pending[..pending.len() - 1]);
            self.begin_sequence();
            self.step(byte, out);
        }
    }

    fn ss3(&mut self, byte: u8, out: &mut Vec<Token>) {
        match byte {
            0x20..=0x7e => {
                self.pending.push(byte);
                self.flush_text(out);
                let raw = std::mem::take(&mut self.pending);
                self.clear_sequence();
                out.push(Token::Escape(EscapeSeq {
                    kind: EscapeKind::Ss3,
                    params: Vec::new(),
                    intermediates: Vec::new(),
                    final_byte: byte,
                    payload: Vec::new(),
                    raw,
                }));
                self.state = State::Ground;
            }
            _ => self.resync(byte, out),
        }
    }

    /// Reclassify the partially collected sequence as text and replay the
    /// offending byte from the ground state. The lexer is always at a
    /// replayable position, so this recurses at most once.
    fn resync(&mut self, byte: u8, out: &mut Vec<Token>) {
        let pending = std::mem::take(&mut self.pending);
        self.text.extend_from_slice(&pending);
        self.clear_sequence();
        self.state = State::Ground;
        self.step(byte, out);
    }

    fn begin_sequence(&mut self) {
        self.pending.clear();
        self.pending.push(ESC);
        self.clear_sequence();
        self.state = State::EscapeStart;
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.current_param = None;
        self.intermediates.clear();
        self.payload.clear();
    }

    fn flush_text(&mut self, out: &mut Vec<Token>) {
        if !self.text.is_empty() {
            out.push(Token::Text(std::mem::take(&mut self.text)));
        }
    }

    fn emit_simple(&mut self, final_byte: u8, out: &mut Vec<Token>) {
        self.flush_text(out);
        let raw = std::mem::take(&mut self.pending);
        let intermediates = std::mem::take(&mut self.intermediates);
        self.clear_sequence();
        out.push(Token::Escape(EscapeSeq {
            kind: EscapeKind::Simple,
            params: Vec::new(),
            intermediates,
            final_byte,
            payload: Vec::new(),
            raw,
        }));
        self.state = State::Ground;
    }

    fn emit_csi(&mut self, final_byte: u8, out: &mut Vec<Token>) {
        self.flush_text(out);
        let kind = match final_byte {
            b'A'..=b'H' | b'f' | b'd' => EscapeKind::Cursor,
            b'J' | b'K' => EscapeKind::Erase,
            b'm' => EscapeKind::Sgr,
            b'h' | b'l' => EscapeKind::Mode,
            _ => EscapeKind::Csi,
        };
        let raw = std::mem::take(&mut self.pending);
        let params = std::mem::take(&mut self.params);
        let intermediates = std::mem::take(&mut self.intermediates);
        self.clear_sequence();
        out.push(Token::Escape(EscapeSeq {
            kind,
            params,
            intermediates,
            final_byte,
            payload: Vec::new(),
            raw,
        }));
        self.state = State::Ground;
    }

    fn emit_osc(&mut self, out: &mut Vec<Token>) {
        self.flush_text(out);
        let raw = std::mem::take(&mut self.pending);
        let payload = std::mem::take(&mut self.payload);

        // OSC payload is "code;text"; the code selects the kind.
        let (code, text) = match payload.iter().position(|&b| b == b';') {
            Some(pos) => (&payload[..pos], payload[pos + 1..].to_vec()),
            None => (&payload[..], Vec::new()),
        };
        let code: Option<u16> = std::str::from_utf8(code)
            .ok()
            .and_then(|s| s.parse().ok());
        let kind = match code {
            Some(0..=2) => EscapeKind::Title,
            _ => EscapeKind::Osc,
        };

        self.clear_sequence();
        out.push(Token::Escape(EscapeSeq {
            kind,
            params: code.map(|c| vec![c]).unwrap_or_default(),
            intermediates: Vec::new(),
            final_byte: 0,
            payload: text,
            raw,
        }));
        self.state = State::Ground;
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
