//! The I/O multiplexer.
//!
//! Three threads service the session: real-terminal stdin → pty master,
//! pty master → real-terminal stdout plus the tokenizer channel, and a
//! SIGWINCH listener → resize application. Bytes are moved in bounded
//! chunks; each chunk is fully written to the passthrough sink and sent
//! to the analysis channel before the next read, so both sinks observe
//! the same byte order. The bytes themselves are never interpreted
//! here — only the tokenizer gives them meaning.

use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::thread;

use portable_pty::ExitStatus;

use crate::actions::ActionLog;
use crate::config::Config;
use crate::error::SessionError;
use crate::events::EventSink;
use crate::lex::Tokenizer;
use crate::lifecycle::Analyzer;
use crate::pty::{write_retrying, PtySession, ResizeWatcher};
use crate::term::{self, RawModeGuard};

/// Bytes read from the pty master per chunk.
const READ_CHUNK: usize = 4096;

pub struct SessionOutcome {
    pub status: ExitStatus,
    pub events: EventSink,
    pub actions: ActionLog,
}

/// Wrap `command` and run it to completion.
///
/// The child is spawned before raw mode is entered, so resource and
/// spawn failures leave the user's terminal untouched. Once running,
/// teardown always restores the terminal: the raw-mode guard releases
/// on every exit path.
pub fn run(
    command: &str,
    args: &[String],
    config: &Config,
) -> Result<SessionOutcome, SessionError> {
    if !term::stdin_is_tty() {
        return Err(SessionError::NotATty);
    }

    let rules = config.rules_for(command)?;
    let (cols, rows) = term::window_size();
    let mut session = PtySession::spawn(command, args, cols, rows)?;
    tracing::info!(session = %session.id(), command, cols, rows, "session started");

    let Some(mut reader) = session.take_reader() else {
        return Err(SessionError::Io(io::Error::other("pty reader taken")));
    };
    let Some(mut writer) = session.take_writer() else {
        return Err(SessionError::Io(io::Error::other("pty writer taken")));
    };

    // The terminal is only touched once the child is running.
    let guard = RawModeGuard::new()?;

    let sink = EventSink::new(config.history_size);
    let actions = ActionLog::new(config.history_size);
    let mut analyzer = Analyzer::new(sink.clone(), actions.clone(), rules);

    let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>();

    // Pty output: passthrough first, then the analysis channel. Chunks
    // are drained to both before the next read.
    let reader_handle = thread::spawn(move || {
        let mut stdout = io::stdout();
        let mut buffer = [0u8; READ_CHUNK];
        loop {
            let count = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(_) => break,
            };
            if stdout.write_all(&buffer[..count]).is_err() {
                break;
            }
            let _ = stdout.flush();
            if chunk_tx.send(buffer[..count].to_vec()).is_err() {
                break;
            }
        }
    });

    // User keystrokes go to the master verbatim; the pty line discipline
    // handles signal generation, so Ctrl-C reaches the child untouched.
    let _writer_handle = thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buffer = [0u8; 1024];
        loop {
            let count = match stdin.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(_) => break,
            };
            if write_retrying(&mut writer, &buffer[..count]).is_err() {
                break;
            }
        }
    });

    // Single consumer of the token stream; the shell stack is only ever
    // mutated here.
    let analysis_handle = thread::spawn(move || {
        let mut tokenizer = Tokenizer::new();
        while let Ok(chunk) = chunk_rx.recv() {
            let tokens = tokenizer.feed(&chunk);
            analyzer.consume(&tokens);
        }
        let tokens = tokenizer.finish();
        analyzer.consume(&tokens);
        analyzer.finish();
    });

    let watcher = match ResizeWatcher::start(session.master()) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "resize watcher unavailable");
            None
        }
    };

    let status = session.wait()?;

    guard.restore();
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    // Child exit closes the slave; the reader drains remaining output to
    // EOF, which in turn ends the analysis thread after its last chunk.
    let _ = reader_handle.join();
    let _ = analysis_handle.join();

    tracing::info!(code = status.exit_code(), "session ended");
    Ok(SessionOutcome {
        status,
        events: sink,
        actions,
    })
}
