//! End-to-end flow over synthetic byte streams: tokenizer into analyzer,
//! exercising the event feed the way a downstream consumer would.

use std::sync::mpsc;

use sheath::actions::ActionLog;
use sheath::events::{EventKind, EventSink};
use sheath::lex::{Token, Tokenizer};
use sheath::lifecycle::Analyzer;

fn analyze(chunks: &[&[u8]], capacity: usize) -> (Vec<EventKind>, ActionLog) {
    let (tx, rx) = mpsc::channel();
    let sink = EventSink::new(capacity).with_subscriber(tx);
    let actions = ActionLog::new(capacity);
    let mut analyzer = Analyzer::new(sink, actions.clone(), Vec::new());
    let mut tokenizer = Tokenizer::new();

    for chunk in chunks {
        let tokens = tokenizer.feed(chunk);
        analyzer.consume(&tokens);
    }
    let tokens = tokenizer.finish();
    analyzer.consume(&tokens);
    analyzer.finish();

    drop(analyzer);
    let kinds = rx.into_iter().map(|event| event.kind).collect();
    (kinds, actions)
}

#[test]
fn simple_command_emits_full_cycle() {
    let (kinds, actions) = analyze(&[b"$ echo hi\r\nhi\r\n$ "], 64);
    assert_eq!(
        kinds,
        vec![
            EventKind::PromptStart,
            EventKind::PromptEnd,
            EventKind::CommandInputBegin,
            EventKind::CommandInputEnd,
            EventKind::CommandOutputBegin,
            EventKind::CommandOutputEnd,
            EventKind::PromptStart,
        ]
    );
    let records = actions.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].typescript(), b"$ echo hi\r\nhi\r\n".to_vec());
}

#[test]
fn subshell_round_trip() {
    let (kinds, _) = analyze(
        &[
            b"$ ",
            b"ssh host\r\n",
            b"host$ ",
            b"whoami\r\nroot\r\nhost$ ",
            b"exit\r\n",
            b"$ ",
        ],
        64,
    );

    let enters = kinds
        .iter()
        .filter(|k| matches!(k, EventKind::ShellEnter(_)))
        .count();
    let exits = kinds
        .iter()
        .filter(|k| matches!(k, EventKind::ShellExit(_)))
        .count();
    assert_eq!(enters, 1);
    assert_eq!(exits, 1);

    let enter = kinds
        .iter()
        .position(|k| matches!(k, EventKind::ShellEnter(_)))
        .expect("enter");
    let exit = kinds
        .iter()
        .position(|k| matches!(k, EventKind::ShellExit(_)))
        .expect("exit");
    assert!(enter < exit);

    // The fingerprint carried on the enter event is the subshell's.
    let EventKind::ShellEnter(fp) = &kinds[enter] else {
        panic!("expected enter");
    };
    assert_eq!(fp.prefix, "host");
    assert_eq!(fp.suffix, "$ ");
}

#[test]
fn commands_inside_subshell_are_recorded_at_depth() {
    let (_, actions) = analyze(
        &[b"$ ", b"ssh host\r\n", b"host$ ", b"ls\r\na b\r\nhost$ "],
        64,
    );
    let records = actions.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].depth, 0);
    assert_eq!(records[0].input, b"ssh host\r\n".to_vec());
    assert_eq!(records[1].depth, 1);
    assert_eq!(records[1].input, b"ls\r\n".to_vec());
    assert_eq!(records[1].output, b"a b\r\n".to_vec());
}

#[test]
fn malformed_escape_is_preserved_at_stream_end() {
    let (_, actions) = analyze(&[b"$ cat blob\r\n", b"chunk \x1b]0;never-terminated"], 64);
    let records = actions.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].output,
        b"chunk \x1b]0;never-terminated".to_vec()
    );
}

#[test]
fn tokenizer_stream_reconstructs_exactly() {
    let stream: &[u8] = b"$ ls\r\n\x1b[1;34mdir\x1b[0m  file\r\n\x1b]0;sh\x07$ \x1b[broken";
    let mut tokenizer = Tokenizer::new();
    let mut tokens = Vec::new();
    // Deliver byte by byte: worst-case chunk boundaries.
    for &byte in stream {
        tokens.extend(tokenizer.feed(&[byte]));
    }
    tokens.extend(tokenizer.finish());

    let mut reconstructed = Vec::new();
    for token in &tokens {
        token.push_raw(&mut reconstructed);
    }
    assert_eq!(reconstructed, stream.to_vec());
}

#[test]
fn prompt_render_with_title_and_colors() {
    let (kinds, actions) = analyze(
        &[b"\x1b]0;user@host: ~\x07\x1b[32m$ \x1b[0m", b"true\r\n", b"\x1b]0;user@host: ~\x07\x1b[32m$ \x1b[0m"],
        64,
    );
    assert_eq!(
        kinds
            .iter()
            .filter(|k| matches!(k, EventKind::ShellEnter(_)))
            .count(),
        0
    );
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::PromptStart)
            .count(),
        2
    );
    let records = actions.records();
    assert_eq!(records.len(), 1);
    // The prompt capture keeps the escape sequences of the render.
    assert!(records[0]
        .prompt
        .windows(2)
        .any(|w| w == [0x1b, b']']));
}

#[test]
fn event_ring_is_bounded() {
    let mut chunks: Vec<Vec<u8>> = vec![b"$ ".to_vec()];
    for _ in 0..50 {
        chunks.push(b"true\r\n$ ".to_vec());
    }
    let borrowed: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();

    let sink = EventSink::new(16);
    let actions = ActionLog::new(16);
    let mut analyzer = Analyzer::new(sink.clone(), actions.clone(), Vec::new());
    let mut tokenizer = Tokenizer::new();
    for chunk in &borrowed {
        let tokens: Vec<Token> = tokenizer.feed(chunk);
        analyzer.consume(&tokens);
    }
    assert_eq!(sink.len(), 16);
    assert_eq!(actions.len(), 16);
}
