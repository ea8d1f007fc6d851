//! Completed interactive actions.
//!
//! One `ActionRecord` per prompt/command/output cycle, kept in a bounded
//! in-memory ring. This is the in-tree consumer of the lifecycle event
//! feed; nothing is persisted to disk.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use uuid::Uuid;

/// One interactive action performed by the user: the prompt that invited
/// it, the echoed input, and the output it produced.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub id: Uuid,
    /// Raw bytes of the prompt render, escape sequences included.
    pub prompt: Vec<u8>,
    /// Echoed command input up to and including the terminating newline.
    pub input: Vec<u8>,
    /// Command output up to (but not including) the next prompt.
    pub output: Vec<u8>,
    pub started: SystemTime,
    pub elapsed: Duration,
    /// Label of the shell fingerprint the action ran under.
    pub shell: String,
    /// Shell-stack depth the action ran at.
    pub depth: usize,
}

impl ActionRecord {
    /// Full transcript of the cycle as it appeared on screen.
    pub fn typescript(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(self.prompt.len() + self.input.len() + self.output.len());
        bytes.extend_from_slice(&self.prompt);
        bytes.extend_from_slice(&self.input);
        bytes.extend_from_slice(&self.output);
        bytes
    }
}

#[derive(Clone)]
pub struct ActionLog {
    ring: Arc<Mutex<VecDeque<ActionRecord>>>,
    capacity: usize,
}

impl ActionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, record: ActionRecord) {
        let mut ring = self.ring.lock();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(record);
    }

    /// Snapshot of the retained records, oldest first.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.ring.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }
}
