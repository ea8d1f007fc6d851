//! Append-only lifecycle event feed.
//!
//! Events are held in a bounded in-memory ring and optionally forwarded
//! to a subscriber channel. Consumers receive events in emission order;
//! there is no replay beyond what a consumer keeps itself.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::lifecycle::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PromptStart,
    PromptEnd,
    CommandInputBegin,
    CommandInputEnd,
    CommandOutputBegin,
    CommandOutputEnd,
    ShellEnter(Fingerprint),
    ShellExit(Fingerprint),
}

/// One lifecycle transition, timestamped and tied back to the byte offset
/// in the session's output stream where it originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub timestamp: SystemTime,
    pub offset: u64,
    /// Shell-stack depth the event applies to.
    pub depth: usize,
}

#[derive(Clone)]
pub struct EventSink {
    ring: Arc<Mutex<VecDeque<LifecycleEvent>>>,
    capacity: usize,
    forward: Option<Sender<LifecycleEvent>>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
            forward: None,
        }
    }

    /// Forward every emitted event to `tx` in addition to the ring.
    pub fn with_subscriber(mut self, tx: Sender<LifecycleEvent>) -> Self {
        self.forward = Some(tx);
        self
    }

    pub fn emit(&self, event: LifecycleEvent) {
        if let Some(tx) = &self.forward {
            // A gone subscriber is not an error; the ring still records.
            let _ = tx.send(event.clone());
        }
        let mut ring = self.ring.lock();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(event);
    }

    /// Snapshot of the retained events, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.ring.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn event(kind: EventKind) -> LifecycleEvent {
        LifecycleEvent {
            kind,
            timestamp: SystemTime::now(),
            offset: 0,
            depth: 0,
        }
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let sink = EventSink::new(2);
        sink.emit(event(EventKind::PromptStart));
        sink.emit(event(EventKind::PromptEnd));
        sink.emit(event(EventKind::CommandInputBegin));
        let events: Vec<_> = sink.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            events,
            vec![EventKind::PromptEnd, EventKind::CommandInputBegin]
        );
    }

    #[test]
    fn subscriber_receives_in_order() {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(8).with_subscriber(tx);
        sink.emit(event(EventKind::PromptStart));
        sink.emit(event(EventKind::PromptEnd));
        assert_eq!(rx.recv().map(|e| e.kind), Ok(EventKind::PromptStart));
        assert_eq!(rx.recv().map(|e| e.kind), Ok(EventKind::PromptEnd));
    }
}
