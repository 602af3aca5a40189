//! Fan-out of server events to connected terminals and dashboards.
//!
//! The connection set lives behind one lock in insertion order; each
//! connection gets an unbounded channel, so delivery order per connection
//! follows send order. Best-effort, at-most-once: a connection whose channel
//! is gone is dropped from the set, never an error.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

struct Slot {
    id: Uuid,
    terminal_id: Option<String>,
    tx: UnboundedSender<String>,
}

#[derive(Default)]
pub struct Hub {
    slots: Mutex<Vec<Slot>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and returns its id plus the receiving end the
    /// socket task forwards to the wire.
    pub fn register(&self) -> (Uuid, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.slots.lock().expect("hub lock").push(Slot {
            id,
            terminal_id: None,
            tx,
        });
        (id, rx)
    }

    /// Removing an id that is already gone is a no-op.
    pub fn unregister(&self, id: Uuid) {
        self.slots.lock().expect("hub lock").retain(|s| s.id != id);
    }

    pub fn set_terminal(&self, id: Uuid, terminal_id: &str) {
        let mut slots = self.slots.lock().expect("hub lock");
        if let Some(slot) = slots.iter_mut().find(|s| s.id == id) {
            slot.terminal_id = Some(terminal_id.to_string());
        }
    }

    /// Sends `event` to a single connection, in order with any broadcasts.
    pub fn send_to(&self, id: Uuid, event: &serde_json::Value) -> bool {
        let payload = event.to_string();
        let slots = self.slots.lock().expect("hub lock");
        slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.tx.send(payload).is_ok())
            .unwrap_or(false)
    }

    /// Sends `event` to every live connection, pruning closed ones.
    pub fn broadcast(&self, event: &serde_json::Value) {
        let payload = event.to_string();
        let mut slots = self.slots.lock().expect("hub lock");
        slots.retain(|s| s.tx.send(payload.clone()).is_ok());
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().expect("hub lock").len()
    }

    pub fn terminal_ids(&self) -> Vec<String> {
        self.slots
            .lock()
            .expect("hub lock")
            .iter()
            .filter_map(|s| s.terminal_id.clone())
            .collect()
    }
}
