//! Detected changes and the queue they wait in until the next flush.
//!
//! The buffer is shared by the notification path (appends) and the tick path
//! (drains) without an outer lock, so it sits on an unbounded MPMC channel:
//! appends never block, and a drain takes exactly the events queued when it
//! started.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// One field whose value differed between two snapshots.
///
/// Serializes to the collector's wire shape
/// `{"index", "oldValue", "newValue", "tick"}`; the display name is kept
/// for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Field id
    #[serde(rename = "index")]
    pub field_id: u32,
    /// Resolved display name
    #[serde(skip)]
    pub name: String,
    /// Value in the previous snapshot
    pub old_value: i32,
    /// Value in the current snapshot
    pub new_value: i32,
    /// Tick at which the change was detected
    pub tick: u32,
}

impl ChangeEvent {
    pub fn new(field_id: u32, name: String, old_value: i32, new_value: i32, tick: u32) -> Self {
        Self {
            field_id,
            name,
            old_value,
            new_value,
            tick,
        }
    }
}

/// Append-only queue of pending change events.
#[derive(Debug, Clone)]
pub struct ChangeBuffer {
    sender: Sender<ChangeEvent>,
    receiver: Receiver<ChangeEvent>,
}

impl ChangeBuffer {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Queue an event.
    pub fn push(&self, event: ChangeEvent) {
        // The buffer holds its own receiver, so the channel never disconnects.
        let _ = self.sender.send(event);
    }

    /// Remove and return the events queued at the moment of the call.
    ///
    /// Events pushed concurrently after the length is sampled stay queued
    /// for the next drain.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        let pending = self.receiver.len();
        self.receiver.try_iter().take(pending).collect()
    }

    /// Discard everything queued.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for ChangeBuffer {
    fn default() -> Self {
        Self::new()
    }
}
