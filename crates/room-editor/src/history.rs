//! Snapshot undo/redo history.
//!
//! Every committing mutation stores a complete encoding of the graph
//! document; undo and redo restore by total replacement. The stack holds
//! the base state at index 0 plus one snapshot per completed operation,
//! capped at `capacity` (oldest dropped first).
//!
//! Snapshots are MessagePack-encoded `GraphDocument`s, the same shape the
//! persistence collaborator sees as JSON.

use room_core::document::GraphDocument;
use room_core::error::Result;
use std::collections::VecDeque;

/// One encoded graph state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
    pub label: String,
}

impl Snapshot {
    pub fn encode(doc: &GraphDocument, label: &str) -> Result<Self> {
        Ok(Self {
            bytes: rmp_serde::to_vec_named(doc)?,
            label: label.to_string(),
        })
    }

    /// Wrap bytes read back from storage. Nothing is validated until
    /// `decode`.
    pub fn from_bytes(bytes: Vec<u8>, label: &str) -> Self {
        Self {
            bytes,
            label: label.to_string(),
        }
    }

    pub fn decode(&self) -> Result<GraphDocument> {
        Ok(rmp_serde::from_slice(&self.bytes)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

pub struct History {
    snapshots: VecDeque<Snapshot>,
    pointer: usize,
    capacity: usize,
}

impl History {
    /// Start a history whose base state is `base`.
    pub fn new(base: &GraphDocument, capacity: usize) -> Result<Self> {
        let mut snapshots = VecDeque::with_capacity(capacity.min(64));
        snapshots.push_back(Snapshot::encode(base, "initial")?);
        Ok(Self {
            snapshots,
            pointer: 0,
            capacity: capacity.max(1),
        })
    }

    /// Discard everything and restart from `base`.
    pub fn reset(&mut self, base: &GraphDocument) -> Result<()> {
        let snapshot = Snapshot::encode(base, "initial")?;
        self.snapshots.clear();
        self.snapshots.push_back(snapshot);
        self.pointer = 0;
        Ok(())
    }

    /// Record the state after a completed operation: truncate the redo
    /// tail, append, advance.
    pub fn commit(&mut self, doc: &GraphDocument, label: &str) -> Result<()> {
        let snapshot = Snapshot::encode(doc, label)?;
        self.snapshots.truncate(self.pointer + 1);
        self.snapshots.push_back(snapshot);
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.pointer = self.snapshots.len() - 1;
        log::debug!(
            "history: committed {label:?} ({}/{})",
            self.pointer + 1,
            self.snapshots.len()
        );
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.snapshots.len()
    }

    /// Decode the state one step back without moving. `Ok(None)` at the
    /// bottom of the stack.
    pub fn peek_undo(&self) -> Result<Option<GraphDocument>> {
        if !self.can_undo() {
            return Ok(None);
        }
        self.snapshots[self.pointer - 1].decode().map(Some)
    }

    /// Decode the state one step forward without moving. `Ok(None)` at
    /// the top of the stack.
    pub fn peek_redo(&self) -> Result<Option<GraphDocument>> {
        if !self.can_redo() {
            return Ok(None);
        }
        self.snapshots[self.pointer + 1].decode().map(Some)
    }

    /// Move the pointer back. Returns `false` at the bottom.
    pub fn step_back(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.pointer -= 1;
        true
    }

    /// Move the pointer forward. Returns `false` at the top.
    pub fn step_forward(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.pointer += 1;
        true
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.pointer]
    }

    /// Label of the operation undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.snapshots[self.pointer].label.as_str())
    }

    /// Replace the stored bytes at `index` (restoring persisted history).
    pub fn replace(&mut self, index: usize, snapshot: Snapshot) -> bool {
        match self.snapshots.get_mut(index) {
            Some(slot) => {
                *slot = snapshot;
                true
            }
            None => false,
        }
    }
}
