//! Observer registry for toolbar and autosave collaborators.

use crate::state::StateKind;
use room_core::id::{ArrowId, BoxId};

/// Something external collaborators may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    SelectionChanged {
        boxes: Vec<BoxId>,
        arrow: Option<ArrowId>,
    },
    DirtyChanged(bool),
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    StateChanged(StateKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type Callback = Box<dyn FnMut(&RoomEvent)>;

#[derive(Default)]
pub struct Observers {
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: u64,
}

impl Observers {
    pub fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Returns `false` if `id` wasn't subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &RoomEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
