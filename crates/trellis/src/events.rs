//! Change notification.
//!
//! A [`Graph`](crate::Graph) owns one [`EventDispatcher`]. Subscribers see
//! events after the fact and cannot mutate the graph from inside a callback;
//! listeners that need to react with further mutations use
//! [`Hooks`](crate::hooks::Hooks) instead.

use std::fmt;

use indexmap::IndexMap;
use log::trace;

use crate::model::ChangeSet;

/// Something observable happened to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// An outermost transaction committed with at least one change.
    Changed(ChangeSet),
    /// An edit was undone; carries the edit as originally recorded.
    Undone(ChangeSet),
    /// An edit was redone.
    Redone(ChangeSet),
    /// The model was replaced by a snapshot import.
    Reset,
}

impl GraphEvent {
    /// The changes this event is about, if any.
    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            Self::Changed(set) | Self::Undone(set) | Self::Redone(set) => Some(set),
            Self::Reset => None,
        }
    }
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&GraphEvent)>;

/// Fan-out of [`GraphEvent`]s to subscribers, in subscription order.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: IndexMap<SubscriptionId, Listener>,
    next_id: u64,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.shift_remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn emit(&mut self, event: &GraphEvent) {
        trace!(listeners = self.listeners.len(); "Emitting event");
        for listener in self.listeners.values_mut() {
            listener(event);
        }
    }
}
