//! Per-participant undo/redo stacks.
//!
//! DESIGN
//! ======
//! The undo stack holds the ids of elements *this* participant created, in
//! local creation order. The redo stack holds full element snapshots taken at
//! undo time. A participant can only ever undo their own creations — remote
//! ids never enter the stacks, even though the elements themselves live in
//! the shared store. This is a policy choice, not a technical limit.
//!
//! Undoing and redoing mutate the store directly; the returned
//! [`HistoryOutcome`] tells the session what to broadcast so every replica
//! converges. Remote peers apply the broadcast as a plain delete/add and
//! never touch their own stacks.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::element::{BoardElement, ElementId};
use crate::store::ElementStore;

/// What an undo/redo did, and what the caller must broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    /// The stack was empty, or the target element no longer exists.
    Noop,
    /// An element was removed; broadcast an undo event carrying this id.
    Undone { id: ElementId },
    /// A snapshot was restored; broadcast an add-element event with it.
    Redone { element: BoardElement },
}

/// Undo/redo stacks for one participant.
#[derive(Default)]
pub struct History {
    undo: Vec<ElementId>,
    redo: Vec<BoardElement>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a locally-created element. Any new action invalidates forward
    /// history, so the redo stack is truncated.
    pub fn record_create(&mut self, id: ElementId) {
        self.undo.push(id);
        self.redo.clear();
    }

    /// Pop the most recent local creation: snapshot it onto the redo stack
    /// and delete it from the store.
    ///
    /// If a remote peer already deleted the element, the stack entry is
    /// consumed and nothing else happens — there is no snapshot left to save.
    pub fn undo(&mut self, store: &mut ElementStore) -> HistoryOutcome {
        let Some(id) = self.undo.pop() else {
            return HistoryOutcome::Noop;
        };
        let Some(element) = store.delete(&id) else {
            return HistoryOutcome::Noop;
        };
        self.redo.push(element);
        HistoryOutcome::Undone { id }
    }

    /// Pop the most recent undo snapshot and re-add it under the *same* id.
    ///
    /// If the id meanwhile reappeared in the store (e.g. a replayed add), the
    /// re-add would be a duplicate; the snapshot is dropped and nothing is
    /// broadcast. A remote delete arriving after a successful redo still wins.
    pub fn redo(&mut self, store: &mut ElementStore) -> HistoryOutcome {
        let Some(element) = self.redo.pop() else {
            return HistoryOutcome::Noop;
        };
        let id = element.id();
        if store.add(element.clone()).is_err() {
            return HistoryOutcome::Noop;
        }
        self.undo.push(id);
        HistoryOutcome::Redone { element }
    }

    /// Forget all history. Used when the whole board is cleared — every
    /// stacked id is dead after that, so keeping them would only produce
    /// no-op undos.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Whether this participant created (and still can undo) the given id.
    #[must_use]
    pub fn owns(&self, id: &ElementId) -> bool {
        self.undo.contains(id)
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
