//! Ordered in-memory element store.
//!
//! DESIGN
//! ======
//! Elements are looked up by identity, never by index: concurrent deletes and
//! updates arriving from remote peers must not be able to corrupt local
//! positions. Creation order is preserved through a monotonic sequence number
//! assigned on insert, and `all()` yields elements in that order for
//! rendering.
//!
//! ERROR HANDLING
//! ==============
//! `add` on an existing id and `update` on a missing id are *expected* under
//! broadcast replay and network reordering. Both return typed errors the
//! caller treats as no-ops — they are recoverable by design, which is what
//! makes replayed history idempotent.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use crate::element::{BoardElement, ElementId, ElementPatch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `add` was called with an id already present. Recover by ignoring.
    #[error("duplicate element: {0}")]
    DuplicateElement(ElementId),
    /// `update` targeted an id not in the store. Recover by ignoring.
    #[error("element not found: {0}")]
    ElementNotFound(ElementId),
}

struct Slot {
    seq: u64,
    element: BoardElement,
}

/// The canonical replica of every element currently on the board.
pub struct ElementStore {
    elements: HashMap<ElementId, Slot>,
    next_seq: u64,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: HashMap::new(), next_seq: 0 }
    }

    /// Append an element in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateElement`] if the id is already present;
    /// the store is left unchanged.
    pub fn add(&mut self, element: BoardElement) -> Result<(), StoreError> {
        let id = element.id();
        if self.elements.contains_key(&id) {
            return Err(StoreError::DuplicateElement(id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.elements.insert(id, Slot { seq, element });
        Ok(())
    }

    /// Merge a sparse patch into an existing element.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ElementNotFound`] if the id is absent. This
    /// happens under reordering of network events and must not crash.
    pub fn update(&mut self, id: &ElementId, patch: &ElementPatch) -> Result<(), StoreError> {
        let slot = self
            .elements
            .get_mut(id)
            .ok_or(StoreError::ElementNotFound(*id))?;
        slot.element.apply_patch(patch);
        Ok(())
    }

    /// Remove an element by id, returning it if it was present.
    /// Absent ids are a silent no-op.
    pub fn delete(&mut self, id: &ElementId) -> Option<BoardElement> {
        self.elements.remove(id).map(|slot| slot.element)
    }

    /// Reference to an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&BoardElement> {
        self.elements.get(id).map(|slot| &slot.element)
    }

    /// Whether an element with this id exists.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// All elements in creation order.
    #[must_use]
    pub fn all(&self) -> Vec<&BoardElement> {
        let mut slots: Vec<&Slot> = self.elements.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.iter().map(|slot| &slot.element).collect()
    }

    /// Drop every element. The sequence counter keeps running, so inserts
    /// after a clear — including pre-clear adds replayed late — keep a
    /// single monotonic creation order, sorted by arrival.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}
