//! Reorder engine
//!
//! Turns a finished drag gesture into a new order. The dragged record lands
//! at the target's former index and the records in between shift by one.

use crate::model::{AttachmentId, AttachmentRecord, SlotKind};

/// Indices `(from, to)` for a drag of `dragged` onto `target`
///
/// `None` when either id is missing or both are the same.
pub fn locate(
    records: &[AttachmentRecord],
    dragged: &AttachmentId,
    target: &AttachmentId,
) -> Option<(usize, usize)> {
    if dragged == target {
        return None;
    }
    let from = records.iter().position(|r| &r.id == dragged)?;
    let to = records.iter().position(|r| &r.id == target)?;
    Some((from, to))
}

/// Move the element at `from` to `to`; out-of-range indices are ignored
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Reorder policy for one collection
#[derive(Debug, Clone, Copy)]
pub struct ReorderEngine {
    slot_kind: SlotKind,
}

impl ReorderEngine {
    pub fn new(slot_kind: SlotKind) -> Self {
        Self { slot_kind }
    }

    /// Single-slot collections have nothing to reorder
    pub fn is_enabled(&self) -> bool {
        self.slot_kind == SlotKind::Multi
    }

    /// Indices to move, or `None` when the gesture is a no-op
    pub fn plan(
        &self,
        records: &[AttachmentRecord],
        dragged: &AttachmentId,
        target: &AttachmentId,
    ) -> Option<(usize, usize)> {
        if !self.is_enabled() {
            return None;
        }
        locate(records, dragged, target)
    }

    /// The collection after the gesture; unchanged for no-ops
    pub fn compute_reorder(
        &self,
        records: &[AttachmentRecord],
        dragged: &AttachmentId,
        target: &AttachmentId,
    ) -> Vec<AttachmentRecord> {
        let mut next = records.to_vec();
        if let Some((from, to)) = self.plan(records, dragged, target) {
            array_move(&mut next, from, to);
        }
        next
    }
}
