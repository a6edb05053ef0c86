//! Per-unit artifact revisions
//!
//! One slot per user story, appended in the order stories are selected.
//! Each slot keeps every revision the generation stage produced for that
//! story; the last one is the current value.

use tracing::debug;

use crate::domain::UnitId;

/// Revision history of one unit's artifact
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSlot<T> {
    unit: UnitId,
    revisions: Vec<T>,
}

impl<T> UnitSlot<T> {
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// Every recorded revision, oldest first
    pub fn revisions(&self) -> &[T] {
        &self.revisions
    }

    /// The tail revision
    pub fn current(&self) -> Option<&T> {
        self.revisions.last()
    }
}

/// How `ArtifactBatches::record` merged a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First value for a unit; a new slot was appended
    NewSlot,
    /// A later revision for a unit that already had a slot
    Revision(usize),
}

/// Artifact revisions keyed by unit
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBatches<T> {
    slots: Vec<UnitSlot<T>>,
}

impl<T> Default for ArtifactBatches<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> ArtifactBatches<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a freshly generated value for `unit`
    ///
    /// Appends a slot the first time a unit is seen, otherwise pushes a new
    /// revision onto that unit's slot. Other units are never touched.
    pub fn record(&mut self, unit: &UnitId, value: T) -> Recorded {
        if let Some(slot) = self.slots.iter_mut().find(|s| &s.unit == unit) {
            slot.revisions.push(value);
            let revision = slot.revisions.len();
            debug!(%unit, %revision, "ArtifactBatches::record: revision");
            return Recorded::Revision(revision);
        }

        debug!(%unit, slot = self.slots.len(), "ArtifactBatches::record: new slot");
        self.slots.push(UnitSlot {
            unit: unit.clone(),
            revisions: vec![value],
        });
        Recorded::NewSlot
    }

    /// Current value for a unit
    pub fn current(&self, unit: &UnitId) -> Option<&T> {
        self.slot(unit).and_then(|s| s.current())
    }

    pub fn slot(&self, unit: &UnitId) -> Option<&UnitSlot<T>> {
        self.slots.iter().find(|s| &s.unit == unit)
    }

    /// Current value of the `i`-th slot in selection order
    pub fn current_at(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|s| s.current())
    }

    /// Slots in selection order
    pub fn iter(&self) -> impl Iterator<Item = &UnitSlot<T>> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit(n: usize) -> UnitId {
        UnitId::new(n, &format!("story {}", n))
    }

    #[test]
    fn test_first_value_appends_slot() {
        let mut batches = ArtifactBatches::new();
        assert!(batches.is_empty());

        assert_eq!(batches.record(&unit(1), vec!["a".to_string()]), Recorded::NewSlot);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches.current(&unit(1)), Some(&vec!["a".to_string()]));
    }

    #[test]
    fn test_revision_replaces_current_but_keeps_history() {
        let mut batches = ArtifactBatches::new();
        batches.record(&unit(1), "v1");
        batches.record(&unit(2), "draft");
        assert_eq!(batches.record(&unit(2), "final"), Recorded::Revision(2));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches.current(&unit(2)), Some(&"final"));
        assert_eq!(batches.slot(&unit(2)).unwrap().revisions(), &["draft", "final"]);
        assert_eq!(batches.current(&unit(1)), Some(&"v1"));
    }

    #[test]
    fn test_positional_view_follows_selection_order() {
        let mut batches = ArtifactBatches::new();
        batches.record(&unit(2), "second story first");
        batches.record(&unit(1), "first story second");

        assert_eq!(batches.current_at(0), Some(&"second story first"));
        assert_eq!(batches.current_at(1), Some(&"first story second"));
        assert_eq!(batches.current_at(2), None);
        let units: Vec<&UnitId> = batches.iter().map(|s| s.unit()).collect();
        assert_eq!(units, vec![&unit(2), &unit(1)]);
    }

    #[test]
    fn test_unknown_unit() {
        let batches: ArtifactBatches<u32> = ArtifactBatches::new();
        assert!(batches.current(&unit(9)).is_none());
        assert!(batches.slot(&unit(9)).is_none());
    }

    proptest! {
        #[test]
        fn prop_one_slot_per_unit_and_tail_is_last_write(writes in proptest::collection::vec((1usize..5, 0u32..1000), 0..40)) {
            let mut batches = ArtifactBatches::new();
            for (u, v) in &writes {
                batches.record(&unit(*u), *v);
            }

            let mut distinct: Vec<usize> = writes.iter().map(|(u, _)| *u).collect();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(batches.len(), distinct.len());

            for u in distinct {
                let last = writes.iter().rev().find(|(w, _)| *w == u).map(|(_, v)| v);
                prop_assert_eq!(batches.current(&unit(u)), last);
                let count = writes.iter().filter(|(w, _)| *w == u).count();
                prop_assert_eq!(batches.slot(&unit(u)).unwrap().revisions().len(), count);
            }
        }
    }
}
