//! Lock-free copy-on-write set of gating sequences
//!
//! Producers must never claim past `min(gating set) + N`; this set is the
//! thing they poll to find that minimum. Readers (the hot path, called on
//! every `next`) never take a lock — they acquire-load a snapshot `Arc` and
//! iterate it. Writers (`add`/`remove`, called rarely, only when consumers
//! are wired up or torn down) serialize through a compare-and-swap loop.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::disruptor::sequence::Sequence;

pub struct SequenceGroup {
    sequences: ArcSwap<Vec<Arc<Sequence>>>,
}

impl SequenceGroup {
    pub fn new() -> Self {
        Self {
            sequences: ArcSwap::new(Arc::new(Vec::new())),
        }
    }

    /// Lock-free snapshot of the current member list.
    #[inline]
    pub fn get(&self) -> Arc<Vec<Arc<Sequence>>> {
        self.sequences.load_full()
    }

    /// Minimum value across every member, or `default` if the set is empty
    /// (used by a sequencer with no downstream consumers yet).
    pub fn minimum(&self, default: i64) -> i64 {
        self.get().iter().map(|seq| seq.get_acquire()).min().unwrap_or(default)
    }

    /// Add `new_sequences` to the set.
    ///
    /// Each added sequence is initialized to `cursor`'s current value before
    /// the CAS, then re-initialized once more immediately after the CAS
    /// succeeds — closing the narrow race where the cursor advanced while
    /// the CAS was in flight (spec.md §4.5).
    pub fn add(&self, new_sequences: &[Arc<Sequence>], cursor: &Sequence) {
        if new_sequences.is_empty() {
            return;
        }

        for seq in new_sequences {
            seq.set_relaxed(cursor.get_relaxed());
        }

        self.sequences.rcu(|current| {
            let mut next = (**current).clone();
            next.extend(new_sequences.iter().cloned());
            next
        });

        for seq in new_sequences {
            seq.set_relaxed(cursor.get_relaxed());
        }
    }

    /// Remove every occurrence of `target` (by identity) from the set.
    /// Idempotent: removing an absent sequence is a no-op. Returns whether
    /// any occurrence was found.
    pub fn remove(&self, target: &Arc<Sequence>) -> bool {
        let mut removed_any = false;
        self.sequences.rcu(|current| {
            let next: Vec<Arc<Sequence>> = current
                .iter()
                .filter(|seq| !Arc::ptr_eq(seq, target))
                .cloned()
                .collect();
            removed_any = next.len() != current.len();
            next
        });
        removed_any
    }

    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SequenceGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_returns_default_minimum() {
        let group = SequenceGroup::new();
        assert_eq!(group.minimum(42), 42);
    }

    #[test]
    fn minimum_reflects_lowest_member() {
        let group = SequenceGroup::new();
        let cursor = Sequence::new(10);
        let a = Arc::new(Sequence::new(5));
        let b = Arc::new(Sequence::new(3));
        group.add(&[a.clone(), b.clone()], &cursor);
        a.set_relaxed(5);
        b.set_relaxed(3);
        assert_eq!(group.minimum(i64::MAX), 3);
    }

    #[test]
    fn add_initializes_new_members_to_cursor() {
        let group = SequenceGroup::new();
        let cursor = Sequence::new(17);
        let a = Arc::new(Sequence::new(-1));
        group.add(&[a.clone()], &cursor);
        assert_eq!(a.get_relaxed(), 17);
    }

    #[test]
    fn remove_drops_every_occurrence_of_the_same_sequence() {
        let group = SequenceGroup::new();
        let cursor = Sequence::new(0);
        let a = Arc::new(Sequence::new(0));
        group.add(&[a.clone(), a.clone()], &cursor);
        assert_eq!(group.len(), 2);
        assert!(group.remove(&a));
        assert_eq!(group.len(), 0);
    }

    #[test]
    fn remove_is_idempotent() {
        let group = SequenceGroup::new();
        let a = Arc::new(Sequence::new(0));
        assert!(!group.remove(&a));
    }

    #[test]
    fn add_then_remove_restores_prior_membership() {
        let group = SequenceGroup::new();
        let cursor = Sequence::new(0);
        let a = Arc::new(Sequence::new(0));
        let b = Arc::new(Sequence::new(0));
        group.add(&[a.clone()], &cursor);
        group.add(&[b.clone()], &cursor);
        group.remove(&b);
        let members = group.get();
        assert_eq!(members.len(), 1);
        assert!(Arc::ptr_eq(&members[0], &a));
    }
}
