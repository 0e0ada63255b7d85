//! Ordered pending set: a min-priority map of buffered out-of-order messages,
//! keyed by `sequence_number`.
//!
//! The contract is `insert` / `peek_min` / `pop_min` / `is_empty` with
//! O(log n) operations and idempotent inserts on a duplicate key. `BTreeMap`
//! gives exactly that contract idiomatically, with no bespoke tree needed.

use std::collections::BTreeMap;

use crate::wire::Message;

#[derive(Debug, Default)]
pub struct OrderedPendingSet {
    by_seq: BTreeMap<u32, Message>,
}

impl OrderedPendingSet {
    pub fn new() -> Self {
        Self {
            by_seq: BTreeMap::new(),
        }
    }

    /// Inserts `msg` keyed by its sequence number. Returns `false` without
    /// modifying the set if that key is already present (idempotent insert).
    pub fn insert(&mut self, msg: Message) -> bool {
        let seq = msg.sequence_number;
        if self.by_seq.contains_key(&seq) {
            return false;
        }
        self.by_seq.insert(seq, msg);
        true
    }

    pub fn peek_min(&self) -> Option<&Message> {
        self.by_seq.values().next()
    }

    pub fn pop_min(&mut self) -> Option<Message> {
        let key = *self.by_seq.keys().next()?;
        self.by_seq.remove(&key)
    }

    pub fn contains_key(&self, seq: u32) -> bool {
        self.by_seq.contains_key(&seq)
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(seq: u32) -> Message {
        Message::data(seq, 1, Bytes::new())
    }

    #[test]
    fn empty_set_has_no_min() {
        let set = OrderedPendingSet::new();
        assert!(set.is_empty());
        assert!(set.peek_min().is_none());
    }

    #[test]
    fn insert_then_peek_min_returns_smallest_key() {
        let mut set = OrderedPendingSet::new();
        set.insert(msg(5));
        set.insert(msg(2));
        set.insert(msg(8));
        assert_eq!(set.peek_min().unwrap().sequence_number, 2);
    }

    #[test]
    fn pop_min_removes_in_ascending_order() {
        let mut set = OrderedPendingSet::new();
        for seq in [9, 1, 4, 2] {
            set.insert(msg(seq));
        }
        let mut popped = Vec::new();
        while let Some(m) = set.pop_min() {
            popped.push(m.sequence_number);
        }
        assert_eq!(popped, vec![1, 2, 4, 9]);
        assert!(set.is_empty());
    }

    #[test]
    fn insert_is_idempotent_on_duplicate_key() {
        let mut set = OrderedPendingSet::new();
        assert!(set.insert(msg(3)));
        assert!(!set.insert(msg(3)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn contains_key_reflects_membership() {
        let mut set = OrderedPendingSet::new();
        set.insert(msg(6));
        assert!(set.contains_key(6));
        assert!(!set.contains_key(7));
    }
}
