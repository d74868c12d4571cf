// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecorderError;
use crate::frame::{hash_raw_frames, RawFrame, Stack};
use crate::heap_record::HeapRecord;
use hashbrown::HashTable;
use std::rc::Rc;

/// Maps a [`Stack`] to a refcounted [`HeapRecord`], deduplicating stacks
/// that multiple tracked objects share.
///
/// Backed by `hashbrown::HashTable<Rc<HeapRecord>>` rather than the
/// `enum Owned/Borrowed` key design sketched in `spec.md` §9: since
/// `HeapRecord` already owns its `Stack`, there is no separate key object to
/// keep hashing in sync with, and `get_or_create`'s lookup and insert paths
/// both go through [`hash_raw_frames`], so the dual-key contract holds by
/// construction rather than by convention. `Rc` gives every
/// [`crate::ObjectRecord`] a stable, non-moving reference to its
/// `HeapRecord` even though the table itself may grow and rehash.
pub(crate) struct StackDedupTable {
    table: HashTable<Rc<HeapRecord>>,
}

impl StackDedupTable {
    pub fn new() -> Self {
        StackDedupTable {
            table: HashTable::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns the existing `HeapRecord` for these frames, or creates one.
    /// Never increments `tracked`; the caller does that after the
    /// corresponding `ObjectRecord` is successfully committed.
    pub fn get_or_create(&mut self, frames: &[RawFrame<'_>]) -> Result<Rc<HeapRecord>, RecorderError> {
        let hash = hash_raw_frames(frames);
        if let Ok(entry) = self
            .table
            .find_entry(hash, |record| record.stack.matches_raw_frames(frames))
        {
            return Ok(Rc::clone(entry.get()));
        }
        let stack = Stack::from_raw_frames(frames)?;
        let record = Rc::new(HeapRecord::new(stack, hash));
        let entry = self
            .table
            .insert_unique(hash, Rc::clone(&record), |r| r.hash);
        Ok(Rc::clone(entry.get()))
    }

    /// Decrements `heap`'s tracked-object count; if it reaches zero, removes
    /// and frees the stack, record, and table entry in one action.
    pub fn drop_one(&mut self, heap: &Rc<HeapRecord>) {
        if heap.decrement_tracked() != 0 {
            return;
        }
        if let Ok(entry) = self.table.find_entry(heap.hash, |r| Rc::ptr_eq(r, heap)) {
            entry.remove();
        }
    }

    /// Removes `heap`'s entry if nothing tracks it yet. Used to roll back a
    /// `get_or_create` that just materialized a brand-new stack/record pair
    /// when a later step of the same commit fails, so the caller observes
    /// full rollback rather than an orphaned zero-`tracked` entry (`spec.md`
    /// §4.D). A no-op if `heap` is already tracked — a pre-existing entry
    /// (cache hit) always has `tracked >= 1` per invariant I2, so this only
    /// ever removes the entry this same call created.
    pub fn remove_untracked(&mut self, heap: &Rc<HeapRecord>) {
        if heap.tracked() != 0 {
            return;
        }
        if let Ok(entry) = self.table.find_entry(heap.hash, |r| Rc::ptr_eq(r, heap)) {
            entry.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(tag: &'static str) -> Vec<RawFrame<'static>> {
        vec![RawFrame {
            function_name: tag,
            file_name: "f.rb",
            line: 1,
        }]
    }

    #[test]
    fn dedups_identical_stacks() {
        let mut table = StackDedupTable::new();
        let f = frames("same");
        let a = table.get_or_create(&f).unwrap();
        let b = table.get_or_create(&f).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_stacks_get_distinct_records() {
        let mut table = StackDedupTable::new();
        let a = table.get_or_create(&frames("a")).unwrap();
        let b = table.get_or_create(&frames("b")).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn drop_to_zero_removes_entry() {
        let mut table = StackDedupTable::new();
        let f = frames("x");
        let heap = table.get_or_create(&f).unwrap();
        heap.increment_tracked().unwrap();
        heap.increment_tracked().unwrap();
        table.drop_one(&heap);
        assert_eq!(table.len(), 1);
        assert_eq!(heap.tracked(), 1);
        table.drop_one(&heap);
        assert_eq!(table.len(), 0);
    }
}
