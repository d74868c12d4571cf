// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecorderError;
use crate::object_record::ObjectRecord;
use indexmap::IndexMap;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

/// Public only because it appears in [`crate::Recorder::state_snapshot`]'s
/// return type; not otherwise meant to be named outside this crate.
pub type FxBuildHasher = BuildHasherDefault<rustc_hash::FxHasher>;

/// Maps `obj_id -> ObjectRecord`, one entry per tracked object.
///
/// An `IndexMap` rather than the teacher's append-only `FxIndexSet`
/// interning tables (`libdd-profiling`'s `collections::identifiable`),
/// because this table must support removal during the update pass; unlike
/// those tables, nothing ever looks a record up by id again after commit
/// (see the Open Question this carries from the original implementation,
/// recorded in `DESIGN.md`), so the choice of keyed collection is really
/// only about the duplicate-id check at insert time and the swap-remove
/// during updates.
///
/// Values are `Rc<ObjectRecord>` rather than bare `ObjectRecord` so that
/// cloning the whole table for a snapshot (`spec.md` §5, "the snapshot owns
/// neither keys nor values") is a refcount bump per entry instead of a deep
/// copy of every `LiveObjectData` (and its `class` string allocation).
#[derive(Clone, Default)]
pub(crate) struct ObjectRecordTable {
    records: IndexMap<i64, Rc<ObjectRecord>, FxBuildHasher>,
}

impl ObjectRecordTable {
    pub fn new() -> Self {
        ObjectRecordTable {
            records: IndexMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Inserts `record`, failing loud if its id is already tracked — a
    /// repeated commit of the same id is a programming error (`spec.md` I4).
    pub fn insert_unique(&mut self, record: ObjectRecord) -> Result<(), RecorderError> {
        let key = record.obj_id.raw();
        match self.records.entry(key) {
            indexmap::map::Entry::Occupied(existing) => Err(RecorderError::DuplicateObjectId {
                existing: existing.get().debug_summary(),
                new: record.debug_summary(),
            }),
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(Rc::new(record));
                Ok(())
            }
        }
    }

    /// Returns `(obj_id, record)` at `index`, for the update pass's
    /// index-driven walk.
    pub fn get_index(&self, index: usize) -> Option<(&i64, &ObjectRecord)> {
        self.records.get_index(index).map(|(id, rec)| (id, rec.as_ref()))
    }

    /// Returns a mutable view of the record at `index`, or `None` if it is
    /// shared (a snapshot clone is outstanding). Updates never run while a
    /// snapshot exists (`spec.md` §4.E), so in practice the `Rc` here is
    /// always uniquely held at this point; the `None` case is handled
    /// defensively by callers rather than assumed impossible, the same as
    /// the rest of the update-pass cleanup seam (`spec.md` §9).
    pub fn get_index_mut(&mut self, index: usize) -> Option<(&i64, &mut ObjectRecord)> {
        let (id, rec) = self.records.get_index_mut(index)?;
        Rc::get_mut(rec).map(|r| (id, r))
    }

    /// Removes the entry at `index`, moving the last entry into its slot.
    /// Order is not semantically meaningful to iteration output, so this
    /// O(1) removal is preferable to an order-preserving shift.
    pub fn swap_remove_index(&mut self, index: usize) -> Option<(i64, Rc<ObjectRecord>)> {
        self.records.swap_remove_index(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &ObjectRecord)> {
        self.records.iter().map(|(id, rec)| (id, rec.as_ref()))
    }
}
