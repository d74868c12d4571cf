// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecorderError;
use crate::frame::RawFrame;
use crate::hooks::GcHost;
use crate::iteration::{IterationRecord, Location};
use crate::object_record::{LiveObjectData, ObjectId, PendingObjectRecord, PendingRecording};
use crate::object_table::{FxBuildHasher, ObjectRecordTable};
use crate::stack_table::StackDedupTable;
use crate::stats::{LastUpdateStats, LifetimeStats};
use crate::{ITERATION_MIN_AGE, MIN_TIME_BETWEEN_UPDATES_NS, OLD_AGE};
use indexmap::IndexMap;
use std::rc::Rc;

/// Holds configuration, the active pending recording, the two
/// stack/object tables, and lifetime/last-update statistics.
///
/// All mutating methods assume the host runtime's single cooperative
/// mutator lock is held by the caller — the recorder adds no locking of
/// its own (`spec.md` §5). The one operation that may run without that
/// lock is [`Recorder::for_each_live_object`].
pub struct Recorder {
    size_enabled: bool,
    sample_rate: u32,
    num_recordings_skipped: u32,
    active_recording: PendingRecording,
    stack_table: StackDedupTable,
    object_table: ObjectRecordTable,
    snapshot: Option<ObjectRecordTable>,
    updating: bool,
    update_gen: u64,
    last_update_ns: i64,
    last_update_stats: LastUpdateStats,
    lifetime: LifetimeStats,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Recorder {
            size_enabled: true,
            sample_rate: 1,
            num_recordings_skipped: 0,
            active_recording: PendingRecording::None,
            stack_table: StackDedupTable::new(),
            object_table: ObjectRecordTable::new(),
            snapshot: None,
            updating: false,
            update_gen: 0,
            last_update_ns: -1,
            last_update_stats: LastUpdateStats::default(),
            lifetime: LifetimeStats::default(),
        }
    }

    pub fn set_size_enabled(&mut self, enabled: bool) {
        self.size_enabled = enabled;
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), RecorderError> {
        if sample_rate < 1 {
            return Err(RecorderError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        self.num_recordings_skipped = 0;
        Ok(())
    }

    pub fn num_object_records(&self) -> usize {
        self.object_table.len()
    }

    pub fn num_heap_records(&self) -> usize {
        self.stack_table.len()
    }

    pub fn last_update_stats(&self) -> LastUpdateStats {
        self.last_update_stats
    }

    /// Starts a pending recording for `obj`. Fails if a recording is
    /// already active — consecutive `begin()`s without an intervening
    /// `end()` are a caller bug.
    pub fn begin<H: GcHost>(
        &mut self,
        host: &H,
        obj: &H::ObjRef,
        weight: u32,
        class_name: &str,
    ) -> Result<(), RecorderError> {
        if !matches!(self.active_recording, PendingRecording::None) {
            return Err(RecorderError::RecordingAlreadyActive);
        }

        self.num_recordings_skipped += 1;
        if self.num_recordings_skipped < self.sample_rate || host.kind_is_unrecordable(obj) {
            self.active_recording = PendingRecording::Skipped;
            return Ok(());
        }
        self.num_recordings_skipped = 0;

        let raw_id = host.object_id(obj);
        let obj_id = ObjectId::new(raw_id)?;
        self.active_recording = PendingRecording::Active(PendingObjectRecord {
            obj_id,
            data: LiveObjectData {
                weight: weight.saturating_mul(self.sample_rate),
                class: if class_name.is_empty() {
                    None
                } else {
                    Some(Box::from(class_name))
                },
                alloc_gen: host.gc_generation_count(),
                gen_age: 0,
                size: 0,
                is_frozen: false,
            },
        });
        Ok(())
    }

    /// Commits the pending recording using the stack captured for it.
    /// Clears `active_recording` eagerly, before any fallible step, so a
    /// later failure can never leave a dangling pending recording.
    pub fn end(&mut self, frames: &[RawFrame<'_>]) -> Result<(), RecorderError> {
        let pending = std::mem::replace(&mut self.active_recording, PendingRecording::None);
        match pending {
            PendingRecording::None => Err(RecorderError::NoActiveRecording),
            PendingRecording::Skipped => Ok(()),
            PendingRecording::Active(pending) => self.commit(pending, frames),
        }
    }

    /// Commits atomically from the caller's perspective (`spec.md` §4.D): if
    /// `insert_unique` fails after `get_or_create` has already materialized a
    /// brand-new heap record, that record is rolled back before the error is
    /// returned, so a failed commit never leaves an orphaned zero-`tracked`
    /// entry in the dedup table (invariant I2).
    fn commit(
        &mut self,
        pending: PendingObjectRecord,
        frames: &[RawFrame<'_>],
    ) -> Result<(), RecorderError> {
        let heap = self.stack_table.get_or_create(frames)?;
        if heap.tracked() == u32::MAX {
            return Err(RecorderError::TrackedCountSaturated);
        }
        let record = pending.into_committed(Rc::clone(&heap));
        if let Err(err) = self.object_table.insert_unique(record) {
            self.stack_table.remove_untracked(&heap);
            return Err(err);
        }
        // Checked above; this can't fail, since nothing else could have
        // incremented `tracked` to u32::MAX between the check and here —
        // the recorder is single-threaded under the mutator lock.
        let _ = heap.increment_tracked();
        Ok(())
    }

    /// `end()`'s cancellation-safe wrapper: never propagates a failure,
    /// returning a non-zero status instead so the caller (typically a thin
    /// FFI shim that can raise mid-`end()`) can release its own resources
    /// before surfacing the error, without ever leaking `active_recording`.
    pub fn end_guarded(&mut self, frames: &[RawFrame<'_>]) -> i32 {
        match self.end(frames) {
            Ok(()) => 0,
            Err(_) => {
                self.active_recording = PendingRecording::None;
                1
            }
        }
    }

    /// Best-effort incremental liveness pass; may be a no-op per the skip
    /// heuristics in `spec.md` §4.E.
    pub fn update_young<H: GcHost>(&mut self, host: &H) {
        if self.updating {
            self.lifetime.updates_skipped_concurrent += 1;
            return;
        }
        if self.snapshot.is_some() {
            return;
        }
        let gen = host.gc_generation_count();
        if gen == self.update_gen {
            self.lifetime.updates_skipped_gcgen += 1;
            return;
        }
        let now = host.monotonic_ns();
        if self.last_update_ns >= 0
            && now >= 0
            && now.saturating_sub(self.last_update_ns) < MIN_TIME_BETWEEN_UPDATES_NS
        {
            self.lifetime.updates_skipped_time += 1;
            return;
        }

        let stats = self.run_update(host, gen, false, false);
        self.last_update_stats = stats;
        self.lifetime.updates_successful += 1;
        self.lifetime.ewma_young.update(&stats);
    }

    /// Forces a full update (refreshing sizes/frozen-ness when enabled,
    /// including old objects) and installs a snapshot for iteration. Fails
    /// if a snapshot already exists or an update is already in progress;
    /// unlike `update_young`, this is never skipped for gcgen/time reasons.
    pub fn prepare_iteration<H: GcHost>(&mut self, host: &H) -> Result<(), RecorderError> {
        if self.snapshot.is_some() {
            return Err(RecorderError::IterationAlreadyPrepared);
        }
        if self.updating {
            return Err(RecorderError::ConcurrentUpdate);
        }

        let gen = host.gc_generation_count();
        let stats = self.run_update(host, gen, true, true);
        self.last_update_stats = stats;
        self.lifetime.updates_successful += 1;
        self.lifetime.ewma_full.update(&stats);

        self.snapshot = Some(self.object_table.clone());
        Ok(())
    }

    /// Shared walk for both young and full updates. Visits every
    /// `ObjectRecord` by index so dead entries can be swap-removed
    /// in place without disturbing the walk.
    fn run_update<H: GcHost>(
        &mut self,
        host: &H,
        gen: u64,
        include_old: bool,
        refresh_sizes: bool,
    ) -> LastUpdateStats {
        self.updating = true;
        let mut stats = LastUpdateStats::default();

        let mut index = 0;
        while index < self.object_table.len() {
            let (alloc_gen, obj_id) = match self.object_table.get_index(index) {
                Some((&id, record)) => (record.data.alloc_gen, id),
                None => break,
            };
            let gen_age = gen.saturating_sub(alloc_gen);

            if !include_old && (gen_age == 0 || gen_age >= OLD_AGE) {
                stats.objects_skipped += 1;
                index += 1;
                continue;
            }

            match host.resolve_id(obj_id) {
                None => {
                    if let Some((_, removed)) = self.object_table.swap_remove_index(index) {
                        self.stack_table.drop_one(&removed.heap);
                    }
                    stats.objects_dead += 1;
                    // Do not advance `index`: swap_remove moved the last
                    // entry into this slot.
                }
                Some(obj_ref) => {
                    if let Some((_, record)) = self.object_table.get_index_mut(index) {
                        record.data.gen_age = gen_age;
                        if refresh_sizes && self.size_enabled && !record.data.is_frozen {
                            record.data.size = host.size_of(&obj_ref);
                            record.data.is_frozen = host.is_frozen(&obj_ref);
                        }
                        if record.data.is_frozen {
                            stats.objects_frozen += 1;
                        }
                    }
                    stats.objects_alive += 1;
                    index += 1;
                }
            }
        }

        self.update_gen = gen;
        self.last_update_ns = host.monotonic_ns();
        self.updating = false;
        stats
    }

    /// Walks the prepared snapshot, calling `cb` for every record whose
    /// `gen_age >= ITERATION_MIN_AGE`. Returns `false` without calling `cb`
    /// if no snapshot is prepared.
    ///
    /// This is the one recorder operation allowed to run without the
    /// host's cooperative mutator lock held (`spec.md` §5): the snapshot
    /// only references memory the two tables own and which is frozen for
    /// its lifetime (`update_young`/`prepare_iteration` bail while a
    /// snapshot exists), and the locations buffer built here is local to
    /// this call, not shared recorder state. `cb` must not allocate via the
    /// host runtime, raise, or call anything that needs the mutator lock —
    /// that contract is one-way and not enforced by this crate.
    pub fn for_each_live_object<C>(&self, mut cb: C) -> bool
    where
        C: FnMut(IterationRecord<'_>) -> bool,
    {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return false;
        };

        let mut locations: Vec<Location<'_>> = Vec::new();
        for (_, record) in snapshot.iter() {
            if record.data.gen_age < ITERATION_MIN_AGE {
                continue;
            }
            locations.clear();
            locations.extend(record.heap.stack.frames().iter().map(|frame| Location {
                function_name: &frame.function_name,
                file_name: &frame.file_name,
                line: frame.line,
            }));
            let iteration_record = IterationRecord {
                object_data: &record.data,
                locations: &locations,
            };
            if !cb(iteration_record) {
                return true;
            }
        }
        true
    }

    /// Frees the snapshot (but not the records it shares with the primary
    /// table). Fails if no snapshot is prepared.
    pub fn finish_iteration(&mut self) -> Result<(), RecorderError> {
        if self.snapshot.take().is_none() {
            return Err(RecorderError::NoIterationPrepared);
        }
        Ok(())
    }

    /// Reconciles a snapshot left in progress across a fork and resets
    /// lifetime statistics. Tracked objects survive: the child inherits
    /// the parent's live object graph.
    pub fn after_fork(&mut self) {
        if self.snapshot.is_some() {
            let _ = self.finish_iteration();
        }
        self.updating = false;
        self.last_update_stats = LastUpdateStats::default();
        self.lifetime = LifetimeStats::default();
    }

    /// Table sizes, last-update stats, and lifetime stats as a mapping of
    /// stable, symbolic keys to numeric values (`spec.md` §6).
    pub fn state_snapshot(&self) -> IndexMap<&'static str, f64, FxBuildHasher> {
        let mut map = IndexMap::default();
        map.insert("num_object_records", self.object_table.len() as f64);
        map.insert("num_heap_records", self.stack_table.len() as f64);
        map.insert(
            "last_update_objects_alive",
            self.last_update_stats.objects_alive as f64,
        );
        map.insert(
            "last_update_objects_dead",
            self.last_update_stats.objects_dead as f64,
        );
        map.insert(
            "last_update_objects_skipped",
            self.last_update_stats.objects_skipped as f64,
        );
        map.insert(
            "last_update_objects_frozen",
            self.last_update_stats.objects_frozen as f64,
        );
        map.insert(
            "lifetime_updates_successful",
            self.lifetime.updates_successful as f64,
        );
        map.insert(
            "lifetime_updates_skipped_concurrent",
            self.lifetime.updates_skipped_concurrent as f64,
        );
        map.insert(
            "lifetime_updates_skipped_gcgen",
            self.lifetime.updates_skipped_gcgen as f64,
        );
        map.insert(
            "lifetime_updates_skipped_time",
            self.lifetime.updates_skipped_time as f64,
        );
        map.insert(
            "lifetime_ewma_young_objects_alive",
            self.lifetime.ewma_young.alive(),
        );
        map.insert(
            "lifetime_ewma_young_objects_dead",
            self.lifetime.ewma_young.dead(),
        );
        map.insert(
            "lifetime_ewma_young_objects_skipped",
            self.lifetime.ewma_young.skipped(),
        );
        map.insert(
            "lifetime_ewma_objects_alive",
            self.lifetime.ewma_full.alive(),
        );
        map.insert("lifetime_ewma_objects_dead", self.lifetime.ewma_full.dead());
        map.insert(
            "lifetime_ewma_objects_skipped",
            self.lifetime.ewma_full.skipped(),
        );
        map
    }

    /// Releases all owned memory. In Rust this is just `Drop`; the method
    /// exists to keep the surface matching `spec.md`'s table for callers
    /// porting from the C API, where `free()` on an already-freed recorder
    /// is idempotent because the caller is expected to null out their
    /// pointer — ownership here makes a second call impossible to express.
    pub fn free(self) {}
}
