// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Heap-liveness bookkeeping for a sampling heap profiler embedded in a
//! managed runtime with a generational, tracing garbage collector.
//!
//! [`Recorder`] remembers, for every sampled allocation, the stack that
//! produced it and a handful of per-object facts (weight, class, size,
//! age, frozen-ness), deduplicating stacks across objects that share an
//! allocation site. At flush time, [`Recorder::prepare_iteration`] and
//! [`Recorder::for_each_live_object`] hand the still-live subset back to
//! a profile serializer.
//!
//! The recorder does not sample, walk stacks, serialize profiles, or
//! detect frees via runtime hooks; liveness is inferred lazily by
//! re-resolving object ids through [`GcHost::resolve_id`] during update
//! passes. It assumes serialized (non-concurrent) access; see
//! [`Recorder::for_each_live_object`] for the one documented exception.

mod error;
mod frame;
mod heap_record;
mod hooks;
mod iteration;
mod object_record;
mod object_table;
mod recorder;
mod stack_table;
mod stats;

pub use error::RecorderError;
pub use frame::{Frame, RawFrame, Stack, MAX_FRAMES_LIMIT};
pub use hooks::GcHost;
pub use iteration::{IterationRecord, Location};
pub use object_record::{LiveObjectData, ObjectId, ObjectRecord};
pub use object_table::FxBuildHasher;
pub use recorder::Recorder;
pub use stats::LastUpdateStats;

/// Age (in GC generations) at which an object is considered old and is only
/// reclaimed by major collections. Old objects are skipped by young updates.
pub const OLD_AGE: u64 = 3;

/// Minimum `gen_age` an object must have at snapshot time to be handed to
/// the iteration callback. Age-0 objects haven't survived a single GC yet
/// and are usually noise that the next collection will trivially reclaim.
pub const ITERATION_MIN_AGE: u64 = 1;

/// Minimum spacing between two young updates that actually do work.
pub const MIN_TIME_BETWEEN_UPDATES_NS: i64 = 2_000_000_000;

/// Smoothing factor for the lifetime EWMA statistics.
pub const EWMA_ALPHA: f64 = 0.3;

#[cfg(debug_assertions)]
pub use frame::debug_self_check_dual_key_hash;
