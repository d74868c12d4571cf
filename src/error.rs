// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Programming-contract violations and wrapper-captured failures.
///
/// Every variant here corresponds to a bug in the surrounding profiler, not
/// to an expected runtime condition — transient update skips and liveness
/// failures (a dead object's id no longer resolving) are silent and never
/// surface through this type; they are tallied in [`crate::LastUpdateStats`]
/// and the recorder's lifetime statistics instead.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("begin() called while a recording is already active")]
    RecordingAlreadyActive,

    #[error("end() called without a matching begin()")]
    NoActiveRecording,

    #[error("object id {0} does not fit in 63 bits")]
    ObjectIdTooLarge(i64),

    #[error("stack has {frames} frames, exceeding MAX_FRAMES_LIMIT ({limit})")]
    TooManyFrames { frames: usize, limit: usize },

    #[error("heap record tracked-object count saturated at u32::MAX")]
    TrackedCountSaturated,

    #[error("object id committed twice: existing={{{existing}}}, new={{{new}}}")]
    DuplicateObjectId { existing: String, new: String },

    #[error("sample_rate must be >= 1, got {0}")]
    InvalidSampleRate(u32),

    #[error("prepare_iteration() called while a snapshot already exists")]
    IterationAlreadyPrepared,

    #[error("finish_iteration() called without a prepared snapshot")]
    NoIterationPrepared,

    #[error("prepare_iteration() called while an update is already in progress")]
    ConcurrentUpdate,
}
