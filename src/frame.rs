// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecorderError;

/// Upper bound on the number of frames a single [`Stack`] may hold.
///
/// Matches the original implementation's 16-bit frame-count field; kept in
/// sync with the hash algorithm, which folds frames in order and would
/// otherwise have no natural limit.
pub const MAX_FRAMES_LIMIT: usize = u16::MAX as usize;

const HASH_SEED: u64 = 0x811c_9dc5;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline]
fn fnv1a(mut state: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        state ^= u64::from(byte);
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

/// Hashes the bytes that make up a single frame: the function name, the
/// file name, and the line number in native byte order. This is the one
/// helper both the owned ([`Frame`]) and borrowed ([`RawFrame`]) arms call,
/// so that hashing an owned stack and a borrowed slice built from the same
/// data can never drift apart.
#[inline]
fn hash_frame_parts(function_name: &str, file_name: &str, line: i32) -> u64 {
    let state = HASH_SEED;
    let state = fnv1a(state, function_name.as_bytes());
    let state = fnv1a(state, file_name.as_bytes());
    fnv1a(state, &line.to_ne_bytes())
}

#[inline]
fn fold_frame_hashes<I: IntoIterator<Item = u64>>(frame_hashes: I) -> u64 {
    let mut state = HASH_SEED;
    for h in frame_hashes {
        state = fnv1a(state, &h.to_ne_bytes());
    }
    state
}

/// An owned, compact representation of one call-stack frame.
///
/// Strings are heap-allocated copies of whatever the stack-capture
/// mechanism handed in; `line` is truncated from the input's 64-bit line
/// number, matching the original implementation's `int32_t` field and kept
/// in lockstep with it for hash compatibility.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub function_name: Box<str>,
    pub file_name: Box<str>,
    pub line: i32,
}

impl Frame {
    fn from_raw(raw: &RawFrame<'_>) -> Self {
        Frame {
            function_name: Box::from(raw.function_name),
            file_name: Box::from(raw.file_name),
            line: truncate_line(raw.line),
        }
    }

    fn hash(&self) -> u64 {
        hash_frame_parts(&self.function_name, &self.file_name, self.line)
    }
}

#[inline]
fn truncate_line(line: i64) -> i32 {
    line as i32
}

/// A borrowed frame as delivered by the external stack-capture mechanism:
/// a 64-bit line number that this crate truncates to 32 bits on ingest.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    pub function_name: &'a str,
    pub file_name: &'a str,
    pub line: i64,
}

impl RawFrame<'_> {
    fn hash(&self) -> u64 {
        hash_frame_parts(self.function_name, self.file_name, truncate_line(self.line))
    }
}

/// An owned, immutable call stack, content-hashed and content-compared.
///
/// `Stack`s are never mutated after construction; the stack-dedup table
/// relies on that to share one `Stack` across every tracked object
/// allocated at the same call site.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stack {
    frames: Box<[Frame]>,
}

impl Stack {
    pub fn from_raw_frames(frames: &[RawFrame<'_>]) -> Result<Self, RecorderError> {
        if frames.len() > MAX_FRAMES_LIMIT {
            return Err(RecorderError::TooManyFrames {
                frames: frames.len(),
                limit: MAX_FRAMES_LIMIT,
            });
        }
        Ok(Stack {
            frames: frames.iter().map(Frame::from_raw).collect(),
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Equality against a borrowed frame slice, length-first: this is the
    /// comparator side of the dual-key contract (see [`hash_raw_frames`]).
    pub fn matches_raw_frames(&self, frames: &[RawFrame<'_>]) -> bool {
        if self.frames.len() != frames.len() {
            return false;
        }
        self.frames.iter().zip(frames.iter()).all(|(owned, raw)| {
            owned.line == truncate_line(raw.line)
                && owned.function_name.as_ref() == raw.function_name
                && owned.file_name.as_ref() == raw.file_name
        })
    }
}

/// Hashes an owned [`Stack`]. Produces the same digest as
/// [`hash_raw_frames`] over an equivalent borrowed slice — this is the
/// dual-key contract the stack-dedup table depends on (see `spec.md` P2).
pub fn hash_stack(stack: &Stack) -> u64 {
    fold_frame_hashes(stack.frames.iter().map(Frame::hash))
}

/// Hashes a borrowed slice of [`RawFrame`]s without allocating. Must agree
/// with [`hash_stack`] for any slice and the `Stack` built from it.
pub fn hash_raw_frames(frames: &[RawFrame<'_>]) -> u64 {
    fold_frame_hashes(frames.iter().map(RawFrame::hash))
}

/// Verifies the dual-key hash contract (P2) for a fixed frame sequence.
/// Exposed so embedders can wire it into their own startup self-checks; any
/// divergence here is a bug in this crate, not in the caller.
#[cfg(debug_assertions)]
pub fn debug_self_check_dual_key_hash() -> bool {
    let raw = [
        RawFrame {
            function_name: "top_level",
            file_name: "app.rb",
            line: 42,
        },
        RawFrame {
            function_name: "<main>",
            file_name: "app.rb",
            line: 7,
        },
    ];
    let stack = match Stack::from_raw_frames(&raw) {
        Ok(s) => s,
        Err(_) => return false,
    };
    hash_stack(&stack) == hash_raw_frames(&raw) && stack.matches_raw_frames(&raw)
}
