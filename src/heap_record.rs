// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecorderError;
use crate::frame::Stack;
use std::cell::Cell;

/// A deduplicated allocation-stack record: one per distinct [`Stack`] seen
/// by the recorder.
///
/// Shared via `Rc` between the stack-dedup table (the owner) and every
/// [`crate::ObjectRecord`] allocated at this call site (non-owning
/// borrowers, in the sense that they never decide when the record goes
/// away — `tracked` does). `tracked` is a plain [`Cell`] rather than a
/// `RefCell` because it's the only field that ever changes after
/// construction and it's `Copy`.
pub struct HeapRecord {
    pub stack: Stack,
    pub(crate) hash: u64,
    tracked: Cell<u32>,
}

impl HeapRecord {
    pub(crate) fn new(stack: Stack, hash: u64) -> Self {
        HeapRecord {
            stack,
            hash,
            tracked: Cell::new(0),
        }
    }

    pub fn tracked(&self) -> u32 {
        self.tracked.get()
    }

    /// Increments the tracked-object count. Callers must check
    /// [`HeapRecord::tracked`] against `u32::MAX` first; see
    /// `spec.md` §4.B ("tracked saturates at u32::MAX — reaching it is a
    /// hard failure").
    pub(crate) fn increment_tracked(&self) -> Result<(), RecorderError> {
        let current = self.tracked.get();
        if current == u32::MAX {
            return Err(RecorderError::TrackedCountSaturated);
        }
        self.tracked.set(current + 1);
        Ok(())
    }

    /// Decrements the tracked-object count and returns the new value.
    pub(crate) fn decrement_tracked(&self) -> u32 {
        let next = self.tracked.get().saturating_sub(1);
        self.tracked.set(next);
        next
    }

    /// Forces `tracked` to an arbitrary value. Only exists so tests can
    /// reach the `u32::MAX` saturation path without four billion real
    /// increments.
    #[cfg(test)]
    pub(crate) fn set_tracked_for_test(&self, value: u32) {
        self.tracked.set(value);
    }
}
