// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// The collaborator capabilities the recorder needs from the embedding
/// runtime (`spec.md` §6). Out of scope for this crate: the sampling
/// decision at allocation time, the stack-capture mechanism, and the
/// downstream profile serializer — only the interfaces to them are
/// specified here.
///
/// Implementations are expected to be cheap, synchronous, and callable
/// under the runtime's single cooperative mutator lock; none of these may
/// be called from [`crate::Recorder::for_each_live_object`]'s callback (see
/// its documentation for why).
pub trait GcHost {
    /// An opaque reference to a live object, as understood by the host
    /// runtime. The recorder never inspects this beyond passing it back to
    /// other `GcHost` methods.
    type ObjRef;

    /// Monotonically non-decreasing GC generation/epoch counter.
    fn gc_generation_count(&self) -> u64;

    /// A stable id for `obj`. The recorder requires this to fit in 63 bits.
    fn object_id(&self, obj: &Self::ObjRef) -> i64;

    /// Resolves a previously recorded id back to a live object. `None`
    /// means the object is no longer live.
    fn resolve_id(&self, id: i64) -> Option<Self::ObjRef>;

    /// Approximate retained size of `obj`.
    fn size_of(&self, obj: &Self::ObjRef) -> usize;

    fn is_frozen(&self, obj: &Self::ObjRef) -> bool;

    /// Monotonic clock reading in nanoseconds, or negative on failure.
    fn monotonic_ns(&self) -> i64;

    /// True for object kinds whose id cannot be reliably retrieved on the
    /// current runtime version. Such objects are administratively skipped
    /// at `begin()` rather than recorded with a bogus id.
    fn kind_is_unrecordable(&self, obj: &Self::ObjRef) -> bool;
}
