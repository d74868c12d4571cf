// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::object_record::LiveObjectData;

/// One frame as handed to the downstream profile serializer.
///
/// Mirrors the serializer's own frame shape minus its `mapping` fields:
/// heap-liveness records never populate those, so this crate doesn't model
/// them (see `DESIGN.md`). Strings are borrowed from the owning `Stack`;
/// the callback must consume or copy them synchronously, since they don't
/// outlive the [`crate::Recorder::for_each_live_object`] call that produced
/// them.
#[derive(Clone, Copy, Debug)]
pub struct Location<'a> {
    pub function_name: &'a str,
    pub file_name: &'a str,
    pub line: i32,
}

/// One live object handed to the iteration callback: its per-object data
/// plus the allocation stack that produced it.
#[derive(Debug)]
pub struct IterationRecord<'a> {
    pub object_data: &'a LiveObjectData,
    pub locations: &'a [Location<'a>],
}
