// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A hand-written `GcHost` mock for exercising the recorder end to end,
//! without a real managed runtime attached.

use libdd_heap_liveness::GcHost;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct MockObj(pub i64);

#[derive(Default)]
pub struct MockHost {
    gen: Cell<u64>,
    clock_ns: Cell<i64>,
    sizes: RefCell<HashMap<i64, usize>>,
    frozen: RefCell<HashMap<i64, bool>>,
    dead: RefCell<std::collections::HashSet<i64>>,
    unrecordable: RefCell<std::collections::HashSet<i64>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_generation(&self, gen: u64) {
        self.gen.set(gen);
    }

    pub fn advance_clock_ns(&self, delta: i64) {
        self.clock_ns.set(self.clock_ns.get() + delta);
    }

    pub fn set_size(&self, id: i64, size: usize) {
        self.sizes.borrow_mut().insert(id, size);
    }

    pub fn set_frozen(&self, id: i64, frozen: bool) {
        self.frozen.borrow_mut().insert(id, frozen);
    }

    pub fn kill(&self, id: i64) {
        self.dead.borrow_mut().insert(id);
    }

    pub fn mark_unrecordable(&self, id: i64) {
        self.unrecordable.borrow_mut().insert(id);
    }
}

impl GcHost for MockHost {
    type ObjRef = MockObj;

    fn gc_generation_count(&self) -> u64 {
        self.gen.get()
    }

    fn object_id(&self, obj: &MockObj) -> i64 {
        obj.0
    }

    fn resolve_id(&self, id: i64) -> Option<MockObj> {
        if self.dead.borrow().contains(&id) {
            None
        } else {
            Some(MockObj(id))
        }
    }

    fn size_of(&self, obj: &MockObj) -> usize {
        *self.sizes.borrow().get(&obj.0).unwrap_or(&0)
    }

    fn is_frozen(&self, obj: &MockObj) -> bool {
        *self.frozen.borrow().get(&obj.0).unwrap_or(&false)
    }

    fn monotonic_ns(&self) -> i64 {
        self.clock_ns.get()
    }

    fn kind_is_unrecordable(&self, obj: &MockObj) -> bool {
        self.unrecordable.borrow().contains(&obj.0)
    }
}
