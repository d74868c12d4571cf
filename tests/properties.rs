// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the invariants listed in `spec.md` §8 (P1-P8).

mod common;

use common::{MockHost, MockObj};
use libdd_heap_liveness::{RawFrame, Recorder};
use proptest::prelude::*;

fn frames_for(tag: i32) -> Vec<RawFrame<'static>> {
    vec![RawFrame {
        function_name: "f",
        file_name: "f.rb",
        line: tag as i64,
    }]
}

fn commit(recorder: &mut Recorder, host: &MockHost, id: i64, tag: i32) {
    recorder
        .begin(host, &MockObj(id), 1, "C")
        .expect("begin");
    recorder.end(&frames_for(tag)).expect("end");
}

// P1: num_heap_records == distinct stacks committed; num_object_records ==
// number of committed (non-skipped) pairs.
proptest! {
    #[test]
    fn p1_counts_match_distinct_stacks_and_commits(
        tags in prop::collection::vec(0i32..5, 0..40),
    ) {
        let host = MockHost::new();
        let mut recorder = Recorder::new();
        let mut distinct = std::collections::HashSet::new();
        for (i, &tag) in tags.iter().enumerate() {
            distinct.insert(tag);
            commit(&mut recorder, &host, i as i64, tag);
        }
        prop_assert_eq!(recorder.num_heap_records(), distinct.len());
        prop_assert_eq!(recorder.num_object_records(), tags.len());
    }
}

// P2: dual-key hashing/equality agreement — covered directly (no proptest
// randomness needed beyond what frame.rs's unit tests already do), plus a
// proptest sweep over arbitrary frame content.
proptest! {
    #[test]
    fn p2_dual_key_hash_and_eq_agree(
        name in "[a-zA-Z_]{0,16}",
        file in "[a-zA-Z_./]{0,16}",
        line in any::<i64>(),
    ) {
        let raw = [RawFrame { function_name: &name, file_name: &file, line }];
        let stack = libdd_heap_liveness::Stack::from_raw_frames(&raw).unwrap();
        prop_assert!(stack.matches_raw_frames(&raw));
    }
}

#[test]
fn p3_full_update_with_all_dead_empties_both_tables() {
    let host = MockHost::new();
    let mut recorder = Recorder::new();
    for id in 0..5 {
        commit(&mut recorder, &host, id, 0);
        host.kill(id);
    }
    host.set_generation(1);
    recorder.prepare_iteration(&host).unwrap();
    assert_eq!(recorder.num_object_records(), 0);
    assert_eq!(recorder.num_heap_records(), 0);
}

#[test]
fn p4_full_update_with_all_alive_preserves_count_and_ages() {
    let host = MockHost::new();
    let mut recorder = Recorder::new();
    for id in 0..5 {
        commit(&mut recorder, &host, id, 0);
    }
    host.set_generation(7);
    recorder.prepare_iteration(&host).unwrap();
    assert_eq!(recorder.num_object_records(), 5);

    let mut ages = Vec::new();
    recorder.for_each_live_object(|r| {
        ages.push(r.object_data.gen_age);
        true
    });
    assert!(ages.iter().all(|&age| age == 7));
}

#[test]
fn p5_sample_rate_commits_every_kth() {
    let host = MockHost::new();
    for k in 1..=5u32 {
        let mut recorder = Recorder::new();
        recorder.set_sample_rate(k).unwrap();
        let n = 37i64;
        for id in 0..n {
            commit(&mut recorder, &host, id, 0);
        }
        assert_eq!(recorder.num_object_records(), (n as u32 / k) as usize);
    }
}

#[test]
fn p6_dedup_sharing_refcounts() {
    let host = MockHost::new();
    let mut recorder = Recorder::new();
    commit(&mut recorder, &host, 1, 0);
    commit(&mut recorder, &host, 2, 0);
    assert_eq!(recorder.num_heap_records(), 1);

    host.kill(2);
    host.set_generation(1);
    recorder.prepare_iteration(&host).unwrap();
    assert_eq!(recorder.num_heap_records(), 1);
    assert_eq!(recorder.num_object_records(), 1);

    host.kill(1);
    host.set_generation(2);
    recorder.prepare_iteration(&host).unwrap();
    assert_eq!(recorder.num_heap_records(), 0);
}

#[test]
fn p7_iteration_yields_only_age_at_least_one() {
    let host = MockHost::new();
    let mut recorder = Recorder::new();
    commit(&mut recorder, &host, 1, 0); // alloc_gen = 0
    host.set_generation(0);
    recorder.prepare_iteration(&host).unwrap(); // gen_age == 0, excluded
    let mut count = 0;
    recorder.for_each_live_object(|_| {
        count += 1;
        true
    });
    assert_eq!(count, 0);
    recorder.finish_iteration().unwrap();

    host.set_generation(1);
    recorder.prepare_iteration(&host).unwrap(); // gen_age == 1, included
    count = 0;
    recorder.for_each_live_object(|_| {
        count += 1;
        true
    });
    assert_eq!(count, 1);
}

#[test]
fn p8_young_update_noop_between_identical_generations() {
    let host = MockHost::new();
    let mut recorder = Recorder::new();
    host.set_generation(5);
    recorder.update_young(&host);
    recorder.update_young(&host);
    assert_eq!(
        recorder.state_snapshot()["lifetime_updates_skipped_gcgen"],
        1.0
    );
}
