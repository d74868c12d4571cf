// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::EWMA_ALPHA;

/// Counts produced by the most recent successful update (young or full).
#[derive(Clone, Copy, Debug, Default)]
pub struct LastUpdateStats {
    pub objects_alive: u64,
    pub objects_dead: u64,
    pub objects_skipped: u64,
    /// Only meaningful after a full update; young updates never refresh
    /// frozen-ness, so this mirrors whatever the previous full update saw.
    pub objects_frozen: u64,
}

/// An exponentially-weighted moving average, seeded by its first sample.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Ewma {
    alive: f64,
    dead: f64,
    skipped: f64,
    seeded: bool,
}

impl Ewma {
    fn blend(previous: f64, current: f64) -> f64 {
        EWMA_ALPHA * current + (1.0 - EWMA_ALPHA) * previous
    }

    pub fn update(&mut self, stats: &LastUpdateStats) {
        let alive = stats.objects_alive as f64;
        let dead = stats.objects_dead as f64;
        let skipped = stats.objects_skipped as f64;
        if !self.seeded {
            self.alive = alive;
            self.dead = dead;
            self.skipped = skipped;
            self.seeded = true;
            return;
        }
        self.alive = Self::blend(self.alive, alive);
        self.dead = Self::blend(self.dead, dead);
        self.skipped = Self::blend(self.skipped, skipped);
    }

    pub fn alive(&self) -> f64 {
        self.alive
    }

    pub fn dead(&self) -> f64 {
        self.dead
    }

    pub fn skipped(&self) -> f64 {
        self.skipped
    }
}

/// Statistics accumulated over the recorder's lifetime, reset on
/// [`crate::Recorder::after_fork`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LifetimeStats {
    pub updates_successful: u64,
    pub updates_skipped_concurrent: u64,
    pub updates_skipped_gcgen: u64,
    pub updates_skipped_time: u64,
    pub ewma_young: Ewma,
    pub ewma_full: Ewma,
}
