//! Epoch clock adapter.
//!
//! Combines a monotonic uptime counter with the server epoch obtained once
//! at startup. Before the sync the clock reports plain uptime seconds, which
//! is what a node with an unreachable registry stamps its records with.

use core::cell::Cell;
use std::time::Instant;

use log::info;

use crate::app::ports::ClockPort;

/// Wall-clock source for the edge node.
pub struct EpochClock {
    start: Instant,
    /// Server epoch minus uptime at the moment of sync.
    offset: Cell<Option<u64>>,
}

impl Default for EpochClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Cell::new(None),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    pub fn is_synced(&self) -> bool {
        self.offset.get().is_some()
    }

    /// Anchor the clock to `server_epoch`. Only the first call has effect.
    pub fn sync(&self, server_epoch: u64) -> bool {
        if self.is_synced() {
            return false;
        }
        let offset = server_epoch.saturating_sub(self.uptime_secs());
        self.offset.set(Some(offset));
        info!("Clock: synced to server epoch {}", server_epoch);
        true
    }
}

impl ClockPort for EpochClock {
    fn now_unix(&self) -> u64 {
        self.offset.get().unwrap_or(0).saturating_add(self.uptime_secs())
    }
}
