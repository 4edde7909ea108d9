#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use kdm_contracts::survivor::SurvivorMeta;
use tracing::debug;

pub const MANAGEABLE_SETTLE_MS_DEFAULT: u64 = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageableVerdict {
    /// Cards are still initializing.
    Pending,
    Satisfied { manageable: u32 },
    /// Every card initialized and none is manageable: the session should reload.
    NoneManageable,
    /// The roster is empty, nothing to verify.
    NothingToManage,
    AlreadyChecked,
}

/// One-shot barrier deciding when survivor cards have finished initializing.
///
/// Settles when the number of initialized cards reaches the expected total.
/// Without a known total it falls back to a fixed delay after `arm`. Each
/// load gets a fresh barrier through `reset`.
#[derive(Debug, Clone)]
pub struct ManageableBarrier {
    expected_cards: Option<u32>,
    settle_after: Duration,
    armed_at: Option<Instant>,
    initialized: u32,
    manageable: u32,
    departing: u32,
    checked: bool,
}

impl ManageableBarrier {
    pub fn new(expected_cards: Option<u32>, settle_after: Duration) -> Self {
        Self {
            expected_cards,
            settle_after,
            armed_at: None,
            initialized: 0,
            manageable: 0,
            departing: 0,
            checked: false,
        }
    }

    /// Forgets every counter and the checked flag, keeping the settle delay.
    pub fn reset(&mut self, expected_cards: Option<u32>) {
        *self = Self::new(expected_cards, self.settle_after);
    }

    pub fn record_card(&mut self, meta: &SurvivorMeta, departing: bool) {
        self.initialized = self.initialized.saturating_add(1);
        if meta.manageable {
            self.manageable = self.manageable.saturating_add(1);
        }
        if departing {
            self.departing = self.departing.saturating_add(1);
        }
    }

    /// Starts the fallback timer. Later calls keep the first start time.
    pub fn arm(&mut self, now: Instant) {
        if self.armed_at.is_none() {
            self.armed_at = Some(now);
        }
    }

    pub fn manageable_count(&self) -> u32 {
        self.manageable
    }

    pub fn departing_count(&self) -> u32 {
        self.departing
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    fn settled(&self, now: Instant) -> bool {
        if let Some(expected) = self.expected_cards {
            if self.initialized >= expected {
                return true;
            }
        }
        self.armed_at
            .is_some_and(|t| now.saturating_duration_since(t) >= self.settle_after)
    }

    pub fn poll(&mut self, now: Instant) -> ManageableVerdict {
        if self.checked {
            return ManageableVerdict::AlreadyChecked;
        }
        if self.expected_cards == Some(0) {
            self.checked = true;
            return ManageableVerdict::NothingToManage;
        }
        if !self.settled(now) {
            return ManageableVerdict::Pending;
        }
        self.checked = true;
        debug!(
            initialized = self.initialized,
            manageable = self.manageable,
            departing = self.departing,
            "survivor cards settled"
        );
        if self.manageable == 0 {
            ManageableVerdict::NoneManageable
        } else {
            ManageableVerdict::Satisfied {
                manageable: self.manageable,
            }
        }
    }
}
