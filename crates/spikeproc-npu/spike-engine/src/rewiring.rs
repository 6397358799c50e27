// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rewiring subsystem: pending structural-plasticity attempts
//!
//! Requests accumulate; the fetch engine consumes one whenever it finds the incoming
//! spike buffer empty, so rewiring never delays real traffic.

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewiringScheduler {
    pending: u32,
}

impl RewiringScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` attempts to the pending count (saturating)
    pub fn request(&mut self, n: u32) {
        self.pending = self.pending.saturating_add(n);
        debug!(n, pending = self.pending, "Rewires requested");
    }

    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Consume one attempt; false when none are pending
    pub fn take_one(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}
