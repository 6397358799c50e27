// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ordered log of observable side effects in the simulated platform

use std::sync::Arc;

use parking_lot::Mutex;
use spikeproc_npu_neural::SynapticContribution;

use crate::traits::DmaDirection;

/// One observable side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    DmaStarted {
        tag: u32,
        direction: DmaDirection,
        address: u32,
        n_bytes: usize,
    },
    /// Recorded when the harness services the completion interrupt
    DmaCompleted { tag: u32 },
    PlasticityUpdate { time: u32, n_bytes: usize },
    Restructure { time: u32 },
    Contribution(SynapticContribution),
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct SimTrace {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl SimTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Position of the first event matching `predicate`
    pub fn position(&self, predicate: impl Fn(&TraceEvent) -> bool) -> Option<usize> {
        self.events.lock().iter().position(predicate)
    }

    /// Every contribution, in delivery order
    pub fn contributions(&self) -> Vec<SynapticContribution> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Contribution(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}
