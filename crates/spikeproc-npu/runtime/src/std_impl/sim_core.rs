// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Simulated application core: interrupt controller, DMA controller and external memory
//!
//! ARCHITECTURE:
//! - One `SimState` behind a lock; `SimCore`, `SimInterrupts`, `SimDma` and the user-event
//!   trigger are cheap handles onto it
//! - Pending interrupts sit in a priority queue ordered by (priority, arrival); the
//!   harness that owns the handlers pops them and runs the matching handler
//! - DMA copies happen when the transfer starts; completion is raised as an interrupt and
//!   only counts as finished once the harness pops it

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use spikeproc_npu_neural::SpikeKey;

use super::memory::SimSdram;
use super::trace::{SimTrace, TraceEvent};
use crate::traits::{
    DmaController, DmaDirection, InterruptController, InterruptSource, Priority, Result,
    RuntimeError, UserEvent, UserEventTrigger,
};

/// An interrupt waiting to be serviced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Packet { key: SpikeKey },
    PacketWithPayload { key: SpikeKey, payload: u32 },
    DmaDone { tag: u32 },
    DmaError { tag: u32 },
    UserEvent(UserEvent),
    Timer { time: u32 },
}

impl SimEvent {
    pub fn source(&self) -> InterruptSource {
        match self {
            SimEvent::Packet { .. } => InterruptSource::MulticastPacket,
            SimEvent::PacketWithPayload { .. } => InterruptSource::MulticastPacketWithPayload,
            SimEvent::DmaDone { .. } => InterruptSource::DmaTransferDone,
            SimEvent::DmaError { .. } => InterruptSource::DmaError,
            SimEvent::UserEvent(_) => InterruptSource::UserEvent,
            SimEvent::Timer { .. } => InterruptSource::Timer,
        }
    }
}

#[derive(Debug)]
struct PendingEvent {
    priority: Priority,
    seq: u64,
    event: SimEvent,
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    // BinaryHeap is a max-heap: most urgent priority first, then earliest arrival
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// DMA activity observed by the simulated controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmaStats {
    pub reads_started: u32,
    pub writes_started: u32,
    pub completed: u32,
    pub in_flight: u32,
    /// Largest number of transfers outstanding at once
    pub max_in_flight: u32,
}

struct SimState {
    registrations: AHashMap<InterruptSource, Priority>,
    pending: BinaryHeap<PendingEvent>,
    next_seq: u64,
    user_event_pending: bool,
    sdram: SimSdram,
    dma: DmaStats,
    fail_next_dma: bool,
}

impl SimState {
    /// Queue an event at its registered priority; events without a handler are dropped.
    fn raise(&mut self, event: SimEvent) -> bool {
        let Some(&priority) = self.registrations.get(&event.source()) else {
            return false;
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingEvent {
            priority,
            seq,
            event,
        });
        true
    }

    fn take(&mut self) -> Option<SimEvent> {
        let pending = self.pending.pop()?;
        match pending.event {
            SimEvent::UserEvent(_) => self.user_event_pending = false,
            SimEvent::DmaDone { .. } | SimEvent::DmaError { .. } => {
                self.dma.in_flight = self.dma.in_flight.saturating_sub(1);
                self.dma.completed += 1;
            }
            _ => {}
        }
        Some(pending.event)
    }
}

/// Handle onto a simulated application core.
#[derive(Clone)]
pub struct SimCore {
    state: Arc<Mutex<SimState>>,
    trace: SimTrace,
}

impl SimCore {
    /// Create a core with `sdram_bytes` of external memory
    pub fn new(sdram_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                registrations: AHashMap::new(),
                pending: BinaryHeap::new(),
                next_seq: 0,
                user_event_pending: false,
                sdram: SimSdram::new(sdram_bytes),
                dma: DmaStats::default(),
                fail_next_dma: false,
            })),
            trace: SimTrace::new(),
        }
    }

    pub fn interrupts(&self) -> SimInterrupts {
        SimInterrupts { core: self.clone() }
    }

    pub fn dma(&self) -> SimDma {
        SimDma { core: self.clone() }
    }

    /// Shared event log (DMA, plasticity and contribution order)
    pub fn trace(&self) -> SimTrace {
        self.trace.clone()
    }

    /// Raise an interrupt; returns false if no handler is registered for its source
    pub fn raise(&self, event: SimEvent) -> bool {
        self.state.lock().raise(event)
    }

    /// Pop the most urgent pending interrupt
    pub fn pop_next(&self) -> Option<SimEvent> {
        let event = self.state.lock().take();
        if let Some(SimEvent::DmaDone { tag }) = event {
            self.trace.push(TraceEvent::DmaCompleted { tag });
        }
        event
    }

    /// Pop the most urgent pending interrupt only if it would preempt `priority`
    pub fn pop_preempting(&self, priority: Priority) -> Option<SimEvent> {
        {
            let state = self.state.lock();
            match state.pending.peek() {
                Some(pending) if pending.priority < priority => {}
                _ => return None,
            }
        }
        self.pop_next()
    }

    /// Priority of the next pending interrupt
    pub fn peek_priority(&self) -> Option<Priority> {
        self.state.lock().pending.peek().map(|p| p.priority)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    pub fn priority_of(&self, source: InterruptSource) -> Option<Priority> {
        self.state.lock().registrations.get(&source).copied()
    }

    /// Store a block (e.g. a row image) in external memory and return its address
    pub fn store(&self, data: &[u8]) -> Result<u32> {
        self.state.lock().sdram.store(data)
    }

    /// Copy of external memory contents
    pub fn read_memory(&self, address: u32, n_bytes: usize) -> Result<Vec<u8>> {
        Ok(self.state.lock().sdram.read(address, n_bytes)?.to_vec())
    }

    pub fn dma_stats(&self) -> DmaStats {
        self.state.lock().dma.clone()
    }

    /// Make the next DMA transfer raise `DmaError` instead of completing
    pub fn fail_next_dma(&self) {
        self.state.lock().fail_next_dma = true;
    }
}

/// Simulated interrupt controller
#[derive(Clone)]
pub struct SimInterrupts {
    core: SimCore,
}

impl InterruptController for SimInterrupts {
    type Trigger = SimUserEventTrigger;

    fn register(&mut self, source: InterruptSource, priority: Priority) -> Result<()> {
        let mut state = self.core.state.lock();
        if state.registrations.contains_key(&source) {
            return Err(RuntimeError::AlreadyRegistered { source });
        }
        state.registrations.insert(source, priority);
        Ok(())
    }

    fn user_event_trigger(&self) -> Self::Trigger {
        SimUserEventTrigger {
            state: Arc::clone(&self.core.state),
        }
    }
}

/// Posts user events into the simulated interrupt queue; coalesces while one is pending.
#[derive(Clone)]
pub struct SimUserEventTrigger {
    state: Arc<Mutex<SimState>>,
}

impl UserEventTrigger for SimUserEventTrigger {
    fn trigger_user_event(&self, event: UserEvent) -> bool {
        let mut state = self.state.lock();
        if state.user_event_pending {
            return false;
        }
        if state.raise(SimEvent::UserEvent(event)) {
            state.user_event_pending = true;
            true
        } else {
            false
        }
    }
}

/// Simulated DMA controller
#[derive(Clone)]
pub struct SimDma {
    core: SimCore,
}

impl DmaController for SimDma {
    fn start_transfer(
        &mut self,
        tag: u32,
        direction: DmaDirection,
        external_address: u32,
        local: &mut [u8],
    ) -> Result<()> {
        let mut state = self.core.state.lock();
        match direction {
            DmaDirection::Read => {
                let source = state.sdram.read(external_address, local.len())?;
                local.copy_from_slice(source);
                state.dma.reads_started += 1;
            }
            DmaDirection::Write => {
                state.sdram.write(external_address, local)?;
                state.dma.writes_started += 1;
            }
        }
        state.dma.in_flight += 1;
        state.dma.max_in_flight = state.dma.max_in_flight.max(state.dma.in_flight);

        let completion = if std::mem::take(&mut state.fail_next_dma) {
            SimEvent::DmaError { tag }
        } else {
            SimEvent::DmaDone { tag }
        };
        if !state.raise(completion) {
            state.dma.in_flight -= 1;
            return Err(RuntimeError::DmaRejected { tag });
        }
        drop(state);

        self.core.trace.push(TraceEvent::DmaStarted {
            tag,
            direction,
            address: external_address,
            n_bytes: local.len(),
        });
        Ok(())
    }
}
