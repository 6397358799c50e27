// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host simulation harness
//!
//! Drives a [`SpikeProcessing`] core on the simulated platform: events are raised on a
//! [`SimCore`] and dispatched one at a time in interrupt-priority order, the way the
//! interrupt controller would on hardware.
//!
//! ## Example
//!
//! ```rust,ignore
//! let core = SimCore::new(64 * 1024);
//! let mut table = SimPopulationTable::new();
//! table.insert(SpikeKey(1), location);
//! let mut sim = Simulation::new(&config, core.clone(), SimPlatform::collaborators(&core, table))?;
//! sim.send(SpikeKey(1));
//! sim.run_until_idle();
//! assert_eq!(sim.provenance().n_spikes_processed, 1);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use spikeproc_config::SpikeProcessingConfig;
use spikeproc_npu_neural::{ProvenanceRecord, SpikeKey};
use spikeproc_npu_runtime::std_impl::{SimCore, SimEvent, SimPlatform, SimUserEventTrigger};
use spikeproc_npu_runtime::{Collaborators, InterruptSource};
use tracing::debug;

use crate::dispatcher::{DmaCompletion, PacketReceiver};
use crate::error::{InitError, SpikeProcessingError};
use crate::spike_processing::SpikeProcessing;

/// Shared handle onto the packet interrupt handler.
///
/// Clones can be moved into a collaborator hook to inject packets while a row is being
/// walked. The lock keeps the spike buffer single-producer.
#[derive(Clone)]
pub struct PacketPort {
    receiver: Arc<Mutex<PacketReceiver<SimUserEventTrigger>>>,
}

impl PacketPort {
    /// Run the packet handler for `key` now, as if the packet interrupt preempted the caller
    pub fn deliver(&self, key: SpikeKey) -> bool {
        self.receiver.lock().on_packet(key)
    }

    pub fn deliver_with_payload(&self, key: SpikeKey, payload: u32) -> u32 {
        self.receiver.lock().on_packet_with_payload(key, payload)
    }
}

impl std::fmt::Debug for PacketPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketPort").finish_non_exhaustive()
    }
}

/// A spike-processing core running on the simulated platform
pub struct Simulation {
    core: SimCore,
    engine: SpikeProcessing<SimPlatform>,
    packets: PacketPort,
    dma: DmaCompletion<SimUserEventTrigger>,
    halted: Option<SpikeProcessingError>,
    packets_sent: u64,
    dma_priority: i32,
}

impl Simulation {
    /// Initialise spike processing on `core`.
    pub fn new(
        config: &SpikeProcessingConfig,
        core: SimCore,
        collaborators: Collaborators<SimPlatform>,
    ) -> Result<Self, InitError> {
        let (engine, handlers) = SpikeProcessing::initialise(config, collaborators)?;
        let dma_priority = core
            .priority_of(InterruptSource::DmaTransferDone)
            .unwrap_or(config.dma_callback_priority);
        Ok(Self {
            core,
            engine,
            packets: PacketPort {
                receiver: Arc::new(Mutex::new(handlers.packets)),
            },
            dma: handlers.dma,
            halted: None,
            packets_sent: 0,
            dma_priority,
        })
    }

    pub fn core(&self) -> &SimCore {
        &self.core
    }

    pub fn engine(&self) -> &SpikeProcessing<SimPlatform> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SpikeProcessing<SimPlatform> {
        &mut self.engine
    }

    pub fn packet_port(&self) -> PacketPort {
        self.packets.clone()
    }

    /// Queue a multicast packet interrupt
    pub fn send(&mut self, key: SpikeKey) {
        self.packets_sent += 1;
        self.core.raise(SimEvent::Packet { key });
    }

    pub fn send_burst(&mut self, keys: impl IntoIterator<Item = SpikeKey>) {
        for key in keys {
            self.send(key);
        }
    }

    /// Queue a packet-with-payload interrupt; each repetition counts as a packet
    pub fn send_with_payload(&mut self, key: SpikeKey, payload: u32) {
        self.packets_sent += u64::from(payload);
        self.core.raise(SimEvent::PacketWithPayload { key, payload });
    }

    /// Dispatch queued packet interrupts only, leaving user events and DMA completions queued
    pub fn deliver_packets(&mut self) -> usize {
        let mut n = 0;
        while let Some(event) = self.core.pop_preempting(self.dma_priority) {
            self.dispatch(event);
            n += 1;
        }
        n
    }

    /// Dispatch the most urgent pending interrupt. Returns false if none was pending.
    pub fn step(&mut self) -> bool {
        match self.core.pop_next() {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, event: SimEvent) {
        match event {
            SimEvent::Packet { key } => {
                self.packets.deliver(key);
            }
            SimEvent::PacketWithPayload { key, payload } => {
                self.packets.deliver_with_payload(key, payload);
            }
            SimEvent::DmaDone { tag } => self.dma.on_transfer_done(tag),
            SimEvent::DmaError { tag } => self.dma.on_error(tag),
            SimEvent::UserEvent(event) => {
                if let Err(err) = self.engine.on_user_event() {
                    debug!(?event, error = %err, "User event failed");
                    if self.halted.is_none() {
                        self.halted = Some(err);
                    }
                }
            }
            SimEvent::Timer { time } => self.engine.on_timer_tick(time),
        }
    }

    /// Dispatch until no interrupt is pending; returns how many were dispatched
    pub fn run_until_idle(&mut self) -> usize {
        let mut n = 0;
        while self.step() {
            n += 1;
        }
        n
    }

    /// Timestep boundary: packets already queued arrive first, then the timer runs
    /// before any pending row work.
    pub fn tick(&mut self, time: u32) {
        self.deliver_packets();
        self.engine.on_timer_tick(time);
    }

    /// First fatal error, if the core halted
    pub fn halted(&self) -> Option<&SpikeProcessingError> {
        self.halted.as_ref()
    }

    pub fn provenance(&self) -> ProvenanceRecord {
        let mut record = ProvenanceRecord::default();
        self.engine.store_provenance(&mut record);
        record
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }
}
