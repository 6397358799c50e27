// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated host platform (std only)
//!
//! Runs the spike-processing core on a desktop: software DMA over a byte vector, a
//! priority queue standing in for the interrupt controller, and collaborators that log
//! what they see.

pub mod collaborators;
pub mod memory;
pub mod sim_core;
pub mod trace;

pub use collaborators::{RecordingInput, SimPlasticity, SimPopulationTable, SimRecorder, SimRewiring};
pub use memory::{SimSdram, SDRAM_BASE};
pub use sim_core::{DmaStats, SimCore, SimDma, SimEvent, SimInterrupts, SimUserEventTrigger};
pub use trace::{SimTrace, TraceEvent};

use crate::traits::{Collaborators, Platform};

/// Host simulation platform
pub struct SimPlatform;

impl Platform for SimPlatform {
    type PopulationTable = SimPopulationTable;
    type Synapses = RecordingInput;
    type Plasticity = SimPlasticity;
    type Rewiring = SimRewiring;
    type Recorder = SimRecorder;
    type Dma = SimDma;
    type Interrupts = SimInterrupts;

    fn platform_name() -> &'static str {
        "Host Simulation"
    }
}

impl SimPlatform {
    /// Collaborators wired to `core`, with no rewiring candidates.
    ///
    /// Fields are public, so tests swap individual collaborators before initialising.
    pub fn collaborators(
        core: &SimCore,
        population_table: SimPopulationTable,
    ) -> Collaborators<SimPlatform> {
        let trace = core.trace();
        Collaborators {
            population_table,
            synapses: RecordingInput::new(trace.clone()),
            plasticity: SimPlasticity::new(trace.clone()),
            rewiring: SimRewiring::new(trace, Vec::new()),
            recorder: SimRecorder::new(),
            dma: core.dma(),
            interrupts: core.interrupts(),
        }
    }
}
