// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Platform trait: binds one concrete type to every collaborator seam
//!
//! ## Design Philosophy
//!
//! - **Static dispatch**: the core is generic over a `Platform`, so every collaborator
//!   call compiles to a direct call
//! - **One bundle**: a platform names its types once instead of threading seven generic
//!   parameters through the engine

use super::collaborators::{
    MasterPopulationTable, PlasticityHook, RecordingChannel, StructuralPlasticity, SynapticInput,
};
use super::dma::DmaController;
use super::interrupts::InterruptController;

/// Collaborator types for one application core.
///
/// # Example
///
/// ```ignore
/// pub struct BoardPlatform;
///
/// impl Platform for BoardPlatform {
///     type PopulationTable = FlashPopulationTable;
///     type Synapses = RingBufferInput;
///     type Plasticity = NoPlasticity;
///     type Rewiring = NoPlasticity;
///     type Recorder = SdramRecorder;
///     type Dma = DmaEngine;
///     type Interrupts = Vic;
/// }
/// ```
pub trait Platform {
    /// Key → row translation
    type PopulationTable: MasterPopulationTable;
    /// Input accumulators
    type Synapses: SynapticInput;
    /// Synaptic plasticity rule
    type Plasticity: PlasticityHook;
    /// Structural plasticity rule
    type Rewiring: StructuralPlasticity;
    /// Recording region writer
    type Recorder: RecordingChannel;
    /// DMA controller
    type Dma: DmaController;
    /// Interrupt controller
    type Interrupts: InterruptController;

    /// Platform name for logging/debugging
    fn platform_name() -> &'static str {
        "Generic Platform"
    }
}

/// Concrete collaborator instances handed to the core at initialisation.
pub struct Collaborators<P: Platform> {
    pub population_table: P::PopulationTable,
    pub synapses: P::Synapses,
    pub plasticity: P::Plasticity,
    pub rewiring: P::Rewiring,
    pub recorder: P::Recorder,
    pub dma: P::Dma,
    pub interrupts: P::Interrupts,
}
