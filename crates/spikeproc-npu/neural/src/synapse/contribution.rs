// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synaptic contribution handed to the input-accumulator collaborator

/// One decoded fixed synapse: what the core delivers to the input accumulators.
///
/// The weight is left in the row's fixed-point units; scaling it into the accumulator's
/// representation is the synapse-type collaborator's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynapticContribution {
    /// Index of the postsynaptic neuron within this core's population
    pub target_index: u32,
    /// Synapse type (e.g. excitatory / inhibitory receptor)
    pub synapse_type: u32,
    /// Delay in timesteps; selects the accumulator slot
    pub delay_slot: u32,
    /// Raw 16-bit weight
    pub weight: u16,
}

impl SynapticContribution {
    pub const fn new(target_index: u32, synapse_type: u32, delay_slot: u32, weight: u16) -> Self {
        Self {
            target_index,
            synapse_type,
            delay_slot,
            weight,
        }
    }
}
