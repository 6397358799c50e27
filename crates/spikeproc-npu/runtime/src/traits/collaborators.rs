// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Collaborators the spike-processing core calls into
//!
//! Each trait is one seam: the population table that maps keys to rows, the input
//! accumulators that receive contributions, the synaptic and structural plasticity
//! rules, and the recording region writer.

use spikeproc_npu_neural::{RowLocation, SpikeKey, SynapticContribution};

use super::error::Result;

/// Master-population-table: constant-time key → row translation.
pub trait MasterPopulationTable {
    /// Row for `key`, or `None` when this core has no synapses for it.
    fn lookup(&self, key: SpikeKey) -> Option<RowLocation>;
}

/// Per-neuron input accumulators (ring buffers indexed by delay slot).
pub trait SynapticInput {
    /// Deposit one synapse's weight into its target's accumulator.
    fn add_synaptic_contribution(&mut self, contribution: SynapticContribution);
}

/// Synaptic plasticity rule applied to rows with a plastic region.
pub trait PlasticityHook {
    /// Update the row in place for a presynaptic spike at `time`.
    ///
    /// `row` holds exactly the fetched bytes. Returns the number of leading bytes that
    /// must be written back to external memory, or `None` when the row is unchanged.
    /// An error is fatal for the core.
    fn update_row_in_place(&mut self, row: &mut [u8], time: u32) -> Result<Option<usize>>;
}

/// Structural plasticity (rewiring) rule.
pub trait StructuralPlasticity {
    /// Choose the presynaptic key whose row should be restructured, if any.
    fn synthesise_rewire(&mut self, time: u32) -> Option<SpikeKey>;

    /// Restructure a row fetched for a synthetic key.
    ///
    /// Same return contract as [`PlasticityHook::update_row_in_place`].
    fn restructure_row(&mut self, row: &mut [u8], time: u32) -> Result<Option<usize>>;
}

/// Recording region writer.
pub trait RecordingChannel {
    /// Append `bytes` to recording `region`; false if the region is full.
    fn record(&mut self, region: u32, bytes: &[u8]) -> bool;
}

/// Static synapses only: no plasticity rule and no rewiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlasticity;

impl PlasticityHook for NoPlasticity {
    fn update_row_in_place(&mut self, _row: &mut [u8], _time: u32) -> Result<Option<usize>> {
        Ok(None)
    }
}

impl StructuralPlasticity for NoPlasticity {
    fn synthesise_rewire(&mut self, _time: u32) -> Option<SpikeKey> {
        None
    }

    fn restructure_row(&mut self, _row: &mut [u8], _time: u32) -> Result<Option<usize>> {
        Ok(None)
    }
}

/// Discards recordings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecording;

impl RecordingChannel for NoRecording {
    fn record(&mut self, _region: u32, _bytes: &[u8]) -> bool {
        true
    }
}
