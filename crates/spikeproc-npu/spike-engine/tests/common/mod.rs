// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the spike-engine integration tests

#![allow(dead_code)]

use spikeproc_config::SpikeProcessingConfig;
use spikeproc_npu_neural::{
    RowBuilder, RowLocation, SpikeKey, SynapseWordFormat, SynapticContribution,
};
use spikeproc_npu_runtime::std_impl::{SimCore, SimPlatform, SimPopulationTable};
use spikeproc_npu_runtime::Collaborators;
use spikeproc_npu_spike_engine::Simulation;

pub const SDRAM_BYTES: usize = 64 * 1024;

/// Capacity 16, 256-byte rows, a single target neuron
pub fn small_config() -> SpikeProcessingConfig {
    SpikeProcessingConfig {
        incoming_spike_buffer_size: 16,
        row_max_n_bytes: 256,
        n_neurons: 1,
        ..Default::default()
    }
}

pub fn format(config: &SpikeProcessingConfig) -> SynapseWordFormat {
    SynapseWordFormat::for_population(
        config.n_neurons,
        config.n_synapse_types,
        config.synapse_delay_bits,
    )
    .expect("test config has a valid synapse format")
}

/// Static row with one synapse per weight, all onto neuron 0
pub fn static_row(format: &SynapseWordFormat, weights: &[u16]) -> Vec<u8> {
    weights
        .iter()
        .fold(RowBuilder::new(), |row, &w| {
            row.fixed_synapse(format, SynapticContribution::new(0, 0, 1, w))
        })
        .build()
}

/// Row with a plastic region ahead of its fixed synapses
pub fn plastic_row(format: &SynapseWordFormat, plastic: &[u32], weights: &[u16]) -> Vec<u8> {
    weights
        .iter()
        .fold(RowBuilder::new().plastic_words(plastic), |row, &w| {
            row.fixed_synapse(format, SynapticContribution::new(0, 1, 2, w))
        })
        .plastic_control(0x1)
        .build()
}

/// Store `row` in external memory and map `key` to it
pub fn map_row(core: &SimCore, table: &mut SimPopulationTable, key: SpikeKey, row: &[u8]) -> RowLocation {
    let address = core.store(row).expect("row fits in simulated SDRAM");
    let location = RowLocation {
        address,
        n_bytes: row.len(),
        synapse_type_index: 0,
    };
    table.insert(key, location);
    location
}

/// A simulation whose collaborators can be adjusted before initialisation
pub fn simulation_with(
    config: &SpikeProcessingConfig,
    core: SimCore,
    adjust: impl FnOnce(&mut Collaborators<SimPlatform>),
) -> Simulation {
    let mut collaborators = SimPlatform::collaborators(&core, SimPopulationTable::new());
    adjust(&mut collaborators);
    Simulation::new(config, core, collaborators).expect("test config initialises")
}

/// Simulation where `keys` each map to their own single-synapse static row
pub fn simulation_with_rows(config: &SpikeProcessingConfig, keys: &[SpikeKey]) -> Simulation {
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(config);
    let mut table = SimPopulationTable::new();
    for (i, key) in keys.iter().enumerate() {
        map_row(&core, &mut table, *key, &static_row(&format, &[i as u16 + 1]));
    }
    let collaborators = SimPlatform::collaborators(&core, table);
    Simulation::new(config, core, collaborators).expect("test config initialises")
}
