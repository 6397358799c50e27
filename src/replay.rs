// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Replay of a recorded spike trace on the simulated platform
//!
//! A trace is a JSON document listing the synaptic rows the core knows about and the
//! interrupts to feed it:
//!
//! ```json
//! {
//!   "rows": [
//!     { "key": 1, "synapses": [{ "target": 0, "synapse_type": 0, "delay": 1, "weight": 100 }] },
//!     { "key": 2, "plastic_words": [0], "synapses": [] }
//!   ],
//!   "rewire_candidates": [2],
//!   "events": [
//!     { "spike": 1 },
//!     { "payload": { "key": 1, "count": 3 } },
//!     "run",
//!     { "rewire": 2 },
//!     { "tick": 0 }
//!   ]
//! }
//! ```
//!
//! The core is run to idle after the last event.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spikeproc_config::SpikeProcessingConfig;
use spikeproc_npu_neural::{
    ProvenanceRecord, RowBuilder, RowLocation, SpikeKey, SynapseWordFormat, SynapticContribution,
};
use spikeproc_npu_runtime::std_impl::{SimCore, SimPlatform, SimPopulationTable, SimRewiring};
use spikeproc_npu_spike_engine::Simulation;
use tracing::{debug, info, warn};

/// External memory given to a replayed core
pub const REPLAY_SDRAM_BYTES: usize = 16 * 1024 * 1024;

/// One fixed synapse of a replayed row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SynapseSpec {
    pub target: u32,
    #[serde(default)]
    pub synapse_type: u32,
    #[serde(default)]
    pub delay: u32,
    pub weight: u16,
}

/// Synaptic row for one presynaptic key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RowSpec {
    pub key: u32,
    #[serde(default)]
    pub plastic_words: Vec<u32>,
    #[serde(default)]
    pub synapses: Vec<SynapseSpec>,
}

/// Interrupts and host calls, in trace order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Multicast packet without payload
    Spike(u32),
    /// Multicast packet repeated `count` times
    Payload { key: u32, count: u32 },
    /// Timestep boundary
    Tick(u32),
    /// `do_rewiring(n)`
    Rewire(u32),
    /// On-demand `clear_input_buffer(time)`
    Clear(u32),
    /// Dispatch everything pending
    Run,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub rows: Vec<RowSpec>,
    #[serde(default)]
    pub rewire_candidates: Vec<u32>,
    #[serde(default)]
    pub events: Vec<ReplayEvent>,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid replay trace")
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub provenance: ProvenanceRecord,
    pub packets_sent: u64,
    pub contributions: usize,
    pub dma_reads: u32,
    pub dma_writes: u32,
    /// Fatal error that halted the core, if any
    pub halted: Option<String>,
}

fn build_row(format: &SynapseWordFormat, spec: &RowSpec) -> Vec<u8> {
    let mut row = RowBuilder::new().plastic_words(&spec.plastic_words);
    for s in &spec.synapses {
        row = row.fixed_synapse(
            format,
            SynapticContribution::new(s.target, s.synapse_type, s.delay, s.weight),
        );
    }
    row.build()
}

/// Run `script` on a fresh simulated core configured by `config`.
pub fn replay(config: &SpikeProcessingConfig, script: &ReplayScript) -> Result<ReplayReport> {
    let format = SynapseWordFormat::for_population(
        config.n_neurons,
        config.n_synapse_types,
        config.synapse_delay_bits,
    )
    .map_err(|e| anyhow::anyhow!("Invalid synapse format: {e}"))?;

    let core = SimCore::new(REPLAY_SDRAM_BYTES);
    let mut table = SimPopulationTable::new();
    for spec in &script.rows {
        let row = build_row(&format, spec);
        let address = core
            .store(&row)
            .map_err(|e| anyhow::anyhow!("Row for key {} does not fit: {e}", spec.key))?;
        let location = RowLocation {
            address,
            n_bytes: row.len(),
            synapse_type_index: 0,
        };
        if table.insert(SpikeKey(spec.key), location).is_some() {
            warn!(key = spec.key, "Duplicate row in trace; last one wins");
        }
    }
    debug!(rows = table.len(), "Population table loaded");

    let mut collaborators = SimPlatform::collaborators(&core, table);
    collaborators.rewiring = SimRewiring::new(
        core.trace(),
        script.rewire_candidates.iter().copied().map(SpikeKey).collect(),
    );
    let mut sim = Simulation::new(config, core.clone(), collaborators)
        .context("Spike processing failed to initialise")?;

    for event in &script.events {
        match *event {
            ReplayEvent::Spike(key) => sim.send(SpikeKey(key)),
            ReplayEvent::Payload { key, count } => sim.send_with_payload(SpikeKey(key), count),
            ReplayEvent::Tick(time) => sim.tick(time),
            ReplayEvent::Rewire(n) => {
                sim.engine_mut().do_rewiring(n);
            }
            ReplayEvent::Clear(time) => {
                sim.deliver_packets();
                sim.engine_mut().clear_input_buffer(time);
            }
            ReplayEvent::Run => {
                sim.run_until_idle();
            }
        }
    }
    sim.run_until_idle();

    let stats = core.dma_stats();
    let report = ReplayReport {
        provenance: sim.provenance(),
        packets_sent: sim.packets_sent(),
        contributions: sim.engine().synapses().received().len(),
        dma_reads: stats.reads_started,
        dma_writes: stats.writes_started,
        halted: sim.halted().map(|e| e.to_string()),
    };
    info!(
        packets = report.packets_sent,
        processed = report.provenance.n_spikes_processed,
        halted = report.halted.is_some(),
        "Replay finished"
    );
    Ok(report)
}
