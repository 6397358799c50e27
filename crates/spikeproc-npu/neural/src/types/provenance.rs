// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike-processing provenance record
//!
//! Snapshot of the end-of-run diagnostic counters reported to the host.

/// Provenance for spike processing.
///
/// The first six fields are the counters every core reports; the remaining ones are
/// supplementary diagnostics. All counters are monotonically non-decreasing over a run.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ProvenanceRecord {
    /// Times the incoming spike buffer was full and a spike was dropped
    pub n_input_buffer_overflows: u32,
    /// Row reads completed by the DMA controller
    pub n_dmas_complete: u32,
    /// Real spikes whose row was fetched and processed
    pub n_spikes_processed: u32,
    /// Rewiring attempts whose row was fetched and restructured
    pub n_rewires: u32,
    /// Spikes discarded at a timestep boundary or for want of a row
    pub n_packets_dropped_from_lateness: u32,
    /// Largest incoming spike buffer fill observed
    pub max_filled_input_buffer_size: u32,
    /// Spikes whose key had no entry in the master-population-table (also counted as dropped)
    pub n_population_table_misses: u32,
    /// Plastic rows written back to external memory
    pub n_plastic_write_backs: u32,
    /// Rewiring opportunities that produced no row to restructure
    pub n_failed_rewires: u32,
    /// User events that found no work to do
    pub n_spurious_user_events: u32,
}

impl ProvenanceRecord {
    /// Number of 32-bit words in the record as laid out in the provenance region
    pub const N_WORDS: usize = 10;

    /// Record as provenance-region words, in field order
    pub fn to_words(&self) -> [u32; Self::N_WORDS] {
        [
            self.n_input_buffer_overflows,
            self.n_dmas_complete,
            self.n_spikes_processed,
            self.n_rewires,
            self.n_packets_dropped_from_lateness,
            self.max_filled_input_buffer_size,
            self.n_population_table_misses,
            self.n_plastic_write_backs,
            self.n_failed_rewires,
            self.n_spurious_user_events,
        ]
    }
}
