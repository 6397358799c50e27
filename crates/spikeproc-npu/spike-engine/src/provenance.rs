// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Provenance counters owned by the user-event/timer context.
//!
//! Overflows and the maximum fill live in the spike ring, where the packet ISR updates
//! them atomically; everything else is a plain word written by a single owner.

use spikeproc_npu_neural::ProvenanceRecord;

use crate::input_buffer::SpikeRing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub n_dmas_complete: u32,
    pub n_spikes_processed: u32,
    pub n_rewires: u32,
    pub n_packets_dropped_from_lateness: u32,
    pub n_population_table_misses: u32,
    pub n_plastic_write_backs: u32,
    pub n_failed_rewires: u32,
    pub n_spurious_user_events: u32,
}

impl Counters {
    /// Combine with the ISR-side counters into a provenance record
    pub fn snapshot(&self, spikes: &SpikeRing) -> ProvenanceRecord {
        ProvenanceRecord {
            n_input_buffer_overflows: spikes.n_overflows(),
            n_dmas_complete: self.n_dmas_complete,
            n_spikes_processed: self.n_spikes_processed,
            n_rewires: self.n_rewires,
            n_packets_dropped_from_lateness: self.n_packets_dropped_from_lateness,
            max_filled_input_buffer_size: spikes.max_fill(),
            n_population_table_misses: self.n_population_table_misses,
            n_plastic_write_backs: self.n_plastic_write_backs,
            n_failed_rewires: self.n_failed_rewires,
            n_spurious_user_events: self.n_spurious_user_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spikeproc_npu_neural::SpikeKey;

    #[test]
    fn test_snapshot_merges_isr_counters() {
        let ring = SpikeRing::try_new(2).unwrap();
        for k in 0..3 {
            ring.add(SpikeKey(k));
        }
        let counters = Counters {
            n_spikes_processed: 4,
            n_population_table_misses: 1,
            ..Counters::default()
        };

        let record = counters.snapshot(&ring);
        assert_eq!(record.n_input_buffer_overflows, 1);
        assert_eq!(record.max_filled_input_buffer_size, 2);
        assert_eq!(record.n_spikes_processed, 4);
        assert_eq!(record.n_population_table_misses, 1);
    }
}
