// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Timestep boundary handler
//!
//! At each boundary: fold the current fill into the maximum, optionally drop late spikes,
//! and record `{time, packets_this_time_step}` to the packets-per-timestep region.

use std::sync::atomic::{AtomicU32, Ordering};

use spikeproc_npu_runtime::RecordingChannel;
use tracing::{debug, warn};

use crate::input_buffer::SpikeRing;
use crate::provenance::Counters;

/// Size of one packets-per-timestep record
pub const PACKETS_PER_TIMESTEP_RECORD_BYTES: usize = 8;

/// Encode a packets-per-timestep record (little-endian `time`, then `packets`)
pub fn encode_packets_record(time: u32, packets: u32) -> [u8; PACKETS_PER_TIMESTEP_RECORD_BYTES] {
    let mut bytes = [0u8; PACKETS_PER_TIMESTEP_RECORD_BYTES];
    bytes[..4].copy_from_slice(&time.to_le_bytes());
    bytes[4..].copy_from_slice(&packets.to_le_bytes());
    bytes
}

#[derive(Debug, Clone)]
pub struct TimestepBoundary {
    clear_late_packets: bool,
    region: u32,
    last_recorded_time: Option<u32>,
    overflows_seen: u32,
}

impl TimestepBoundary {
    pub fn new(clear_late_packets: bool, region: u32) -> Self {
        Self {
            clear_late_packets,
            region,
            last_recorded_time: None,
            overflows_seen: 0,
        }
    }

    pub fn clears_late_packets(&self) -> bool {
        self.clear_late_packets
    }

    pub fn last_recorded_time(&self) -> Option<u32> {
        self.last_recorded_time
    }

    /// Timer path: drops late spikes only if configured to.
    pub fn on_tick<R: RecordingChannel>(
        &mut self,
        time: u32,
        spikes: &SpikeRing,
        packets_this_time_step: &AtomicU32,
        recorder: &mut R,
        counters: &mut Counters,
    ) {
        let clear = self.clear_late_packets;
        self.run(time, clear, spikes, packets_this_time_step, recorder, counters);
    }

    /// On-demand path: always drops queued spikes.
    pub fn clear_input_buffer<R: RecordingChannel>(
        &mut self,
        time: u32,
        spikes: &SpikeRing,
        packets_this_time_step: &AtomicU32,
        recorder: &mut R,
        counters: &mut Counters,
    ) {
        self.run(time, true, spikes, packets_this_time_step, recorder, counters);
    }

    fn run<R: RecordingChannel>(
        &mut self,
        time: u32,
        clear: bool,
        spikes: &SpikeRing,
        packets_this_time_step: &AtomicU32,
        recorder: &mut R,
        counters: &mut Counters,
    ) {
        spikes.observe_fill(spikes.size());

        let overflows = spikes.n_overflows();
        if overflows > self.overflows_seen {
            warn!(
                time,
                dropped = overflows - self.overflows_seen,
                total = overflows,
                "Incoming spike buffer overflowed during timestep"
            );
            self.overflows_seen = overflows;
        }

        if clear {
            let dropped = spikes.clear();
            if dropped > 0 {
                counters.n_packets_dropped_from_lateness += dropped;
                debug!(time, dropped, "Late spikes cleared");
            }
        }

        // One record per timestep, however often the boundary runs
        if self.last_recorded_time == Some(time) {
            return;
        }
        self.last_recorded_time = Some(time);
        let packets = packets_this_time_step.swap(0, Ordering::AcqRel);
        if !recorder.record(self.region, &encode_packets_record(time, packets)) {
            warn!(time, region = self.region, "Packets-per-timestep recording region full");
        }
    }
}
