// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines the structs that map to sections in `spikeproc.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpikeProcConfig {
    pub spike_processing: SpikeProcessingConfig,
    pub logging: LoggingConfig,
}

/// Parameters fixed at `initialise`
///
/// Priorities follow the interrupt controller convention: a smaller number is more urgent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpikeProcessingConfig {
    /// Size of each row buffer; no row may be longer
    pub row_max_n_bytes: usize,
    /// Row buffers in the double-buffering pool
    pub n_row_buffers: usize,
    pub mc_packet_callback_priority: i32,
    pub dma_callback_priority: i32,
    pub user_event_priority: i32,
    pub timer_priority: i32,
    /// Capacity of the incoming spike buffer (power of two)
    pub incoming_spike_buffer_size: usize,
    /// Drop spikes still queued when the timestep ends
    pub clear_input_buffers_of_late_packets: bool,
    /// Recording region that receives `{time, packets}` per timestep
    pub packets_per_timestep_region: u32,
    /// Neurons in this core's population (sizes the synapse index field)
    pub n_neurons: u32,
    /// Synapse types (sizes the synapse type field)
    pub n_synapse_types: u32,
    pub synapse_delay_bits: u32,
}

impl Default for SpikeProcessingConfig {
    fn default() -> Self {
        Self {
            row_max_n_bytes: 256,
            n_row_buffers: 2,
            mc_packet_callback_priority: -1,
            dma_callback_priority: 0,
            user_event_priority: 1,
            timer_priority: 2,
            incoming_spike_buffer_size: 256,
            clear_input_buffers_of_late_packets: false,
            packets_per_timestep_region: 0,
            n_neurons: 256,
            n_synapse_types: 2,
            synapse_delay_bits: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for every crate ("error" .. "trace")
    pub global_log_level: String,
    /// Crates logged at debug level regardless of the global level
    pub debug_crates: Vec<String>,
    /// Optional log file; empty means console only
    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_log_level: "info".to_string(),
            debug_crates: Vec::new(),
            log_file: String::new(),
        }
    }
}
