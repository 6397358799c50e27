// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikeproc - Spike Processing for Neuromorphic Application Cores
//!
//! The part of a SpiNNaker-style application core that turns incoming multicast spike
//! packets into synaptic input: buffer the keys, fetch each key's synaptic row by DMA, walk
//! the row into the input accumulators, apply plasticity and write changed rows back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spikeproc::config::SpikeProcessingConfig;
//! use spikeproc::replay::{replay, ReplayScript};
//!
//! let script = ReplayScript::from_json(r#"{ "rows": [], "events": [{ "spike": 1 }] }"#)?;
//! let report = replay(&SpikeProcessingConfig::default(), &script)?;
//! println!("{} population table misses", report.provenance.n_population_table_misses);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`platform-std`** (default): simulated host platform and the replay harness
//! - **`file-logging`**: timestamped log file output for the tools
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: spikeproc-npu-neural, spikeproc-config     │
//! │  (keys, row layout, synapse words, configuration)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Platform: spikeproc-npu-runtime                        │
//! │  (DMA, interrupts, collaborator traits, host sim)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: spikeproc-npu-spike-engine                     │
//! │  (spike buffer, row fetch, row pipeline, rewiring)      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use spikeproc_config as config;
pub use spikeproc_npu_neural as types;

// Re-export platform and engine
pub use spikeproc_npu_runtime as runtime;
pub use spikeproc_npu_spike_engine as engine;

// Re-export infrastructure
pub use spikeproc_observability as observability;

#[cfg(feature = "platform-std")]
pub mod replay;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{SpikeProcConfig, SpikeProcessingConfig};
    pub use crate::engine::{InitError, SpikeProcessing, SpikeProcessingError};
    pub use crate::runtime::{Collaborators, Platform};
    pub use crate::types::{ProvenanceRecord, RowLocation, SpikeKey, SynapticContribution};

    #[cfg(feature = "platform-std")]
    pub use crate::engine::Simulation;
    #[cfg(feature = "platform-std")]
    pub use crate::runtime::std_impl::SimPlatform;
}
