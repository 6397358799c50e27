// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Spike Processing Engine
//!
//! Moves incoming spikes from the network into synaptic input on one application core:
//! - **Incoming spike buffer**: lock-free ring filled by the packet interrupt
//! - **Row-fetch engine**: one outstanding DMA at a time, double-buffered rows
//! - **Row pipeline**: decodes fixed synapses into input contributions
//! - **Plasticity**: in-place row updates with DMA write-back
//! - **Rewiring**: structural plasticity interleaved with real spikes
//! - **Timestep boundary**: late-packet handling and packets-per-timestep recording
//!
//! The engine is generic over a [`spikeproc_npu_runtime::Platform`]; the `std` feature adds
//! a host [`Simulation`] over the simulated platform.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod boundary;
pub mod dispatcher;
pub mod error;
pub mod fetch_engine;
pub mod input_buffer;
pub mod pipeline;
pub mod provenance;
pub mod rewiring;
pub mod spike_processing;

#[cfg(feature = "std")]
pub mod sim;

pub use boundary::{encode_packets_record, TimestepBoundary, PACKETS_PER_TIMESTEP_RECORD_BYTES};
pub use dispatcher::{register_handlers, DmaCompletion, IsrHandlers, PacketReceiver};
pub use error::{InitError, Result, SpikeProcessingError};
pub use fetch_engine::{EngineState, EngineStateKind, FetchOrigin, RowFetchEngine, Transfer};
pub use input_buffer::SpikeRing;
pub use pipeline::RowPipeline;
pub use provenance::Counters;
pub use rewiring::RewiringScheduler;
pub use spike_processing::SpikeProcessing;

#[cfg(feature = "std")]
pub use sim::{PacketPort, Simulation};
