// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Spike Processing Types (Platform-Agnostic)
//!
//! Everything the spike-processing core shares with its collaborators:
//! - **Types**: spike keys, row locations, the synaptic row layout, provenance
//! - **Synapse**: the packed fixed-synapse word format and its decoded form
//!
//! ## Target Platforms
//! - Desktop/host simulation (with `std`)
//! - Bare-metal application cores (`no_std`, no allocation)

#![cfg_attr(not(feature = "std"), no_std)]

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod synapse;
pub mod types;

pub use synapse::{SynapseWordFormat, SynapticContribution, DEFAULT_DELAY_BITS};
pub use types::{
    ProvenanceRecord, Result, RowFormatError, RowLayout, RowLocation, SpikeKey,
    BYTES_PER_WORD, ROW_OVERHEAD_WORDS,
};

#[cfg(feature = "std")]
pub use types::RowBuilder;
