// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spike Processing Types Module
//!
//! Core type definitions shared by the spike engine, its runtime collaborators and
//! the host tooling.

pub mod error;
pub mod ids;
pub mod provenance;
pub mod row;

pub use error::{Result, RowFormatError};
pub use ids::SpikeKey;
pub use provenance::ProvenanceRecord;
pub use row::{RowLayout, RowLocation, BYTES_PER_WORD, ROW_OVERHEAD_WORDS};

#[cfg(feature = "std")]
pub use row::RowBuilder;
