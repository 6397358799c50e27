// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synapse Words
//!
//! Platform-agnostic decoding of the packed fixed-synapse words found in a row.

pub mod contribution;
pub mod format;

pub use contribution::SynapticContribution;
pub use format::{SynapseWordFormat, DEFAULT_DELAY_BITS};
