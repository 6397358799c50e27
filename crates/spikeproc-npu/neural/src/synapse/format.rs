// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Fixed-synapse word format
//!
//! ```text
//! |  weight (16)  |  delay (D)  |  type (T)  |  index (I)  |
//! |---------------|-------------|------------|-------------|
//! |               |             |   type-index bits (T+I)  |
//! ```
//!
//! `I` and `T` are derived from the population size and the number of synapse types by
//! rounding each up to a power of two; a single neuron or a single type still takes one bit.

use crate::types::error::{Result, RowFormatError};
use crate::SynapticContribution;

/// Delay field width used unless the synapse collaborator says otherwise
pub const DEFAULT_DELAY_BITS: u32 = 4;

const WEIGHT_SHIFT: u32 = 16;

/// Bit layout of a fixed synapse word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynapseWordFormat {
    index_bits: u32,
    type_bits: u32,
    delay_bits: u32,
}

/// Bits needed to index `n` items, rounded up to a power of two (minimum one bit).
///
/// Counts above 2^31 have no `u32` power of two and take the full word.
#[inline]
fn log2_bits(n: u32) -> u32 {
    if n <= 1 {
        1
    } else {
        n.checked_next_power_of_two()
            .map_or(u32::BITS, |p| p.ilog2())
    }
}

impl SynapseWordFormat {
    /// Explicit field widths.
    pub fn new(index_bits: u32, type_bits: u32, delay_bits: u32) -> Result<Self> {
        if index_bits
            .saturating_add(type_bits)
            .saturating_add(delay_bits)
            > WEIGHT_SHIFT
        {
            return Err(RowFormatError::BitBudgetExceeded {
                index_bits,
                type_bits,
                delay_bits,
            });
        }
        Ok(Self {
            index_bits,
            type_bits,
            delay_bits,
        })
    }

    /// Field widths for a population of `n_neurons` with `n_synapse_types` receptor types.
    pub fn for_population(n_neurons: u32, n_synapse_types: u32, delay_bits: u32) -> Result<Self> {
        if n_neurons == 0 || n_synapse_types == 0 {
            return Err(RowFormatError::EmptyPopulation);
        }
        Self::new(log2_bits(n_neurons), log2_bits(n_synapse_types), delay_bits)
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn type_bits(&self) -> u32 {
        self.type_bits
    }

    pub fn delay_bits(&self) -> u32 {
        self.delay_bits
    }

    /// Width of the combined type-index field
    pub fn type_index_bits(&self) -> u32 {
        self.index_bits + self.type_bits
    }

    #[inline]
    fn mask(bits: u32) -> u32 {
        (1u32 << bits) - 1
    }

    /// Decode one fixed synapse word.
    #[inline]
    pub fn decode(&self, word: u32) -> SynapticContribution {
        SynapticContribution {
            target_index: word & Self::mask(self.index_bits),
            synapse_type: (word >> self.index_bits) & Self::mask(self.type_bits),
            delay_slot: (word >> self.type_index_bits()) & Self::mask(self.delay_bits),
            weight: (word >> WEIGHT_SHIFT) as u16,
        }
    }

    /// Encode a synapse; fields wider than their slot are truncated.
    pub fn encode(&self, synapse: &SynapticContribution) -> u32 {
        ((synapse.weight as u32) << WEIGHT_SHIFT)
            | ((synapse.delay_slot & Self::mask(self.delay_bits)) << self.type_index_bits())
            | ((synapse.synapse_type & Self::mask(self.type_bits)) << self.index_bits)
            | (synapse.target_index & Self::mask(self.index_bits))
    }
}

impl Default for SynapseWordFormat {
    /// 256 neurons, 2 synapse types, 4 delay bits
    fn default() -> Self {
        Self {
            index_bits: 8,
            type_bits: 1,
            delay_bits: DEFAULT_DELAY_BITS,
        }
    }
}
