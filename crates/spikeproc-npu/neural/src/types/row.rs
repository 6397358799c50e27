// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synaptic row layout
//!
//! A row is a sequence of little-endian 32-bit words:
//!
//! ```text
//! word 0                 plastic region length in words (P)
//! words 1..=P            plastic region (opaque, owned by the plasticity collaborator)
//! word P+1               fixed synapse count (F)
//! word P+2               plastic control count (C)
//! words P+3..P+3+F       fixed synapse words
//! ceil(C/2) words        16-bit plastic control half-words
//! ```
//!
//! The core only ever reads the header words and the fixed region; everything else is
//! handed to the plasticity hook untouched.

use super::error::{Result, RowFormatError};

#[cfg(feature = "std")]
use crate::synapse::{SynapseWordFormat, SynapticContribution};

/// Size of one row word in bytes
pub const BYTES_PER_WORD: usize = 4;

/// Header words present in every row: plastic length, fixed count, plastic control count
pub const ROW_OVERHEAD_WORDS: usize = 3;

/// Where a row lives in external memory, as returned by the master-population-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocation {
    /// External memory address of the first row word
    pub address: u32,
    /// Row length in bytes (never more than `row_max_n_bytes`)
    pub n_bytes: usize,
    /// Synapse type index of the projection this row belongs to
    pub synapse_type_index: u32,
}

/// Decoded row header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    n_plastic_words: usize,
    n_fixed: usize,
    n_plastic_controls: usize,
}

#[inline]
fn read_word(row: &[u8], word_index: usize) -> Result<u32> {
    let start = word_index.saturating_mul(BYTES_PER_WORD);
    let end = start.saturating_add(BYTES_PER_WORD);
    match row.get(start..end) {
        Some(&[b0, b1, b2, b3]) => Ok(u32::from_le_bytes([b0, b1, b2, b3])),
        _ => Err(RowFormatError::Truncated {
            needed: end,
            available: row.len(),
        }),
    }
}

impl RowLayout {
    /// Parse the header of `row` and check the announced regions fit in the buffer.
    pub fn parse(row: &[u8]) -> Result<Self> {
        let n_plastic_words = read_word(row, 0)? as usize;
        let fixed_header = n_plastic_words.saturating_add(1);
        let n_fixed = read_word(row, fixed_header)? as usize;
        let n_plastic_controls = read_word(row, fixed_header.saturating_add(1))? as usize;

        let layout = Self {
            n_plastic_words,
            n_fixed,
            n_plastic_controls,
        };
        let needed = layout.n_bytes();
        if needed > row.len() {
            return Err(RowFormatError::Truncated {
                needed,
                available: row.len(),
            });
        }
        Ok(layout)
    }

    pub fn n_plastic_words(&self) -> usize {
        self.n_plastic_words
    }

    pub fn n_fixed(&self) -> usize {
        self.n_fixed
    }

    pub fn n_plastic_controls(&self) -> usize {
        self.n_plastic_controls
    }

    /// True when the row carries plastic state the plasticity hook must see first
    pub fn has_plastic_region(&self) -> bool {
        self.n_plastic_words > 0
    }

    /// Total row length in words
    pub fn n_words(&self) -> usize {
        ROW_OVERHEAD_WORDS
            .saturating_add(self.n_plastic_words)
            .saturating_add(self.n_fixed)
            .saturating_add(self.n_plastic_controls.div_ceil(2))
    }

    /// Total row length in bytes
    pub fn n_bytes(&self) -> usize {
        self.n_words().saturating_mul(BYTES_PER_WORD)
    }

    fn fixed_words_range(&self) -> (usize, usize) {
        let start = (self.n_plastic_words + ROW_OVERHEAD_WORDS) * BYTES_PER_WORD;
        (start, start + self.n_fixed * BYTES_PER_WORD)
    }

    /// Plastic region bytes (empty for static rows)
    pub fn plastic_region<'a>(&self, row: &'a [u8]) -> &'a [u8] {
        let end = BYTES_PER_WORD + self.n_plastic_words * BYTES_PER_WORD;
        row.get(BYTES_PER_WORD..end).unwrap_or_default()
    }

    /// Mutable plastic region bytes, for in-place plasticity updates
    pub fn plastic_region_mut<'a>(&self, row: &'a mut [u8]) -> &'a mut [u8] {
        let end = BYTES_PER_WORD + self.n_plastic_words * BYTES_PER_WORD;
        row.get_mut(BYTES_PER_WORD..end).unwrap_or_default()
    }

    /// Fixed synapse words in row order
    pub fn fixed_words<'a>(&self, row: &'a [u8]) -> impl Iterator<Item = u32> + 'a {
        let (start, end) = self.fixed_words_range();
        row.get(start..end)
            .unwrap_or_default()
            .chunks_exact(BYTES_PER_WORD)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    /// Plastic control half-words in row order
    pub fn plastic_controls<'a>(&self, row: &'a [u8]) -> impl Iterator<Item = u16> + 'a {
        let (_, start) = self.fixed_words_range();
        let end = start + self.n_plastic_controls * 2;
        row.get(start..end)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|h| u16::from_le_bytes([h[0], h[1]]))
    }
}

/// Builds row images for loaders, the host simulator and tests.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    plastic: Vec<u32>,
    fixed: Vec<u32>,
    controls: Vec<u16>,
}

#[cfg(feature = "std")]
impl RowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plastic region words
    pub fn plastic_words(mut self, words: &[u32]) -> Self {
        self.plastic = words.to_vec();
        self
    }

    /// Append one fixed synapse, encoded with `format`
    pub fn fixed_synapse(mut self, format: &SynapseWordFormat, synapse: SynapticContribution) -> Self {
        self.fixed.push(format.encode(&synapse));
        self
    }

    /// Append a raw fixed synapse word
    pub fn fixed_word(mut self, word: u32) -> Self {
        self.fixed.push(word);
        self
    }

    /// Append a plastic control half-word
    pub fn plastic_control(mut self, control: u16) -> Self {
        self.controls.push(control);
        self
    }

    /// Produce the row image
    pub fn build(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(
            ROW_OVERHEAD_WORDS + self.plastic.len() + self.fixed.len() + self.controls.len(),
        );
        words.push(self.plastic.len() as u32);
        words.extend_from_slice(&self.plastic);
        words.push(self.fixed.len() as u32);
        words.push(self.controls.len() as u32);
        words.extend_from_slice(&self.fixed);
        for pair in self.controls.chunks(2) {
            let low = pair[0] as u32;
            let high = pair.get(1).copied().unwrap_or(0) as u32;
            words.push(low | (high << 16));
        }
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}
