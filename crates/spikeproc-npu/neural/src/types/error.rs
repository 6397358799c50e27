// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for synaptic row and synapse-format handling

use core::fmt;

/// Errors raised while interpreting a synaptic row or building a synapse word format.
///
/// A malformed row is never recoverable on the core: the row came from the loader, so a
/// bad header means the loaded data structures are corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormatError {
    /// The row header announces more data than the buffer holds
    Truncated { needed: usize, available: usize },

    /// A row is larger than the configured maximum row size
    RowTooLarge { n_bytes: usize, row_max_n_bytes: usize },

    /// A row length that is not a whole number of 32-bit words
    UnalignedLength { n_bytes: usize },

    /// Index, type and delay fields do not fit below the 16-bit weight
    BitBudgetExceeded { index_bits: u32, type_bits: u32, delay_bits: u32 },

    /// Zero neurons or zero synapse types
    EmptyPopulation,
}

impl fmt::Display for RowFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFormatError::Truncated { needed, available } => write!(
                f,
                "Truncated row: header needs {} bytes, buffer holds {}",
                needed, available
            ),
            RowFormatError::RowTooLarge {
                n_bytes,
                row_max_n_bytes,
            } => write!(
                f,
                "Row of {} bytes exceeds the maximum row size of {} bytes",
                n_bytes, row_max_n_bytes
            ),
            RowFormatError::UnalignedLength { n_bytes } => {
                write!(f, "Row length {} is not a multiple of 4 bytes", n_bytes)
            }
            RowFormatError::BitBudgetExceeded {
                index_bits,
                type_bits,
                delay_bits,
            } => write!(
                f,
                "Synapse word fields need {} bits (index {}, type {}, delay {}), only 16 available",
                index_bits + type_bits + delay_bits,
                index_bits,
                type_bits,
                delay_bits
            ),
            RowFormatError::EmptyPopulation => {
                write!(f, "Population must have at least one neuron and one synapse type")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RowFormatError {}

pub type Result<T> = core::result::Result<T, RowFormatError>;
