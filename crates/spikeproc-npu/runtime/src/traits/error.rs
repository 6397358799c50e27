// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for collaborator operations

use core::fmt;

use super::interrupts::{InterruptSource, Priority};

/// Errors reported by platform collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A handler is already registered for this interrupt source
    AlreadyRegistered {
        /// Source that was registered twice
        source: InterruptSource,
    },

    /// The interrupt controller cannot honour this priority
    InvalidPriority {
        /// Source being registered
        source: InterruptSource,
        /// Rejected priority
        priority: Priority,
    },

    /// The DMA controller refused to start a transfer
    DmaRejected {
        /// Transfer tag
        tag: u32,
    },

    /// A transfer touches memory outside the external memory map
    TransferOutOfBounds {
        /// External address of the transfer
        address: u32,
        /// Transfer length in bytes
        n_bytes: usize,
    },

    /// The plasticity collaborator could not update a row
    PlasticityFailed {
        /// Short reason supplied by the collaborator
        reason: &'static str,
    },

    /// Out of memory
    OutOfMemory {
        /// Requested bytes
        requested_bytes: usize,
    },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::AlreadyRegistered { source } => {
                write!(f, "Handler already registered for {:?}", source)
            }
            RuntimeError::InvalidPriority { source, priority } => {
                write!(f, "Invalid priority {} for {:?}", priority, source)
            }
            RuntimeError::DmaRejected { tag } => {
                write!(f, "DMA controller rejected transfer with tag {}", tag)
            }
            RuntimeError::TransferOutOfBounds { address, n_bytes } => write!(
                f,
                "Transfer of {} bytes at 0x{:08x} is outside external memory",
                n_bytes, address
            ),
            RuntimeError::PlasticityFailed { reason } => {
                write!(f, "Plasticity update failed: {}", reason)
            }
            RuntimeError::OutOfMemory { requested_bytes } => {
                write!(f, "Out of memory: requested {} bytes", requested_bytes)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RuntimeError {}

/// Result type for collaborator operations
pub type Result<T> = core::result::Result<T, RuntimeError>;
