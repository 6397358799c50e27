// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the spike-processing core
//!
//! Two families:
//! - [`InitError`]: configuration-fatal, reported by `initialise`
//! - [`SpikeProcessingError`]: runtime-fatal, reported from user-event context; the core
//!   halts and the host collects the diagnostic
//!
//! Recoverable conditions (ISB overflow, table misses, late packets) are counters, not errors.

use spikeproc_npu_neural::{RowFormatError, SpikeKey};
use spikeproc_npu_runtime::RuntimeError;

use crate::fetch_engine::EngineStateKind;

/// Reasons `initialise` refuses to start the core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("incoming spike buffer size {0} is not a non-zero power of two")]
    SpikeBufferSizeNotPowerOfTwo(usize),

    #[error("interrupt priorities must be strictly ordered: {0}")]
    InvalidPriorityOrder(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid synapse word format: {0}")]
    SynapseFormat(RowFormatError),

    #[error("failed to allocate {n_bytes} bytes for {what}")]
    AllocationFailed { what: &'static str, n_bytes: usize },

    #[error("spike processing is already initialised on this core")]
    AlreadyInitialised,

    #[error("interrupt registration failed: {0}")]
    Registration(RuntimeError),
}

/// Fatal runtime conditions; each indicates a programming or configuration fault
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpikeProcessingError {
    #[error("DMA transfer {tag} failed")]
    DmaFailed { tag: u32 },

    #[error("DMA controller refused transfer: {0}")]
    DmaStart(RuntimeError),

    #[error("DMA completion for tag {got} while {expected:?} was expected")]
    UnexpectedDmaCompletion { expected: Option<u32>, got: u32 },

    #[error("row for {key} is {n_bytes} bytes, larger than the {row_max_n_bytes}-byte row buffers")]
    RowTooLarge {
        key: SpikeKey,
        n_bytes: usize,
        row_max_n_bytes: usize,
    },

    #[error("malformed row for {key}: {source}")]
    MalformedRow { key: SpikeKey, source: RowFormatError },

    #[error("plasticity update failed: {0}")]
    PlasticityFailed(RuntimeError),

    #[error("write-back of {n_bytes} bytes is invalid for a {fetched_n_bytes}-byte row")]
    InvalidWriteBack {
        n_bytes: usize,
        fetched_n_bytes: usize,
    },

    #[error("row-fetch engine in {state:?} cannot {operation}")]
    InvalidState {
        state: EngineStateKind,
        operation: &'static str,
    },

    #[error("spike processing halted after a fatal error")]
    Halted,
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, SpikeProcessingError>;
