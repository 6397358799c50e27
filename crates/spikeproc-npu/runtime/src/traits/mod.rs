// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits for cross-platform spike processing
//!
//! This module defines the seams that let the same spike-processing core run on:
//! - A bare-metal application core (hardware DMA, vectored interrupt controller)
//! - A host simulation (software DMA, priority-queue interrupt controller)

pub mod collaborators;
pub mod dma;
pub mod error;
pub mod interrupts;
pub mod platform;

// Re-export key types
pub use collaborators::{
    MasterPopulationTable, NoPlasticity, NoRecording, PlasticityHook, RecordingChannel,
    StructuralPlasticity, SynapticInput,
};
pub use dma::{DmaController, DmaDirection};
pub use error::{Result, RuntimeError};
pub use interrupts::{InterruptController, InterruptSource, Priority, UserEvent, UserEventTrigger};
pub use platform::{Collaborators, Platform};
