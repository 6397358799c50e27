// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Spike Processing Runtime
//!
//! The seams between the spike-processing core and the application core it runs on.
//!
//! ## Features
//! - (default): collaborator traits only, `no_std`
//! - `std`: a simulated host platform ([`std_impl::SimPlatform`]) for tests and replay
//!
//! ## Example
//!
//! ```ignore
//! use spikeproc_npu_runtime::std_impl::{SimCore, SimPlatform, SimPopulationTable};
//!
//! let core = SimCore::new(64 * 1024);
//! let collaborators = SimPlatform::collaborators(&core, SimPopulationTable::new());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod traits;

#[cfg(feature = "std")]
pub mod std_impl;

pub use traits::*;
