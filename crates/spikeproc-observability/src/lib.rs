// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikeproc-observability
//!
//! Logging setup shared by the spike-processing tools, with per-crate debug flags.
//! Library crates only emit `tracing` events; binaries call [`init_logging`] once.
//!
//! ## Features
//! - `file-logging`: mirror console output into a timestamped log file

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Workspace crate names accepted by `--debug-<crate>`
pub const KNOWN_CRATES: &[&str] = &[
    "spikeproc",
    "spikeproc-config",
    "spikeproc-npu-neural",
    "spikeproc-npu-runtime",
    "spikeproc-npu-spike-engine",
];
