// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! DMA controller abstraction

use super::error::Result;

/// Transfer direction relative to external memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaDirection {
    /// External memory → local buffer
    Read,
    /// Local buffer → external memory
    Write,
}

/// DMA controller.
///
/// Completion is always reported asynchronously through the `DmaTransferDone` (or
/// `DmaError`) interrupt carrying `tag`; `start_transfer` never blocks.
///
/// # Buffer ownership
///
/// The caller does not touch `local` again until the completion for `tag` has been
/// delivered. Implementations backed by hardware may keep using the memory behind `local`
/// until then; software implementations may finish the copy before returning.
pub trait DmaController {
    /// Queue one transfer of `local.len()` bytes.
    fn start_transfer(
        &mut self,
        tag: u32,
        direction: DmaDirection,
        external_address: u32,
        local: &mut [u8],
    ) -> Result<()>;
}
