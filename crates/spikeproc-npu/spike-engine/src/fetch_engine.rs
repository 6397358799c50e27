// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Row-fetch engine: single-outstanding-DMA state machine over a pool of row buffers
//!
//! ```text
//!            begin_read                 complete(tag)
//!   Idle ───────────────▶ FetchPending ───────────────▶ RowReady
//!    ▲                                                    │
//!    │  release / finish_row            begin_write_back  │
//!    ├────────────────────────────────────────────────────┤
//!    │          complete(tag)                             ▼
//!    └──────────────────────────────────────────── WriteBackPending
//! ```
//!
//! A buffer belongs to the DMA controller while a transfer is pending, to the row pipeline
//! while a row is ready or being walked, and to nobody otherwise. A row being walked can
//! coexist with the next fetch (static rows are released before they are walked), so the
//! buffer rotation skips the buffer held by the pipeline.

use spikeproc_npu_neural::{RowLocation, SpikeKey};
use spikeproc_npu_runtime::{DmaController, DmaDirection};
use tracing::{debug, trace};

use crate::error::{InitError, Result, SpikeProcessingError};

/// Why a row is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// A received spike
    Spike(SpikeKey),
    /// A synthetic key from the rewiring subsystem
    Rewire(SpikeKey),
}

impl FetchOrigin {
    pub fn key(&self) -> SpikeKey {
        match self {
            FetchOrigin::Spike(key) | FetchOrigin::Rewire(key) => *key,
        }
    }
}

/// One DMA transfer and the row it concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub tag: u32,
    pub buffer: usize,
    pub origin: FetchOrigin,
    pub location: RowLocation,
    /// Bytes moved by this transfer
    pub n_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    FetchPending(Transfer),
    RowReady(Transfer),
    WriteBackPending(Transfer),
}

/// State without its payload, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStateKind {
    Idle,
    FetchPending,
    RowReady,
    WriteBackPending,
}

impl EngineState {
    pub fn kind(&self) -> EngineStateKind {
        match self {
            EngineState::Idle => EngineStateKind::Idle,
            EngineState::FetchPending(_) => EngineStateKind::FetchPending,
            EngineState::RowReady(_) => EngineStateKind::RowReady,
            EngineState::WriteBackPending(_) => EngineStateKind::WriteBackPending,
        }
    }
}

/// What a DMA completion finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completed {
    /// A row read; the engine is now `RowReady`
    Read(Transfer),
    /// A plastic write-back; the engine is `Idle` again
    WriteBack(Transfer),
}

#[derive(Debug)]
pub struct RowFetchEngine {
    buffers: Vec<Box<[u8]>>,
    row_max_n_bytes: usize,
    state: EngineState,
    /// Buffer holding a row the pipeline is still walking
    in_pipeline: Option<usize>,
    next_buffer: usize,
    next_tag: u32,
}

impl RowFetchEngine {
    /// Allocate `n_buffers` row buffers of `row_max_n_bytes` each.
    pub fn try_new(n_buffers: usize, row_max_n_bytes: usize) -> std::result::Result<Self, InitError> {
        let mut buffers = Vec::new();
        buffers
            .try_reserve_exact(n_buffers)
            .map_err(|_| InitError::AllocationFailed {
                what: "row buffer pool",
                n_bytes: n_buffers.saturating_mul(std::mem::size_of::<Box<[u8]>>()),
            })?;
        for _ in 0..n_buffers {
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(row_max_n_bytes)
                .map_err(|_| InitError::AllocationFailed {
                    what: "row buffer",
                    n_bytes: row_max_n_bytes,
                })?;
            buffer.resize(row_max_n_bytes, 0u8);
            buffers.push(buffer.into_boxed_slice());
        }

        Ok(Self {
            buffers,
            row_max_n_bytes,
            state: EngineState::Idle,
            in_pipeline: None,
            next_buffer: 0,
            next_tag: 0,
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, EngineState::Idle)
    }

    /// A transfer is outstanding on the DMA controller
    pub fn dma_in_flight(&self) -> bool {
        matches!(
            self.state,
            EngineState::FetchPending(_) | EngineState::WriteBackPending(_)
        )
    }

    pub fn row_max_n_bytes(&self) -> usize {
        self.row_max_n_bytes
    }

    pub fn n_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn invalid(&self, operation: &'static str) -> SpikeProcessingError {
        SpikeProcessingError::InvalidState {
            state: self.state.kind(),
            operation,
        }
    }

    fn next_free_buffer(&mut self) -> usize {
        let n = self.buffers.len();
        let mut candidate = self.next_buffer % n;
        if Some(candidate) == self.in_pipeline {
            candidate = (candidate + 1) % n;
        }
        self.next_buffer = (candidate + 1) % n;
        candidate
    }

    fn allocate_tag(&mut self) -> u32 {
        let tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        tag
    }

    /// Idle → FetchPending: DMA the row for `origin` into the next free buffer.
    pub fn begin_read<D: DmaController>(
        &mut self,
        dma: &mut D,
        origin: FetchOrigin,
        location: RowLocation,
    ) -> Result<()> {
        if !self.is_idle() {
            return Err(self.invalid("start a fetch"));
        }
        if location.n_bytes > self.row_max_n_bytes {
            return Err(SpikeProcessingError::RowTooLarge {
                key: origin.key(),
                n_bytes: location.n_bytes,
                row_max_n_bytes: self.row_max_n_bytes,
            });
        }

        let buffer = self.next_free_buffer();
        let tag = self.allocate_tag();
        let local = &mut self.buffers[buffer][..location.n_bytes];
        dma.start_transfer(tag, DmaDirection::Read, location.address, local)
            .map_err(SpikeProcessingError::DmaStart)?;

        trace!(
            tag,
            buffer,
            key = %origin.key(),
            address = format_args!("0x{:08x}", location.address),
            n_bytes = location.n_bytes,
            synapse_type_index = location.synapse_type_index,
            "Row fetch started"
        );
        self.state = EngineState::FetchPending(Transfer {
            tag,
            buffer,
            origin,
            location,
            n_bytes: location.n_bytes,
        });
        Ok(())
    }

    /// Advance on a DMA completion interrupt.
    pub fn complete(&mut self, tag: u32) -> Result<Completed> {
        match self.state {
            EngineState::FetchPending(transfer) if transfer.tag == tag => {
                self.state = EngineState::RowReady(transfer);
                self.in_pipeline = Some(transfer.buffer);
                Ok(Completed::Read(transfer))
            }
            EngineState::WriteBackPending(transfer) if transfer.tag == tag => {
                debug!(tag, key = %transfer.origin.key(), "Write-back complete");
                self.state = EngineState::Idle;
                self.in_pipeline = None;
                Ok(Completed::WriteBack(transfer))
            }
            EngineState::FetchPending(transfer) | EngineState::WriteBackPending(transfer) => {
                Err(SpikeProcessingError::UnexpectedDmaCompletion {
                    expected: Some(transfer.tag),
                    got: tag,
                })
            }
            _ => Err(SpikeProcessingError::UnexpectedDmaCompletion {
                expected: None,
                got: tag,
            }),
        }
    }

    /// RowReady → Idle while the pipeline keeps the buffer, so the next fetch can start
    /// before the row is walked.
    pub fn release_for_prefetch(&mut self) -> Result<Transfer> {
        match self.state {
            EngineState::RowReady(transfer) => {
                self.state = EngineState::Idle;
                Ok(transfer)
            }
            _ => Err(self.invalid("release a row")),
        }
    }

    /// The pipeline is done with its buffer.
    pub fn finish_row(&mut self) {
        if let EngineState::RowReady(_) = self.state {
            self.state = EngineState::Idle;
        }
        self.in_pipeline = None;
    }

    /// RowReady → WriteBackPending: DMA the first `n_bytes` of the row back to its origin.
    pub fn begin_write_back<D: DmaController>(&mut self, dma: &mut D, n_bytes: usize) -> Result<()> {
        let EngineState::RowReady(read) = self.state else {
            return Err(self.invalid("start a write-back"));
        };
        if n_bytes == 0 || n_bytes > read.n_bytes || n_bytes % 4 != 0 {
            return Err(SpikeProcessingError::InvalidWriteBack {
                n_bytes,
                fetched_n_bytes: read.n_bytes,
            });
        }

        let tag = self.allocate_tag();
        let local = &mut self.buffers[read.buffer][..n_bytes];
        dma.start_transfer(tag, DmaDirection::Write, read.location.address, local)
            .map_err(SpikeProcessingError::DmaStart)?;

        debug!(tag, key = %read.origin.key(), n_bytes, "Write-back started");
        self.state = EngineState::WriteBackPending(Transfer {
            tag,
            n_bytes,
            ..read
        });
        Ok(())
    }

    /// Bytes of the row held in `transfer`'s buffer
    pub fn row(&self, transfer: &Transfer) -> &[u8] {
        &self.buffers[transfer.buffer][..transfer.n_bytes]
    }

    pub fn row_mut(&mut self, transfer: &Transfer) -> &mut [u8] {
        &mut self.buffers[transfer.buffer][..transfer.n_bytes]
    }
}
