// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated external memory (SDRAM)

use crate::traits::{Result, RuntimeError};

/// Base address of the simulated external memory map
pub const SDRAM_BASE: u32 = 0x6000_0000;

/// Byte-addressed external memory with a bump allocator for loaders and tests.
#[derive(Debug, Clone)]
pub struct SimSdram {
    bytes: Vec<u8>,
    next_free: usize,
}

impl SimSdram {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            bytes: vec![0; size_bytes],
            next_free: 0,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    fn offset(&self, address: u32, n_bytes: usize) -> Result<usize> {
        let out_of_bounds = RuntimeError::TransferOutOfBounds { address, n_bytes };
        let offset = address.checked_sub(SDRAM_BASE).ok_or(out_of_bounds.clone())? as usize;
        match offset.checked_add(n_bytes) {
            Some(end) if end <= self.bytes.len() => Ok(offset),
            _ => Err(out_of_bounds),
        }
    }

    /// Reserve a word-aligned block and return its address
    pub fn allocate(&mut self, n_bytes: usize) -> Result<u32> {
        let start = self.next_free.next_multiple_of(4);
        let end = start
            .checked_add(n_bytes)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(RuntimeError::OutOfMemory {
                requested_bytes: n_bytes,
            })?;
        self.next_free = end;
        Ok(SDRAM_BASE + start as u32)
    }

    /// Allocate and fill a block, e.g. a synaptic row image
    pub fn store(&mut self, data: &[u8]) -> Result<u32> {
        let address = self.allocate(data.len())?;
        self.write(address, data)?;
        Ok(address)
    }

    pub fn read(&self, address: u32, n_bytes: usize) -> Result<&[u8]> {
        let offset = self.offset(address, n_bytes)?;
        Ok(&self.bytes[offset..offset + n_bytes])
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let offset = self.offset(address, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}
