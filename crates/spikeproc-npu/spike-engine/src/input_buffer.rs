// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Incoming spike buffer: bounded lock-free SPSC queue of spike keys
//!
//! The packet ISR is the only producer (`add`); the user-event/timer context is the only
//! consumer (`take`, `clear`). Head and tail are free-running counters that are only ever
//! advanced, so `head - tail` is the fill and never exceeds capacity.

use std::sync::atomic::{AtomicU32, Ordering};

use spikeproc_npu_neural::SpikeKey;

use crate::error::InitError;

/// Lock-free single-producer/single-consumer ring of spike keys.
#[derive(Debug)]
pub struct SpikeRing {
    slots: Box<[AtomicU32]>,
    mask: u32,
    /// Written only by the producer
    head: AtomicU32,
    /// Written only by the consumer
    tail: AtomicU32,
    n_overflows: AtomicU32,
    max_fill: AtomicU32,
}

impl SpikeRing {
    /// Allocate a ring of `capacity` slots.
    ///
    /// # Errors
    ///
    /// `capacity` must be a non-zero power of two no larger than 2^31.
    pub fn try_new(capacity: usize) -> Result<Self, InitError> {
        if !capacity.is_power_of_two() || capacity > 1 << 31 {
            return Err(InitError::SpikeBufferSizeNotPowerOfTwo(capacity));
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| InitError::AllocationFailed {
                what: "incoming spike buffer",
                n_bytes: capacity * std::mem::size_of::<AtomicU32>(),
            })?;
        slots.resize_with(capacity, || AtomicU32::new(0));

        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: (capacity - 1) as u32,
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            n_overflows: AtomicU32::new(0),
            max_fill: AtomicU32::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Producer side. Drops the key and counts an overflow when full.
    pub fn add(&self, key: SpikeKey) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let fill = head.wrapping_sub(tail);
        if fill as usize >= self.slots.len() {
            self.n_overflows.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.slots[(head & self.mask) as usize].store(key.0, Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        self.max_fill.fetch_max(fill + 1, Ordering::Relaxed);
        true
    }

    /// Consumer side. Oldest key, or `None` when empty.
    pub fn take(&self) -> Option<SpikeKey> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let key = self.slots[(tail & self.mask) as usize].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(SpikeKey(key))
    }

    /// Consumer side. Discard everything queued; returns how many keys were dropped.
    pub fn clear(&self) -> u32 {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
        head.wrapping_sub(tail)
    }

    pub fn size(&self) -> u32 {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn n_overflows(&self) -> u32 {
        self.n_overflows.load(Ordering::Relaxed)
    }

    /// Largest fill observed so far
    pub fn max_fill(&self) -> u32 {
        self.max_fill.load(Ordering::Relaxed)
    }

    /// Fold an externally observed fill (e.g. at the timestep boundary) into the maximum
    pub fn observe_fill(&self, fill: u32) {
        self.max_fill.fetch_max(fill, Ordering::Relaxed);
    }
}
