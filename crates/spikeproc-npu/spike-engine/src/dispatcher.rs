// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dispatcher: interrupt-context handlers and handler registration
//!
//! ISR-context work is limited to a few atomic operations: enqueue the key, count it,
//! and post a user event when the fetch engine is idle. Everything else runs in
//! user-event context inside [`crate::SpikeProcessing`].
//!
//! ## Idle handshake
//!
//! `engine_idle` is true only while the user-event side has nothing in flight and has
//! promised to look at the spike buffer again before sleeping. Whoever swaps it from true
//! to false owns the wake-up: the packet ISR posts a user event, the user-event handler
//! keeps fetching. This is what prevents a lost wake-up when a packet lands just as the
//! engine goes idle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use spikeproc_config::SpikeProcessingConfig;
use spikeproc_npu_neural::SpikeKey;
use spikeproc_npu_runtime::{
    InterruptController, InterruptSource, RuntimeError, UserEvent, UserEventTrigger,
};
use tracing::trace;

use crate::error::InitError;
use crate::input_buffer::SpikeRing;

/// Completion reported by a DMA interrupt, picked up by the next user event.
#[derive(Debug, Default)]
pub(crate) struct DmaMailbox {
    done: AtomicBool,
    done_tag: AtomicU32,
    failed: AtomicBool,
    failed_tag: AtomicU32,
}

impl DmaMailbox {
    fn post_done(&self, tag: u32) {
        self.done_tag.store(tag, Ordering::Relaxed);
        self.done.store(true, Ordering::Release);
    }

    fn post_failed(&self, tag: u32) {
        self.failed_tag.store(tag, Ordering::Relaxed);
        self.failed.store(true, Ordering::Release);
    }

    pub(crate) fn take_done(&self) -> Option<u32> {
        self.done
            .swap(false, Ordering::AcqRel)
            .then(|| self.done_tag.load(Ordering::Relaxed))
    }

    pub(crate) fn take_failed(&self) -> Option<u32> {
        self.failed
            .swap(false, Ordering::AcqRel)
            .then(|| self.failed_tag.load(Ordering::Relaxed))
    }
}

/// State shared between interrupt context and user-event context
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) spikes: SpikeRing,
    pub(crate) packets_this_time_step: AtomicU32,
    pub(crate) engine_idle: AtomicBool,
    pub(crate) dma: DmaMailbox,
}

impl SharedState {
    pub(crate) fn new(spikes: SpikeRing) -> Self {
        Self {
            spikes,
            packets_this_time_step: AtomicU32::new(0),
            engine_idle: AtomicBool::new(true),
            dma: DmaMailbox::default(),
        }
    }

    /// Claim the idle engine; true means the caller must make sure it runs.
    pub(crate) fn claim_idle_engine(&self) -> bool {
        self.engine_idle.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn mark_engine_idle(&self) {
        self.engine_idle.store(true, Ordering::SeqCst);
    }
}

/// Multicast packet handler (highest priority).
///
/// There is exactly one per core: the spike buffer has a single producer.
#[derive(Debug)]
pub struct PacketReceiver<T: UserEventTrigger> {
    shared: Arc<SharedState>,
    trigger: T,
}

impl<T: UserEventTrigger> PacketReceiver<T> {
    pub(crate) fn new(shared: Arc<SharedState>, trigger: T) -> Self {
        Self { shared, trigger }
    }

    /// Packet without payload. Returns false if the spike buffer was full.
    pub fn on_packet(&self, key: SpikeKey) -> bool {
        self.shared
            .packets_this_time_step
            .fetch_add(1, Ordering::Relaxed);
        let queued = self.shared.spikes.add(key);
        if queued && self.shared.claim_idle_engine() {
            self.trigger.trigger_user_event(UserEvent::FetchRequested);
        }
        queued
    }

    /// Packet with payload `n`: `n` arrivals of the same key.
    ///
    /// Returns how many were queued.
    pub fn on_packet_with_payload(&self, key: SpikeKey, payload: u32) -> u32 {
        let mut queued = 0;
        for _ in 0..payload {
            if self.on_packet(key) {
                queued += 1;
            }
        }
        queued
    }
}

/// DMA done / DMA error handler.
#[derive(Debug)]
pub struct DmaCompletion<T: UserEventTrigger> {
    shared: Arc<SharedState>,
    trigger: T,
}

impl<T: UserEventTrigger> DmaCompletion<T> {
    pub(crate) fn new(shared: Arc<SharedState>, trigger: T) -> Self {
        Self { shared, trigger }
    }

    pub fn on_transfer_done(&self, tag: u32) {
        trace!(tag, "DMA done");
        self.shared.dma.post_done(tag);
        self.trigger.trigger_user_event(UserEvent::DmaCompleted);
    }

    /// Reported as fatal by the next user event.
    pub fn on_error(&self, tag: u32) {
        self.shared.dma.post_failed(tag);
        self.trigger.trigger_user_event(UserEvent::DmaCompleted);
    }
}

/// Handlers the platform invokes from interrupt context
#[derive(Debug)]
pub struct IsrHandlers<T: UserEventTrigger> {
    pub packets: PacketReceiver<T>,
    pub dma: DmaCompletion<T>,
}

/// Attach every handler at its configured priority.
///
/// A source that is already registered means the core was initialised before.
pub fn register_handlers<I: InterruptController>(
    interrupts: &mut I,
    config: &SpikeProcessingConfig,
) -> Result<(), InitError> {
    let registrations = [
        (InterruptSource::MulticastPacket, config.mc_packet_callback_priority),
        (
            InterruptSource::MulticastPacketWithPayload,
            config.mc_packet_callback_priority,
        ),
        (InterruptSource::DmaTransferDone, config.dma_callback_priority),
        (InterruptSource::DmaError, config.dma_callback_priority),
        (InterruptSource::UserEvent, config.user_event_priority),
        (InterruptSource::Timer, config.timer_priority),
    ];
    for (source, priority) in registrations {
        interrupts.register(source, priority).map_err(|e| match e {
            RuntimeError::AlreadyRegistered { .. } => InitError::AlreadyInitialised,
            other => InitError::Registration(other),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Default, Clone)]
    struct CountingTrigger(Arc<AtomicUsize>);

    impl UserEventTrigger for CountingTrigger {
        fn trigger_user_event(&self, _event: UserEvent) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn receiver(capacity: usize) -> (PacketReceiver<CountingTrigger>, Arc<SharedState>, CountingTrigger) {
        let shared = Arc::new(SharedState::new(SpikeRing::try_new(capacity).unwrap()));
        let trigger = CountingTrigger::default();
        (
            PacketReceiver::new(Arc::clone(&shared), trigger.clone()),
            shared,
            trigger,
        )
    }

    #[test]
    fn test_only_first_packet_wakes_idle_engine() {
        let (rx, shared, trigger) = receiver(8);
        rx.on_packet(SpikeKey(1));
        rx.on_packet(SpikeKey(2));
        assert_eq!(trigger.0.load(Ordering::SeqCst), 1);
        assert_eq!(shared.spikes.size(), 2);
        assert_eq!(shared.packets_this_time_step.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_busy_engine_is_not_woken() {
        let (rx, shared, trigger) = receiver(8);
        assert!(shared.claim_idle_engine());
        rx.on_packet(SpikeKey(1));
        assert_eq!(trigger.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_payload_repeats_key_and_counts_overflow() {
        let (rx, shared, _) = receiver(4);
        assert_eq!(rx.on_packet_with_payload(SpikeKey(9), 6), 4);
        assert_eq!(shared.spikes.n_overflows(), 2);
        assert_eq!(shared.packets_this_time_step.load(Ordering::SeqCst), 6);
        assert_eq!(rx.on_packet_with_payload(SpikeKey(9), 0), 0);
    }

    #[test]
    fn test_mailbox_is_taken_once() {
        let mailbox = DmaMailbox::default();
        assert_eq!(mailbox.take_done(), None);
        mailbox.post_done(3);
        assert_eq!(mailbox.take_done(), Some(3));
        assert_eq!(mailbox.take_done(), None);
        mailbox.post_failed(4);
        assert_eq!(mailbox.take_failed(), Some(4));
    }
}
