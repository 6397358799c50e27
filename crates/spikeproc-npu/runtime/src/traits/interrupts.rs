// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Interrupt controller abstraction
//!
//! The core runs on a single CPU with prioritised interrupts and a user-event queue.
//! Priorities follow the hardware convention: a smaller number is more urgent, and
//! negative numbers denote the fast interrupt line.

use super::error::Result;

/// Interrupt priority (smaller is more urgent)
pub type Priority = i32;

/// Event sources the spike-processing core attaches handlers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterruptSource {
    /// Multicast packet without payload
    MulticastPacket,
    /// Multicast packet carrying a 32-bit payload
    MulticastPacketWithPayload,
    /// DMA transfer finished
    DmaTransferDone,
    /// DMA transfer failed
    DmaError,
    /// Software-posted user event
    UserEvent,
    /// Periodic timestep timer
    Timer,
}

/// Reason a user event was posted (diagnostic only; handlers inspect shared state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserEvent {
    /// Spikes or rewires are waiting while the fetch engine is idle
    FetchRequested,
    /// A DMA transfer finished
    DmaCompleted,
}

/// Handle that posts user events; usable from interrupt context.
pub trait UserEventTrigger: Send + Sync {
    /// Post a user event.
    ///
    /// Returns false when a user event is already pending; the pending one will run the
    /// same handler, so nothing is lost.
    fn trigger_user_event(&self, event: UserEvent) -> bool;
}

/// Interrupt controller: handler registration and user-event posting.
pub trait InterruptController {
    /// Trigger handle given to interrupt-context handlers
    type Trigger: UserEventTrigger;

    /// Attach the core's handler for `source` at `priority`.
    ///
    /// Registering the same source twice is an error.
    fn register(&mut self, source: InterruptSource, priority: Priority) -> Result<()>;

    /// Handle for posting user events
    fn user_event_trigger(&self) -> Self::Trigger;
}
