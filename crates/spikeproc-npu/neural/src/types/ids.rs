// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity types carried by multicast packets

use core::fmt;

/// Spike key: the 32-bit routing key of a multicast spike packet.
///
/// Opaque to the core apart from being the argument of the master-population-table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct SpikeKey(pub u32);

impl fmt::Display for SpikeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(0x{:08x})", self.0)
    }
}

impl From<u32> for SpikeKey {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
