// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host implementations of the collaborator seams
//!
//! Simple enough to reason about in tests, but each one reports what it saw through the
//! shared [`SimTrace`] so ordering between DMA, plasticity and delivery can be checked.

use ahash::AHashMap;
use spikeproc_npu_neural::{RowLayout, RowLocation, SpikeKey, SynapticContribution, BYTES_PER_WORD};

use super::trace::{SimTrace, TraceEvent};
use crate::traits::{
    MasterPopulationTable, PlasticityHook, RecordingChannel, Result, RuntimeError,
    StructuralPlasticity, SynapticInput,
};

/// Hash-map backed master-population-table.
#[derive(Debug, Clone, Default)]
pub struct SimPopulationTable {
    rows: AHashMap<SpikeKey, RowLocation>,
}

impl SimPopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SpikeKey, location: RowLocation) -> Option<RowLocation> {
        self.rows.insert(key, location)
    }

    pub fn remove(&mut self, key: SpikeKey) -> Option<RowLocation> {
        self.rows.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl MasterPopulationTable for SimPopulationTable {
    fn lookup(&self, key: SpikeKey) -> Option<RowLocation> {
        self.rows.get(&key).copied()
    }
}

type InterruptHook = Box<dyn FnMut() + Send>;

/// Input accumulators that just remember what they were given.
///
/// An armed interrupt fires once, at the next contribution, to simulate a packet
/// arriving while a row is being walked.
#[derive(Default)]
pub struct RecordingInput {
    received: Vec<SynapticContribution>,
    trace: SimTrace,
    armed: Option<InterruptHook>,
}

impl RecordingInput {
    pub fn new(trace: SimTrace) -> Self {
        Self {
            received: Vec::new(),
            trace,
            armed: None,
        }
    }

    pub fn received(&self) -> &[SynapticContribution] {
        &self.received
    }

    pub fn arm_interrupt(&mut self, hook: impl FnMut() + Send + 'static) {
        self.armed = Some(Box::new(hook));
    }
}

impl std::fmt::Debug for RecordingInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingInput")
            .field("received", &self.received.len())
            .field("armed", &self.armed.is_some())
            .finish()
    }
}

impl SynapticInput for RecordingInput {
    fn add_synaptic_contribution(&mut self, contribution: SynapticContribution) {
        if let Some(mut hook) = self.armed.take() {
            hook();
        }
        self.received.push(contribution);
        self.trace.push(TraceEvent::Contribution(contribution));
    }
}

/// Recording channel that keeps every write in memory.
#[derive(Debug, Clone, Default)]
pub struct SimRecorder {
    entries: Vec<(u32, Vec<u8>)>,
    capacity: Option<usize>,
}

impl SimRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that reports "full" after `capacity` writes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn entries(&self) -> &[(u32, Vec<u8>)] {
        &self.entries
    }

    /// Payloads written to `region`, in order
    pub fn region(&self, region: u32) -> Vec<&[u8]> {
        self.entries
            .iter()
            .filter(|(r, _)| *r == region)
            .map(|(_, bytes)| bytes.as_slice())
            .collect()
    }
}

impl RecordingChannel for SimRecorder {
    fn record(&mut self, region: u32, bytes: &[u8]) -> bool {
        if self.capacity.is_some_and(|cap| self.entries.len() >= cap) {
            return false;
        }
        self.entries.push((region, bytes.to_vec()));
        true
    }
}

/// Plasticity rule for tests: stamps the spike time into the first plastic word and
/// asks for the header plus plastic region to be written back.
#[derive(Debug, Clone, Default)]
pub struct SimPlasticity {
    trace: SimTrace,
    n_updates: u32,
    fail_next: bool,
}

impl SimPlasticity {
    pub fn new(trace: SimTrace) -> Self {
        Self {
            trace,
            n_updates: 0,
            fail_next: false,
        }
    }

    pub fn n_updates(&self) -> u32 {
        self.n_updates
    }

    /// Make the next update report an error
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }
}

impl PlasticityHook for SimPlasticity {
    fn update_row_in_place(&mut self, row: &mut [u8], time: u32) -> Result<Option<usize>> {
        if std::mem::take(&mut self.fail_next) {
            return Err(RuntimeError::PlasticityFailed {
                reason: "injected failure",
            });
        }
        let layout = RowLayout::parse(row).map_err(|_| RuntimeError::PlasticityFailed {
            reason: "malformed row",
        })?;
        let region = layout.plastic_region_mut(row);
        if let Some(first) = region.get_mut(..BYTES_PER_WORD) {
            first.copy_from_slice(&time.to_le_bytes());
        }
        let n_bytes = (1 + layout.n_plastic_words()) * BYTES_PER_WORD;
        self.n_updates += 1;
        self.trace.push(TraceEvent::PlasticityUpdate { time, n_bytes });
        Ok(Some(n_bytes))
    }
}

/// Rewiring rule for tests: cycles through candidate presynaptic keys.
///
/// With a replacement word set, restructuring overwrites the first fixed synapse and
/// asks for the whole row to be written back.
#[derive(Debug, Clone, Default)]
pub struct SimRewiring {
    trace: SimTrace,
    candidates: Vec<SpikeKey>,
    next: usize,
    replacement: Option<u32>,
    n_restructured: u32,
}

impl SimRewiring {
    pub fn new(trace: SimTrace, candidates: Vec<SpikeKey>) -> Self {
        Self {
            trace,
            candidates,
            ..Self::default()
        }
    }

    pub fn with_replacement(mut self, word: u32) -> Self {
        self.replacement = Some(word);
        self
    }

    pub fn n_restructured(&self) -> u32 {
        self.n_restructured
    }
}

impl StructuralPlasticity for SimRewiring {
    fn synthesise_rewire(&mut self, _time: u32) -> Option<SpikeKey> {
        let key = *self.candidates.get(self.next % self.candidates.len().max(1))?;
        self.next = self.next.wrapping_add(1);
        Some(key)
    }

    fn restructure_row(&mut self, row: &mut [u8], time: u32) -> Result<Option<usize>> {
        self.n_restructured += 1;
        self.trace.push(TraceEvent::Restructure { time });

        let Some(word) = self.replacement else {
            return Ok(None);
        };
        let layout = RowLayout::parse(row).map_err(|_| RuntimeError::PlasticityFailed {
            reason: "malformed row",
        })?;
        if layout.n_fixed() == 0 {
            return Ok(None);
        }
        let start = (layout.n_plastic_words() + 3) * BYTES_PER_WORD;
        if let Some(slot) = row.get_mut(start..start + BYTES_PER_WORD) {
            slot.copy_from_slice(&word.to_le_bytes());
        }
        Ok(Some(layout.n_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spikeproc_npu_neural::RowBuilder;

    #[test]
    fn test_plasticity_stamps_time_and_limits_write_back() {
        let trace = SimTrace::new();
        let mut plasticity = SimPlasticity::new(trace.clone());
        let mut row = RowBuilder::new()
            .plastic_words(&[0, 0])
            .fixed_word(0x0001_0001)
            .build();

        let n_bytes = plasticity.update_row_in_place(&mut row, 42).unwrap();
        assert_eq!(n_bytes, Some(12));
        assert_eq!(&row[4..8], &42u32.to_le_bytes());
        assert_eq!(
            trace.snapshot(),
            vec![TraceEvent::PlasticityUpdate { time: 42, n_bytes: 12 }]
        );
    }

    #[test]
    fn test_plasticity_failure_is_one_shot() {
        let mut plasticity = SimPlasticity::new(SimTrace::new());
        let mut row = RowBuilder::new().plastic_words(&[0]).build();
        plasticity.fail_next();
        assert!(plasticity.update_row_in_place(&mut row, 1).is_err());
        assert!(plasticity.update_row_in_place(&mut row, 1).is_ok());
    }

    #[test]
    fn test_rewiring_cycles_candidates() {
        let mut rewiring = SimRewiring::new(SimTrace::new(), vec![SpikeKey(1), SpikeKey(2)]);
        assert_eq!(rewiring.synthesise_rewire(0), Some(SpikeKey(1)));
        assert_eq!(rewiring.synthesise_rewire(0), Some(SpikeKey(2)));
        assert_eq!(rewiring.synthesise_rewire(0), Some(SpikeKey(1)));

        let mut empty = SimRewiring::new(SimTrace::new(), Vec::new());
        assert_eq!(empty.synthesise_rewire(0), None);
    }

    #[test]
    fn test_rewiring_replaces_first_fixed_word() {
        let mut rewiring =
            SimRewiring::new(SimTrace::new(), vec![SpikeKey(1)]).with_replacement(0xdead_beef);
        let mut row = RowBuilder::new().fixed_word(1).fixed_word(2).build();
        let n_bytes = rewiring.restructure_row(&mut row, 3).unwrap();

        assert_eq!(n_bytes, Some(row.len()));
        let layout = RowLayout::parse(&row).unwrap();
        assert_eq!(layout.fixed_words(&row).collect::<Vec<_>>(), vec![0xdead_beef, 2]);
    }

    #[test]
    fn test_recording_input_fires_armed_interrupt_once() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let mut input = RecordingInput::new(SimTrace::new());
        input.arm_interrupt(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let c = SynapticContribution::new(1, 0, 1, 10);
        input.add_synaptic_contribution(c);
        input.add_synaptic_contribution(c);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(input.received().len(), 2);
    }

    #[test]
    fn test_recorder_reports_full() {
        let mut recorder = SimRecorder::with_capacity(1);
        assert!(recorder.record(0, &[1]));
        assert!(!recorder.record(0, &[2]));
        assert_eq!(recorder.region(0), vec![&[1u8][..]]);
    }
}
