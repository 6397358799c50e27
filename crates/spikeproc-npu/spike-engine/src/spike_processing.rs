// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Spike processing core: the user-event and timer side of the dispatcher
//!
//! ## Contexts
//! - Packet and DMA interrupts run the [`IsrHandlers`] returned by `initialise`
//! - User events run [`SpikeProcessing::on_user_event`]
//! - The timer runs [`SpikeProcessing::on_timer_tick`]
//!
//! The platform never runs the user-event and timer handlers at the same time, which is
//! why they take `&mut self`; interrupt handlers only touch the shared atomics.
//!
//! ## Flow
//! ```text
//! packet ISR → spike ring → user event → fetch (DMA) → DMA ISR → user event → walk row
//! ```

use std::sync::Arc;

use spikeproc_config::{
    collect_spike_processing_errors, ConfigValidationError, SpikeProcessingConfig,
};
use spikeproc_npu_neural::{ProvenanceRecord, RowLayout, SynapseWordFormat};
use spikeproc_npu_runtime::{
    Collaborators, InterruptController, MasterPopulationTable, PlasticityHook, Platform,
    StructuralPlasticity, UserEvent, UserEventTrigger,
};
use tracing::{debug, error, info, trace, warn};

use crate::boundary::TimestepBoundary;
use crate::dispatcher::{register_handlers, DmaCompletion, IsrHandlers, PacketReceiver, SharedState};
use crate::error::{InitError, Result, SpikeProcessingError};
use crate::fetch_engine::{Completed, EngineState, FetchOrigin, RowFetchEngine, Transfer};
use crate::input_buffer::SpikeRing;
use crate::pipeline::RowPipeline;
use crate::provenance::Counters;
use crate::rewiring::RewiringScheduler;

type TriggerOf<P> = <<P as Platform>::Interrupts as InterruptController>::Trigger;

/// The spike-processing core of one application core.
pub struct SpikeProcessing<P: Platform> {
    config: SpikeProcessingConfig,
    shared: Arc<SharedState>,
    trigger: TriggerOf<P>,
    rfe: RowFetchEngine,
    pipeline: RowPipeline,
    rewiring: RewiringScheduler,
    boundary: TimestepBoundary,
    counters: Counters,
    population_table: P::PopulationTable,
    synapses: P::Synapses,
    plasticity: P::Plasticity,
    structural: P::Rewiring,
    recorder: P::Recorder,
    dma: P::Dma,
    interrupts: P::Interrupts,
    time: u32,
    halted: bool,
}

fn init_error_from(errors: &[ConfigValidationError], config: &SpikeProcessingConfig) -> Option<InitError> {
    let first = errors.first()?;
    Some(match first {
        ConfigValidationError::NotPowerOfTwo { .. } => {
            InitError::SpikeBufferSizeNotPowerOfTwo(config.incoming_spike_buffer_size)
        }
        ConfigValidationError::PriorityOrder { .. } => {
            InitError::InvalidPriorityOrder(first.to_string())
        }
        ConfigValidationError::InvalidValue { .. } => InitError::InvalidConfig(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        ),
    })
}

impl<P: Platform> SpikeProcessing<P> {
    /// One-shot initialisation.
    ///
    /// Validates the configuration, allocates the spike ring and row buffers, and
    /// registers every handler with the interrupt controller. Returns the core (for
    /// user-event and timer context) and the interrupt-context handlers.
    ///
    /// # Errors
    ///
    /// Non-power-of-two spike buffer, priority inversion, allocation failure, or a
    /// second initialisation on the same interrupt controller.
    pub fn initialise(
        config: &SpikeProcessingConfig,
        collaborators: Collaborators<P>,
    ) -> std::result::Result<(Self, IsrHandlers<TriggerOf<P>>), InitError> {
        if let Some(err) = init_error_from(&collect_spike_processing_errors(config), config) {
            error!(error = %err, "Spike processing configuration rejected");
            return Err(err);
        }
        let format = SynapseWordFormat::for_population(
            config.n_neurons,
            config.n_synapse_types,
            config.synapse_delay_bits,
        )
        .map_err(InitError::SynapseFormat)?;

        let spikes = SpikeRing::try_new(config.incoming_spike_buffer_size)?;
        let rfe = RowFetchEngine::try_new(config.n_row_buffers, config.row_max_n_bytes)?;

        let Collaborators {
            population_table,
            synapses,
            plasticity,
            rewiring,
            recorder,
            dma,
            mut interrupts,
        } = collaborators;
        register_handlers(&mut interrupts, config)?;

        let shared = Arc::new(SharedState::new(spikes));
        let handlers = IsrHandlers {
            packets: PacketReceiver::new(Arc::clone(&shared), interrupts.user_event_trigger()),
            dma: DmaCompletion::new(Arc::clone(&shared), interrupts.user_event_trigger()),
        };

        info!(
            platform = P::platform_name(),
            row_max_n_bytes = config.row_max_n_bytes,
            n_row_buffers = config.n_row_buffers,
            incoming_spike_buffer_size = config.incoming_spike_buffer_size,
            clear_late = config.clear_input_buffers_of_late_packets,
            index_bits = format.index_bits(),
            type_bits = format.type_bits(),
            delay_bits = format.delay_bits(),
            "Spike processing initialised"
        );

        let engine = Self {
            config: config.clone(),
            trigger: interrupts.user_event_trigger(),
            shared,
            rfe,
            pipeline: RowPipeline::new(format),
            rewiring: RewiringScheduler::new(),
            boundary: TimestepBoundary::new(
                config.clear_input_buffers_of_late_packets,
                config.packets_per_timestep_region,
            ),
            counters: Counters::default(),
            population_table,
            synapses,
            plasticity,
            structural: rewiring,
            recorder,
            dma,
            interrupts,
            time: 0,
            halted: false,
        };
        Ok((engine, handlers))
    }

    // ------------------------------------------------------------------
    // User-event context
    // ------------------------------------------------------------------

    /// User-event handler: finish a DMA if one completed, then keep the fetch engine busy.
    ///
    /// # Errors
    ///
    /// Any error is fatal; the core stays halted afterwards.
    pub fn on_user_event(&mut self) -> Result<()> {
        if self.halted {
            return Err(SpikeProcessingError::Halted);
        }
        let result = self.service_user_event();
        if let Err(err) = &result {
            self.halted = true;
            error!(error = %err, time = self.time, "Spike processing halted");
        }
        result
    }

    fn service_user_event(&mut self) -> Result<()> {
        if let Some(tag) = self.shared.dma.take_failed() {
            return Err(SpikeProcessingError::DmaFailed { tag });
        }

        let mut did_work = false;
        if let Some(tag) = self.shared.dma.take_done() {
            did_work = true;
            match self.rfe.complete(tag)? {
                Completed::Read(transfer) => self.process_fetched_row(transfer)?,
                Completed::WriteBack(_) => self.counters.n_plastic_write_backs += 1,
            }
        }
        if self.rfe.is_idle() && self.try_start_fetch()? {
            did_work = true;
        }
        if !did_work {
            self.counters.n_spurious_user_events += 1;
            trace!(state = ?self.rfe.state().kind(), "User event found no work");
        }
        self.settle()
    }

    /// Go idle, unless work arrived meanwhile and the idle flag can be reclaimed.
    fn settle(&mut self) -> Result<()> {
        loop {
            if !self.rfe.is_idle() {
                // The DMA completion will post the next user event
                return Ok(());
            }
            self.shared.mark_engine_idle();
            if self.shared.spikes.is_empty() && !self.rewiring.has_pending() {
                return Ok(());
            }
            if !self.shared.claim_idle_engine() {
                // A packet ISR claimed it and posted a user event
                return Ok(());
            }
            self.try_start_fetch()?;
        }
    }

    /// Start the next row fetch: real spikes first, then one pending rewire.
    ///
    /// Returns true if a spike or rewire was consumed (fetched, missed or failed).
    fn try_start_fetch(&mut self) -> Result<bool> {
        if !self.rfe.is_idle() {
            return Ok(false);
        }
        let mut consumed = false;
        loop {
            if let Some(key) = self.shared.spikes.take() {
                consumed = true;
                match self.population_table.lookup(key) {
                    Some(location) => {
                        self.rfe
                            .begin_read(&mut self.dma, FetchOrigin::Spike(key), location)?;
                        return Ok(true);
                    }
                    None => {
                        // Dropped like a late spike; misses are the breakdown
                        self.counters.n_packets_dropped_from_lateness += 1;
                        self.counters.n_population_table_misses += 1;
                        warn!(%key, "No synaptic row for spike key; dropped");
                        continue;
                    }
                }
            }

            if !self.rewiring.take_one() {
                return Ok(consumed);
            }
            consumed = true;
            let target = self
                .structural
                .synthesise_rewire(self.time)
                .and_then(|key| self.population_table.lookup(key).map(|loc| (key, loc)));
            match target {
                Some((key, location)) => {
                    debug!(%key, pending = self.rewiring.pending(), "Rewire fetch");
                    self.rfe
                        .begin_read(&mut self.dma, FetchOrigin::Rewire(key), location)?;
                    return Ok(true);
                }
                None => {
                    self.counters.n_failed_rewires += 1;
                    debug!(time = self.time, "Rewire attempt produced no row");
                }
            }
        }
    }

    fn process_fetched_row(&mut self, transfer: Transfer) -> Result<()> {
        self.counters.n_dmas_complete += 1;
        let key = transfer.origin.key();
        let layout = RowLayout::parse(self.rfe.row(&transfer))
            .map_err(|source| SpikeProcessingError::MalformedRow { key, source })?;

        match transfer.origin {
            FetchOrigin::Spike(_) if !layout.has_plastic_region() => {
                // Static row: next fetch overlaps with the walk
                self.rfe.release_for_prefetch()?;
                self.try_start_fetch()?;
                let n = self
                    .pipeline
                    .deliver(self.rfe.row(&transfer), &layout, &mut self.synapses);
                self.rfe.finish_row();
                self.counters.n_spikes_processed += 1;
                trace!(%key, n_synapses = n, "Spike processed");
            }
            FetchOrigin::Spike(_) => {
                let write_back = self
                    .plasticity
                    .update_row_in_place(self.rfe.row_mut(&transfer), self.time)
                    .map_err(SpikeProcessingError::PlasticityFailed)?;
                let layout = RowLayout::parse(self.rfe.row(&transfer))
                    .map_err(|source| SpikeProcessingError::MalformedRow { key, source })?;
                let n = self
                    .pipeline
                    .deliver(self.rfe.row(&transfer), &layout, &mut self.synapses);
                self.counters.n_spikes_processed += 1;
                trace!(%key, n_synapses = n, ?write_back, "Plastic spike processed");
                self.finish_with_write_back(write_back)?;
            }
            FetchOrigin::Rewire(_) => {
                let write_back = self
                    .structural
                    .restructure_row(self.rfe.row_mut(&transfer), self.time)
                    .map_err(SpikeProcessingError::PlasticityFailed)?;
                self.counters.n_rewires += 1;
                debug!(%key, ?write_back, "Row restructured");
                self.finish_with_write_back(write_back)?;
            }
        }
        Ok(())
    }

    fn finish_with_write_back(&mut self, write_back: Option<usize>) -> Result<()> {
        match write_back {
            Some(n_bytes) if n_bytes > 0 => self.rfe.begin_write_back(&mut self.dma, n_bytes),
            _ => {
                self.rfe.finish_row();
                Ok(())
            }
        }
    }

    /// Request `n` more rewiring attempts (additive). Always true.
    pub fn do_rewiring(&mut self, n: u32) -> bool {
        self.rewiring.request(n);
        if n > 0 && !self.halted && self.shared.claim_idle_engine() {
            self.trigger.trigger_user_event(UserEvent::FetchRequested);
        }
        true
    }

    // ------------------------------------------------------------------
    // Timer context
    // ------------------------------------------------------------------

    /// Timestep boundary: record packet counts and, if configured, drop late spikes.
    pub fn on_timer_tick(&mut self, time: u32) {
        self.time = time;
        self.boundary.on_tick(
            time,
            &self.shared.spikes,
            &self.shared.packets_this_time_step,
            &mut self.recorder,
            &mut self.counters,
        );
    }

    /// Discard queued spikes now, counting them as late.
    pub fn clear_input_buffer(&mut self, time: u32) {
        self.boundary.clear_input_buffer(
            time,
            &self.shared.spikes,
            &self.shared.packets_this_time_step,
            &mut self.recorder,
            &mut self.counters,
        );
    }

    // ------------------------------------------------------------------
    // Provenance and inspection
    // ------------------------------------------------------------------

    /// Snapshot all counters into `record`.
    pub fn store_provenance(&self, record: &mut ProvenanceRecord) {
        *record = self.counters.snapshot(&self.shared.spikes);
        info!(
            n_input_buffer_overflows = record.n_input_buffer_overflows,
            n_dmas_complete = record.n_dmas_complete,
            n_spikes_processed = record.n_spikes_processed,
            n_rewires = record.n_rewires,
            n_packets_dropped_from_lateness = record.n_packets_dropped_from_lateness,
            max_filled_input_buffer_size = record.max_filled_input_buffer_size,
            "Spike processing provenance"
        );
    }

    /// Current counters, without logging
    pub fn provenance(&self) -> ProvenanceRecord {
        self.counters.snapshot(&self.shared.spikes)
    }

    /// Configuration the core was initialised with
    pub fn config(&self) -> &SpikeProcessingConfig {
        &self.config
    }

    /// Synapse word layout derived from the population size
    pub fn synapse_format(&self) -> &SynapseWordFormat {
        self.pipeline.format()
    }

    /// Row-fetch engine state
    pub fn state(&self) -> &EngineState {
        self.rfe.state()
    }

    /// Timestep of the last timer tick
    pub fn current_time(&self) -> u32 {
        self.time
    }

    /// True once a fatal error has stopped the core
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Spikes waiting in the incoming spike buffer
    pub fn spikes_queued(&self) -> u32 {
        self.shared.spikes.size()
    }

    /// Rewiring attempts not yet consumed
    pub fn pending_rewires(&self) -> u32 {
        self.rewiring.pending()
    }

    /// Master-population-table used for key lookups
    pub fn population_table(&self) -> &P::PopulationTable {
        &self.population_table
    }

    /// Mutable table, for remapping keys between runs
    pub fn population_table_mut(&mut self) -> &mut P::PopulationTable {
        &mut self.population_table
    }

    /// Synaptic input sink receiving row contributions
    pub fn synapses(&self) -> &P::Synapses {
        &self.synapses
    }

    /// Mutable synaptic input sink
    pub fn synapses_mut(&mut self) -> &mut P::Synapses {
        &mut self.synapses
    }

    /// Plasticity hook applied to rows with a plastic region
    pub fn plasticity(&self) -> &P::Plasticity {
        &self.plasticity
    }

    /// Mutable plasticity hook
    pub fn plasticity_mut(&mut self) -> &mut P::Plasticity {
        &mut self.plasticity
    }

    /// Structural plasticity source of rewire keys
    pub fn structural_plasticity(&self) -> &P::Rewiring {
        &self.structural
    }

    /// Recording channel for packets-per-timestep records
    pub fn recorder(&self) -> &P::Recorder {
        &self.recorder
    }

    /// Interrupt controller the handlers were registered with
    pub fn interrupts(&self) -> &P::Interrupts {
        &self.interrupts
    }
}
