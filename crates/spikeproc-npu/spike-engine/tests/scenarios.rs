// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios on the simulated platform
//!
//! Each test drives packets, DMA completions, user events and timer ticks through a
//! `Simulation` and checks the provenance counters and the side-effect trace.

mod common;

use common::*;
use spikeproc_npu_neural::{RowLayout, SpikeKey};
use spikeproc_npu_runtime::std_impl::{SimCore, SimRewiring, TraceEvent};
use spikeproc_npu_runtime::DmaDirection;
use spikeproc_npu_spike_engine::{
    encode_packets_record, EngineStateKind, InitError, Simulation, SpikeProcessingError,
};

const K1: SpikeKey = SpikeKey(0x0001_0001);
const K2: SpikeKey = SpikeKey(0x0001_0002);
const K3: SpikeKey = SpikeKey(0x0001_0003);

// ============================================================================
// Spike path
// ============================================================================

#[test]
fn test_population_table_miss_is_counted_and_skipped() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1, K2]);

    sim.send_burst([K1, K2, K3]);
    sim.run_until_idle();

    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, 2);
    assert_eq!(record.n_dmas_complete, 2);
    assert_eq!(record.n_input_buffer_overflows, 0);
    assert_eq!(record.n_packets_dropped_from_lateness, 1);
    assert_eq!(record.n_population_table_misses, 1);
    assert!(sim.halted().is_none());
    assert_eq!(sim.engine().state().kind(), EngineStateKind::Idle);
}

#[test]
fn test_burst_overflows_spike_buffer() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.send_burst(std::iter::repeat(K1).take(20));
    sim.run_until_idle();

    let record = sim.provenance();
    assert_eq!(record.n_input_buffer_overflows, 4);
    assert_eq!(record.n_spikes_processed, 16);
    assert_eq!(record.max_filled_input_buffer_size, 16);
    assert_eq!(sim.engine().synapses().received().len(), 16);
}

#[test]
fn test_late_packets_cleared_at_boundary() {
    let config = spikeproc_config::SpikeProcessingConfig {
        clear_input_buffers_of_late_packets: true,
        ..small_config()
    };
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.send_burst(std::iter::repeat(K1).take(5));
    sim.tick(1);

    assert_eq!(sim.engine().spikes_queued(), 0);
    assert_eq!(sim.provenance().n_packets_dropped_from_lateness, 5);

    // The user event posted by the first packet now finds nothing to do
    sim.run_until_idle();
    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, 0);
    assert_eq!(record.n_dmas_complete, 0);
    assert_eq!(record.n_spurious_user_events, 1);
}

#[test]
fn test_late_packets_kept_when_not_configured() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.send_burst(std::iter::repeat(K1).take(5));
    sim.tick(1);
    assert_eq!(sim.engine().spikes_queued(), 5);

    sim.run_until_idle();
    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, 5);
    assert_eq!(record.n_packets_dropped_from_lateness, 0);
    assert_eq!(record.max_filled_input_buffer_size, 5);
}

#[test]
fn test_one_dma_in_flight() {
    let config = small_config();
    let keys = [K1, K2, K3];
    let mut sim = simulation_with_rows(&config, &keys);

    for _ in 0..4 {
        sim.send_burst(keys);
        sim.run_until_idle();
    }

    let stats = sim.core().dma_stats();
    assert_eq!(stats.reads_started, 12);
    assert_eq!(stats.max_in_flight, 1);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn test_contributions_follow_arrival_order() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1, K2, K3]);

    sim.send_burst([K3, K1, K2, K1]);
    sim.run_until_idle();

    // Rows carry weight = position in the table + 1
    let weights: Vec<u16> = sim
        .engine()
        .synapses()
        .received()
        .iter()
        .map(|c| c.weight)
        .collect();
    assert_eq!(weights, vec![3, 1, 2, 1]);
}

#[test]
fn test_payload_packet_repeats_key() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K2]);

    sim.send_with_payload(K2, 3);
    sim.run_until_idle();

    assert_eq!(sim.packets_sent(), 3);
    assert_eq!(sim.provenance().n_spikes_processed, 3);
}

#[test]
fn test_packet_during_row_walk_is_processed() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let row = static_row(&format, &[11, 12, 13]);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &row);
        map_row(&core, &mut c.population_table, K2, &static_row(&format, &[21]));
    });

    let port = sim.packet_port();
    sim.engine_mut().synapses_mut().arm_interrupt(move || {
        port.deliver(K2);
    });
    sim.send(K1);
    sim.run_until_idle();

    let weights: Vec<u16> = core.trace().contributions().iter().map(|c| c.weight).collect();
    assert_eq!(weights, vec![11, 12, 13, 21]);
    assert_eq!(sim.provenance().n_spikes_processed, 2);
    assert_eq!(sim.engine().spikes_queued(), 0);
}

// ============================================================================
// Plasticity
// ============================================================================

#[test]
fn test_plastic_row_updated_before_walk_and_written_back_before_next_fetch() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let plastic = plastic_row(&format, &[0xdead, 0xbeef], &[10, 20]);
    let mut address = 0;
    let mut sim = simulation_with(&config, core.clone(), |c| {
        address = map_row(&core, &mut c.population_table, K1, &plastic).address;
        map_row(&core, &mut c.population_table, K2, &static_row(&format, &[30]));
    });

    sim.send_burst([K1, K2]);
    sim.run_until_idle();
    assert!(sim.halted().is_none());

    let trace = core.trace();
    let update = trace
        .position(|e| matches!(e, TraceEvent::PlasticityUpdate { .. }))
        .expect("plasticity hook ran");
    let first_contribution = trace
        .position(|e| matches!(e, TraceEvent::Contribution(_)))
        .expect("row was walked");
    assert!(update < first_contribution);

    let events = trace.snapshot();
    let write_tag = events
        .iter()
        .find_map(|e| match e {
            TraceEvent::DmaStarted {
                tag,
                direction: DmaDirection::Write,
                ..
            } => Some(*tag),
            _ => None,
        })
        .expect("write-back started");
    let write_done = trace
        .position(|e| *e == TraceEvent::DmaCompleted { tag: write_tag })
        .expect("write-back completed");
    let next_read = trace
        .position(|e| {
            matches!(e, TraceEvent::DmaStarted { tag, direction: DmaDirection::Read, .. } if *tag > write_tag)
        })
        .expect("next row fetched");
    assert!(write_done < next_read);

    // The hook stamped the spike time (0) into the first plastic word
    let stored = core.read_memory(address, plastic.len()).unwrap();
    assert_eq!(&stored[4..8], &0u32.to_le_bytes());
    assert_eq!(&stored[8..12], &0xbeefu32.to_le_bytes());

    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, 2);
    assert_eq!(record.n_dmas_complete, 2);
    assert_eq!(record.n_plastic_write_backs, 1);
    assert_eq!(sim.engine().plasticity().n_updates(), 1);
    assert_eq!(core.dma_stats().max_in_flight, 1);
}

#[test]
fn test_plasticity_failure_halts() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &plastic_row(&format, &[1], &[5]));
        c.plasticity.fail_next();
    });

    sim.send(K1);
    sim.run_until_idle();

    assert!(matches!(
        sim.halted(),
        Some(SpikeProcessingError::PlasticityFailed(_))
    ));
    assert!(core.trace().contributions().is_empty());
}

#[test]
fn test_write_back_failure_halts_before_next_fetch() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &plastic_row(&format, &[1], &[5]));
        map_row(&core, &mut c.population_table, K2, &static_row(&format, &[6]));
    });

    sim.send_burst([K1, K2]);
    // Let the plastic read start, then fail the next transfer: the write-back
    while core.dma_stats().reads_started == 0 {
        assert!(sim.step());
    }
    core.fail_next_dma();
    sim.run_until_idle();

    assert_eq!(sim.halted(), Some(&SpikeProcessingError::DmaFailed { tag: 1 }));
    assert_eq!(sim.engine().state().kind(), EngineStateKind::WriteBackPending);
    let stats = core.dma_stats();
    assert_eq!(stats.reads_started, 1);
    assert_eq!(stats.writes_started, 1);

    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, 1);
    assert_eq!(record.n_plastic_write_backs, 0);
    assert_eq!(sim.engine().plasticity().n_updates(), 1);
}

// ============================================================================
// Rewiring
// ============================================================================

#[test]
fn test_rewiring_without_spikes() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &static_row(&format, &[1, 2]));
        c.rewiring = SimRewiring::new(core.trace(), vec![K1]);
    });

    assert!(sim.engine_mut().do_rewiring(3));
    sim.run_until_idle();

    let record = sim.provenance();
    assert_eq!(record.n_rewires, 3);
    assert_eq!(record.n_spikes_processed, 0);
    assert_eq!(record.n_dmas_complete, 3);
    assert!(core.trace().contributions().is_empty());
    assert_eq!(sim.engine().pending_rewires(), 0);
}

#[test]
fn test_rewiring_yields_to_real_spikes() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &static_row(&format, &[1]));
        map_row(&core, &mut c.population_table, K2, &static_row(&format, &[2]));
        c.rewiring = SimRewiring::new(core.trace(), vec![K2]);
    });

    sim.engine_mut().do_rewiring(5);
    let mut sent = 0;
    for time in 0..20 {
        sim.send_burst([K1, K1]);
        sent += 2;
        sim.run_until_idle();
        sim.tick(time);
    }

    let record = sim.provenance();
    assert_eq!(record.n_spikes_processed, sent);
    assert!(record.n_rewires <= 5);
    assert_eq!(record.n_rewires + record.n_failed_rewires, 5);
    assert_eq!(record.n_input_buffer_overflows, 0);
}

#[test]
fn test_rewiring_requests_accumulate() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &static_row(&format, &[1]));
        c.rewiring = SimRewiring::new(core.trace(), vec![K1]);
    });

    sim.engine_mut().do_rewiring(2);
    sim.engine_mut().do_rewiring(2);
    assert_eq!(sim.engine().pending_rewires(), 4);
    sim.run_until_idle();
    assert_eq!(sim.provenance().n_rewires, 4);
}

#[test]
fn test_rewire_without_candidate_counts_failure() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.engine_mut().do_rewiring(2);
    sim.run_until_idle();

    let record = sim.provenance();
    assert_eq!(record.n_rewires, 0);
    assert_eq!(record.n_failed_rewires, 2);
    assert_eq!(record.n_dmas_complete, 0);
}

#[test]
fn test_restructured_row_is_written_back() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let row = static_row(&format, &[1, 2]);
    let mut address = 0;
    let mut sim = simulation_with(&config, core.clone(), |c| {
        address = map_row(&core, &mut c.population_table, K1, &row).address;
        c.rewiring = SimRewiring::new(core.trace(), vec![K1]).with_replacement(0xffff_0000);
    });

    sim.engine_mut().do_rewiring(1);
    sim.run_until_idle();

    let stored = core.read_memory(address, row.len()).unwrap();
    let layout = RowLayout::parse(&stored).unwrap();
    let words: Vec<u32> = layout.fixed_words(&stored).collect();
    assert_eq!(words[0], 0xffff_0000);
    assert_eq!(words[1], format.encode(&spikeproc_npu_neural::SynapticContribution::new(0, 0, 1, 2)));

    let record = sim.provenance();
    assert_eq!(record.n_rewires, 1);
    assert_eq!(record.n_plastic_write_backs, 1);
    assert_eq!(sim.engine().structural_plasticity().n_restructured(), 1);
}

// ============================================================================
// Timestep boundary
// ============================================================================

#[test]
fn test_packets_per_timestep_recorded() {
    let config = spikeproc_config::SpikeProcessingConfig {
        packets_per_timestep_region: 3,
        ..small_config()
    };
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.send_burst([K1, K1, K1]);
    sim.run_until_idle();
    sim.tick(0);
    sim.send_burst([K1, K1]);
    sim.run_until_idle();
    sim.tick(1);
    sim.tick(2);

    let expected = [
        encode_packets_record(0, 3),
        encode_packets_record(1, 2),
        encode_packets_record(2, 0),
    ];
    let recorded = sim.engine().recorder().region(3);
    assert_eq!(recorded, expected.iter().map(|r| r.as_slice()).collect::<Vec<_>>());
}

#[test]
fn test_clear_input_buffer_twice_matches_once() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1]);

    sim.send_burst([K1, K1, K1]);
    sim.deliver_packets();
    sim.engine_mut().clear_input_buffer(4);
    let once = sim.provenance();
    let recorded = sim.engine().recorder().entries().len();
    sim.engine_mut().clear_input_buffer(4);

    assert_eq!(sim.provenance(), once);
    assert_eq!(sim.engine().recorder().entries().len(), recorded);
    assert_eq!(sim.engine().spikes_queued(), 0);
    assert_eq!(once.n_packets_dropped_from_lateness, 3);
}

// ============================================================================
// Initialisation and fatal errors
// ============================================================================

#[test]
fn test_second_initialise_rejected() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let _first = simulation_with(&config, core.clone(), |_| {});

    let again = Simulation::new(
        &config,
        core.clone(),
        spikeproc_npu_runtime::std_impl::SimPlatform::collaborators(
            &core,
            spikeproc_npu_runtime::std_impl::SimPopulationTable::new(),
        ),
    );
    assert!(matches!(again, Err(InitError::AlreadyInitialised)));
}

#[test]
fn test_invalid_configs_rejected() {
    let core = SimCore::new(SDRAM_BYTES);
    let init = |config: spikeproc_config::SpikeProcessingConfig| {
        Simulation::new(
            &config,
            core.clone(),
            spikeproc_npu_runtime::std_impl::SimPlatform::collaborators(
                &core,
                spikeproc_npu_runtime::std_impl::SimPopulationTable::new(),
            ),
        )
        .err()
    };

    assert_eq!(
        init(spikeproc_config::SpikeProcessingConfig {
            incoming_spike_buffer_size: 12,
            ..small_config()
        }),
        Some(InitError::SpikeBufferSizeNotPowerOfTwo(12))
    );
    assert!(matches!(
        init(spikeproc_config::SpikeProcessingConfig {
            user_event_priority: -2,
            ..small_config()
        }),
        Some(InitError::InvalidPriorityOrder(_))
    ));
    assert!(matches!(
        init(spikeproc_config::SpikeProcessingConfig {
            n_row_buffers: 1,
            ..small_config()
        }),
        Some(InitError::InvalidConfig(_))
    ));
    // Populations too large for any power of two are rejected, not a panic
    assert!(matches!(
        init(spikeproc_config::SpikeProcessingConfig {
            n_neurons: 3_000_000_000,
            ..small_config()
        }),
        Some(InitError::InvalidConfig(_))
    ));
    assert!(matches!(
        init(spikeproc_config::SpikeProcessingConfig {
            n_synapse_types: u32::MAX,
            ..small_config()
        }),
        Some(InitError::InvalidConfig(_))
    ));

    // Rejected configs register nothing, so a valid one still initialises
    assert!(init(small_config()).is_none());
}

#[test]
fn test_dma_error_halts() {
    let config = small_config();
    let mut sim = simulation_with_rows(&config, &[K1, K2]);

    sim.core().fail_next_dma();
    sim.send(K1);
    sim.run_until_idle();

    assert_eq!(sim.halted(), Some(&SpikeProcessingError::DmaFailed { tag: 0 }));
    assert!(sim.engine().is_halted());
    assert_eq!(
        sim.engine_mut().on_user_event(),
        Err(SpikeProcessingError::Halted)
    );

    sim.send(K2);
    sim.run_until_idle();
    assert_eq!(sim.provenance().n_spikes_processed, 0);
}

#[test]
fn test_oversized_row_halts() {
    let config = small_config();
    let core = SimCore::new(SDRAM_BYTES);
    let format = format(&config);
    let weights: Vec<u16> = (0..80).collect();
    let mut sim = simulation_with(&config, core.clone(), |c| {
        map_row(&core, &mut c.population_table, K1, &static_row(&format, &weights));
    });

    sim.send(K1);
    sim.run_until_idle();

    assert!(matches!(
        sim.halted(),
        Some(SpikeProcessingError::RowTooLarge { n_bytes: 332, row_max_n_bytes: 256, .. })
    ));
    assert_eq!(core.dma_stats().reads_started, 0);
}
