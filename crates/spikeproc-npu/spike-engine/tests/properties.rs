// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests over random packet, run and tick interleavings

mod common;

use common::*;
use proptest::prelude::*;
use spikeproc_config::SpikeProcessingConfig;
use spikeproc_npu_neural::SpikeKey;

/// Keys 0..3 have rows (weight = key + 1); key 3 misses the population table
const N_MAPPED: u32 = 3;

#[derive(Debug, Clone)]
enum Op {
    Send(u32),
    Payload(u32, u32),
    Run,
    Tick,
    Rewire(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..=N_MAPPED).prop_map(Op::Send),
        1 => ((0..N_MAPPED), 1u32..4).prop_map(|(k, n)| Op::Payload(k, n)),
        2 => Just(Op::Run),
        1 => Just(Op::Tick),
        1 => (0u32..3).prop_map(Op::Rewire),
    ]
}

fn keys() -> Vec<SpikeKey> {
    (0..N_MAPPED).map(SpikeKey).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every packet is processed, dropped, still queued or overflowed
    #[test]
    fn prop_packets_are_conserved(
        ops in prop::collection::vec(op(), 0..120),
        clear_late in any::<bool>(),
    ) {
        let config = SpikeProcessingConfig {
            clear_input_buffers_of_late_packets: clear_late,
            ..small_config()
        };
        let mut sim = simulation_with_rows(&config, &keys());
        let mut time = 0;
        for op in ops {
            match op {
                Op::Send(k) => sim.send(SpikeKey(k)),
                Op::Payload(k, n) => sim.send_with_payload(SpikeKey(k), n),
                Op::Run => {
                    sim.run_until_idle();
                }
                Op::Tick => {
                    sim.tick(time);
                    time += 1;
                }
                Op::Rewire(n) => {
                    sim.engine_mut().do_rewiring(n);
                }
            }
            prop_assert!(sim.engine().spikes_queued() as usize <= config.incoming_spike_buffer_size);
        }
        sim.deliver_packets();

        prop_assert!(sim.halted().is_none());
        let record = sim.provenance();
        let accounted = u64::from(record.n_spikes_processed)
            + u64::from(record.n_packets_dropped_from_lateness)
            + u64::from(sim.engine().spikes_queued())
            + u64::from(record.n_input_buffer_overflows);
        prop_assert_eq!(accounted, sim.packets_sent());
        prop_assert!(record.n_population_table_misses <= record.n_packets_dropped_from_lateness);
        prop_assert!(record.max_filled_input_buffer_size as usize <= config.incoming_spike_buffer_size);
        prop_assert!(sim.core().dma_stats().max_in_flight <= 1);
    }

    /// Without overflow, rows are walked in packet arrival order
    #[test]
    fn prop_rows_walked_in_arrival_order(sent in prop::collection::vec(0..N_MAPPED, 0..=16)) {
        let config = small_config();
        let mut sim = simulation_with_rows(&config, &keys());

        sim.send_burst(sent.iter().copied().map(SpikeKey));
        sim.run_until_idle();

        let walked: Vec<u32> = sim
            .engine()
            .synapses()
            .received()
            .iter()
            .map(|c| u32::from(c.weight) - 1)
            .collect();
        prop_assert_eq!(walked, sent);
    }

    /// A second clear with no packets in between changes nothing
    #[test]
    fn prop_clear_is_idempotent(n in 0usize..24, time in 0u32..1000) {
        let config = small_config();
        let mut sim = simulation_with_rows(&config, &keys());

        sim.send_burst(std::iter::repeat(SpikeKey(0)).take(n));
        sim.deliver_packets();
        sim.engine_mut().clear_input_buffer(time);
        let once = sim.provenance();
        let n_records = sim.engine().recorder().entries().len();
        sim.engine_mut().clear_input_buffer(time);

        prop_assert_eq!(sim.engine().spikes_queued(), 0);
        prop_assert_eq!(sim.provenance(), once);
        prop_assert_eq!(sim.engine().recorder().entries().len(), n_records);
        prop_assert_eq!(
            u64::from(once.n_packets_dropped_from_lateness + once.n_input_buffer_overflows),
            n as u64
        );
    }
}
