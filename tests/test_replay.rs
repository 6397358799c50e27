// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Replay tests through the umbrella crate: config file → trace → provenance report

use std::io::Write;

use spikeproc::config::load_config;
use spikeproc::prelude::*;
use spikeproc::replay::{replay, ReplayEvent, ReplayScript, RowSpec, SynapseSpec};

fn row(key: u32, weights: &[u16]) -> RowSpec {
    RowSpec {
        key,
        plastic_words: Vec::new(),
        synapses: weights
            .iter()
            .map(|&weight| SynapseSpec {
                target: 0,
                synapse_type: 0,
                delay: 1,
                weight,
            })
            .collect(),
    }
}

#[test]
fn test_replay_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[spike_processing]
incoming_spike_buffer_size = 16
row_max_n_bytes = 256
clear_input_buffers_of_late_packets = true
"#
    )
    .unwrap();
    let config = load_config(Some(file.path()), None).unwrap();

    let script = ReplayScript {
        rows: vec![row(1, &[10, 20]), row(2, &[30])],
        rewire_candidates: Vec::new(),
        events: vec![
            ReplayEvent::Spike(1),
            ReplayEvent::Spike(2),
            ReplayEvent::Spike(9),
            ReplayEvent::Run,
            ReplayEvent::Tick(0),
            // Queued, then dropped as late by the boundary
            ReplayEvent::Payload { key: 1, count: 4 },
            ReplayEvent::Tick(1),
        ],
    };
    let report = replay(&config.spike_processing, &script).unwrap();

    assert_eq!(report.packets_sent, 7);
    assert_eq!(report.provenance.n_spikes_processed, 2);
    assert_eq!(report.provenance.n_population_table_misses, 1);
    // Four late spikes plus the key with no row
    assert_eq!(report.provenance.n_packets_dropped_from_lateness, 5);
    assert_eq!(report.contributions, 3);
    assert_eq!(report.dma_reads, 2);
    assert!(report.halted.is_none());
}

#[test]
fn test_replay_plastic_row_and_rewiring() {
    let mut plastic = row(5, &[1, 2, 3]);
    plastic.plastic_words = vec![7, 8];
    let script = ReplayScript::from_json(
        &serde_json::json!({
            "rows": [plastic, row(6, &[4])],
            "rewire_candidates": [6],
            "events": [{ "spike": 5 }, { "rewire": 2 }, "run"]
        })
        .to_string(),
    )
    .unwrap();

    let report = replay(&SpikeProcessingConfig::default(), &script).unwrap();

    assert_eq!(report.provenance.n_spikes_processed, 1);
    assert_eq!(report.provenance.n_rewires, 2);
    assert_eq!(report.provenance.n_plastic_write_backs, 1);
    assert_eq!(report.dma_reads, 3);
    assert_eq!(report.dma_writes, 1);
}

#[test]
fn test_replay_reports_init_failure() {
    let config = SpikeProcessingConfig {
        incoming_spike_buffer_size: 100,
        ..Default::default()
    };
    let err = replay(&config, &ReplayScript::default()).unwrap_err();
    assert!(format!("{err:#}").contains("power of two"));
}

#[test]
fn test_report_serialises_provenance() {
    let report = replay(&SpikeProcessingConfig::default(), &ReplayScript::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["provenance"]["n_spikes_processed"], 0);
    assert!(json["halted"].is_null());
}
