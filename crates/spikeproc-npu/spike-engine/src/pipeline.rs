// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Row-processing pipeline: walk a fetched row's fixed region into the input accumulators.

use spikeproc_npu_neural::{RowLayout, SynapseWordFormat};
use spikeproc_npu_runtime::SynapticInput;
use tracing::trace;

/// Decodes fixed-synapse words and hands each one to the input accumulators in row order.
#[derive(Debug, Clone, Copy)]
pub struct RowPipeline {
    format: SynapseWordFormat,
}

impl RowPipeline {
    pub fn new(format: SynapseWordFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &SynapseWordFormat {
        &self.format
    }

    /// Deliver every fixed synapse of `row`; returns how many were delivered.
    pub fn deliver<S: SynapticInput>(&self, row: &[u8], layout: &RowLayout, synapses: &mut S) -> usize {
        let mut n_delivered = 0;
        for word in layout.fixed_words(row) {
            synapses.add_synaptic_contribution(self.format.decode(word));
            n_delivered += 1;
        }
        trace!(n_delivered, "Row walked");
        n_delivered
    }
}
