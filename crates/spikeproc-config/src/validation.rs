// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures the values handed to `initialise` are consistent: buffer sizes the core can
//! index, a priority ordering that lets packets preempt row processing, and a synapse
//! word layout that fits in 16 bits.

use crate::{ConfigError, ConfigResult, SpikeProcConfig, SpikeProcessingConfig};

/// Header words every row carries
const ROW_HEADER_BYTES: usize = 12;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    NotPowerOfTwo { field: String, value: usize },
    PriorityOrder { higher: String, lower: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPowerOfTwo { field, value } => {
                write!(f, "{} = {} must be a non-zero power of two", field, value)
            }
            Self::PriorityOrder { higher, lower } => {
                write!(f, "{} must be more urgent than {}", higher, lower)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SpikeProcConfig) -> ConfigResult<()> {
    let mut errors = collect_spike_processing_errors(&config.spike_processing);
    validate_logging(config, &mut errors);
    into_result(errors)
}

/// Validate only the spike-processing section
pub fn validate_spike_processing(config: &SpikeProcessingConfig) -> ConfigResult<()> {
    into_result(collect_spike_processing_errors(config))
}

/// Every problem with the spike-processing section, in field order
pub fn collect_spike_processing_errors(
    config: &SpikeProcessingConfig,
) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_buffers(config, &mut errors);
    validate_priorities(config, &mut errors);
    validate_synapse_format(config, &mut errors);
    errors
}

fn into_result(errors: Vec<ConfigValidationError>) -> ConfigResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn validate_buffers(config: &SpikeProcessingConfig, errors: &mut Vec<ConfigValidationError>) {
    if !config.incoming_spike_buffer_size.is_power_of_two() {
        errors.push(ConfigValidationError::NotPowerOfTwo {
            field: "spike_processing.incoming_spike_buffer_size".to_string(),
            value: config.incoming_spike_buffer_size,
        });
    }
    if config.n_row_buffers < 2 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike_processing.n_row_buffers".to_string(),
            reason: format!("{} (at least 2 required for double buffering)", config.n_row_buffers),
        });
    }
    if config.row_max_n_bytes < ROW_HEADER_BYTES || config.row_max_n_bytes % 4 != 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike_processing.row_max_n_bytes".to_string(),
            reason: format!(
                "{} (must be a multiple of 4 and at least {})",
                config.row_max_n_bytes, ROW_HEADER_BYTES
            ),
        });
    }
}

fn validate_priorities(config: &SpikeProcessingConfig, errors: &mut Vec<ConfigValidationError>) {
    let ordered = [
        ("mc_packet_callback_priority", config.mc_packet_callback_priority),
        ("dma_callback_priority", config.dma_callback_priority),
        ("user_event_priority", config.user_event_priority),
        ("timer_priority", config.timer_priority),
    ];
    for pair in ordered.windows(2) {
        let (higher, higher_priority) = pair[0];
        let (lower, lower_priority) = pair[1];
        if higher_priority >= lower_priority {
            errors.push(ConfigValidationError::PriorityOrder {
                higher: format!("spike_processing.{}", higher),
                lower: format!("spike_processing.{}", lower),
            });
        }
    }
}

/// Index bits for `n` items; counts above 2^31 need all 32.
fn bits_for(n: u32) -> u32 {
    if n <= 1 {
        1
    } else {
        n.checked_next_power_of_two()
            .map_or(u32::BITS, |p| p.ilog2())
    }
}

fn validate_synapse_format(
    config: &SpikeProcessingConfig,
    errors: &mut Vec<ConfigValidationError>,
) {
    if config.n_neurons == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike_processing.n_neurons".to_string(),
            reason: "must be non-zero".to_string(),
        });
    }
    if config.n_synapse_types == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike_processing.n_synapse_types".to_string(),
            reason: "must be non-zero".to_string(),
        });
    }
    let total = bits_for(config.n_neurons)
        .saturating_add(bits_for(config.n_synapse_types))
        .saturating_add(config.synapse_delay_bits);
    if total > 16 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike_processing.synapse_delay_bits".to_string(),
            reason: format!("index + type + delay needs {} bits, only 16 available", total),
        });
    }
}

fn validate_logging(config: &SpikeProcConfig, errors: &mut Vec<ConfigValidationError>) {
    let valid_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_levels.contains(&config.logging.global_log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.global_log_level".to_string(),
            reason: format!(
                "'{}' is not one of {:?}",
                config.logging.global_log_level, valid_levels
            ),
        });
    }
}
