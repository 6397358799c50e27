// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values; missing keys fall back to defaults)
//! 2. Environment variables (`SPIKEPROC_*`)
//! 3. CLI arguments

use crate::{ConfigError, ConfigResult, SpikeProcConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "spikeproc.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `SPIKEPROC_CONFIG_PATH` environment variable
/// 2. Current working directory: `./spikeproc.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SPIKEPROC_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SPIKEPROC_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet SPIKEPROC_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found or contains invalid TOML. Validation is left
/// to [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SpikeProcConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SpikeProcConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SPIKEPROC_ROW_MAX_N_BYTES` -> `spike_processing.row_max_n_bytes`
/// - `SPIKEPROC_N_ROW_BUFFERS` -> `spike_processing.n_row_buffers`
/// - `SPIKEPROC_INCOMING_SPIKE_BUFFER_SIZE` -> `spike_processing.incoming_spike_buffer_size`
/// - `SPIKEPROC_CLEAR_LATE_PACKETS` -> `spike_processing.clear_input_buffers_of_late_packets`
/// - `SPIKEPROC_PACKETS_PER_TIMESTEP_REGION` -> `spike_processing.packets_per_timestep_region`
/// - `SPIKEPROC_LOG_LEVEL` -> `logging.global_log_level`
/// - `SPIKEPROC_LOG_FILE` -> `logging.log_file`
pub fn apply_environment_overrides(config: &mut SpikeProcConfig) {
    let sp = &mut config.spike_processing;
    if let Ok(value) = env::var("SPIKEPROC_ROW_MAX_N_BYTES") {
        if let Ok(n) = value.parse::<usize>() {
            sp.row_max_n_bytes = n;
        }
    }
    if let Ok(value) = env::var("SPIKEPROC_N_ROW_BUFFERS") {
        if let Ok(n) = value.parse::<usize>() {
            sp.n_row_buffers = n;
        }
    }
    if let Ok(value) = env::var("SPIKEPROC_INCOMING_SPIKE_BUFFER_SIZE") {
        if let Ok(n) = value.parse::<usize>() {
            sp.incoming_spike_buffer_size = n;
        }
    }
    if let Ok(value) = env::var("SPIKEPROC_CLEAR_LATE_PACKETS") {
        sp.clear_input_buffers_of_late_packets = parse_flag(&value);
    }
    if let Ok(value) = env::var("SPIKEPROC_PACKETS_PER_TIMESTEP_REGION") {
        if let Ok(region) = value.parse::<u32>() {
            sp.packets_per_timestep_region = region;
        }
    }

    if let Ok(value) = env::var("SPIKEPROC_LOG_LEVEL") {
        config.logging.global_log_level = value;
    }
    if let Ok(value) = env::var("SPIKEPROC_LOG_FILE") {
        config.logging.log_file = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys mirror the field names, e.g. `{"incoming_spike_buffer_size": "64", "log_level": "debug"}`
pub fn apply_cli_overrides(config: &mut SpikeProcConfig, cli_args: &HashMap<String, String>) {
    let sp = &mut config.spike_processing;
    if let Some(n) = cli_args.get("row_max_n_bytes").and_then(|v| v.parse().ok()) {
        sp.row_max_n_bytes = n;
    }
    if let Some(n) = cli_args.get("n_row_buffers").and_then(|v| v.parse().ok()) {
        sp.n_row_buffers = n;
    }
    if let Some(n) = cli_args
        .get("incoming_spike_buffer_size")
        .and_then(|v| v.parse().ok())
    {
        sp.incoming_spike_buffer_size = n;
    }
    if let Some(value) = cli_args.get("clear_late_packets") {
        sp.clear_input_buffers_of_late_packets = parse_flag(value);
    }
    if let Some(n) = cli_args.get("n_neurons").and_then(|v| v.parse().ok()) {
        sp.n_neurons = n;
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.global_log_level = value.clone();
    }
}
