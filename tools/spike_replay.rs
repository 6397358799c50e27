// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Replay a spike trace on a simulated application core and print its provenance.
//!
//! Loads `spikeproc.toml` (or `--config <path>`), applies `SPIKEPROC_*` overrides, runs the
//! JSON trace given by `--trace <path>` and writes the report as JSON to stdout.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use spikeproc::config::{load_config, validate_config, SpikeProcConfig};
use spikeproc::observability::{debug_flags_help, init_logging, parse_debug_flags};
use spikeproc::replay::{replay, ReplayScript};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: spike_replay --trace <path> [--config <path>] [--set key=value]... [--debug-<crate>]\n\n\
         Defaults:\n\
         - config: spikeproc.toml found via SPIKEPROC_CONFIG_PATH, the working directory or its parents;\n\
           built-in defaults if none exists\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

struct Args {
    trace: PathBuf,
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn parse_args() -> Args {
    let mut trace = None;
    let mut config = None;
    let mut overrides = HashMap::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--trace" => trace = Some(PathBuf::from(args.next().unwrap_or_else(|| usage_and_exit()))),
            "--config" => config = Some(PathBuf::from(args.next().unwrap_or_else(|| usage_and_exit()))),
            "--set" => {
                let kv = args.next().unwrap_or_else(|| usage_and_exit());
                let Some((key, value)) = kv.split_once('=') else {
                    usage_and_exit();
                };
                overrides.insert(key.trim().to_string(), value.trim().to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            _ => usage_and_exit(),
        }
    }

    Args {
        trace: trace.unwrap_or_else(|| usage_and_exit()),
        config,
        overrides,
    }
}

fn load(args: &Args) -> Result<SpikeProcConfig> {
    let loaded = load_config(args.config.as_deref(), Some(&args.overrides));
    let config = match (loaded, &args.config) {
        (Ok(config), _) => config,
        // No config file anywhere: fall back to defaults plus overrides
        (Err(spikeproc::config::ConfigError::FileNotFound(_)), None) => {
            let mut config = SpikeProcConfig::default();
            spikeproc::config::apply_environment_overrides(&mut config);
            spikeproc::config::apply_cli_overrides(&mut config, &args.overrides);
            config
        }
        (Err(e), _) => return Err(e).context("Failed to load configuration"),
    };
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = load(&args)?;
    let _guard = init_logging(&parse_debug_flags(), &config.logging)?;

    let json = fs::read_to_string(&args.trace)
        .with_context(|| format!("Failed to read trace {}", args.trace.display()))?;
    let script = ReplayScript::from_json(&json)?;
    let report = replay(&config.spike_processing, &script)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.halted.is_some() {
        process::exit(1);
    }
    Ok(())
}
