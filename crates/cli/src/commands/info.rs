//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{GyroBlueprint, SourceConfig};
use serde::Serialize;
use tracing::info;

use super::run::describe_source;
use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    channel: String,
    source: SourceInfo,
    nsamples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<EngineInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    kind: String,
    description: String,
    finite: bool,
}

#[derive(Serialize)]
struct EngineInfo {
    lock_threshold: u32,
    verbose_sync: bool,
    nominal_rate_hz: f64,
    phase_wrap: u8,
    rate_error: f64,
    reset_time_s: f64,
    process_noise: f64,
    measurement_noise: f64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &GyroBlueprint, args: &InfoArgs) -> ConfigInfo {
    let engine = args.engine.then(|| {
        let e = &blueprint.engine;
        EngineInfo {
            lock_threshold: e.frame_sync.lock_threshold,
            verbose_sync: e.frame_sync.verbose,
            nominal_rate_hz: e.timesync.nominal_rate_hz,
            phase_wrap: e.timesync.phase_wrap,
            rate_error: e.timesync.rate_error,
            reset_time_s: e.timesync.reset_time_s,
            process_noise: e.timesync.adakf.process_noise,
            measurement_noise: e.timesync.adakf.measurement_noise,
        }
    });

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        channel: blueprint.channel.clone(),
        source: SourceInfo {
            kind: blueprint.source.kind().to_string(),
            description: describe_source(&blueprint.source),
            finite: blueprint.source.is_finite(),
        },
        nsamples: blueprint.engine.aggregator.nsamples,
        engine,
        sinks,
    }
}

fn print_config_info(blueprint: &GyroBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Gyro Sync Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Stream");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Channel: {}", blueprint.channel);
    println!("   ├─ Source: {}", describe_source(&blueprint.source));
    if let SourceConfig::Mock(mock) = &blueprint.source {
        match mock.rate_hz {
            Some(rate) => println!("   ├─ Mock pacing: {} Hz", rate),
            None => println!("   ├─ Mock pacing: unpaced"),
        }
    }
    println!(
        "   └─ Samples per record: {}",
        blueprint.engine.aggregator.nsamples
    );

    if args.engine {
        let sync = &blueprint.engine.frame_sync;
        let timesync = &blueprint.engine.timesync;
        println!("\n⚙️  Engine");
        println!("   ├─ Lock threshold: {} cycles", sync.lock_threshold);
        println!("   ├─ Verbose sync: {}", sync.verbose);
        println!(
            "   ├─ Nominal rate: {} Hz (phase wrap {})",
            timesync.nominal_rate_hz, timesync.phase_wrap
        );
        println!(
            "   ├─ Resync: rate error {} / residual {} s",
            timesync.rate_error, timesync.reset_time_s
        );
        println!(
            "   └─ Filter: Q={:e} R={:e}",
            timesync.adakf.process_noise, timesync.adakf.measurement_noise
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
