//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{GyroBlueprint, MockSourceConfig, SourceConfig};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("no configuration file given, using defaults");
            GyroBlueprint::default()
        }
    };

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        channel = %blueprint.channel,
        source = blueprint.source.kind(),
        nsamples = blueprint.engine.aggregator.nsamples,
        lock_threshold = blueprint.engine.frame_sync.lock_threshold,
        sinks = blueprint.sinks.len(),
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_records: (args.max_records > 0).then_some(args.max_records),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        records = stats.engine.records_published,
        duration_secs = stats.duration.as_secs_f64(),
        rate_hz = format!("{:.2}", stats.record_rate()),
        end = %stats.end_reason,
        "pipeline completed"
    );
    stats.print_summary();

    Ok(())
}

/// Apply command line overrides on top of the loaded blueprint
fn apply_overrides(blueprint: &mut GyroBlueprint, args: &RunArgs) {
    if let Some(path) = &args.device {
        info!(path = %path.display(), "overriding source with device");
        blueprint.source = SourceConfig::Device { path: path.clone() };
    } else if let Some(path) = &args.file {
        info!(
            path = %path.display(),
            loop_playback = args.loop_playback,
            "overriding source with capture file"
        );
        blueprint.source = SourceConfig::File {
            path: path.clone(),
            loop_playback: args.loop_playback,
        };
    } else if args.stdin {
        blueprint.source = SourceConfig::Stdin;
    } else if args.mock {
        let mut mock = match &blueprint.source {
            SourceConfig::Mock(existing) => existing.clone(),
            _ => MockSourceConfig::default(),
        };
        if let Some(frames) = args.mock_frames {
            mock.frames = (frames > 0).then_some(frames);
        }
        blueprint.source = SourceConfig::Mock(mock);
    }

    if let Some(nsamples) = args.nsamples {
        blueprint.engine.aggregator.nsamples = nsamples;
    }
    if let Some(channel) = &args.channel {
        blueprint.channel = channel.clone();
    }
    if args.verbose_sync {
        blueprint.engine.frame_sync.verbose = true;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &GyroBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Channel: {}", blueprint.channel);
    println!("Source: {}", describe_source(&blueprint.source));

    let engine = &blueprint.engine;
    println!("\nEngine:");
    println!("  Samples per record: {}", engine.aggregator.nsamples);
    println!("  Lock threshold: {} cycles", engine.frame_sync.lock_threshold);
    println!(
        "  Nominal rate: {} Hz (phase wrap {})",
        engine.timesync.nominal_rate_hz, engine.timesync.phase_wrap
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

/// One-line description of a byte source
pub(crate) fn describe_source(source: &SourceConfig) -> String {
    match source {
        SourceConfig::Device { path } => format!("device {}", path.display()),
        SourceConfig::File {
            path,
            loop_playback,
        } => {
            let mode = if *loop_playback { ", looping" } else { "" };
            format!("file {}{}", path.display(), mode)
        }
        SourceConfig::Stdin => "stdin".to_string(),
        SourceConfig::Mock(mock) => match mock.frames {
            Some(frames) => format!("mock ({frames} frames, seed {})", mock.seed),
            None => format!("mock (unbounded, seed {})", mock.seed),
        },
    }
}
