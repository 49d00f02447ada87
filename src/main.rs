//! CLI entry point for gridsense.
//!
//! One-shot commands around the measurement engine:
//! - `measure` runs a full measurement cycle and optionally records the
//!   result and dumps the captured samples next to the fitted model.
//! - `status` does the cheap activity-only poll, no fitting.
//!
//! The recurring schedule (poll status every few minutes, measure every
//! hour, publish in batches) belongs to the deployment harness, not this
//! binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridsense::acquire::SampleAcquirer;
use gridsense::activity::{ActivityDetector, ActivityMonitor};
use gridsense::config::Settings;
use gridsense::core::ResultSink;
use gridsense::fit::{WaveModel, WaveParams};
use gridsense::instrument::mock::{MockSampleSource, MockSourceConfig, SimClock};
use gridsense::orchestrator::{MeasurementCycle, MeasurementOrchestrator};
use gridsense::sink::{JsonlSink, LogActivitySink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "gridsense")]
#[command(about = "AC power monitoring through software sinusoid fitting", long_about = None)]
struct Cli {
    /// Configuration file, without extension
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full measurement cycle
    Measure {
        /// Append the result to this JSON-lines file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write captured samples and the fitted model to this CSV file
        #[arg(long)]
        dump_samples: Option<PathBuf>,
    },

    /// Check whether the source is active, without fitting
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&settings.log_level)?;

    let (mut source, clock) = build_source(&settings)?;

    match cli.command {
        Commands::Measure { out, dump_samples } => {
            let orchestrator = MeasurementOrchestrator::new(&settings);
            let cycle = orchestrator.run_cycle(&mut source, &clock)?;
            println!("{}", serde_json::to_string_pretty(&cycle.result)?);
            if let Some(path) = out {
                let mut sink = JsonlSink::create(&path)?;
                sink.record(&cycle.result)?;
                info!(path = %path.display(), "result recorded");
            }
            if let Some(path) = dump_samples {
                dump_cycle(&path, &cycle, &settings)?;
                info!(path = %path.display(), "samples dumped");
            }
        }
        Commands::Status => {
            let engine = &settings.engine;
            let acquirer = SampleAcquirer::new(engine.sample_count);
            let window = acquirer.acquire_window(
                settings.channels[0].input,
                engine.status_samples,
                &mut source,
            )?;
            let detector =
                ActivityDetector::new(engine.activity_threshold, settings.channels[0].y_offset);
            let mut monitor = ActivityMonitor::new(detector);
            let active = monitor.poll(&window, &mut LogActivitySink)?;
            println!("generator {}", if active { "on" } else { "off" });
        }
    }
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_source(settings: &Settings) -> Result<(MockSampleSource, SimClock)> {
    match settings.source.r#type.as_str() {
        "mock" => {
            let config = MockSourceConfig::from_toml_validated(&settings.source.config)?;
            let source =
                MockSampleSource::new(config, &settings.channels, settings.search.phase.max)?;
            let clock = source.clock();
            Ok((source, clock))
        }
        other => anyhow::bail!("unknown sample source type '{other}'"),
    }
}

/// Writes every channel's raw capture alongside the fitted model so fit
/// quality can be inspected offline.
fn dump_cycle(path: &Path, cycle: &MeasurementCycle, settings: &Settings) -> Result<()> {
    let Some(buffer) = &cycle.buffer else {
        info!("no buffer survived the cycle; nothing to dump");
        return Ok(());
    };
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "channel,sample,t_us,raw,model")?;
    for (index, (channel, fit)) in settings.channels.iter().zip(&cycle.fits).enumerate() {
        let model = WaveModel::for_channel(channel, settings.search.phase.max);
        let params = WaveParams {
            period: fit.period,
            phase: fit.phase,
            amplitude: fit.amplitude,
        };
        for (i, &raw) in buffer.channel(index).iter().enumerate() {
            let modeled = if fit.ignored {
                f64::NAN
            } else {
                model.value_at(params, i, buffer.sample_interval_us)
            };
            let t_us = i as f64 * buffer.sample_interval_us;
            writeln!(out, "{index},{i},{t_us},{raw},{modeled}")?;
        }
    }
    Ok(())
}
