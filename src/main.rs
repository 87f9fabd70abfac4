mod cli;
mod config;
mod sink;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use bandmeter::{EngineConfig, PeakMeter, SpectralEngine, Summary};
use cli::{Cli, Measure};
use config::Config;
use sink::jsonl::JsonLinesWriter;
use source::PcmSource;

enum Meter {
    Spectral(SpectralEngine),
    Peak(PeakMeter),
}

impl Meter {
    fn ingest_interleaved(&mut self, samples: &[f32]) -> bandmeter::Result<()> {
        match self {
            Meter::Spectral(engine) => engine.ingest_interleaved(samples),
            Meter::Peak(meter) => meter.ingest_interleaved(samples),
        }
    }

    fn finish(self) -> bandmeter::Result<Summary> {
        match self {
            Meter::Spectral(engine) => engine.finish(),
            Meter::Peak(meter) => meter.finish(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config must load; a discovered one is best effort.
    let cfg = match cli.config.as_deref() {
        Some(path) => {
            let cfg = config::load_config(path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => match config::discover_config() {
            Some(path) => match config::load_config(&path) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path.display());
                    cfg
                }
                Err(err) => {
                    log::warn!("{:#}", err);
                    Config::default()
                }
            },
            None => Config::default(),
        },
    };

    let engine_config = build_engine_config(&cli, &cfg);
    let block_frames = cli.block_frames.unwrap_or(cfg.output.block_frames);
    let print_summary = cli.summary || cfg.output.summary;

    log::info!("bandmeter - streaming spectral band analysis");
    log::info!(
        "Input: {}",
        cli.input
            .as_ref()
            .map_or_else(|| "stdin".to_string(), |p| p.display().to_string())
    );

    let writer = Arc::new(JsonLinesWriter::create(cli.output.as_deref())?);
    let mut meter = match cli.measure {
        Measure::Spectral => Meter::Spectral(
            SpectralEngine::new(engine_config, writer.clone())
                .context("Invalid analysis configuration")?,
        ),
        Measure::Peak => Meter::Peak(
            PeakMeter::new(engine_config, writer.clone())
                .context("Invalid analysis configuration")?,
        ),
    };

    let reader = source::open_input(cli.input.as_deref())?;
    let mut pcm = PcmSource::new(reader, cli.channels, block_frames);
    while let Some(block) = pcm.next_block()? {
        meter
            .ingest_interleaved(block)
            .context("Analysis failed while ingesting")?;
    }

    let summary = meter.finish().context("Analysis failed while draining")?;
    writer.flush()?;

    if print_summary {
        eprintln!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

/// CLI flags win over the config file, which wins over built-in defaults.
fn build_engine_config(cli: &Cli, cfg: &Config) -> EngineConfig {
    let analysis = &cfg.analysis;
    let stream = cli.stream.clone().unwrap_or_else(|| {
        cli.input
            .as_ref()
            .filter(|p| p.as_os_str() != "-")
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stdin".to_string())
    });
    let workers = cli.workers.or(analysis.workers).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    EngineConfig {
        stream,
        sample_rate: cli.sample_rate,
        channels: cli.channels,
        window: cli.window.unwrap_or(analysis.window),
        hop: cli.hop.unwrap_or(analysis.hop),
        unit: cli.unit.unwrap_or(analysis.unit),
        bands: cli.bands.unwrap_or(analysis.bands),
        floor_db: cli.floor_db.unwrap_or(analysis.floor_db),
        workers,
        queue_depth: cli.queue_depth.or(analysis.queue_depth),
    }
}
