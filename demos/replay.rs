// Replay a recorded page session through the Web Vitals collector

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use vitals::collector::{Collector, CollectorConfig, WebVitalsCollector};
use vitals::config::{ConfigBuilder, VitalsConfig};
use vitals::sink::{JsonLinesSink, LogSink, ObservabilitySink};
use vitals::source::{MemorySource, PerformanceSource, Trace};
use vitals::util::logging;

/// Command line arguments for the replay example
#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay a recorded performance trace")]
struct Args {
    /// Path to the JSON trace file
    #[arg(short, long)]
    trace: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write reported events to stdout as JSON lines instead of the log
    #[arg(long)]
    json: bool,

    /// Replay without any analytics sink
    #[arg(long, conflicts_with = "json")]
    no_sink: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ConfigBuilder::<VitalsConfig>::new().use_defaults();
    if let Some(path) = &args.config {
        builder = builder.add_file(path);
    }
    let config = builder.add_env("VITALS").build()?;
    logging::init(&config.log_level);

    let trace = Trace::from_file(&args.trace)?;
    let source = Arc::new(MemorySource::from_trace(trace, args.trace.display().to_string())?);

    let sink: Option<Arc<dyn ObservabilitySink>> = if args.no_sink {
        None
    } else if args.json {
        Some(Arc::new(JsonLinesSink::new(io::stdout())))
    } else {
        Some(Arc::new(LogSink))
    };

    let dyn_source: Arc<dyn PerformanceSource> = source.clone();
    let mut collector = WebVitalsCollector::new(CollectorConfig::from(&config), dyn_source);
    if let Some(sink) = sink {
        collector = collector.with_sink(sink);
    }

    let mut rx = collector.start().await?;
    for failure in collector.failed_subscriptions().await {
        warn!("Skipped {}: {}", failure.kind, failure.reason);
    }

    // The recording is finite: unload the page once everything is queued
    source.close()?;

    let mut samples = 0;
    while let Some(batch) = rx.recv().await {
        for sample in &batch.metrics {
            info!("{} = {} (at {} ms)", sample.kind, sample.value, sample.timestamp_ms);
        }
        samples += batch.len();
    }

    collector.stop().await?;
    info!("Replay finished with {} samples", samples);
    Ok(())
}
