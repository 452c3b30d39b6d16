//! gesture_relay - classify arm gestures from a pose pipeline and report them
//!
//! This binary:
//! 1. Parses the pose pipeline flags and starts the selected engine
//! 2. Classifies the first person of every frame (both/left/right hand up, both down)
//! 3. PUTs each gesture to the status endpoint (GESTURE_RELAY_CONFIG / GESTURE_* env)
//! 4. Stops at end of input, on Ctrl-C, or on the first pipeline fault

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use gesture_relay::pipeline::{ReplayEngine, ScriptedEngine};
use gesture_relay::{
    AbortFlag, ConsoleDisplay, EngineRegistry, FrameConsumer, GestureReporter, Pipeline,
    PipelineConfig, PipelineFlags, RelayConfig,
};

/// Process status for a fatal error (-1 as an 8-bit exit code).
const EXIT_FAILURE: u8 = 255;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Pose engine to run (see --list-engines). Defaults to the first registered one.
    #[arg(long, env = "GESTURE_ENGINE")]
    engine: Option<String>,

    /// Frame count for the scripted demo engine.
    #[arg(long, default_value_t = 40)]
    demo_frames: u64,

    /// Print the available engines and exit.
    #[arg(long)]
    list_engines: bool,

    #[command(flatten)]
    pipeline: PipelineFlags,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.pipeline.to_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(log::LevelFilter::Info);
            log::error!("{:#}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_logging(config.log_level);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_logging(level: log::LevelFilter) {
    let default_filter = level.to_string().to_ascii_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    let mut registry = EngineRegistry::new();
    registry.register(ReplayEngine::new());
    registry.register(ScriptedEngine::demo_cycle(cli.demo_frames));

    if cli.list_engines {
        for name in registry.list() {
            println!("{}", name);
        }
        return Ok(());
    }

    let started = Instant::now();
    log::info!("starting gesture relay");

    let relay = RelayConfig::load()?;
    log::info!(
        "status endpoint {} (content-type {}, delivery {:?})",
        relay.reporter.url,
        relay.reporter.content_type,
        relay.reporter.delivery
    );
    let reporter = GestureReporter::new(relay.reporter)?;

    let engine = registry.take(cli.engine.as_deref())?;
    let mut pipeline = Pipeline::configure(engine, config)?;
    let stop = pipeline.stop_signal();

    let mut consumer = FrameConsumer::new(reporter, stop.clone());
    if config.display {
        let abort = AbortFlag::new();
        abort.install_ctrlc().context("install Ctrl-C handler")?;
        consumer = consumer.with_display(Box::new(ConsoleDisplay::new(abort)));
    } else {
        ctrlc::set_handler(move || stop.stop()).context("install Ctrl-C handler")?;
    }
    pipeline.set_output_handler(Box::new(consumer));

    let summary = pipeline.exec()?;
    log::info!(
        "pipeline done: delivered={} skipped={} people={} stopped_early={}",
        summary.frames_delivered,
        summary.frames_skipped,
        summary.people_seen,
        summary.stopped_early
    );
    log::info!(
        "finished. Total time: {:.3} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
