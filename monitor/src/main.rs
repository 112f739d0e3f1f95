use anyhow::Context;
use clap::Parser;
use generator::scenario::{SyntheticCamera, SyntheticDetector};
use log::{info, warn};
use pubsub::bridge::HttpBridge;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use storage::JsonlStore;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use trafficcore::sink::{SinkDispatcher, SinkSet};
use workflow::config::WorkflowConfig;
use workflow::runner::{Delivery, Runner};

mod generator;
mod pubsub;
mod storage;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Traffic-state monitor driving the estimation pipeline")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Stop after this many analysis records (runs until Ctrl+C otherwise)
    #[arg(long)]
    frames: Option<usize>,
    #[arg(long)]
    window_size: Option<usize>,
    #[arg(long)]
    stride: Option<usize>,
    #[arg(long)]
    road_capacity: Option<u64>,
    /// JSON-lines file receiving every record
    #[arg(long)]
    store: Option<PathBuf>,
    /// Deliver records from a background worker instead of the capture loop
    #[arg(long, default_value_t = false)]
    background_sinks: bool,
    /// Serve published payloads over HTTP and keep running after the pipeline stops
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::default()
    };
    apply_overrides(&mut config, &args);
    config.validate().context("invalid workflow configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    spawn_stop_listener(stop.clone())?;

    let runner = Runner::new(config.clone());
    let bridge = HttpBridge::new(config.sinks.history_limit);
    if args.serve {
        bridge.serve(config.sinks.bridge_address)?;
    }

    let store = JsonlStore::open(&config.sinks.store_path).with_context(|| {
        format!(
            "opening record store {}",
            config.sinks.store_path.display()
        )
    })?;
    info!(
        "storing records in {} ({} already present)",
        store.path().display(),
        store.documents()
    );

    let sinks = SinkSet::new(
        Box::new(store),
        Box::new(bridge.clone()),
        config.sinks.topic.clone(),
        runner.metrics(),
    );
    let delivery = if config.sinks.background {
        let dispatcher = SinkDispatcher::spawn(sinks, config.sinks.queue_depth)
            .context("starting background sink worker")?;
        Delivery::Background(dispatcher)
    } else {
        Delivery::Inline(sinks)
    };

    info!(
        "monitoring {} at {} (stride {}, window {})",
        config.source.camera_id,
        config.source.location,
        config.sampler.stride,
        config.estimator.window_size
    );

    let mut camera = SyntheticCamera::new(&config.scenario);
    let detector = SyntheticDetector::new(&config.scenario);
    let summary = runner.run(&mut camera, detector, delivery, &stop, args.frames)?;

    let metrics = summary.metrics;
    println!(
        "Run finished -> records {}, frames read {}, sampled {}, capture failures {}, skipped {}, sink failures {}, dropped {}",
        summary.records,
        metrics.frames_read,
        metrics.frames_sampled,
        metrics.capture_failures,
        metrics.skipped_frames,
        metrics.sink_failures,
        metrics.dropped_dispatches
    );
    if let Some(record) = &summary.last_record {
        let snapshot = record.snapshot();
        println!(
            "Last record -> vehicles {}, avg {:.2}, density {}, congestion {:.1}%, trend {}",
            snapshot.vehicle_count(),
            snapshot.average_count(),
            snapshot.density(),
            snapshot.congestion_level(),
            snapshot.trend()
        );
    }

    if args.serve {
        info!("HTTP bridge running (Ctrl+C to stop)...");
        while !stop.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(200));
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut WorkflowConfig, args: &Args) {
    if let Some(window_size) = args.window_size {
        config.estimator.window_size = window_size;
    }
    if let Some(stride) = args.stride {
        config.sampler.stride = stride;
    }
    if let Some(road_capacity) = args.road_capacity {
        config.estimator.road_capacity = road_capacity;
    }
    if let Some(store) = &args.store {
        config.sinks.store_path = store.clone();
    }
    if args.background_sinks {
        config.sinks.background = true;
    }
}

/// Raises `stop` on Ctrl+C. The pipeline finishes its current frame first.
fn spawn_stop_listener(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::Builder::new()
        .name("stop-listener".into())
        .spawn(move || {
            match runtime.block_on(signal::ctrl_c()) {
                Ok(()) => {
                    info!("stop requested, finishing current frame");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(err) => warn!("Ctrl+C handler unavailable: {}", err),
            }
        })
        .context("spawning stop listener")?;
    Ok(())
}
