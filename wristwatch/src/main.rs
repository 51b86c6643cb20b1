//! wristwatch - headless driver for the hand-tracked XR wristwatch.

use clap::Parser;
use tracing::{info, warn};

use wristwatch::ipc;
use wristwatch::sim::{self, SimConfig, SyntheticHand};
use wristwatch::vr::Hand;
use wristwatch::watch::time_display::SystemClock;
use wristwatch::{WatchConfig, WristWatch};

#[derive(Parser, Debug)]
#[command(name = "wristwatch", about = "Run the XR wristwatch against a synthetic hand")]
struct Cli {
    /// Simulated run length in seconds
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Simulated frame rate
    #[arg(long, default_value_t = 90)]
    fps: u32,

    /// Tracked hand: left or right
    #[arg(long, default_value = "left")]
    hand: String,

    /// Only show the watch while the palm faces up
    #[arg(long)]
    palm_gating: bool,

    /// Snap to the wrist instead of smoothing
    #[arg(long)]
    no_smoothing: bool,

    /// Use the 24-hour time template
    #[arg(long)]
    twenty_four_hour: bool,

    /// Control message applied before the run, e.g. '(:type :watch-config :fade-ms 500)'
    #[arg(long = "command")]
    commands: Vec<String>,

    /// Pace frames against the wall clock
    #[arg(long)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wristwatch=info".into()),
        )
        .init();

    info!("wristwatch v{} starting", env!("CARGO_PKG_VERSION"));

    let hand = match Hand::parse(&cli.hand) {
        Some(hand) => hand,
        None => anyhow::bail!("unknown hand: {} (use left or right)", cli.hand),
    };

    let mut config = WatchConfig::default();
    config.tracker.hand = hand;
    config.tracker.palm_gating = cli.palm_gating;
    config.tracker.smoothing = !cli.no_smoothing;

    let mut watch = WristWatch::new(config, Box::new(SystemClock));
    if cli.twenty_four_hour {
        watch.time.set_24_hour(true);
    }

    for command in &cli.commands {
        if let Some(reply) = ipc::handle_message(&mut watch, command) {
            if reply.contains(":status :error") {
                warn!("command failed: {}", reply);
            } else {
                info!("{}", reply);
            }
        }
    }

    let sim_config = SimConfig {
        duration_s: cli.duration,
        fps: cli.fps,
        realtime: cli.realtime,
        hand: SyntheticHand {
            hand: watch.tracker.config.hand,
            ..SyntheticHand::default()
        },
    };
    let summary = sim::run(&mut watch, &sim_config)?;

    info!(
        "{} event(s) over {} frame(s); time {:?} date {:?}",
        summary.events.len(),
        summary.frames,
        watch.time.time_text(),
        watch.time.date_text()
    );
    Ok(())
}
