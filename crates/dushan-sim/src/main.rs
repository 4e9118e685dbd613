//! Dushan headless simulator.
//!
//! Seats four bots, plays a run of hands and writes every score sheet as a
//! JSON line to stdout or `--output`.

use clap::Parser;
use dushan_core::{BotDifficulty, GameConfig};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod runner;

use runner::Runner;

#[derive(Parser, Debug)]
#[command(name = "dushan-sim", about = "Play chicken mahjong hands between bots")]
struct Args {
    /// Number of hands to play.
    #[arg(long, default_value_t = 1)]
    hands: u32,

    /// Seed for the wall shuffle, dealer draw and bots.
    #[arg(long)]
    seed: Option<u64>,

    /// Bot strength: easy, medium or hard.
    #[arg(long, default_value = "medium")]
    difficulty: BotDifficulty,

    /// JSON file overriding the table configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write score sheets here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    info!(hands = args.hands, difficulty = ?args.difficulty, seed = ?config.seed, "Starting Dushan simulation...");

    let mut runner = Runner::new(config, args.difficulty)?;
    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            runner.run(args.hands, &mut out)?;
        }
        None => {
            let mut out = io::stdout().lock();
            runner.run(args.hands, &mut out)?;
        }
    }
    Ok(())
}
