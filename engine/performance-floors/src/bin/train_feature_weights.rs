//! # train-feature-weights
//!
//! Fits the contextual-feature forest on completed games and writes the learned weights.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use feature_weights::FeatureWeightTrainer;
use performance_floors::documents::{load_season_data, write_json};
use performance_floors::logging::initialize_logging;
use performance_floors::FloorsConfig;

/// Train feature weights from a season of completed games
#[derive(Parser)]
#[command(name = "train-feature-weights")]
#[command(about = "Learn contextual feature weights from completed games")]
struct Cli {
    /// Season data document (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Last week to train on (defaults to the configured max week)
    #[arg(long)]
    week: Option<u32>,

    /// Season to train on (defaults to the configured season)
    #[arg(long)]
    season: Option<i32>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FloorsConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting train-feature-weights v{}", env!("CARGO_PKG_VERSION"));

    let data = load_season_data(&cli.input)
        .with_context(|| format!("Failed to read season data from {}", cli.input.display()))?;

    let mut training = config.training;
    if let Some(season) = cli.season {
        training.season = season;
    }
    if let Some(week) = cli.week {
        training.max_week = week;
    }

    let outcome = FeatureWeightTrainer::new(training)
        .train(&data)
        .context("Feature weight training failed")?;

    let weights = &outcome.weights;
    match weights.cross_validation_r2 {
        Some(r2) if r2 < 0.0 => warn!(r2, "contextual features do not beat the mean"),
        Some(r2) => info!(r2, "cross-validated fit"),
        None => info!(reason = ?weights.cross_validation_skipped, "cross-validation skipped"),
    }
    info!(samples = weights.training_samples, low_confidence = weights.low_confidence, "training complete");

    write_json(weights, cli.output.as_deref())?;
    Ok(())
}
