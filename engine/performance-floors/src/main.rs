//! # calculate-floors
//!
//! Projects floor/expected/ceiling ranges for one game or a whole week from a season
//! document, optionally using learned feature weights.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::info;

use performance_floors::documents::{load_season_data, load_weights, write_json};
use performance_floors::logging::initialize_logging;
use performance_floors::{FloorEngine, FloorsConfig};

/// Calculate performance floors for upcoming games
#[derive(Parser)]
#[command(name = "calculate-floors")]
#[command(about = "Project floor, expected and ceiling values for upcoming games")]
#[command(group(ArgGroup::new("target").required(true).args(["game", "week"])))]
struct Cli {
    /// Season data document (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Project a single game
    #[arg(long)]
    game: Option<String>,

    /// Project every scheduled game in this week
    #[arg(long)]
    week: Option<u32>,

    /// Season for --week (defaults to the configured training season)
    #[arg(long)]
    season: Option<i32>,

    /// Learned feature weights document (JSON)
    #[arg(long)]
    weights: Option<PathBuf>,

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

    info!("Starting calculate-floors v{}", env!("CARGO_PKG_VERSION"));

    let data = load_season_data(&cli.input)
        .with_context(|| format!("Failed to read season data from {}", cli.input.display()))?;
    info!(
        games = data.games.len(),
        stat_lines = data.player_stats.len(),
        "season data loaded"
    );

    let season = cli.season.unwrap_or(config.training.season);
    let mut engine = FloorEngine::new(config);
    if let Some(path) = &cli.weights {
        let weights = load_weights(path)
            .with_context(|| format!("Failed to read feature weights from {}", path.display()))?;
        info!(
            season = weights.season,
            training_week = weights.training_week,
            samples = weights.training_samples,
            "learned feature weights loaded"
        );
        engine = engine.with_learned_weights(&weights);
    }

    let output = cli.output.as_deref();
    if let Some(game_id) = &cli.game {
        let projection = engine
            .project_game(&data, game_id)
            .with_context(|| format!("Failed to project game {game_id}"))?;
        write_json(&projection, output)?;
    } else if let Some(week) = cli.week {
        let projection = engine.project_week(&data, season, week);
        write_json(&projection, output)?;
    }

    Ok(())
}
