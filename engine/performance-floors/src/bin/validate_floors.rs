//! # validate-floors
//!
//! Backtests projected ranges against completed games: how often actuals land inside the
//! floor/ceiling range and how far they fall from the expected value.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::info;

use performance_floors::documents::{load_season_data, load_weights, write_json};
use performance_floors::logging::initialize_logging;
use performance_floors::{FloorEngine, FloorsConfig};

/// Validate performance floors against completed games
#[derive(Parser)]
#[command(name = "validate-floors")]
#[command(about = "Score floor/ceiling ranges against what players actually recorded")]
#[command(group(ArgGroup::new("span").required(true).args(["week", "weeks"])))]
struct Cli {
    /// Season data document (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Validate a single week
    #[arg(long)]
    week: Option<u32>,

    /// Validate an inclusive week range, e.g. 1-7
    #[arg(long, value_parser = parse_week_range)]
    weeks: Option<WeekRange>,

    /// Season (defaults to the configured training season)
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

#[derive(Debug, Clone, Copy)]
struct WeekRange {
    first: u32,
    last: u32,
}

fn parse_week_range(raw: &str) -> std::result::Result<WeekRange, String> {
    let (first, last) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected a range like 1-7, got {raw:?}"))?;
    let parse = |s: &str| s.trim().parse::<u32>().map_err(|e| format!("invalid week {s:?}: {e}"));
    let range = WeekRange { first: parse(first)?, last: parse(last)? };
    if range.first > range.last {
        return Err(format!("week range {raw:?} is reversed"));
    }
    Ok(range)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FloorsConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting validate-floors v{}", env!("CARGO_PKG_VERSION"));

    let data = load_season_data(&cli.input)
        .with_context(|| format!("Failed to read season data from {}", cli.input.display()))?;

    let season = cli.season.unwrap_or(config.training.season);
    let weeks: Vec<u32> = match (cli.week, cli.weeks) {
        (Some(week), _) => vec![week],
        (None, Some(range)) => (range.first..=range.last).collect(),
        (None, None) => Vec::new(),
    };

    let mut engine = FloorEngine::new(config);
    if let Some(path) = &cli.weights {
        let weights = load_weights(path)
            .with_context(|| format!("Failed to read feature weights from {}", path.display()))?;
        engine = engine.with_learned_weights(&weights);
    }

    let report = engine.backtest(&data, season, weeks);
    for (position, summary) in &report.by_position {
        info!(
            position = %position,
            predictions = summary.predictions,
            mae = summary.mae,
            coverage_rate = summary.coverage_rate,
            "position accuracy"
        );
    }

    write_json(&report, cli.output.as_deref())?;
    Ok(())
}
