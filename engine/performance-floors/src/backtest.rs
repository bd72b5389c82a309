//! Backtesting projected ranges against completed games
//!
//! Each completed game is projected from the games before its week, exactly as an
//! upcoming game would be, and every projected stat is compared with the stat line the
//! player actually recorded.

use game_stats::{GameParticipationRecord, GameStatus, Position, SeasonData, StatField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::engine::FloorEngine;
use crate::models::{FailedGame, GameProjection};
use crate::modifiers::DefenseTableCache;

/// Where an actual value landed relative to the projected range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOutcome {
    BelowFloor,
    WithinRange,
    AboveCeiling,
}

impl RangeOutcome {
    pub fn classify(actual: f64, floor: f64, ceiling: f64) -> Self {
        if actual < floor {
            Self::BelowFloor
        } else if actual > ceiling {
            Self::AboveCeiling
        } else {
            Self::WithinRange
        }
    }
}

/// One projected stat checked against the game's stat line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub game_id: String,
    pub week: u32,
    pub player_id: String,
    pub position: Position,
    pub stat: StatField,
    pub actual: f64,
    pub floor: f64,
    pub expected: f64,
    pub ceiling: f64,
    /// `|actual - expected|`
    pub error: f64,
    pub outcome: RangeOutcome,
}

/// Accuracy of a group of records
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub predictions: usize,
    /// Mean absolute error of `expected`
    pub mae: f64,
    /// Share of actuals inside `[floor, ceiling]`
    pub coverage_rate: f64,
    pub below_floor: usize,
    pub above_ceiling: usize,
}

impl CoverageSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a BacktestRecord>,
    {
        let mut summary = Self::default();
        let mut total_error = 0.0;
        let mut within = 0usize;
        for record in records {
            summary.predictions += 1;
            total_error += record.error;
            match record.outcome {
                RangeOutcome::BelowFloor => summary.below_floor += 1,
                RangeOutcome::WithinRange => within += 1,
                RangeOutcome::AboveCeiling => summary.above_ceiling += 1,
            }
        }
        if summary.predictions > 0 {
            let n = summary.predictions as f64;
            summary.mae = total_error / n;
            summary.coverage_rate = within as f64 / n;
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub season: i32,
    pub weeks: Vec<u32>,
    pub overall: CoverageSummary,
    /// Keyed by position code
    pub by_position: BTreeMap<String, CoverageSummary>,
    pub by_stat: BTreeMap<StatField, CoverageSummary>,
    pub records: Vec<BacktestRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedGame>,
}

impl BacktestReport {
    fn from_records(
        season: i32,
        weeks: Vec<u32>,
        records: Vec<BacktestRecord>,
        failed: Vec<FailedGame>,
    ) -> Self {
        let mut by_position: BTreeMap<String, Vec<&BacktestRecord>> = BTreeMap::new();
        let mut by_stat: BTreeMap<StatField, Vec<&BacktestRecord>> = BTreeMap::new();
        for record in &records {
            by_position.entry(record.position.code().to_string()).or_default().push(record);
            by_stat.entry(record.stat).or_default().push(record);
        }

        Self {
            season,
            weeks,
            overall: CoverageSummary::from_records(&records),
            by_position: by_position
                .into_iter()
                .map(|(k, group)| (k, CoverageSummary::from_records(group)))
                .collect(),
            by_stat: by_stat
                .into_iter()
                .map(|(k, group)| (k, CoverageSummary::from_records(group)))
                .collect(),
            records,
            failed,
        }
    }
}

impl FloorEngine {
    /// Project every completed game of `season` in `weeks` from the games before it and
    /// score the ranges against what happened.
    ///
    /// Stats a player has no value for in the game are left out. Games that cannot be
    /// projected are listed in `failed`.
    pub fn backtest<W>(&self, data: &SeasonData, season: i32, weeks: W) -> BacktestReport
    where
        W: IntoIterator<Item = u32>,
    {
        let mut weeks: Vec<u32> = weeks.into_iter().collect();
        weeks.sort_unstable();
        weeks.dedup();

        let defense = DefenseTableCache::new(data);
        let mut records = Vec::new();
        let mut failed = Vec::new();

        for &week in &weeks {
            let completed = data
                .games
                .iter()
                .filter(|g| g.season == season && g.week == week && g.status == GameStatus::Final);
            for game in completed {
                match self.project_game_with(&defense, &game.game_id) {
                    Ok(projection) => records.extend(score_game(data, &projection)),
                    Err(err) => {
                        warn!(game_id = %game.game_id, error = %err, "backtest projection failed");
                        failed.push(FailedGame { game_id: game.game_id.clone(), error: err.to_string() });
                    }
                }
            }
        }

        let report = BacktestReport::from_records(season, weeks, records, failed);
        info!(
            season,
            predictions = report.overall.predictions,
            mae = report.overall.mae,
            coverage_rate = report.overall.coverage_rate,
            failed = report.failed.len(),
            "backtest complete"
        );
        report
    }
}

fn score_game(data: &SeasonData, projection: &GameProjection) -> Vec<BacktestRecord> {
    let lines: HashMap<&str, &GameParticipationRecord> = data
        .player_stats
        .iter()
        .filter(|r| r.season == projection.season && r.game_id == projection.game_id)
        .map(|r| (r.player_id.as_str(), r))
        .collect();

    let mut records = Vec::new();
    for team in [&projection.home, &projection.away] {
        for player in &team.players {
            let Some(line) = lines.get(player.player_id.as_str()) else {
                continue;
            };
            for p in &player.projections {
                let Some(actual) = line.value(p.stat) else {
                    continue;
                };
                records.push(BacktestRecord {
                    game_id: projection.game_id.clone(),
                    week: projection.week,
                    player_id: player.player_id.clone(),
                    position: player.position.clone(),
                    stat: p.stat,
                    actual,
                    floor: p.floor,
                    expected: p.expected,
                    ceiling: p.ceiling,
                    error: (actual - p.expected).abs(),
                    outcome: RangeOutcome::classify(actual, p.floor, p.ceiling),
                });
            }
        }
    }
    records
}
