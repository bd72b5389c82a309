//! Per-game contextual factors and the opponent defense table they are derived from

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::types::{GameInfo, TeamGameDefense, Venue};

/// Lower bound of the opponent defensive factor (stingiest defense)
pub const MIN_OPPONENT_FACTOR: f64 = 0.7;

/// Upper bound of the opponent defensive factor (most generous defense)
pub const MAX_OPPONENT_FACTOR: f64 = 1.3;

/// Ratio of an opponent's yards allowed to the league average, clamped to
/// `[MIN_OPPONENT_FACTOR, MAX_OPPONENT_FACTOR]`.
///
/// A zero or non-finite league average yields the neutral factor 1.0.
pub fn opponent_defensive_factor(opponent_avg: f64, league_avg: f64) -> f64 {
    if !league_avg.is_finite() || league_avg == 0.0 {
        debug!(league_avg, "degenerate league average, using neutral opponent factor");
        return 1.0;
    }
    let raw = opponent_avg / league_avg;
    if !raw.is_finite() {
        return 1.0;
    }
    raw.clamp(MIN_OPPONENT_FACTOR, MAX_OPPONENT_FACTOR)
}

/// Non-performance attributes of one (player, game) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextualFactors {
    pub is_home: bool,
    pub opponent_defensive_factor: f64,
    pub is_turf: bool,
    pub is_dome: bool,
}

impl ContextualFactors {
    pub fn new(is_home: bool, opponent_defensive_factor: f64, venue: Option<&Venue>) -> Self {
        Self {
            is_home,
            opponent_defensive_factor,
            is_turf: venue.map(Venue::is_turf).unwrap_or(false),
            is_dome: venue.map(Venue::is_dome).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct YardsAllowed {
    total: f64,
    games: u32,
}

/// Yards-allowed aggregates per team over a fixed set of games
#[derive(Debug, Clone, Default)]
pub struct DefenseTable {
    by_team: HashMap<String, YardsAllowed>,
    league_avg: f64,
    records: usize,
}

impl DefenseTable {
    /// Aggregate every defense record whose game is in `games`.
    ///
    /// Missing yards-allowed values count as zero yards.
    pub fn build<'a, G>(games: G, defense: &[TeamGameDefense]) -> Self
    where
        G: IntoIterator<Item = &'a GameInfo>,
    {
        let game_ids: HashSet<&str> = games.into_iter().map(|g| g.game_id.as_str()).collect();
        Self::from_records(defense.iter().filter(|d| game_ids.contains(d.game_id.as_str())))
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TeamGameDefense>,
    {
        let mut by_team: HashMap<String, YardsAllowed> = HashMap::new();
        let mut league_total = 0.0;
        let mut count = 0usize;

        for record in records {
            let yards = record.total_yards_allowed.filter(|y| y.is_finite()).unwrap_or(0.0);
            let entry = by_team.entry(record.team_id.clone()).or_default();
            entry.total += yards;
            entry.games += 1;
            league_total += yards;
            count += 1;
        }

        let league_avg = if count > 0 { league_total / count as f64 } else { 0.0 };
        Self { by_team, league_avg, records: count }
    }

    pub fn league_avg(&self) -> f64 {
        self.league_avg
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Average yards allowed by `team_id`, falling back to the league average
    pub fn team_avg(&self, team_id: &str) -> f64 {
        match self.by_team.get(team_id) {
            Some(agg) if agg.games > 0 => agg.total / agg.games as f64,
            _ => self.league_avg,
        }
    }

    pub fn has_team(&self, team_id: &str) -> bool {
        self.by_team.contains_key(team_id)
    }

    /// Clamped defensive factor for `opponent_id`; unknown opponents are neutral
    pub fn factor_for(&self, opponent_id: &str) -> f64 {
        if !self.has_team(opponent_id) {
            return 1.0;
        }
        opponent_defensive_factor(self.team_avg(opponent_id), self.league_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameStatus;
    use proptest::prelude::*;

    fn defense(game: &str, team: &str, yards: Option<f64>) -> TeamGameDefense {
        TeamGameDefense {
            game_id: game.into(),
            team_id: team.into(),
            total_yards_allowed: yards,
        }
    }

    fn game(id: &str, week: u32) -> GameInfo {
        GameInfo {
            game_id: id.into(),
            season: 2025,
            week,
            home_team_id: "A".into(),
            away_team_id: "B".into(),
            stadium_id: None,
            status: GameStatus::Final,
        }
    }

    #[test]
    fn factor_is_clamped() {
        assert_eq!(opponent_defensive_factor(1000.0, 300.0), MAX_OPPONENT_FACTOR);
        assert_eq!(opponent_defensive_factor(10.0, 300.0), MIN_OPPONENT_FACTOR);
        assert!((opponent_defensive_factor(330.0, 300.0) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn zero_league_average_is_neutral() {
        assert_eq!(opponent_defensive_factor(250.0, 0.0), 1.0);
        assert_eq!(opponent_defensive_factor(0.0, 0.0), 1.0);
        assert_eq!(opponent_defensive_factor(f64::NAN, 300.0), 1.0);
    }

    #[test]
    fn table_only_counts_listed_games() {
        let records = vec![
            defense("g1", "A", Some(400.0)),
            defense("g1", "B", Some(200.0)),
            defense("g2", "A", Some(100.0)),
            defense("g9", "B", Some(9000.0)),
        ];
        let games = vec![game("g1", 1), game("g2", 2)];
        let table = DefenseTable::build(&games, &records);

        assert_eq!(table.record_count(), 3);
        assert!((table.league_avg() - 700.0 / 3.0).abs() < 1e-9);
        assert!((table.team_avg("A") - 250.0).abs() < 1e-9);
        assert!((table.team_avg("B") - 200.0).abs() < 1e-9);
        assert_eq!(table.factor_for("ZZZ"), 1.0);
    }

    #[test]
    fn missing_yards_count_as_zero() {
        let records = vec![defense("g1", "A", None), defense("g1", "B", Some(300.0))];
        let table = DefenseTable::from_records(&records);
        assert_eq!(table.team_avg("A"), 0.0);
        assert_eq!(table.factor_for("A"), MIN_OPPONENT_FACTOR);
    }

    proptest! {
        #[test]
        fn factor_always_within_bounds(opp in -1.0e9f64..1.0e9, league in -1.0e9f64..1.0e9) {
            let f = opponent_defensive_factor(opp, league);
            prop_assert!((MIN_OPPONENT_FACTOR..=MAX_OPPONENT_FACTOR).contains(&f));
        }

        #[test]
        fn table_factor_within_bounds(yards in proptest::collection::vec(0.0f64..1.0e6, 1..30)) {
            let records: Vec<TeamGameDefense> = yards
                .iter()
                .enumerate()
                .map(|(i, y)| defense(&format!("g{i}"), if i % 2 == 0 { "A" } else { "B" }, Some(*y)))
                .collect();
            let table = DefenseTable::from_records(&records);
            for team in ["A", "B", "C"] {
                let f = table.factor_for(team);
                prop_assert!((MIN_OPPONENT_FACTOR..=MAX_OPPONENT_FACTOR).contains(&f));
            }
        }
    }
}
