use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named per-game statistic tracked on a player's stat line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    PassingYards,
    PassingAttempts,
    PassingCompletions,
    PassingTouchdowns,
    PassingInterceptions,
    RushingYards,
    RushingAttempts,
    RushingTouchdowns,
    ReceivingYards,
    ReceivingTargets,
    ReceivingTouchdowns,
    Receptions,
    FantasyPointsPpr,
}

impl StatField {
    pub const ALL: [StatField; 13] = [
        StatField::PassingYards,
        StatField::PassingAttempts,
        StatField::PassingCompletions,
        StatField::PassingTouchdowns,
        StatField::PassingInterceptions,
        StatField::RushingYards,
        StatField::RushingAttempts,
        StatField::RushingTouchdowns,
        StatField::ReceivingYards,
        StatField::ReceivingTargets,
        StatField::ReceivingTouchdowns,
        StatField::Receptions,
        StatField::FantasyPointsPpr,
    ];

    /// Key of this stat inside a stat line (e.g. "passing_yards")
    pub fn key(self) -> &'static str {
        match self {
            StatField::PassingYards => "passing_yards",
            StatField::PassingAttempts => "passing_attempts",
            StatField::PassingCompletions => "passing_completions",
            StatField::PassingTouchdowns => "passing_touchdowns",
            StatField::PassingInterceptions => "passing_interceptions",
            StatField::RushingYards => "rushing_yards",
            StatField::RushingAttempts => "rushing_attempts",
            StatField::RushingTouchdowns => "rushing_touchdowns",
            StatField::ReceivingYards => "receiving_yards",
            StatField::ReceivingTargets => "receiving_targets",
            StatField::ReceivingTouchdowns => "receiving_touchdowns",
            StatField::Receptions => "receptions",
            StatField::FantasyPointsPpr => "fantasy_points_ppr",
        }
    }

    /// Human-readable label for reports
    pub fn label(self) -> &'static str {
        match self {
            StatField::PassingYards => "Passing Yards",
            StatField::PassingAttempts => "Passing Attempts",
            StatField::PassingCompletions => "Completions",
            StatField::PassingTouchdowns => "Passing TDs",
            StatField::PassingInterceptions => "Interceptions",
            StatField::RushingYards => "Rushing Yards",
            StatField::RushingAttempts => "Rushing Attempts",
            StatField::RushingTouchdowns => "Rushing TDs",
            StatField::ReceivingYards => "Receiving Yards",
            StatField::ReceivingTargets => "Targets",
            StatField::ReceivingTouchdowns => "Receiving TDs",
            StatField::Receptions => "Receptions",
            StatField::FantasyPointsPpr => "Fantasy Points",
        }
    }

    /// Count-like stats are whole numbers per game and project to integers
    pub fn is_count(self) -> bool {
        !matches!(
            self,
            StatField::PassingYards
                | StatField::RushingYards
                | StatField::ReceivingYards
                | StatField::FantasyPointsPpr
        )
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.key() == key)
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fantasy roster position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    Other(String),
}

impl Position {
    pub const SKILL: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

    pub fn code(&self) -> &str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::Other(code) => code,
        }
    }

    pub fn is_skill(&self) -> bool {
        !matches!(self, Position::Other(_))
    }

    /// Stats projected for a player at this position
    pub fn stat_categories(&self) -> &'static [StatField] {
        match self {
            Position::QB => &[StatField::PassingYards, StatField::FantasyPointsPpr],
            Position::RB => &[
                StatField::RushingYards,
                StatField::ReceivingYards,
                StatField::FantasyPointsPpr,
            ],
            Position::WR | Position::TE => {
                &[StatField::ReceivingYards, StatField::FantasyPointsPpr]
            }
            Position::Other(_) => &[],
        }
    }
}

impl From<String> for Position {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "QB" => Position::QB,
            "RB" => Position::RB,
            "WR" => Position::WR,
            "TE" => Position::TE,
            other => Position::Other(other.to_string()),
        }
    }
}

impl From<&str> for Position {
    fn from(raw: &str) -> Self {
        Position::from(raw.to_string())
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.code().to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle status of a scheduled game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
    Postponed,
}

/// Schedule metadata needed to resolve home/away and opponent identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub home_team_id: String,
    pub away_team_id: String,
    #[serde(default)]
    pub stadium_id: Option<String>,
    pub status: GameStatus,
}

impl GameInfo {
    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }

    /// Opponent of `team_id`, or `None` when the team did not play in this game
    pub fn opponent_of(&self, team_id: &str) -> Option<&str> {
        if self.home_team_id == team_id {
            Some(&self.away_team_id)
        } else if self.away_team_id == team_id {
            Some(&self.home_team_id)
        } else {
            None
        }
    }

    pub fn is_home(&self, team_id: &str) -> bool {
        self.home_team_id == team_id
    }

    pub fn has_both_teams(&self) -> bool {
        !self.home_team_id.trim().is_empty() && !self.away_team_id.trim().is_empty()
    }
}

/// One player's stat line for a single game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameParticipationRecord {
    pub player_id: String,
    pub team_id: String,
    #[serde(default)]
    pub opponent_id: Option<String>,
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub position: Position,
    /// Named stat values keyed by [`StatField::key`]; null means "not recorded"
    #[serde(default)]
    pub stats: BTreeMap<String, Option<f64>>,
}

impl GameParticipationRecord {
    /// Observed value for `field`, skipping null and non-finite entries
    pub fn value(&self, field: StatField) -> Option<f64> {
        self.stats
            .get(field.key())
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn with_stat(mut self, field: StatField, value: f64) -> Self {
        self.stats.insert(field.key().to_string(), Some(value));
        self
    }
}

/// Yards allowed by one defense in one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamGameDefense {
    pub game_id: String,
    pub team_id: String,
    #[serde(default)]
    pub total_yards_allowed: Option<f64>,
}

/// Stadium attributes used for venue features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub stadium_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surface_type: Option<String>,
    #[serde(default)]
    pub roof_type: Option<String>,
}

impl Venue {
    pub fn is_turf(&self) -> bool {
        self.surface_type
            .as_deref()
            .map(|s| s.to_ascii_lowercase().contains("turf"))
            .unwrap_or(false)
    }

    pub fn is_grass(&self) -> bool {
        self.surface_type
            .as_deref()
            .map(|s| s.to_ascii_lowercase().contains("grass"))
            .unwrap_or(false)
    }

    pub fn is_dome(&self) -> bool {
        self.roof_type
            .as_deref()
            .map(|r| {
                let r = r.trim().to_ascii_lowercase();
                r == "dome" || r == "retractable dome"
            })
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.stadium_id)
    }
}

/// Game-day weather observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameWeather {
    pub game_id: String,
    /// Degrees Fahrenheit
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Miles per hour
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub conditions: Option<String>,
}

/// Weekly injury designation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

impl InjuryStatus {
    /// Players ruled out or doubtful are not projected
    pub fn excludes_player(self) -> bool {
        matches!(self, InjuryStatus::Out | InjuryStatus::Doubtful)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryReport {
    pub player_id: String,
    pub season: i32,
    pub week: u32,
    pub status: InjuryStatus,
    #[serde(default)]
    pub injury_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: String,
    pub full_name: String,
    pub position: Position,
}

/// Everything the projection core reads for one season, as supplied by the data layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonData {
    #[serde(default)]
    pub games: Vec<GameInfo>,
    #[serde(default)]
    pub player_stats: Vec<GameParticipationRecord>,
    #[serde(default)]
    pub team_defense: Vec<TeamGameDefense>,
    #[serde(default)]
    pub venues: Vec<Venue>,
    #[serde(default)]
    pub weather: Vec<GameWeather>,
    #[serde(default)]
    pub players: Vec<PlayerProfile>,
    #[serde(default)]
    pub injuries: Vec<InjuryReport>,
}

impl SeasonData {
    pub fn game(&self, game_id: &str) -> Option<&GameInfo> {
        self.games.iter().find(|g| g.game_id == game_id)
    }

    pub fn venue(&self, stadium_id: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.stadium_id == stadium_id)
    }

    pub fn weather_for(&self, game_id: &str) -> Option<&GameWeather> {
        self.weather.iter().find(|w| w.game_id == game_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerProfile> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn injury(&self, player_id: &str, season: i32, week: u32) -> Option<&InjuryReport> {
        self.injuries
            .iter()
            .find(|i| i.player_id == player_id && i.season == season && i.week == week)
    }

    /// Completed games of `season` with `min_week <= week <= max_week`
    pub fn completed_games(&self, season: i32, min_week: u32, max_week: u32) -> Vec<&GameInfo> {
        self.games
            .iter()
            .filter(|g| g.season == season && g.is_final())
            .filter(|g| g.week >= min_week && g.week <= max_week)
            .collect()
    }

    /// Completed games of `season` strictly before `week`
    pub fn completed_games_before(&self, season: i32, week: u32) -> Vec<&GameInfo> {
        self.games
            .iter()
            .filter(|g| g.season == season && g.is_final() && g.week < week)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_keys_round_trip() {
        for field in StatField::ALL {
            assert_eq!(StatField::from_key(field.key()), Some(field));
        }
        assert!(StatField::Receptions.is_count());
        assert!(!StatField::ReceivingYards.is_count());
    }

    #[test]
    fn record_value_skips_null_and_nan() {
        let raw = r#"{
            "player_id": "p1", "team_id": "KC", "game_id": "g1",
            "season": 2025, "week": 3, "position": "wr",
            "stats": {"receiving_yards": 81.0, "receptions": null}
        }"#;
        let mut record: GameParticipationRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.position, Position::WR);
        assert_eq!(record.value(StatField::ReceivingYards), Some(81.0));
        assert_eq!(record.value(StatField::Receptions), None);
        assert_eq!(record.value(StatField::RushingYards), None);

        record.stats.insert("rushing_yards".into(), Some(f64::NAN));
        assert_eq!(record.value(StatField::RushingYards), None);
    }

    #[test]
    fn venue_flags() {
        let venue = Venue {
            stadium_id: "s1".into(),
            name: None,
            surface_type: Some("FieldTurf".into()),
            roof_type: Some("Retractable Dome".into()),
        };
        assert!(venue.is_turf());
        assert!(venue.is_dome());
        assert!(!venue.is_grass());
    }

    #[test]
    fn opponent_resolution() {
        let game = GameInfo {
            game_id: "g1".into(),
            season: 2025,
            week: 1,
            home_team_id: "PHI".into(),
            away_team_id: "DAL".into(),
            stadium_id: None,
            status: GameStatus::Final,
        };
        assert_eq!(game.opponent_of("PHI"), Some("DAL"));
        assert_eq!(game.opponent_of("DAL"), Some("PHI"));
        assert_eq!(game.opponent_of("NYG"), None);
        assert!(game.is_home("PHI"));
    }

    #[test]
    fn unknown_position_is_not_skill() {
        let pos = Position::from("k");
        assert_eq!(pos, Position::Other("K".into()));
        assert!(!pos.is_skill());
        assert!(pos.stat_categories().is_empty());
    }
}
