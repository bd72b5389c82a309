use game_stats::{InjuryStatus, Position, StatField};
use serde::{Deserialize, Serialize};

use crate::bootstrap::BootstrapInterval;
use crate::modifiers::EnvironmentModifier;
use crate::robust::RegimeShift;
use crate::smoothing::Trend;

/// Floor/expected/ceiling range for one stat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub stat: StatField,
    pub floor: f64,
    pub expected: f64,
    pub ceiling: f64,
    /// In `[0, 1]`
    pub confidence: f64,
    pub games_used: usize,
    pub recent_avg: f64,
    pub season_avg: f64,
    pub std_dev: f64,
    pub opponent_factor: f64,
    pub environment_modifier: f64,
    /// Present when recent form was smoothed with an EWMA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<SmoothingSummary>,
    /// Present when outlier trimming or regime detection is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robust: Option<RobustSummary>,
    /// Bootstrap bounds behind the floor and ceiling, when that method is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<BootstrapInterval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSummary {
    pub ewma: f64,
    pub alpha: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustSummary {
    pub outliers_removed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime_shift: Option<RegimeShift>,
}

/// Why no projection was produced for a stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer valid season values than the configured minimum
    InsufficientData { required: usize, available: usize },
    /// The rolling window holds no valid values
    EmptyRecentWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedStat {
    pub stat: StatField,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProjection {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team_id: String,
    /// Games with at least one stat line before the target week
    pub games_played: usize,
    /// Injury designation that did not exclude the player (e.g. questionable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_status: Option<InjuryStatus>,
    pub projections: Vec<Projection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStat>,
}

impl PlayerProjection {
    pub fn projection(&self, stat: StatField) -> Option<&Projection> {
        self.projections.iter().find(|p| p.stat == stat)
    }

    pub fn is_questionable(&self) -> bool {
        self.injury_status == Some(InjuryStatus::Questionable)
    }
}

/// A player left out of a team projection because of injury
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedPlayer {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub status: InjuryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProjection {
    pub team_id: String,
    pub opponent_id: String,
    pub is_home: bool,
    pub opponent_factor: f64,
    pub environment: EnvironmentModifier,
    pub players: Vec<PlayerProjection>,
    pub excluded: Vec<ExcludedPlayer>,
}

impl TeamProjection {
    pub fn player(&self, player_id: &str) -> Option<&PlayerProjection> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameProjection {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub home: TeamProjection,
    pub away: TeamProjection,
}

/// A game from a weekly batch that could not be projected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedGame {
    pub game_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekProjection {
    pub season: i32,
    pub week: u32,
    pub games: Vec<GameProjection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedGame>,
}
