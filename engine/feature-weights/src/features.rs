//! Feature vector builder
//!
//! Turns completed-game stat lines into fixed-schema numeric vectors paired with a target.
//! Feature order is stable across training and inference: see [`FEATURE_NAMES`].

use game_stats::{ContextualFactors, DefenseTable, GameParticipationRecord, SeasonData};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};

/// Canonical feature order
pub const FEATURE_NAMES: [&str; 4] = ["opponent_defense", "is_home", "is_turf", "is_dome"];

/// A contextual feature extracted from [`ContextualFactors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    OpponentDefense,
    IsHome,
    IsTurf,
    IsDome,
}

impl Feature {
    pub const ALL: [Feature; 4] =
        [Feature::OpponentDefense, Feature::IsHome, Feature::IsTurf, Feature::IsDome];

    pub fn name(self) -> &'static str {
        match self {
            Feature::OpponentDefense => "opponent_defense",
            Feature::IsHome => "is_home",
            Feature::IsTurf => "is_turf",
            Feature::IsDome => "is_dome",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Numeric value of this feature; flags encode as 0.0 / 1.0
    pub fn extract(self, factors: &ContextualFactors) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            Feature::OpponentDefense => factors.opponent_defensive_factor,
            Feature::IsHome => flag(factors.is_home),
            Feature::IsTurf => flag(factors.is_turf),
            Feature::IsDome => flag(factors.is_dome),
        }
    }
}

/// Ordered list of features shared by training and inference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<Feature>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self { features: Feature::ALL.to_vec() }
    }
}

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name().to_string()).collect()
    }

    /// Encode contextual factors in schema order
    pub fn vectorize(&self, factors: &ContextualFactors) -> FeatureVector {
        FeatureVector {
            values: self.features.iter().map(|f| f.extract(factors)).collect(),
        }
    }

    /// Ensure `names` matches this schema exactly, in order
    pub fn check_names(&self, names: &[String]) -> Result<()> {
        if names.len() != self.len() {
            return Err(TrainingError::SchemaMismatch { expected: self.len(), actual: names.len() });
        }
        for (feature, name) in self.features.iter().zip(names) {
            if feature.name() != name {
                return Err(TrainingError::precondition(format!(
                    "feature order mismatch: expected {}, got {}",
                    feature.name(),
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Feature values for one (player, game), in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// A feature vector paired with its observed target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub target: f64,
    pub player_id: String,
    pub game_id: String,
    pub week: u32,
}

/// Why a candidate stat line produced no example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingTarget,
    UnknownGame,
    GameNotCompleted,
    TeamNotInGame,
}

/// Output of [`build_training_examples`]
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub schema: FeatureSchema,
    pub examples: Vec<TrainingExample>,
    /// Stat lines that matched the season, window and positions
    pub candidates: usize,
    pub excluded: HashMap<ExclusionReason, usize>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.values().sum()
    }

    /// Feature matrix and target column
    pub fn matrix(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        matrix_of(&self.examples)
    }
}

/// Split examples into a row-major feature matrix and a target column
pub fn matrix_of(examples: &[TrainingExample]) -> (Vec<Vec<f64>>, Vec<f64>) {
    examples
        .iter()
        .map(|e| (e.features.values.clone(), e.target))
        .unzip()
}

/// Contextual factors for one stat line, or the reason it cannot be placed in a game
pub fn contextual_factors(
    record: &GameParticipationRecord,
    data: &SeasonData,
    defense: &DefenseTable,
) -> std::result::Result<ContextualFactors, ExclusionReason> {
    let game = data.game(&record.game_id).ok_or(ExclusionReason::UnknownGame)?;
    if !game.has_both_teams() {
        return Err(ExclusionReason::UnknownGame);
    }
    let opponent = game
        .opponent_of(&record.team_id)
        .ok_or(ExclusionReason::TeamNotInGame)?;
    let venue = game.stadium_id.as_deref().and_then(|id| data.venue(id));

    Ok(ContextualFactors::new(
        game.is_home(&record.team_id),
        defense.factor_for(opponent),
        venue,
    ))
}

/// Build one example per (player, completed game) in the configured window with a
/// non-null target.
///
/// The league average is taken once over every defense record in the window.
pub fn build_training_examples(data: &SeasonData, config: &TrainingConfig) -> Result<TrainingSet> {
    let games = data.completed_games(config.season, config.min_week, config.max_week);
    if games.is_empty() {
        return Err(TrainingError::NoCompletedGames {
            season: config.season,
            min_week: config.min_week,
            max_week: config.max_week,
        });
    }

    let defense = DefenseTable::build(games.iter().copied(), &data.team_defense);
    if defense.league_avg() == 0.0 {
        debug!(season = config.season, "league yards-allowed average is zero, opponent factors are neutral");
    }

    let schema = FeatureSchema::default();
    let mut examples = Vec::new();
    let mut excluded: HashMap<ExclusionReason, usize> = HashMap::new();
    let mut candidates = 0usize;

    let in_window = |r: &&GameParticipationRecord| {
        r.season == config.season
            && r.week >= config.min_week
            && r.week <= config.max_week
            && config.positions.contains(&r.position)
    };

    for record in data.player_stats.iter().filter(in_window) {
        candidates += 1;

        let target = match record.value(config.target_stat) {
            Some(v) => v,
            None => {
                *excluded.entry(ExclusionReason::MissingTarget).or_default() += 1;
                continue;
            }
        };

        if let Some(game) = data.game(&record.game_id) {
            if !game.is_final() {
                *excluded.entry(ExclusionReason::GameNotCompleted).or_default() += 1;
                continue;
            }
        }

        let factors = match contextual_factors(record, data, &defense) {
            Ok(f) => f,
            Err(reason) => {
                *excluded.entry(reason).or_default() += 1;
                continue;
            }
        };

        examples.push(TrainingExample {
            features: schema.vectorize(&factors),
            target,
            player_id: record.player_id.clone(),
            game_id: record.game_id.clone(),
            week: record.week,
        });
    }

    info!(
        season = config.season,
        games = games.len(),
        candidates,
        examples = examples.len(),
        excluded = excluded.values().sum::<usize>(),
        "built training examples"
    );

    Ok(TrainingSet { schema, examples, candidates, excluded })
}
