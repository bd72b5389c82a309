//! Configuration for forest training and the feature-weight pipeline

use game_stats::{Position, StatField};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Default number of trees in the final model
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default number of trees per cross-validation fold
pub const DEFAULT_CV_N_ESTIMATORS: usize = 50;

/// Default fold count for cross-validation
pub const DEFAULT_FOLDS: usize = 5;

/// Training sets smaller than this are flagged low-confidence
pub const DEFAULT_MIN_RELIABLE_SAMPLES: usize = 100;

/// Default seed shared by bootstrap sampling and permutation shuffles
pub const DEFAULT_SEED: u64 = 42;

/// Hyperparameters of the bagged regression-tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum depth of each tree (root is depth 0)
    pub max_depth: usize,

    /// Fraction of features considered at each split, in (0, 1]
    pub max_features: f64,

    /// Sample rows with replacement for each tree
    pub bootstrap: bool,

    /// Nodes with fewer rows than this become leaves
    pub min_samples_split: usize,

    /// Base random seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: 10,
            max_features: 0.5,
            bootstrap: true,
            min_samples_split: 2,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    /// Number of candidate features per split for a `n_features`-wide matrix
    pub fn features_per_split(&self, n_features: usize) -> usize {
        if n_features == 0 {
            return 0;
        }
        ((self.max_features * n_features as f64).ceil() as usize).min(n_features).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TrainingError::config("n_estimators must be at least 1"));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(TrainingError::config(format!(
                "max_features must be in (0, 1], got {}",
                self.max_features
            )));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::config("min_samples_split must be at least 2"));
        }
        Ok(())
    }
}

/// Configuration for one feature-weight training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Season to train on
    pub season: i32,

    /// First week of the training window (inclusive)
    pub min_week: u32,

    /// Last week of the training window (inclusive)
    pub max_week: u32,

    /// Positions whose stat lines become training examples
    pub positions: Vec<Position>,

    /// Stat used as the regression target
    pub target_stat: StatField,

    /// Forest used for the final model
    pub forest: ForestConfig,

    /// Forest used inside each cross-validation fold
    pub cv_forest: ForestConfig,

    /// Run k-fold cross-validation before fitting the final model
    pub cross_validate: bool,

    /// Number of folds
    pub folds: usize,

    /// Below this many examples the run is flagged low-confidence
    pub min_reliable_samples: usize,

    /// Seed for permutation-importance shuffles
    pub importance_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            season: 2025,
            min_week: 1,
            max_week: 17,
            positions: Position::SKILL.to_vec(),
            target_stat: StatField::FantasyPointsPpr,
            forest: ForestConfig::default(),
            cv_forest: ForestConfig {
                n_estimators: DEFAULT_CV_N_ESTIMATORS,
                ..ForestConfig::default()
            },
            cross_validate: true,
            folds: DEFAULT_FOLDS,
            min_reliable_samples: DEFAULT_MIN_RELIABLE_SAMPLES,
            importance_seed: DEFAULT_SEED,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_week > self.max_week {
            return Err(TrainingError::config(format!(
                "min_week {} is after max_week {}",
                self.min_week, self.max_week
            )));
        }
        if self.cross_validate && self.folds < 2 {
            return Err(TrainingError::config("cross-validation needs at least 2 folds"));
        }
        self.forest.validate()?;
        self.cv_forest.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_training_script() {
        let config = TrainingConfig::default();
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.cv_forest.n_estimators, 50);
        assert_eq!(config.forest.max_depth, 10);
        assert_eq!(config.folds, 5);
        assert_eq!(config.positions.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn features_per_split_rounds_up() {
        let forest = ForestConfig::default();
        assert_eq!(forest.features_per_split(4), 2);
        assert_eq!(forest.features_per_split(3), 2);
        assert_eq!(forest.features_per_split(1), 1);
        let all = ForestConfig { max_features: 1.0, ..ForestConfig::default() };
        assert_eq!(all.features_per_split(4), 4);
    }

    #[test]
    fn rejects_bad_values() {
        let config = TrainingConfig { min_week: 9, max_week: 3, ..TrainingConfig::default() };
        assert!(matches!(config.validate(), Err(TrainingError::Config(_))));

        let forest = ForestConfig { max_features: 0.0, ..ForestConfig::default() };
        assert!(forest.validate().is_err());
        let forest = ForestConfig { n_estimators: 0, ..ForestConfig::default() };
        assert!(forest.validate().is_err());
    }
}
