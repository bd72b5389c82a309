//! # Feature Weights
//!
//! Learns how much each contextual factor (opponent defense, home field, surface, roof)
//! matters to a player's fantasy output.
//!
//! Completed-game stat lines are encoded as fixed-schema feature vectors, a bagged
//! regression-tree forest is fit to them, and permutation importance turns the fitted model
//! into normalized per-feature weights. k-fold cross-validation reports how well the
//! contextual features explain the target at all.
//!
//! ```text
//! SeasonData -> build_training_examples -> RandomForest::fit -> permutation_importance
//!                                        \-> k_fold_cross_validate
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod forest;
pub mod importance;
pub mod model;
pub mod trainer;
pub mod validation;

pub use config::{ForestConfig, TrainingConfig};
pub use error::{Result, TrainingError};
pub use features::{
    build_training_examples, contextual_factors, ExclusionReason, Feature, FeatureSchema,
    FeatureVector, TrainingExample, TrainingSet, FEATURE_NAMES,
};
pub use forest::{RandomForest, RegressionTree};
pub use importance::{permutation_importance, FeatureImportances, PermutationImportance};
pub use model::{mean_squared_error, r_squared, Regressor};
pub use trainer::{CrossValidationSkip, FeatureWeightTrainer, LearnedFeatureWeights, TrainingOutcome};
pub use validation::{fold_bounds, k_fold_cross_validate, CrossValidation, FoldScore};
