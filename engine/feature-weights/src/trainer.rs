//! End-to-end feature-weight training run

use chrono::{DateTime, Utc};
use game_stats::SeasonData;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::features::build_training_examples;
use crate::forest::RandomForest;
use crate::importance::{permutation_importance, FeatureImportances, PermutationImportance};
use crate::validation::{k_fold_cross_validate, CrossValidation};

/// Importances plus the metadata describing the run that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedFeatureWeights {
    pub generated_at: DateTime<Utc>,
    pub season: i32,
    /// Last week included in training
    pub training_week: u32,
    pub training_samples: usize,
    pub cross_validation_r2: Option<f64>,
    pub cross_validation_mse: Option<f64>,
    /// Why no cross-validation scores were produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_validation_skipped: Option<CrossValidationSkip>,
    pub feature_names: Vec<String>,
    pub importances: FeatureImportances,
    /// Set when the sample was too small for the weights to be trusted
    pub low_confidence: bool,
}

/// Reason a training run produced no cross-validation scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CrossValidationSkip {
    /// Disabled in configuration
    Disabled,
    /// Fewer training examples than folds
    TooFewExamples { examples: usize, folds: usize },
}

impl LearnedFeatureWeights {
    pub fn weight(&self, feature: &str) -> Option<f64> {
        self.importances.get(feature)
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub weights: LearnedFeatureWeights,
    pub cross_validation: Option<CrossValidation>,
    pub permutation: PermutationImportance,
}

pub struct FeatureWeightTrainer {
    config: TrainingConfig,
}

impl FeatureWeightTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Build examples, optionally cross-validate, fit the final forest and attribute
    /// importance to each feature.
    pub fn train(&self, data: &SeasonData) -> Result<TrainingOutcome> {
        let config = &self.config;
        config.validate()?;

        info!(
            season = config.season,
            min_week = config.min_week,
            max_week = config.max_week,
            target = %config.target_stat,
            "training feature weights"
        );

        let set = build_training_examples(data, config)?;
        if set.is_empty() {
            return Err(TrainingError::EmptyTrainingSet {
                season: config.season,
                min_week: config.min_week,
                max_week: config.max_week,
                candidates: set.candidates,
                excluded: set.excluded_count(),
            });
        }

        let low_confidence = set.len() < config.min_reliable_samples;
        if low_confidence {
            warn!(
                samples = set.len(),
                recommended = config.min_reliable_samples,
                "small training set, learned weights are low confidence"
            );
        }

        let (cross_validation, cross_validation_skipped) = if !config.cross_validate {
            (None, Some(CrossValidationSkip::Disabled))
        } else if set.len() < config.folds {
            warn!(samples = set.len(), folds = config.folds, "too few examples to cross-validate, skipping");
            let skip = CrossValidationSkip::TooFewExamples { examples: set.len(), folds: config.folds };
            (None, Some(skip))
        } else {
            (Some(k_fold_cross_validate(&set.examples, config.folds, &config.cv_forest)?), None)
        };

        let (x, y) = set.matrix();
        let model = RandomForest::fit(&x, &y, &config.forest)?;

        let names = set.schema.names();
        let permutation = permutation_importance(&model, &x, &y, &names, config.importance_seed)?;

        for (name, weight) in permutation.importances.iter() {
            info!(feature = name, weight, "learned feature weight");
        }

        let weights = LearnedFeatureWeights {
            generated_at: Utc::now(),
            season: config.season,
            training_week: config.max_week,
            training_samples: set.len(),
            cross_validation_r2: cross_validation.as_ref().map(|cv| cv.avg_r2),
            cross_validation_mse: cross_validation.as_ref().map(|cv| cv.avg_mse),
            cross_validation_skipped,
            feature_names: names,
            importances: permutation.importances.clone(),
            low_confidence,
        };

        Ok(TrainingOutcome { model, weights, cross_validation, permutation })
    }
}
