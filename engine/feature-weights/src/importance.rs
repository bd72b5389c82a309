//! Permutation feature importance

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, TrainingError};
use crate::forest::check_matrix;
use crate::model::{mean_squared_error, Regressor};

/// Tolerance used when checking that normalized weights sum to one
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Feature name to normalized, non-negative weight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureImportances(BTreeMap<String, f64>);

impl FeatureImportances {
    /// Normalize raw scores to sum to one.
    ///
    /// If the raw scores do not sum to a positive total every weight is zero. Otherwise
    /// negative scores contribute nothing and the rest are divided by their positive sum.
    pub fn normalize<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let raw: Vec<(&str, f64)> = raw.into_iter().map(|(name, v)| (name, finite(v))).collect();
        let total: f64 = raw.iter().map(|(_, v)| v).sum();

        if total <= 0.0 {
            debug!(features = raw.len(), total, "total importance is not positive, using zero weights");
            return Self(raw.into_iter().map(|(name, _)| (name.to_string(), 0.0)).collect());
        }

        let positive: f64 = raw.iter().map(|(_, v)| v.max(0.0)).sum();
        Self(
            raw.into_iter()
                .map(|(name, v)| (name.to_string(), v.max(0.0) / positive))
                .collect(),
        )
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0.get(feature).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// True when every weight is zero
    pub fn is_degenerate(&self) -> bool {
        self.0.values().all(|v| *v == 0.0)
    }
}

impl FromIterator<(String, f64)> for FeatureImportances {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Raw and normalized permutation importances for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationImportance {
    pub baseline_mse: f64,
    /// Permuted MSE minus baseline MSE, per feature in input order; may be negative
    pub deltas: Vec<(String, f64)>,
    pub importances: FeatureImportances,
}

/// Score each feature by how much shuffling its column raises the model's MSE.
///
/// Each column is shuffled once with a Fisher-Yates shuffle drawn from `seed`.
pub fn permutation_importance<M>(
    model: &M,
    x: &[Vec<f64>],
    y: &[f64],
    feature_names: &[String],
    seed: u64,
) -> Result<PermutationImportance>
where
    M: Regressor + ?Sized,
{
    let width = check_matrix(x, y)?;
    if feature_names.len() != width {
        return Err(TrainingError::SchemaMismatch { expected: width, actual: feature_names.len() });
    }
    if model.n_features() != width {
        return Err(TrainingError::SchemaMismatch {
            expected: model.n_features(),
            actual: width,
        });
    }

    let baseline_mse = mean_squared_error(y, &model.predict(x));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut permuted = x.to_vec();
    let mut deltas = Vec::with_capacity(width);

    for (col, name) in feature_names.iter().enumerate() {
        let mut column: Vec<f64> = x.iter().map(|row| row[col]).collect();
        column.shuffle(&mut rng);
        for (row, value) in permuted.iter_mut().zip(&column) {
            row[col] = *value;
        }

        let delta = mean_squared_error(y, &model.predict(&permuted)) - baseline_mse;
        debug!(feature = %name, delta, "permutation importance");
        deltas.push((name.clone(), delta));

        for (row, original) in permuted.iter_mut().zip(x) {
            row[col] = original[col];
        }
    }

    let importances = FeatureImportances::normalize(deltas.iter().map(|(n, d)| (n.as_str(), *d)));

    Ok(PermutationImportance { baseline_mse, deltas, importances })
}
