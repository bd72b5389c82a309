//! k-fold cross-validation over training examples

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::info;

use crate::config::ForestConfig;
use crate::error::{Result, TrainingError};
use crate::features::{matrix_of, TrainingExample};
use crate::forest::RandomForest;
use crate::model::{mean_squared_error, r_squared, Regressor};

/// Held-out score of one fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    /// 1-based fold number
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub mse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: Vec<FoldScore>,
    pub avg_mse: f64,
    pub avg_r2: f64,
}

/// Contiguous test ranges for `k` folds over `n` rows; the last fold takes the remainder
pub fn fold_bounds(n: usize, k: usize) -> Vec<Range<usize>> {
    if k == 0 {
        return Vec::new();
    }
    let fold_size = n / k;
    (0..k)
        .map(|fold| {
            let start = fold * fold_size;
            let end = if fold == k - 1 { n } else { start + fold_size };
            start..end
        })
        .collect()
}

/// Train on all-but-one fold and score on the held-out fold, for each of `k` folds.
///
/// Folds are trained in parallel; each uses `forest` unchanged, so scores are identical
/// across runs.
pub fn k_fold_cross_validate(
    examples: &[TrainingExample],
    k: usize,
    forest: &ForestConfig,
) -> Result<CrossValidation> {
    if k < 2 {
        return Err(TrainingError::precondition(format!(
            "cross-validation needs at least 2 folds, got {k}"
        )));
    }
    if examples.len() < k {
        return Err(TrainingError::TooFewExamplesForFolds { examples: examples.len(), folds: k });
    }

    let (x, y) = matrix_of(examples);

    let folds: Vec<FoldScore> = fold_bounds(examples.len(), k)
        .into_par_iter()
        .enumerate()
        .map(|(fold, test)| -> Result<FoldScore> {
            let mut train_x = Vec::with_capacity(x.len() - test.len());
            let mut train_y = Vec::with_capacity(x.len() - test.len());
            for i in (0..test.start).chain(test.end..x.len()) {
                train_x.push(x[i].clone());
                train_y.push(y[i]);
            }

            let model = RandomForest::fit(&train_x, &train_y, forest)?;
            let predicted = model.predict(&x[test.clone()]);
            let actual = &y[test.clone()];

            Ok(FoldScore {
                fold: fold + 1,
                train_size: train_x.len(),
                test_size: test.len(),
                mse: mean_squared_error(actual, &predicted),
                r2: r_squared(actual, &predicted),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let avg_mse = folds.iter().map(|f| f.mse).sum::<f64>() / folds.len() as f64;
    let avg_r2 = folds.iter().map(|f| f.r2).sum::<f64>() / folds.len() as f64;

    for score in &folds {
        info!(fold = score.fold, mse = score.mse, r2 = score.r2, "cross-validation fold");
    }
    info!(folds = k, avg_mse, avg_r2, "cross-validation complete");

    Ok(CrossValidation { folds, avg_mse, avg_r2 })
}
