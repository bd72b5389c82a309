//! Bagged regression-tree ensemble
//!
//! Each tree is a CART regressor grown on a bootstrap sample, choosing splits by variance
//! reduction over a random subset of features at every node. Tree `i` draws from its own
//! RNG seeded with `seed + i`, so the fitted forest does not depend on how rayon schedules
//! the trees.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ForestConfig;
use crate::error::{Result, TrainingError};
use crate::model::Regressor;

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// A single regression tree stored as a node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        sample: Vec<usize>,
        config: &ForestConfig,
        n_features: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            config,
            n_features,
            per_split: config.features_per_split(n_features),
            nodes: Vec::new(),
        };
        builder.grow(sample, 0, rng);
        Self { nodes: builder.nodes }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut cursor = 0;
        loop {
            match self.nodes.get(cursor) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split { feature, threshold, left, right }) => {
                    // A short row routes left, as if the value were missing
                    let goes_left = row.get(*feature).map_or(true, |v| *v <= *threshold);
                    cursor = if goes_left { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, counted in edges
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes.get(at) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a ForestConfig,
    n_features: usize,
    per_split: usize,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `sample` and return its node index
    fn grow(&mut self, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let value = self.mean_target(&sample);
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= self.config.max_depth || sample.len() < self.config.min_samples_split {
            return at;
        }

        let Some(best) = self.best_split(&sample, rng) else {
            return at;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = sample
            .iter()
            .partition(|&&i| self.x[i][best.feature] <= best.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return at;
        }

        let left = self.grow(left_rows, depth + 1, rng);
        let right = self.grow(right_rows, depth + 1, rng);
        self.nodes[at] = Node::Split { feature: best.feature, threshold: best.threshold, left, right };
        at
    }

    fn mean_target(&self, sample: &[usize]) -> f64 {
        if sample.is_empty() {
            return 0.0;
        }
        sample.iter().map(|&i| self.y[i]).sum::<f64>() / sample.len() as f64
    }

    fn best_split(&self, sample: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let n = sample.len() as f64;
        let total: f64 = sample.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = sample.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = total_sq - total * total / n;

        let mut best: Option<BestSplit> = None;
        let mut order = sample.to_vec();

        for feature in index::sample(rng, self.n_features, self.per_split).into_iter() {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..order.len() - 1 {
                let yi = self.y[order[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = n - n_left;
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);
                let gain = parent_sse - sse;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit { feature, threshold: (here + next) / 2.0, gain });
                }
            }
        }

        best
    }
}

/// Averaging ensemble of [`RegressionTree`]s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit a forest on the row-major matrix `x` and targets `y`
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &ForestConfig) -> Result<Self> {
        config.validate()?;
        let n_features = check_matrix(x, y)?;
        let n = x.len();

        let trees: Vec<RegressionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, sample, config, n_features, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            rows = n,
            features = n_features,
            max_depth = trees.iter().map(RegressionTree::depth).max().unwrap_or(0),
            "fitted regression forest"
        );

        Ok(Self { trees, n_features })
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl Regressor for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// Validate matrix shape and return its width
pub(crate) fn check_matrix(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(TrainingError::precondition("training matrix is empty"));
    }
    if x.len() != y.len() {
        return Err(TrainingError::precondition(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if width == 0 {
        return Err(TrainingError::precondition("feature rows have no columns"));
    }
    if let Some(row) = x.iter().find(|row| row.len() != width) {
        return Err(TrainingError::SchemaMismatch { expected: width, actual: row.len() });
    }
    Ok(width)
}
