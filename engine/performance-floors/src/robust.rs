//! Outlier trimming and regime-change detection over a player's season values

use game_stats::stats::{mean, population_std_dev};
use serde::{Deserialize, Serialize};

use crate::config::RobustConfig;

/// Lower and upper IQR fences; values outside them are outliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFences {
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    /// Quartiles are read at `floor(n * 0.25)` and `floor(n * 0.75)` of the sorted values.
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let q1 = sorted[n / 4];
        let q3 = sorted[(n * 3 / 4).min(n - 1)];
        let iqr = q3 - q1;
        Some(Self { lower: q1 - multiplier * iqr, upper: q3 + multiplier * iqr })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Drop values outside the IQR fences, keeping input order.
///
/// Returns the kept values and how many were removed. With fewer than
/// `min_games_for_trim` values nothing is removed.
pub fn trim_outliers(values: &[f64], config: &RobustConfig) -> (Vec<f64>, usize) {
    if values.len() < config.min_games_for_trim.max(1) {
        return (values.to_vec(), 0);
    }
    let Some(fences) = IqrFences::from_values(values, config.iqr_multiplier) else {
        return (Vec::new(), 0);
    };
    let kept: Vec<f64> = values.iter().copied().filter(|v| fences.contains(*v)).collect();
    let removed = values.len() - kept.len();
    (kept, removed)
}

/// Index of the first value after which an upward CUSUM exceeds `threshold`.
///
/// `S_i = max(0, S_{i-1} + (x_i - mean) / std_dev - allowance)`. Needs at least four
/// values and a positive deviation.
pub fn detect_regime_change(
    values: &[f64],
    mean: f64,
    std_dev: f64,
    allowance: f64,
    threshold: f64,
) -> Option<usize> {
    if values.len() < 4 || !(std_dev > 0.0) {
        return None;
    }
    let mut cusum = 0.0_f64;
    for (i, value) in values.iter().enumerate() {
        cusum = (cusum + (value - mean) / std_dev - allowance).max(0.0);
        if cusum > threshold {
            return Some(i);
        }
    }
    None
}

/// A detected shift and the statistics of the games from it onward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeShift {
    pub changepoint_week: u32,
    pub post_shift_games: usize,
    pub post_shift_avg: f64,
    pub post_shift_std_dev: f64,
}

/// Season average and deviation after robust adjustments
#[derive(Debug, Clone, PartialEq)]
pub struct RobustSeason {
    pub avg: f64,
    pub std_dev: f64,
    pub values: Vec<f64>,
    pub outliers_removed: usize,
    pub regime_shift: Option<RegimeShift>,
}

/// Apply the enabled adjustments to a season.
///
/// `chronological` holds `(week, value)` pairs oldest first, untrimmed. Trimming feeds the
/// average and deviation; the regime check scans the untrimmed sequence against them and,
/// when a shift with at least two games after it is found, blends the post-shift average
/// and deviation in at `post_regime_weight`. `None` when trimming leaves nothing.
pub fn robust_season(chronological: &[(u32, f64)], config: &RobustConfig) -> Option<RobustSeason> {
    let raw: Vec<f64> = chronological.iter().map(|(_, v)| *v).collect();
    let (values, outliers_removed) = if config.trim_outliers {
        trim_outliers(&raw, config)
    } else {
        (raw.clone(), 0)
    };

    let mut avg = mean(&values)?;
    let mut std_dev = population_std_dev(&values).unwrap_or(0.0);
    let mut regime_shift = None;

    if config.detect_regime_change && raw.len() >= config.min_games_for_regime && std_dev > 0.0 {
        let change =
            detect_regime_change(&raw, avg, std_dev, config.cusum_allowance, config.cusum_threshold);
        if let Some(index) = change {
            let post = &raw[index..];
            if let (true, Some(post_avg), Some(post_sd)) =
                (post.len() >= 2, mean(post), population_std_dev(post))
            {
                let w = config.post_regime_weight;
                avg = w * post_avg + (1.0 - w) * avg;
                std_dev = w * post_sd + (1.0 - w) * std_dev;
                regime_shift = Some(RegimeShift {
                    changepoint_week: chronological[index].0,
                    post_shift_games: post.len(),
                    post_shift_avg: post_avg,
                    post_shift_std_dev: post_sd,
                });
            }
        }
    }

    Some(RobustSeason { avg, std_dev, values, outliers_removed, regime_shift })
}
