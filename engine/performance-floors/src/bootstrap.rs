//! Bootstrap prediction intervals over season values

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::IntervalConfig;

/// Percentile bounds of a bootstrap distribution of means
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    pub samples: usize,
    pub coverage: f64,
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
}

impl BootstrapInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Means of `samples` resamples of `values` drawn with replacement, sorted ascending.
/// The same seed always gives the same distribution.
pub fn bootstrap_means(values: &[f64], samples: usize, seed: u64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut means: Vec<f64> = (0..samples)
        .map(|_| (0..n).map(|_| values[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();
    means.sort_by(f64::total_cmp);
    means
}

/// Linearly interpolated percentile of an ascending slice, `p` in `[0, 1]`
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    if p <= 0.0 {
        return sorted.first().copied();
    }
    if p >= 1.0 {
        return sorted.last().copied();
    }
    let position = p * last as f64;
    let lo = position.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = position - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Central `coverage` interval of bootstrapped means scaled by `multiplier`
pub fn prediction_interval(
    values: &[f64],
    config: &IntervalConfig,
    multiplier: f64,
) -> Option<BootstrapInterval> {
    let scaled: Vec<f64> = bootstrap_means(values, config.bootstrap_samples.max(1), config.seed)
        .into_iter()
        .map(|m| m * multiplier)
        .collect();
    let tail = (1.0 - config.coverage) / 2.0;
    Some(BootstrapInterval {
        samples: scaled.len(),
        coverage: config.coverage,
        lower: percentile(&scaled, tail)?,
        median: percentile(&scaled, 0.5)?,
        upper: percentile(&scaled, 1.0 - tail)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&sorted, 0.5), Some(30.0));
        assert_eq!(percentile(&sorted, 0.25), Some(20.0));
        assert_eq!(percentile(&sorted, 0.375), Some(25.0));
        assert_eq!(percentile(&sorted, 0.0), Some(10.0));
        assert_eq!(percentile(&sorted, 1.0), Some(50.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn resampling_is_seeded() {
        let values = [12.0, 18.0, 9.0, 22.0, 15.0];
        assert_eq!(bootstrap_means(&values, 200, 7), bootstrap_means(&values, 200, 7));
        assert_ne!(bootstrap_means(&values, 200, 7), bootstrap_means(&values, 200, 8));
    }

    #[test]
    fn means_stay_within_the_observed_range() {
        let values = [12.0, 18.0, 9.0, 22.0, 15.0];
        let means = bootstrap_means(&values, 500, 42);
        assert_eq!(means.len(), 500);
        assert!(means.windows(2).all(|w| w[0] <= w[1]));
        assert!(means.iter().all(|m| (9.0..=22.0).contains(m)));
    }

    #[test]
    fn interval_brackets_the_median_and_scales() {
        let values = [12.0, 18.0, 9.0, 22.0, 15.0];
        let config = IntervalConfig::default();
        let plain = prediction_interval(&values, &config, 1.0).unwrap();
        assert!(plain.lower <= plain.median && plain.median <= plain.upper);
        assert!(plain.width() > 0.0);
        // sample mean is 15.2
        assert!((plain.median - 15.2).abs() < 1.5);

        let boosted = prediction_interval(&values, &config, 1.1).unwrap();
        assert!((boosted.upper - plain.upper * 1.1).abs() < 1e-9);
    }

    #[test]
    fn constant_values_collapse_the_interval() {
        let interval = prediction_interval(&[7.0; 6], &IntervalConfig::default(), 1.0).unwrap();
        assert_eq!((interval.lower, interval.median, interval.upper), (7.0, 7.0, 7.0));
        assert!(prediction_interval(&[], &IntervalConfig::default(), 1.0).is_none());
    }
}
