//! Exponentially weighted smoothing of a player's game history
//!
//! Record-level functions order games by week (oldest first) and skip null values before
//! delegating to the value-level helpers, which expect chronological input.

use game_stats::stats::{mean, population_std_dev};
use game_stats::{GameParticipationRecord, Position, StatField};
use serde::{Deserialize, Serialize};

use crate::config::SmoothingConfig;

/// Direction of recent form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// EWMA change per game
    pub slope: f64,
    /// Slope relative to the mean EWMA
    pub slope_percent: f64,
}

impl Trend {
    pub const STABLE: Trend = Trend { direction: TrendDirection::Stable, slope: 0.0, slope_percent: 0.0 };
}

/// Result of [`compute_adaptive_ewma`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveEwma {
    pub ewma: f64,
    /// Alpha actually applied
    pub alpha: f64,
    /// CV of the most recent games, when enough were available to adapt
    pub recent_cv: Option<f64>,
}

/// Smoothed components behind an expected value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedProjection {
    pub estimate: f64,
    pub season_avg: f64,
    pub ewma: f64,
    pub alpha: f64,
    pub trend: Trend,
}

/// Observed values of `stat`, oldest game first
pub fn chronological_values<'a, I>(games: I, stat: StatField) -> Vec<f64>
where
    I: IntoIterator<Item = &'a GameParticipationRecord>,
{
    let mut ordered: Vec<&GameParticipationRecord> = games.into_iter().collect();
    ordered.sort_by_key(|g| g.week);
    ordered.iter().filter_map(|g| g.value(stat)).collect()
}

/// Running EWMA sequence over chronological values, seeded with the first value
pub fn ewma_sequence(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut sequence = Vec::with_capacity(values.len());
    let mut iter = values.iter();
    if let Some(first) = iter.next() {
        let mut ewma = *first;
        sequence.push(ewma);
        for v in iter {
            ewma = alpha * v + (1.0 - alpha) * ewma;
            sequence.push(ewma);
        }
    }
    sequence
}

/// Final EWMA over chronological values; 0.0 when empty
pub fn ewma(values: &[f64], alpha: f64) -> f64 {
    ewma_sequence(values, alpha).last().copied().unwrap_or(0.0)
}

pub fn compute_ewma<'a, I>(games: I, stat: StatField, alpha: f64) -> f64
where
    I: IntoIterator<Item = &'a GameParticipationRecord>,
{
    ewma(&chronological_values(games, stat), alpha)
}

/// EWMA whose alpha rises with the volatility of the most recent games.
///
/// With fewer than `adaptive_min_games` values the base alpha is used unchanged.
/// Otherwise `alpha = clamp(base + cv * cv_sensitivity, min_alpha, max_alpha)` where `cv`
/// is taken over the last `adaptive_min_games` values (zero when their mean is not positive).
/// Inverted bounds do not panic; `max_alpha` wins.
pub fn adaptive_ewma(values: &[f64], base_alpha: f64, config: &SmoothingConfig) -> AdaptiveEwma {
    let window = config.adaptive_min_games.max(1);
    if values.len() < window {
        return AdaptiveEwma { ewma: ewma(values, base_alpha), alpha: base_alpha, recent_cv: None };
    }

    let recent = &values[values.len() - window..];
    let cv = match (mean(recent), population_std_dev(recent)) {
        (Some(m), Some(sd)) if m > 0.0 => sd / m,
        _ => 0.0,
    };
    let alpha = (base_alpha + cv * config.cv_sensitivity).max(config.min_alpha).min(config.max_alpha);

    AdaptiveEwma { ewma: ewma(values, alpha), alpha, recent_cv: Some(cv) }
}

pub fn compute_adaptive_ewma<'a, I>(
    games: I,
    stat: StatField,
    base_alpha: f64,
    config: &SmoothingConfig,
) -> AdaptiveEwma
where
    I: IntoIterator<Item = &'a GameParticipationRecord>,
{
    adaptive_ewma(&chronological_values(games, stat), base_alpha, config)
}

/// Classify the slope of the EWMA sequence over chronological values
pub fn trend(values: &[f64], alpha: f64, config: &SmoothingConfig) -> Trend {
    if values.len() < config.adaptive_min_games.max(2) {
        return Trend::STABLE;
    }

    let sequence = ewma_sequence(values, alpha);
    let n = sequence.len();
    let slope = (sequence[n - 1] - sequence[0]) / (n - 1) as f64;
    let slope_percent = match mean(&sequence) {
        Some(avg) if avg > 0.0 => slope / avg,
        _ => 0.0,
    };

    let direction = if slope_percent > config.trend_threshold {
        TrendDirection::Improving
    } else if slope_percent < -config.trend_threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Trend { direction, slope, slope_percent }
}

pub fn compute_trend<'a, I>(games: I, stat: StatField, alpha: f64, config: &SmoothingConfig) -> Trend
where
    I: IntoIterator<Item = &'a GameParticipationRecord>,
{
    trend(&chronological_values(games, stat), alpha, config)
}

/// Base smoothing alpha for a position
pub fn position_alpha(position: &Position, config: &SmoothingConfig) -> f64 {
    config.alpha_for(position)
}

/// Blend the season mean with an adaptive EWMA of recent games.
///
/// `estimate = season_weight * season_avg + recent_weight * ewma`. An empty season set
/// yields an all-zero, stable projection.
pub fn compose_projection<'a, S, R>(
    season_games: S,
    recent_games: R,
    stat: StatField,
    position: &Position,
    config: &SmoothingConfig,
    season_weight: f64,
    recent_weight: f64,
) -> SmoothedProjection
where
    S: IntoIterator<Item = &'a GameParticipationRecord>,
    R: IntoIterator<Item = &'a GameParticipationRecord>,
{
    let season_values = chronological_values(season_games, stat);
    let Some(season_avg) = mean(&season_values) else {
        return SmoothedProjection {
            estimate: 0.0,
            season_avg: 0.0,
            ewma: 0.0,
            alpha: position_alpha(position, config),
            trend: Trend::STABLE,
        };
    };

    let base_alpha = position_alpha(position, config);
    let recent_values = chronological_values(recent_games, stat);
    let adaptive = adaptive_ewma(&recent_values, base_alpha, config);

    SmoothedProjection {
        estimate: season_weight * season_avg + recent_weight * adaptive.ewma,
        season_avg,
        ewma: adaptive.ewma,
        alpha: adaptive.alpha,
        trend: trend(&recent_values, base_alpha, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn game(week: u32, value: Option<f64>) -> GameParticipationRecord {
        let mut record = GameParticipationRecord {
            player_id: "p1".into(),
            team_id: "KC".into(),
            opponent_id: None,
            game_id: format!("g{week}"),
            season: 2025,
            week,
            position: Position::WR,
            stats: Default::default(),
        };
        record.stats.insert(StatField::ReceivingYards.key().into(), value);
        record
    }

    fn games(values: &[(u32, Option<f64>)]) -> Vec<GameParticipationRecord> {
        values.iter().map(|(w, v)| game(*w, *v)).collect()
    }

    #[test]
    fn ewma_orders_by_week_and_skips_nulls() {
        let history = games(&[(3, Some(220.0)), (1, Some(200.0)), (2, None), (4, Some(180.0))]);
        let value = compute_ewma(&history, StatField::ReceivingYards, 0.5);
        // 200 -> 210 -> 195
        assert!((value - 195.0).abs() < 1e-12);
    }

    #[test]
    fn ewma_starts_from_first_observed_value() {
        let history = games(&[(1, None), (2, Some(50.0)), (3, Some(70.0))]);
        assert_eq!(compute_ewma(&history, StatField::ReceivingYards, 0.0), 50.0);
        assert_eq!(compute_ewma(&games(&[]), StatField::ReceivingYards, 0.3), 0.0);
    }

    #[test]
    fn short_history_keeps_base_alpha() {
        let config = SmoothingConfig::default();
        let one = adaptive_ewma(&[42.0], 0.35, &config);
        assert_eq!(one.ewma, 42.0);
        assert_eq!(one.alpha, 0.35);
        assert_eq!(one.recent_cv, None);

        let two = adaptive_ewma(&[10.0, 20.0], 0.5, &config);
        assert_eq!(two.ewma, 15.0);
    }

    #[test]
    fn volatile_recent_games_raise_alpha() {
        let config = SmoothingConfig::default();
        let steady = adaptive_ewma(&[5.0, 50.0, 50.0, 50.0], 0.3, &config);
        assert_eq!(steady.recent_cv, Some(0.0));
        assert!((steady.alpha - 0.3).abs() < 1e-12);

        let volatile = adaptive_ewma(&[10.0, 2.0, 30.0, 4.0], 0.4, &config);
        assert!(volatile.alpha > 0.4);
        assert!(volatile.alpha <= config.max_alpha);
    }

    #[test]
    fn alpha_is_clamped() {
        let config = SmoothingConfig::default();
        assert_eq!(adaptive_ewma(&[1.0, 1.0, 1.0], 0.1, &config).alpha, 0.2);
        assert_eq!(adaptive_ewma(&[0.1, 9.0, 0.1], 0.5, &config).alpha, 0.6);
        // Non-positive mean counts as zero variability
        assert_eq!(adaptive_ewma(&[0.0, 0.0, 0.0], 0.3, &config).alpha, 0.3);
    }

    #[test]
    fn inverted_alpha_bounds_do_not_panic() {
        let config = SmoothingConfig { min_alpha: 0.6, max_alpha: 0.2, ..SmoothingConfig::default() };
        let smoothed = adaptive_ewma(&[10.0, 2.0, 30.0, 4.0], 0.4, &config);
        assert_eq!(smoothed.alpha, 0.2);
        assert!(smoothed.ewma.is_finite());
    }

    #[test]
    fn trend_classification() {
        let config = SmoothingConfig::default();
        assert_eq!(trend(&[10.0, 20.0, 30.0, 40.0], 0.5, &config).direction, TrendDirection::Improving);
        assert_eq!(trend(&[40.0, 30.0, 20.0, 10.0], 0.5, &config).direction, TrendDirection::Declining);
        assert_eq!(trend(&[20.0, 20.5, 20.0, 20.2], 0.5, &config).direction, TrendDirection::Stable);
        assert_eq!(trend(&[10.0, 90.0], 0.5, &config), Trend::STABLE);
    }

    #[test]
    fn trend_slope_matches_sequence() {
        let config = SmoothingConfig::default();
        // sequence 10, 15, 20
        let t = trend(&[10.0, 20.0, 25.0], 0.5, &config);
        assert!((t.slope - 5.0).abs() < 1e-12);
        assert!((t.slope_percent - 5.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn position_alphas() {
        let config = SmoothingConfig::default();
        assert_eq!(position_alpha(&Position::QB, &config), 0.25);
        assert_eq!(position_alpha(&Position::RB, &config), 0.35);
        assert_eq!(position_alpha(&Position::WR, &config), 0.40);
        assert_eq!(position_alpha(&Position::TE, &config), 0.30);
        assert_eq!(position_alpha(&Position::Other("K".into()), &config), 0.30);
    }

    #[test]
    fn compose_blends_season_and_ewma() {
        let config = SmoothingConfig::default();
        let season = games(&[(1, Some(60.0)), (2, Some(80.0)), (3, Some(100.0))]);
        let recent = &season[1..];
        let p = compose_projection(
            &season,
            recent,
            StatField::ReceivingYards,
            &Position::WR,
            &config,
            0.4,
            0.6,
        );
        assert_eq!(p.season_avg, 80.0);
        // two recent games: base alpha 0.4 -> 80 + 0.4 * 20
        assert!((p.ewma - 88.0).abs() < 1e-12);
        assert!((p.estimate - (0.4 * 80.0 + 0.6 * 88.0)).abs() < 1e-12);
        assert_eq!(p.trend, Trend::STABLE);
    }

    #[test]
    fn compose_with_no_season_values_is_zero() {
        let config = SmoothingConfig::default();
        let empty = games(&[(1, None)]);
        let p = compose_projection(&empty, &empty, StatField::ReceivingYards, &Position::QB, &config, 0.4, 0.6);
        assert_eq!(p.estimate, 0.0);
    }

    proptest! {
        #[test]
        fn alpha_one_tracks_last_value(values in proptest::collection::vec(-500.0f64..500.0, 1..20)) {
            prop_assert_eq!(ewma(&values, 1.0), *values.last().unwrap());
        }

        #[test]
        fn alpha_zero_keeps_first_value(values in proptest::collection::vec(-500.0f64..500.0, 1..20)) {
            prop_assert_eq!(ewma(&values, 0.0), values[0]);
        }

        #[test]
        fn ewma_stays_within_observed_range(
            values in proptest::collection::vec(0.0f64..300.0, 1..20),
            alpha in 0.0f64..=1.0,
        ) {
            let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let e = ewma(&values, alpha);
            prop_assert!(e >= lo - 1e-9 && e <= hi + 1e-9);
        }
    }
}
