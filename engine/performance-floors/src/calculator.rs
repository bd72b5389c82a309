//! Floor / expected / ceiling calculation for a single stat

use game_stats::stats::{mean, population_std_dev, round_to};
use game_stats::{GameParticipationRecord, Position, StatField};
use tracing::debug;

use crate::bootstrap::prediction_interval;
use crate::config::{
    BlendMode, ConfidenceConfig, IntervalConfig, IntervalMethod, ProjectionConfig, RobustConfig,
    SmoothingConfig,
};
use crate::models::{Projection, RobustSummary, SkipReason, SmoothingSummary};
use crate::modifiers::MatchupAdjustment;
use crate::robust::robust_season;
use crate::smoothing::compose_projection;

/// Stateless calculator; the same inputs always give the same projection
#[derive(Debug, Clone, Default)]
pub struct FloorCeilingCalculator {
    projection: ProjectionConfig,
    smoothing: SmoothingConfig,
    confidence: ConfidenceConfig,
    robust: RobustConfig,
    interval: IntervalConfig,
}

impl FloorCeilingCalculator {
    /// Sections are expected to have passed [`FloorsConfig::validate`](crate::FloorsConfig::validate).
    /// Out-of-range values skew results but never panic.
    pub fn new(
        projection: ProjectionConfig,
        smoothing: SmoothingConfig,
        confidence: ConfidenceConfig,
    ) -> Self {
        Self {
            projection,
            smoothing,
            confidence,
            robust: RobustConfig::default(),
            interval: IntervalConfig::default(),
        }
    }

    /// Enable outlier trimming and regime-change reweighting as configured
    pub fn with_robust(mut self, robust: RobustConfig) -> Self {
        self.robust = robust;
        self
    }

    pub fn with_interval(mut self, interval: IntervalConfig) -> Self {
        self.interval = interval;
        self
    }

    pub fn projection_config(&self) -> &ProjectionConfig {
        &self.projection
    }

    /// Project `stat` from `history`, the player's games before the target week.
    ///
    /// `expected = season_weight * season_avg + recent_weight * recent`, where `recent` is the
    /// rolling-window mean or its adaptive EWMA, then scaled by the matchup multipliers.
    /// The floor and ceiling sit `season_std_dev * volatility` either side, with the floor
    /// held at zero or above. With the bootstrap interval method they are instead the
    /// percentile bounds of resampled season means, widened to include the expected value.
    ///
    /// When enabled, IQR trimming and regime-change reweighting adjust the season average
    /// and deviation before any of this.
    pub fn try_project<'a, I>(
        &self,
        history: I,
        stat: StatField,
        position: &Position,
        adjustment: &MatchupAdjustment,
    ) -> Result<Projection, SkipReason>
    where
        I: IntoIterator<Item = &'a GameParticipationRecord>,
    {
        let mut games: Vec<&GameParticipationRecord> = history.into_iter().collect();
        games.sort_by(|a, b| b.week.cmp(&a.week));

        let season_values: Vec<f64> = games.iter().filter_map(|g| g.value(stat)).collect();
        let required = self.projection.min_games_played.max(1);
        if season_values.len() < required {
            return Err(SkipReason::InsufficientData { required, available: season_values.len() });
        }

        let window = self.projection.window_for(position);
        let recent_games = &games[..window.min(games.len())];
        let recent_values: Vec<f64> = recent_games.iter().filter_map(|g| g.value(stat)).collect();

        let Some(recent_avg) = mean(&recent_values) else {
            return Err(SkipReason::EmptyRecentWindow);
        };

        let chronological: Vec<(u32, f64)> =
            games.iter().rev().filter_map(|g| g.value(stat).map(|v| (g.week, v))).collect();
        let Some(season) = robust_season(&chronological, &self.robust) else {
            return Err(SkipReason::InsufficientData { required, available: 0 });
        };
        let (season_avg, std_dev) = (season.avg, season.std_dev);
        let robust = (self.robust.trim_outliers || self.robust.detect_regime_change).then(|| {
            if season.outliers_removed > 0 || season.regime_shift.is_some() {
                debug!(
                    %stat,
                    outliers_removed = season.outliers_removed,
                    regime_shift = ?season.regime_shift,
                    "season values adjusted"
                );
            }
            RobustSummary { outliers_removed: season.outliers_removed, regime_shift: season.regime_shift }
        });

        let season_weight = self.projection.season_weight;
        let recent_weight = self.projection.recent_weight;
        let (base, smoothing) = match self.projection.blend_mode {
            BlendMode::RecentAverage => (season_weight * season_avg + recent_weight * recent_avg, None),
            BlendMode::Ewma => {
                let smoothed = compose_projection(
                    games.iter().copied(),
                    recent_games.iter().copied(),
                    stat,
                    position,
                    &self.smoothing,
                    season_weight,
                    recent_weight,
                );
                let summary =
                    SmoothingSummary { ewma: smoothed.ewma, alpha: smoothed.alpha, trend: smoothed.trend };
                (season_weight * season_avg + recent_weight * smoothed.ewma, Some(summary))
            }
        };

        let multiplier = adjustment.multiplier();
        let expected = (base * multiplier).max(0.0);
        let interval = match self.interval.method {
            IntervalMethod::Spread => None,
            IntervalMethod::Bootstrap => prediction_interval(&season.values, &self.interval, multiplier),
        };
        let (floor, ceiling) = match &interval {
            Some(bounds) => (bounds.lower.min(expected).max(0.0), bounds.upper.max(expected)),
            None => {
                let spread = std_dev * self.projection.volatility_for(position);
                ((expected - spread).max(0.0), expected + spread)
            }
        };

        let decimals = if stat.is_count() { 0 } else { 1 };
        let interval = interval.map(|mut bounds| {
            bounds.lower = round_to(bounds.lower, decimals);
            bounds.median = round_to(bounds.median, decimals);
            bounds.upper = round_to(bounds.upper, decimals);
            bounds
        });

        Ok(Projection {
            stat,
            floor: round_to(floor, decimals),
            expected: round_to(expected, decimals),
            ceiling: round_to(ceiling, decimals),
            confidence: self.confidence_score(season_values.len(), &recent_values),
            games_used: season_values.len(),
            recent_avg: round_to(recent_avg, 1),
            season_avg: round_to(season_avg, 1),
            std_dev: round_to(std_dev, 1),
            opponent_factor: adjustment.opponent_factor,
            environment_modifier: adjustment.environment_modifier,
            smoothing,
            robust,
            interval,
        })
    }

    /// Like [`Self::try_project`], logging and discarding the skip reason
    pub fn project<'a, I>(
        &self,
        history: I,
        stat: StatField,
        position: &Position,
        adjustment: &MatchupAdjustment,
    ) -> Option<Projection>
    where
        I: IntoIterator<Item = &'a GameParticipationRecord>,
    {
        match self.try_project(history, stat, position, adjustment) {
            Ok(projection) => Some(projection),
            Err(reason) => {
                debug!(%stat, ?reason, "no projection");
                None
            }
        }
    }

    /// `sample_weight * min(games / saturation, 1) + consistency_weight * max(0, 1 - cv)`,
    /// with `cv` taken over the recent values (1 when their mean is not positive).
    pub fn confidence_score(&self, games: usize, recent_values: &[f64]) -> f64 {
        let cfg = &self.confidence;
        let sample = (games as f64 / cfg.saturation_games.max(1) as f64).min(1.0);
        let cv = match (mean(recent_values), population_std_dev(recent_values)) {
            (Some(m), Some(sd)) if m > 0.0 => sd / m,
            _ => 1.0,
        };
        let consistency = (1.0 - cv).max(0.0);
        round_to((cfg.sample_weight * sample + cfg.consistency_weight * consistency).clamp(0.0, 1.0), 2)
    }
}
