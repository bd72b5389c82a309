//! # Performance Floors
//!
//! Projects a player's likely statistical range (floor, expected, ceiling) for an upcoming
//! game.
//!
//! The expected value blends the season average with recent form (a rolling-window mean or
//! an adaptive EWMA), scaled by the opponent's defensive factor and an environment modifier
//! built from venue, weather and home field. The floor and ceiling sit a volatility-scaled
//! season standard deviation either side of it, or at bootstrap percentiles when configured.
//! Optional IQR trimming and CUSUM regime detection adjust the season statistics first.
//! Learned feature weights from the `feature-weights` crate can replace the fixed venue
//! and home-field modifiers, and [`FloorEngine::backtest`] scores ranges against
//! completed games.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use performance_floors::{FloorEngine, FloorsConfig};
//! # fn example(data: &game_stats::SeasonData) -> performance_floors::Result<()> {
//! let engine = FloorEngine::new(FloorsConfig::default());
//! let projection = engine.project_game(data, "2025-w5-KC-BUF")?;
//! for player in &projection.home.players {
//!     println!("{} {:?}", player.name, player.projections);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod bootstrap;
pub mod calculator;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod modifiers;
pub mod robust;
pub mod smoothing;

pub use backtest::{BacktestRecord, BacktestReport, CoverageSummary, RangeOutcome};
pub use bootstrap::{bootstrap_means, percentile, prediction_interval, BootstrapInterval};
pub use calculator::FloorCeilingCalculator;
pub use config::{
    BlendMode, ConfidenceConfig, EnvironmentConfig, FloorsConfig, IntervalConfig, IntervalMethod,
    LoggingConfig, ProjectionConfig, RobustConfig, SmoothingConfig,
};
pub use engine::FloorEngine;
pub use error::{FloorsError, Result};
pub use models::{
    ExcludedPlayer, FailedGame, GameProjection, PlayerProjection, Projection, RobustSummary,
    SkipReason, SkippedStat, SmoothingSummary, TeamProjection, WeekProjection,
};
pub use modifiers::{
    DefenseTableCache, EnvironmentModel, EnvironmentModifier, LearnedModifiers, MatchupAdjustment,
};
pub use robust::{detect_regime_change, robust_season, trim_outliers, IqrFences, RegimeShift};
pub use smoothing::{
    compose_projection, compute_adaptive_ewma, compute_ewma, compute_trend, position_alpha,
    AdaptiveEwma, SmoothedProjection, Trend, TrendDirection,
};

#[cfg(test)]
mod tests;
