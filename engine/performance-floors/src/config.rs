//! Projection engine configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed `FLOORS_` with `__` separating nested keys
//! (e.g. `FLOORS_PROJECTION__ROLLING_WINDOW_WEEKS=4`).

use feature_weights::TrainingConfig;
use game_stats::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{FloorsError, Result};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "FLOORS";

/// Season-average share of the expected value
pub const DEFAULT_SEASON_WEIGHT: f64 = 0.4;

/// Recent-form share of the expected value
pub const DEFAULT_RECENT_WEIGHT: f64 = 0.6;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorsConfig {
    pub projection: ProjectionConfig,
    pub smoothing: SmoothingConfig,
    pub confidence: ConfidenceConfig,
    pub robust: RobustConfig,
    pub interval: IntervalConfig,
    pub environment: EnvironmentConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// How recent form enters the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Plain mean of the rolling window
    #[default]
    RecentAverage,
    /// Adaptive EWMA over the rolling window
    Ewma,
}

/// Floor/ceiling calculator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Fewer valid season values than this yields no projection
    pub min_games_played: usize,

    /// Number of most recent games forming the recent-form window
    pub rolling_window_weeks: usize,

    /// Standard deviations between expected and floor/ceiling
    pub volatility_factor: f64,

    pub blend_mode: BlendMode,
    pub season_weight: f64,
    pub recent_weight: f64,

    /// Rolling window per position code, overriding `rolling_window_weeks`
    pub position_windows: BTreeMap<String, usize>,

    /// Volatility per position code, overriding `volatility_factor`
    pub position_volatility: BTreeMap<String, f64>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            min_games_played: 2,
            rolling_window_weeks: 3,
            volatility_factor: 0.75,
            blend_mode: BlendMode::RecentAverage,
            season_weight: DEFAULT_SEASON_WEIGHT,
            recent_weight: DEFAULT_RECENT_WEIGHT,
            position_windows: BTreeMap::new(),
            position_volatility: BTreeMap::new(),
        }
    }
}

impl ProjectionConfig {
    /// Defaults plus the per-position windows and volatilities tuned for each position
    pub fn with_position_overrides() -> Self {
        let windows = [("QB", 5), ("RB", 3), ("WR", 4), ("TE", 4)];
        let volatility = [("QB", 0.6), ("RB", 0.8), ("WR", 0.9), ("TE", 0.75)];
        Self {
            position_windows: windows.iter().map(|(p, w)| (p.to_string(), *w)).collect(),
            position_volatility: volatility.iter().map(|(p, v)| (p.to_string(), *v)).collect(),
            ..Self::default()
        }
    }

    pub fn window_for(&self, position: &Position) -> usize {
        by_position(&self.position_windows, position).unwrap_or(self.rolling_window_weeks)
    }

    pub fn volatility_for(&self, position: &Position) -> f64 {
        by_position(&self.position_volatility, position).unwrap_or(self.volatility_factor)
    }
}

/// Position-keyed override; keys match position codes case-insensitively
fn by_position<V: Copy>(map: &BTreeMap<String, V>, position: &Position) -> Option<V> {
    let code = position.code();
    map.get(code)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(code)).map(|(_, v)| v))
        .copied()
}

/// Temporal smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Base EWMA alpha per position code
    pub position_alpha: BTreeMap<String, f64>,

    /// Alpha for positions missing from `position_alpha`
    pub default_alpha: f64,

    pub min_alpha: f64,
    pub max_alpha: f64,

    /// How strongly recent CV raises alpha
    pub cv_sensitivity: f64,

    /// Games needed before alpha adapts and trends are classified
    pub adaptive_min_games: usize,

    /// |slope_percent| above this is a trend
    pub trend_threshold: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        let alphas = [("QB", 0.25), ("RB", 0.35), ("WR", 0.40), ("TE", 0.30)];
        Self {
            position_alpha: alphas.iter().map(|(p, a)| (p.to_string(), *a)).collect(),
            default_alpha: 0.30,
            min_alpha: 0.2,
            max_alpha: 0.6,
            cv_sensitivity: 0.3,
            adaptive_min_games: 3,
            trend_threshold: 0.05,
        }
    }
}

impl SmoothingConfig {
    pub fn alpha_for(&self, position: &Position) -> f64 {
        by_position(&self.position_alpha, position).unwrap_or(self.default_alpha)
    }
}

/// Confidence score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Games at which the sample-size component saturates
    pub saturation_games: usize,
    pub sample_weight: f64,
    pub consistency_weight: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self { saturation_games: 10, sample_weight: 0.4, consistency_weight: 0.6 }
    }
}

/// Outlier trimming and regime-change handling of season values. Both are off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustConfig {
    /// Drop season values outside the IQR fences before averaging
    pub trim_outliers: bool,
    /// Fences sit this many IQRs beyond the quartiles
    pub iqr_multiplier: f64,
    pub min_games_for_trim: usize,

    /// Reweight toward games after a CUSUM-detected shift
    pub detect_regime_change: bool,
    /// CUSUM slack `k`, in standard deviations
    pub cusum_allowance: f64,
    /// CUSUM decision threshold `h`
    pub cusum_threshold: f64,
    pub min_games_for_regime: usize,
    /// Share of post-shift statistics in the season average and deviation
    pub post_regime_weight: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            trim_outliers: false,
            iqr_multiplier: 1.5,
            min_games_for_trim: 4,
            detect_regime_change: false,
            cusum_allowance: 0.5,
            cusum_threshold: 4.0,
            min_games_for_regime: 5,
            post_regime_weight: 0.8,
        }
    }
}

/// How the floor and ceiling are placed around the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// `expected ± std_dev * volatility`
    #[default]
    Spread,
    /// Percentiles of bootstrap-resampled season means
    Bootstrap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub method: IntervalMethod,
    pub bootstrap_samples: usize,
    /// Central share of the bootstrap distribution between floor and ceiling
    pub coverage: f64,
    pub seed: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self { method: IntervalMethod::Spread, bootstrap_samples: 500, coverage: 0.80, seed: 42 }
    }
}

/// Venue, weather and home-field multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub turf_modifier: f64,
    pub grass_modifier: f64,
    pub dome_modifier: f64,

    /// Wind strictly above this (mph) applies `wind_modifier`
    pub high_wind_mph: f64,
    pub wind_modifier: f64,
    pub precipitation_modifier: f64,
    /// Temperature strictly below this (°F) applies `cold_modifier`
    pub cold_temperature_f: f64,
    pub cold_modifier: f64,

    pub home_modifier: f64,
    pub away_modifier: f64,

    /// Replace the fixed turf/dome/home modifiers with learned ones when weights exist
    pub use_learned_weights: bool,
    /// Importance that maps to a neutral 1.0 modifier
    pub learned_baseline: f64,
    pub learned_scale: f64,
    pub learned_min: f64,
    pub learned_max: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            turf_modifier: 1.03,
            grass_modifier: 1.00,
            dome_modifier: 1.02,
            high_wind_mph: 15.0,
            wind_modifier: 0.95,
            precipitation_modifier: 0.92,
            cold_temperature_f: 25.0,
            cold_modifier: 0.94,
            home_modifier: 1.02,
            away_modifier: 0.98,
            use_learned_weights: true,
            learned_baseline: 0.25,
            learned_scale: 0.2,
            learned_min: 0.8,
            learned_max: 1.2,
        }
    }
}

/// Logging configuration for the binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl FloorsConfig {
    /// Load defaults, then `path` if given and present, then `FLOORS_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load), reading `FLOORS_*` overrides from `env` instead of the
    /// process environment when given
    pub fn load_from(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration from file: {:?}", path);
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML file on its own, without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw).map_err(|e| FloorsError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.projection;
        if p.min_games_played < 1 {
            return Err(FloorsError::config("min_games_played must be at least 1"));
        }
        if p.rolling_window_weeks < 1 || p.position_windows.values().any(|w| *w < 1) {
            return Err(FloorsError::config("rolling windows must be at least 1 week"));
        }
        if p.volatility_factor < 0.0 || p.position_volatility.values().any(|v| *v < 0.0) {
            return Err(FloorsError::config("volatility factors must not be negative"));
        }
        if p.season_weight < 0.0
            || p.recent_weight < 0.0
            || (p.season_weight + p.recent_weight - 1.0).abs() > 1e-9
        {
            return Err(FloorsError::config(format!(
                "blend weights must be non-negative and sum to 1, got {} + {}",
                p.season_weight, p.recent_weight
            )));
        }

        let s = &self.smoothing;
        let in_unit = |a: f64| a > 0.0 && a <= 1.0;
        if !in_unit(s.default_alpha) || !s.position_alpha.values().all(|a| in_unit(*a)) {
            return Err(FloorsError::config("smoothing alphas must be in (0, 1]"));
        }
        if !(in_unit(s.min_alpha) && in_unit(s.max_alpha) && s.min_alpha <= s.max_alpha) {
            return Err(FloorsError::config("alpha bounds must satisfy 0 < min <= max <= 1"));
        }

        let c = &self.confidence;
        if c.saturation_games == 0 {
            return Err(FloorsError::config("saturation_games must be at least 1"));
        }
        if c.sample_weight < 0.0 || c.consistency_weight < 0.0 {
            return Err(FloorsError::config("confidence weights must not be negative"));
        }

        let r = &self.robust;
        if !(r.iqr_multiplier >= 0.0) {
            return Err(FloorsError::config("iqr_multiplier must not be negative"));
        }
        if !(r.cusum_allowance >= 0.0 && r.cusum_threshold > 0.0) {
            return Err(FloorsError::config("CUSUM allowance must be >= 0 and threshold > 0"));
        }
        if !(0.0..=1.0).contains(&r.post_regime_weight) {
            return Err(FloorsError::config("post_regime_weight must be in [0, 1]"));
        }

        let i = &self.interval;
        if i.bootstrap_samples == 0 {
            return Err(FloorsError::config("bootstrap_samples must be at least 1"));
        }
        if !(i.coverage > 0.0 && i.coverage < 1.0) {
            return Err(FloorsError::config("interval coverage must be in (0, 1)"));
        }

        let e = &self.environment;
        if e.learned_min > e.learned_max {
            return Err(FloorsError::config("learned_min must not exceed learned_max"));
        }

        self.training.validate()?;
        Ok(())
    }
}
