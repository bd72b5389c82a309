//! Matchup multipliers: opponent defense, venue, weather and home field

use feature_weights::LearnedFeatureWeights;
use game_stats::stats::round_to;
use game_stats::{DefenseTable, GameWeather, SeasonData, Venue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::EnvironmentConfig;

/// Multipliers applied to a stat's expected value before the floor/ceiling spread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupAdjustment {
    pub opponent_factor: f64,
    pub environment_modifier: f64,
}

impl Default for MatchupAdjustment {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl MatchupAdjustment {
    pub const NEUTRAL: MatchupAdjustment =
        MatchupAdjustment { opponent_factor: 1.0, environment_modifier: 1.0 };

    pub fn multiplier(&self) -> f64 {
        self.opponent_factor * self.environment_modifier
    }
}

/// Combined environment multiplier and its parts, each rounded to two decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentModifier {
    pub modifier: f64,
    pub venue: f64,
    pub weather: f64,
    pub home: f64,
    pub details: Vec<String>,
}

impl Default for EnvironmentModifier {
    fn default() -> Self {
        Self { modifier: 1.0, venue: 1.0, weather: 1.0, home: 1.0, details: Vec::new() }
    }
}

impl EnvironmentModifier {
    /// Details joined for display
    pub fn summary(&self) -> String {
        if self.details.is_empty() {
            "standard conditions".to_string()
        } else {
            self.details.join(", ")
        }
    }
}

/// Learned replacements for the turf, dome and home modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedModifiers {
    pub turf: Option<f64>,
    pub dome: Option<f64>,
    pub home: Option<f64>,
}

impl LearnedModifiers {
    /// Map feature importances to multipliers:
    /// `clamp(1 + (importance - baseline) * scale, min, max)`.
    /// Inverted bounds do not panic; `learned_max` wins.
    pub fn from_weights(weights: &LearnedFeatureWeights, config: &EnvironmentConfig) -> Self {
        let map = |feature: &str| {
            weights.weight(feature).map(|importance| {
                (1.0 + (importance - config.learned_baseline) * config.learned_scale)
                    .max(config.learned_min)
                    .min(config.learned_max)
            })
        };
        Self { turf: map("is_turf"), dome: map("is_dome"), home: map("is_home") }
    }
}

/// Computes environment modifiers from venue, weather and side
#[derive(Debug, Clone)]
pub struct EnvironmentModel {
    config: EnvironmentConfig,
    learned: Option<LearnedModifiers>,
}

impl EnvironmentModel {
    /// `config` is expected to have passed [`FloorsConfig::validate`](crate::FloorsConfig::validate)
    pub fn new(config: EnvironmentConfig) -> Self {
        Self { config, learned: None }
    }

    /// Use learned turf/dome/home modifiers when enabled in configuration
    pub fn with_learned_weights(mut self, weights: &LearnedFeatureWeights) -> Self {
        if self.config.use_learned_weights {
            let learned = LearnedModifiers::from_weights(weights, &self.config);
            debug!(?learned, "using learned environment modifiers");
            self.learned = Some(learned);
        }
        self
    }

    pub fn learned(&self) -> Option<&LearnedModifiers> {
        self.learned.as_ref()
    }

    pub fn modifier(
        &self,
        venue: Option<&Venue>,
        weather: Option<&GameWeather>,
        is_home: bool,
    ) -> EnvironmentModifier {
        let cfg = &self.config;
        let learned = self.learned.unwrap_or(LearnedModifiers { turf: None, dome: None, home: None });
        let mut details = Vec::new();

        let home = if is_home {
            details.push("home advantage".to_string());
            learned.home.unwrap_or(cfg.home_modifier)
        } else {
            details.push("away game".to_string());
            cfg.away_modifier
        };

        let mut venue_mod = 1.0;
        if let Some(venue) = venue {
            if venue.is_turf() {
                venue_mod *= learned.turf.unwrap_or(cfg.turf_modifier);
                details.push(format!("{} (turf)", venue.display_name()));
            } else if venue.is_grass() {
                venue_mod *= cfg.grass_modifier;
            }
            if venue.is_dome() {
                venue_mod *= learned.dome.unwrap_or(cfg.dome_modifier);
                details.push("dome".to_string());
            }
        }

        let mut weather_mod = 1.0;
        if let Some(weather) = weather {
            if let Some(wind) = weather.wind_speed.filter(|w| *w > cfg.high_wind_mph) {
                weather_mod *= cfg.wind_modifier;
                details.push(format!("high wind ({wind}mph)"));
            }
            if let Some(conditions) = weather.conditions.as_deref() {
                let lowered = conditions.to_ascii_lowercase();
                if lowered.contains("rain") || lowered.contains("snow") {
                    weather_mod *= cfg.precipitation_modifier;
                    details.push(lowered);
                }
            }
            if let Some(temp) = weather.temperature.filter(|t| *t < cfg.cold_temperature_f) {
                weather_mod *= cfg.cold_modifier;
                details.push(format!("cold ({temp}°F)"));
            }
        }

        EnvironmentModifier {
            modifier: round_to(venue_mod * weather_mod * home, 2),
            venue: round_to(venue_mod, 2),
            weather: round_to(weather_mod, 2),
            home: round_to(home, 2),
            details,
        }
    }
}

/// Defense tables over one dataset, memoized per (season, week cutoff).
///
/// Each table covers completed games strictly before the cutoff week. The cache borrows
/// the dataset it was built from, so it cannot outlive or be reused across datasets.
/// Tables are shared immutably; later inserts never touch a table already handed out.
#[derive(Debug)]
pub struct DefenseTableCache<'a> {
    data: &'a SeasonData,
    tables: RwLock<HashMap<(i32, u32), Arc<DefenseTable>>>,
}

impl<'a> DefenseTableCache<'a> {
    pub fn new(data: &'a SeasonData) -> Self {
        Self { data, tables: RwLock::new(HashMap::new()) }
    }

    pub fn data(&self) -> &'a SeasonData {
        self.data
    }

    pub fn get_or_build(&self, season: i32, before_week: u32) -> Arc<DefenseTable> {
        let key = (season, before_week);
        if let Some(table) = self.tables.read().get(&key) {
            return Arc::clone(table);
        }

        let games = self.data.completed_games_before(season, before_week);
        let table = Arc::new(DefenseTable::build(games.iter().copied(), &self.data.team_defense));
        debug!(
            season,
            before_week,
            records = table.record_count(),
            league_avg = table.league_avg(),
            "built defense table"
        );

        let mut tables = self.tables.write();
        Arc::clone(tables.entry(key).or_insert(table))
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}
