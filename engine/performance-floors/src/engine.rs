//! Game and week projection over a season's data

use feature_weights::LearnedFeatureWeights;
use game_stats::{DefenseTable, GameInfo, GameParticipationRecord, GameStatus, Position, SeasonData};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::calculator::FloorCeilingCalculator;
use crate::config::FloorsConfig;
use crate::error::{FloorsError, Result};
use crate::models::{
    ExcludedPlayer, FailedGame, GameProjection, PlayerProjection, SkippedStat, TeamProjection,
    WeekProjection,
};
use crate::modifiers::{DefenseTableCache, EnvironmentModel, EnvironmentModifier, MatchupAdjustment};

/// Projects every skill-position player in a game from their history before that week
pub struct FloorEngine {
    config: FloorsConfig,
    calculator: FloorCeilingCalculator,
    environment: EnvironmentModel,
}

/// One player's stat lines from completed games before the target week
struct PlayerHistory<'a> {
    player_id: &'a str,
    position: Position,
    games: Vec<&'a GameParticipationRecord>,
}

/// Inputs shared by every player on one side of a game
struct Side<'a> {
    game: &'a GameInfo,
    team_id: &'a str,
    opponent_id: &'a str,
    is_home: bool,
}

impl FloorEngine {
    pub fn new(config: FloorsConfig) -> Self {
        let calculator = FloorCeilingCalculator::new(
            config.projection.clone(),
            config.smoothing.clone(),
            config.confidence.clone(),
        )
        .with_robust(config.robust.clone())
        .with_interval(config.interval.clone());
        let environment = EnvironmentModel::new(config.environment.clone());
        Self { config, calculator, environment }
    }

    /// Replace fixed turf/dome/home modifiers with ones derived from learned importances
    pub fn with_learned_weights(mut self, weights: &LearnedFeatureWeights) -> Self {
        if weights.low_confidence {
            warn!(
                samples = weights.training_samples,
                "learned weights were trained on a small sample"
            );
        }
        self.environment = self.environment.with_learned_weights(weights);
        self
    }

    pub fn config(&self) -> &FloorsConfig {
        &self.config
    }

    pub fn calculator(&self) -> &FloorCeilingCalculator {
        &self.calculator
    }

    /// Project both teams in `game_id`
    pub fn project_game(&self, data: &SeasonData, game_id: &str) -> Result<GameProjection> {
        self.project_game_with(&DefenseTableCache::new(data), game_id)
    }

    /// Project one game, reusing defense tables already built for `defense`'s dataset
    pub(crate) fn project_game_with(
        &self,
        defense: &DefenseTableCache<'_>,
        game_id: &str,
    ) -> Result<GameProjection> {
        let data = defense.data();
        let game = data
            .game(game_id)
            .ok_or_else(|| FloorsError::GameNotFound(game_id.to_string()))?;
        if !game.has_both_teams() {
            return Err(FloorsError::invalid_game(game_id, "home or away team is missing"));
        }
        if game.home_team_id == game.away_team_id {
            return Err(FloorsError::invalid_game(game_id, "home and away team are the same"));
        }

        info!(
            game_id,
            season = game.season,
            week = game.week,
            home = %game.home_team_id,
            away = %game.away_team_id,
            "projecting game"
        );

        let table = defense.get_or_build(game.season, game.week);
        let venue = game.stadium_id.as_deref().and_then(|id| data.venue(id));
        let weather = data.weather_for(&game.game_id);

        let home_side = Side {
            game,
            team_id: &game.home_team_id,
            opponent_id: &game.away_team_id,
            is_home: true,
        };
        let away_side = Side {
            game,
            team_id: &game.away_team_id,
            opponent_id: &game.home_team_id,
            is_home: false,
        };

        let home_env = self.environment.modifier(venue, weather, true);
        let away_env = self.environment.modifier(venue, weather, false);

        Ok(GameProjection {
            game_id: game.game_id.clone(),
            season: game.season,
            week: game.week,
            venue: venue.map(|v| v.display_name().to_string()),
            home: self.project_team(data, &home_side, &table, home_env),
            away: self.project_team(data, &away_side, &table, away_env),
        })
    }

    /// Project every scheduled game of `season` week `week`.
    ///
    /// A game that fails is recorded and does not stop the rest of the week.
    pub fn project_week(&self, data: &SeasonData, season: i32, week: u32) -> WeekProjection {
        let defense = DefenseTableCache::new(data);
        let mut games = Vec::new();
        let mut failed = Vec::new();

        let scheduled = data
            .games
            .iter()
            .filter(|g| g.season == season && g.week == week && g.status == GameStatus::Scheduled);

        for game in scheduled {
            match self.project_game_with(&defense, &game.game_id) {
                Ok(projection) => games.push(projection),
                Err(err) => {
                    warn!(game_id = %game.game_id, error = %err, "game projection failed");
                    failed.push(FailedGame { game_id: game.game_id.clone(), error: err.to_string() });
                }
            }
        }

        info!(season, week, projected = games.len(), failed = failed.len(), "week projected");
        WeekProjection { season, week, games, failed }
    }

    fn project_team(
        &self,
        data: &SeasonData,
        side: &Side<'_>,
        defense: &DefenseTable,
        environment: EnvironmentModifier,
    ) -> TeamProjection {
        let game = side.game;
        let opponent_factor = defense.factor_for(side.opponent_id);
        let adjustment = MatchupAdjustment {
            opponent_factor,
            environment_modifier: environment.modifier,
        };

        let mut excluded = Vec::new();
        let mut eligible = Vec::new();
        for history in team_histories(data, game, side.team_id) {
            match data.injury(history.player_id, game.season, game.week) {
                Some(report) if report.status.excludes_player() => {
                    info!(
                        player_id = history.player_id,
                        status = ?report.status,
                        "excluding injured player"
                    );
                    excluded.push(ExcludedPlayer {
                        player_id: history.player_id.to_string(),
                        name: display_name(data, history.player_id),
                        position: history.position.clone(),
                        status: report.status,
                        injury_type: report.injury_type.clone(),
                    });
                }
                report => eligible.push((history, report.map(|r| r.status))),
            }
        }

        let mut players: Vec<PlayerProjection> = eligible
            .par_iter()
            .filter_map(|(history, injury_status)| {
                let mut projections = Vec::new();
                let mut skipped = Vec::new();
                for &stat in history.position.stat_categories() {
                    match self.calculator.try_project(
                        history.games.iter().copied(),
                        stat,
                        &history.position,
                        &adjustment,
                    ) {
                        Ok(projection) => projections.push(projection),
                        Err(reason) => skipped.push(SkippedStat { stat, reason }),
                    }
                }

                if projections.is_empty() {
                    debug!(player_id = history.player_id, games = history.games.len(), "no projectable stats");
                    return None;
                }
                if injury_status.is_some() {
                    debug!(player_id = history.player_id, status = ?injury_status, "projecting with injury designation");
                }

                Some(PlayerProjection {
                    player_id: history.player_id.to_string(),
                    name: display_name(data, history.player_id),
                    position: history.position.clone(),
                    team_id: side.team_id.to_string(),
                    games_played: distinct_games(&history.games),
                    injury_status: *injury_status,
                    projections,
                    skipped,
                })
            })
            .collect();

        players.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.player_id.cmp(&b.player_id)));

        debug!(
            team = side.team_id,
            players = players.len(),
            excluded = excluded.len(),
            opponent_factor,
            environment = environment.modifier,
            "team projected"
        );

        TeamProjection {
            team_id: side.team_id.to_string(),
            opponent_id: side.opponent_id.to_string(),
            is_home: side.is_home,
            opponent_factor,
            environment,
            players,
            excluded,
        }
    }
}

/// Skill-position players who appeared for `team_id` in completed games before `game`,
/// with all of their stat lines from those games.
fn team_histories<'a>(data: &'a SeasonData, game: &GameInfo, team_id: &str) -> Vec<PlayerHistory<'a>> {
    let prior: HashSet<&str> = data
        .completed_games_before(game.season, game.week)
        .into_iter()
        .map(|g| g.game_id.as_str())
        .collect();

    let in_prior = |r: &&GameParticipationRecord| r.season == game.season && prior.contains(r.game_id.as_str());

    let roster: HashSet<&str> = data
        .player_stats
        .iter()
        .filter(in_prior)
        .filter(|r| r.team_id == team_id)
        .map(|r| r.player_id.as_str())
        .collect();

    let mut by_player: BTreeMap<&str, Vec<&GameParticipationRecord>> = BTreeMap::new();
    for record in data.player_stats.iter().filter(in_prior) {
        if roster.contains(record.player_id.as_str()) {
            by_player.entry(record.player_id.as_str()).or_default().push(record);
        }
    }

    by_player
        .into_iter()
        .filter_map(|(player_id, games)| {
            let position = player_position(data, player_id, &games)?;
            position.is_skill().then_some(PlayerHistory { player_id, position, games })
        })
        .collect()
}

/// Profile position, falling back to the most recent stat line's position
fn player_position(
    data: &SeasonData,
    player_id: &str,
    games: &[&GameParticipationRecord],
) -> Option<Position> {
    if let Some(profile) = data.player(player_id) {
        return Some(profile.position.clone());
    }
    games.iter().max_by_key(|g| g.week).map(|g| g.position.clone())
}

fn display_name(data: &SeasonData, player_id: &str) -> String {
    data.player(player_id)
        .map(|p| p.full_name.clone())
        .unwrap_or_else(|| player_id.to_string())
}

fn distinct_games(games: &[&GameParticipationRecord]) -> usize {
    games.iter().map(|g| g.game_id.as_str()).collect::<HashSet<_>>().len()
}
