//! Engine scenario tests and calculator properties

use game_stats::{
    GameInfo, GameParticipationRecord, GameStatus, GameWeather, InjuryReport, InjuryStatus,
    PlayerProfile, Position, SeasonData, StatField, TeamGameDefense, Venue,
};

use crate::{
    FloorCeilingCalculator, FloorEngine, FloorsConfig, FloorsError, IntervalMethod, MatchupAdjustment,
    RangeOutcome, SkipReason,
};

fn game(id: &str, week: u32, home: &str, away: &str, status: GameStatus) -> GameInfo {
    GameInfo {
        game_id: id.into(),
        season: 2025,
        week,
        home_team_id: home.into(),
        away_team_id: away.into(),
        stadium_id: Some(format!("{home}-stadium")),
        status,
    }
}

fn line(player: &str, team: &str, game_id: &str, week: u32, position: Position) -> GameParticipationRecord {
    GameParticipationRecord {
        player_id: player.into(),
        team_id: team.into(),
        opponent_id: None,
        game_id: game_id.into(),
        season: 2025,
        week,
        position,
        stats: Default::default(),
    }
}

fn profile(id: &str, name: &str, position: Position) -> PlayerProfile {
    PlayerProfile { player_id: id.into(), full_name: name.into(), position }
}

/// KC and BUF play four completed weeks against DEN and NYJ, then meet in week 5.
fn season_fixture() -> SeasonData {
    let mut data = SeasonData::default();

    for (team, surface, roof) in [
        ("KC", "Grass", "Outdoor"),
        ("BUF", "FieldTurf", "Outdoor"),
        ("DEN", "Grass", "Outdoor"),
        ("NYJ", "FieldTurf", "Outdoor"),
    ] {
        data.venues.push(Venue {
            stadium_id: format!("{team}-stadium"),
            name: Some(format!("{team} Field")),
            surface_type: Some(surface.into()),
            roof_type: Some(roof.into()),
        });
    }

    let receiving = [10.0, 12.0, 14.0, 16.0];
    for week in 1..=4u32 {
        let (kc_game, buf_game) = (format!("w{week}-kc"), format!("w{week}-buf"));
        if week % 2 == 1 {
            data.games.push(game(&kc_game, week, "KC", "DEN", GameStatus::Final));
            data.games.push(game(&buf_game, week, "BUF", "NYJ", GameStatus::Final));
        } else {
            data.games.push(game(&kc_game, week, "DEN", "KC", GameStatus::Final));
            data.games.push(game(&buf_game, week, "NYJ", "BUF", GameStatus::Final));
        }

        for (game_id, team, opponent) in [(&kc_game, "KC", "DEN"), (&buf_game, "BUF", "NYJ")] {
            data.team_defense.push(TeamGameDefense {
                game_id: game_id.clone(),
                team_id: team.into(),
                total_yards_allowed: Some(if team == "KC" { 300.0 } else { 400.0 }),
            });
            data.team_defense.push(TeamGameDefense {
                game_id: game_id.clone(),
                team_id: opponent.into(),
                total_yards_allowed: Some(350.0),
            });
        }

        let v = receiving[(week - 1) as usize];
        data.player_stats.push(
            line("kc-wr", "KC", &kc_game, week, Position::WR)
                .with_stat(StatField::ReceivingYards, v * 5.0)
                .with_stat(StatField::FantasyPointsPpr, v),
        );
        data.player_stats.push(
            line("kc-qb", "KC", &kc_game, week, Position::QB)
                .with_stat(StatField::PassingYards, 250.0 + 10.0 * week as f64)
                .with_stat(StatField::FantasyPointsPpr, 20.0),
        );
        data.player_stats.push(
            line("buf-rb", "BUF", &buf_game, week, Position::RB)
                .with_stat(StatField::RushingYards, 80.0)
                .with_stat(StatField::ReceivingYards, 20.0)
                .with_stat(StatField::FantasyPointsPpr, 15.0),
        );
        data.player_stats.push(
            line("buf-k", "BUF", &buf_game, week, Position::Other("K".into()))
                .with_stat(StatField::FantasyPointsPpr, 8.0),
        );
    }

    // A late addition with a single game
    data.player_stats.push(
        line("buf-te", "BUF", "w4-buf", 4, Position::TE)
            .with_stat(StatField::ReceivingYards, 30.0)
            .with_stat(StatField::FantasyPointsPpr, 6.0),
    );

    data.games.push(game("w5-kc-buf", 5, "KC", "BUF", GameStatus::Scheduled));
    data.games.push(game("w5-den-nyj", 5, "DEN", "", GameStatus::Scheduled));

    data.players = vec![
        profile("kc-wr", "Kay Wideout", Position::WR),
        profile("kc-qb", "Casey Passer", Position::QB),
        profile("buf-rb", "Bo Runner", Position::RB),
    ];

    data
}

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn projects_both_sides_of_a_game() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let projection = engine.project_game(&data, "w5-kc-buf").unwrap();

        assert_eq!(projection.week, 5);
        assert_eq!(projection.venue.as_deref(), Some("KC Field"));

        let home = &projection.home;
        assert!(home.is_home);
        assert_eq!(home.opponent_id, "BUF");
        assert_eq!(home.players.len(), 2);
        // QB sorts ahead of WR
        assert_eq!(home.players[0].player_id, "kc-qb");
        assert_eq!(home.players[0].name, "Casey Passer");

        let wr = home.player("kc-wr").unwrap();
        let yards = wr.projection(StatField::ReceivingYards).unwrap();
        assert_eq!(yards.games_used, 4);
        assert!(yards.floor <= yards.expected && yards.expected <= yards.ceiling);
        assert_eq!(wr.games_played, 4);

        let away = &projection.away;
        assert!(!away.is_home);
        // Kicker is not a skill position; one-game TE has nothing projectable
        assert_eq!(away.players.len(), 1);
        assert_eq!(away.players[0].position, Position::RB);
        assert_eq!(away.players[0].projections.len(), 3);
    }

    #[test]
    fn opponent_and_environment_scale_expected() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let projection = engine.project_game(&data, "w5-kc-buf").unwrap();

        // BUF allows 400 vs a league average of 350
        let home = &projection.home;
        assert!((home.opponent_factor - 400.0 / 350.0).abs() < 1e-9);
        // KC allows 300
        assert!((projection.away.opponent_factor - 300.0 / 350.0).abs() < 1e-9);

        // Grass outdoors at home: venue 1.00, home 1.02
        assert_eq!(home.environment.modifier, 1.02);
        assert_eq!(projection.away.environment.modifier, 0.98);

        let fantasy = home.player("kc-wr").unwrap().projection(StatField::FantasyPointsPpr).unwrap();
        assert_eq!(fantasy.environment_modifier, 1.02);
        // recent 14, season 13 -> base 13.6
        let expected = 13.6 * (400.0 / 350.0) * 1.02;
        assert!((fantasy.expected - (expected * 10.0f64).round() / 10.0).abs() < 1e-9);
    }

    #[test]
    fn injured_players_are_excluded_or_flagged() {
        let mut data = season_fixture();
        data.injuries.push(InjuryReport {
            player_id: "kc-qb".into(),
            season: 2025,
            week: 5,
            status: InjuryStatus::Out,
            injury_type: Some("Ankle".into()),
        });
        data.injuries.push(InjuryReport {
            player_id: "kc-wr".into(),
            season: 2025,
            week: 5,
            status: InjuryStatus::Questionable,
            injury_type: None,
        });

        let engine = FloorEngine::new(FloorsConfig::default());
        let home = engine.project_game(&data, "w5-kc-buf").unwrap().home;

        assert_eq!(home.excluded.len(), 1);
        assert_eq!(home.excluded[0].player_id, "kc-qb");
        assert_eq!(home.excluded[0].injury_type.as_deref(), Some("Ankle"));
        assert_eq!(home.players.len(), 1);
        assert!(home.players[0].is_questionable());
    }

    #[test]
    fn weather_lowers_the_modifier() {
        let mut data = season_fixture();
        data.weather.push(GameWeather {
            game_id: "w5-kc-buf".into(),
            temperature: Some(12.0),
            wind_speed: Some(20.0),
            conditions: Some("Snow".into()),
        });
        let engine = FloorEngine::new(FloorsConfig::default());
        let home = engine.project_game(&data, "w5-kc-buf").unwrap().home;
        assert!(home.environment.modifier < 1.0);
        assert_eq!(home.environment.details.len(), 4);
    }

    #[test]
    fn unknown_and_malformed_games_are_errors() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        assert!(matches!(
            engine.project_game(&data, "missing"),
            Err(FloorsError::GameNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            engine.project_game(&data, "w5-den-nyj"),
            Err(FloorsError::InvalidGame { .. })
        ));
    }

    #[test]
    fn week_batch_isolates_failures() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let week = engine.project_week(&data, 2025, 5);

        assert_eq!(week.games.len(), 1);
        assert_eq!(week.failed.len(), 1);
        assert_eq!(week.failed[0].game_id, "w5-den-nyj");

        let empty = engine.project_week(&data, 2025, 9);
        assert!(empty.games.is_empty() && empty.failed.is_empty());
    }

    #[test]
    fn projections_ignore_later_games() {
        let mut data = season_fixture();
        // A completed week-6 game must not leak into a week-5 projection
        data.games.push(game("w6-kc", 6, "KC", "DEN", GameStatus::Final));
        data.player_stats.push(
            line("kc-wr", "KC", "w6-kc", 6, Position::WR)
                .with_stat(StatField::ReceivingYards, 900.0)
                .with_stat(StatField::FantasyPointsPpr, 90.0),
        );

        let engine = FloorEngine::new(FloorsConfig::default());
        let wr = engine
            .project_game(&data, "w5-kc-buf")
            .unwrap()
            .home
            .player("kc-wr")
            .cloned()
            .unwrap();
        assert_eq!(wr.projection(StatField::FantasyPointsPpr).unwrap().games_used, 4);
    }

    #[test]
    fn repeated_projection_is_identical() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let a = engine.project_game(&data, "w5-kc-buf").unwrap();
        let b = engine.project_game(&data, "w5-kc-buf").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn one_engine_serves_different_datasets() {
        let engine = FloorEngine::new(FloorsConfig::default());
        let original = season_fixture();
        let first = engine.project_game(&original, "w5-kc-buf").unwrap();

        // Same games and weeks, but BUF's defense has collapsed
        let mut revised = season_fixture();
        for row in revised.team_defense.iter_mut().filter(|r| r.team_id == "BUF") {
            row.total_yards_allowed = Some(450.0);
        }
        let second = engine.project_game(&revised, "w5-kc-buf").unwrap();
        let fresh = FloorEngine::new(FloorsConfig::default())
            .project_game(&revised, "w5-kc-buf")
            .unwrap();

        assert_eq!(second, fresh);
        assert!((second.home.opponent_factor - 450.0 / 362.5).abs() < 1e-9);
        assert!(second.home.opponent_factor > first.home.opponent_factor);

        let week = engine.project_week(&revised, 2025, 5);
        assert_eq!(week.games[0], fresh);
    }

    #[test]
    fn projection_serializes_skip_reasons() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let projection = engine.project_game(&data, "w5-kc-buf").unwrap();
        let json = serde_json::to_value(&projection).unwrap();
        assert_eq!(json["home"]["players"][0]["player_id"], "kc-qb");
        assert!(json["home"]["players"][0].get("skipped").is_none());
    }
}

#[cfg(test)]
mod calculator_properties {
    use super::*;
    use proptest::prelude::*;

    fn history(values: &[Option<f64>]) -> Vec<GameParticipationRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut record = line("p", "KC", &format!("g{i}"), i as u32 + 1, Position::RB);
                record.stats.insert(StatField::RushingYards.key().into(), *v);
                record
            })
            .collect()
    }

    proptest! {
        #[test]
        fn floor_expected_ceiling_are_ordered(
            values in proptest::collection::vec(proptest::option::weighted(0.85, 0.0f64..250.0), 0..20),
            opponent in 0.7f64..=1.3,
            environment in 0.8f64..=1.2,
        ) {
            let calc = FloorCeilingCalculator::default();
            let games = history(&values);
            let adjustment = MatchupAdjustment { opponent_factor: opponent, environment_modifier: environment };

            match calc.try_project(&games, StatField::RushingYards, &Position::RB, &adjustment) {
                Ok(p) => {
                    prop_assert!(p.floor >= 0.0);
                    prop_assert!(p.floor <= p.expected);
                    prop_assert!(p.expected <= p.ceiling);
                    prop_assert!((0.0..=1.0).contains(&p.confidence));
                }
                Err(SkipReason::InsufficientData { required, available }) => {
                    prop_assert!(available < required);
                }
                Err(SkipReason::EmptyRecentWindow) => {}
            }
        }

        #[test]
        fn projection_is_idempotent(values in proptest::collection::vec(0.0f64..250.0, 2..15)) {
            let calc = FloorCeilingCalculator::default();
            let games = history(&values.iter().copied().map(Some).collect::<Vec<_>>());
            let first = calc.try_project(&games, StatField::RushingYards, &Position::RB, &MatchupAdjustment::NEUTRAL);
            let second = calc.try_project(&games, StatField::RushingYards, &Position::RB, &MatchupAdjustment::NEUTRAL);
            prop_assert_eq!(first, second);
        }
    }
}

#[cfg(test)]
mod backtest_tests {
    use super::*;

    #[test]
    fn completed_weeks_are_scored_against_actuals() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        let report = engine.backtest(&data, 2025, [4, 3, 4]);

        assert_eq!(report.weeks, vec![3, 4]);
        assert!(report.failed.is_empty());
        assert_eq!(report.overall.predictions, report.records.len());
        assert!(report.records.iter().all(|r| r.week == 3 || r.week == 4));
        assert!(report.by_position.contains_key("WR"));
        assert!(report.by_position.contains_key("RB"));
        assert!(!report.by_position.contains_key("K"));

        // Weeks 1-2 give 10 and 12; 11 * 1.02 home = 11.2, range 10.5..12.0, actual 14
        let wr = report
            .records
            .iter()
            .find(|r| r.player_id == "kc-wr" && r.week == 3 && r.stat == StatField::FantasyPointsPpr)
            .unwrap();
        assert_eq!(wr.actual, 14.0);
        assert_eq!((wr.floor, wr.expected, wr.ceiling), (10.5, 11.2, 12.0));
        assert_eq!(wr.outcome, RangeOutcome::AboveCeiling);
        assert!((wr.error - 2.8).abs() < 1e-9);
    }

    #[test]
    fn weeks_without_history_or_completed_games_are_empty() {
        let data = season_fixture();
        let engine = FloorEngine::new(FloorsConfig::default());
        // Week 1 has no prior games; week 5 is still scheduled
        let report = engine.backtest(&data, 2025, [1, 5]);
        assert!(report.records.is_empty());
        assert_eq!(report.overall.predictions, 0);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn bootstrap_ranges_can_be_backtested() {
        let data = season_fixture();
        let mut config = FloorsConfig::default();
        config.interval.method = IntervalMethod::Bootstrap;
        let engine = FloorEngine::new(config);

        let report = engine.backtest(&data, 2025, 2..=4);
        assert!(report.overall.predictions > 0);
        assert!(report
            .records
            .iter()
            .all(|r| r.floor <= r.expected && r.expected <= r.ceiling));
        assert_eq!(report, engine.backtest(&data, 2025, 2..=4));
    }
}
