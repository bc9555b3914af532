use anyhow::Result;
use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::models::{Game, GameStatus, League, Prediction, PropPrediction};
use crate::db::Database;
use crate::predict::nba::{self, NbaPrediction, NbaSide, RECENT_GAMES, TOP_PLAYERS_PER_TEAM};
use crate::predict::nfl::{self, NflPrediction};
use crate::predict::roster::build_roster;
use crate::predict::team_stats::TeamStatsService;
use crate::props::nfl::{build_props, parlay_response, NflParlayResponse, PropSide};
use crate::props::{nba_parlay_response, NbaParlayResponse, PropCard};
use crate::sources::draftkings::{DkGame, DraftKingsClient};
use crate::sources::espn::EspnClient;
use crate::sources::injuries::InjuryClient;
use crate::sources::nba_stats::{NbaPlayerStats, NbaStatsClient};
use crate::sources::sleeper::{find_player, SleeperClient, StatLine};
use crate::sources::weather::{Weather, WeatherClient};
use crate::sources::{eastern_today, shift_date, ScheduleProvider};
use crate::teams;

/// Days ahead scanned for upcoming NFL games
const UPCOMING_DAYS: i64 = 14;

/// Owns every data source and the database, and runs the prediction
/// workflows behind the HTTP API and the daily job.
pub struct Engine {
    config: Config,
    db: Database,
    nfl_schedule: Arc<dyn ScheduleProvider>,
    nba_schedule: Arc<dyn ScheduleProvider>,
    sleeper: Arc<SleeperClient>,
    weather: WeatherClient,
    injuries: InjuryClient,
    nba_stats: NbaStatsClient,
    draftkings: DraftKingsClient,
    team_stats: TeamStatsService,
}

/// A scoreboard game with its prediction, when one could be made in time
#[derive(Debug, Clone, Serialize)]
pub struct GameWithPrediction<P> {
    #[serde(flatten)]
    pub game: Game,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<P>,
}

/// Upcoming NFL game, predicted from the away team's side
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingGame {
    pub id: String,
    pub team1: String,
    pub team2: String,
    pub home_team: String,
    pub game_time: String,
    pub game_date: String,
    pub venue: String,
    pub broadcast: String,
    pub status: GameStatus,
    pub prediction: NflPrediction,
}

/// One manually reported prop outcome
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropResultUpdate {
    pub player_name: Option<String>,
    pub prop_type: Option<String>,
    pub actual_value: Option<f64>,
}

/// Where to persist generated picks
#[derive(Debug, Clone, Copy)]
pub struct SaveTarget<'a> {
    pub game_id: &'a str,
    pub game_date: &'a str,
}

impl Engine {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let nfl = Arc::new(EspnClient::new(League::Nfl, &config.espn_base_url)?);
        let nba = Arc::new(EspnClient::new(League::Nba, &config.espn_base_url)?);
        Self::with_schedules(config, db, nfl, nba)
    }

    /// Build with the given scoreboard providers; every other source comes
    /// from `config`.
    pub fn with_schedules(
        config: Config,
        db: Database,
        nfl_schedule: Arc<dyn ScheduleProvider>,
        nba_schedule: Arc<dyn ScheduleProvider>,
    ) -> Result<Self> {
        let records = Arc::new(EspnClient::new(League::Nfl, &config.espn_base_url)?);
        let sleeper = Arc::new(SleeperClient::new(&config.sleeper_base_url, config.nfl_season)?);
        for schedule in [&nfl_schedule, &nba_schedule] {
            debug!(
                "Schedule source for {}: {}",
                schedule.league().as_str(),
                schedule.name()
            );
        }
        Ok(Engine {
            team_stats: TeamStatsService::new(records, sleeper.clone()),
            weather: WeatherClient::new(&config.open_meteo_url)?,
            injuries: InjuryClient::new(&config.injuries_url)?,
            nba_stats: NbaStatsClient::new(&config.nba_stats_url, &config.nba_season)?,
            draftkings: DraftKingsClient::new(&config.draftkings_url)?,
            sleeper,
            nfl_schedule,
            nba_schedule,
            config,
            db,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn prediction_timeout(&self) -> Duration {
        Duration::from_secs(self.config.prediction_timeout_secs)
    }

    // ── NFL predictions ──────────────────────────────────────────────────────

    /// Predict `team1` vs `team2`. Never fails: missing inputs fall back
    /// to league defaults.
    pub async fn predict_nfl(
        &self,
        team1: &str,
        team2: &str,
        team1_home: bool,
        game_date: Option<&str>,
    ) -> NflPrediction {
        let (stats1, stats2, players, season, injuries) = tokio::join!(
            self.team_stats.get(team1),
            self.team_stats.get(team2),
            self.sleeper.players(),
            self.sleeper.season_stats(),
            self.injuries.report(),
        );
        let roster1 = build_roster(team1, &players, &season, &injuries);
        let roster2 = build_roster(team2, &players, &season, &injuries);

        let home = if team1_home { team1 } else { team2 };
        let weather = match teams::nfl_team(home) {
            Some(t) => self.weather.forecast(t.lat, t.lon, game_date, t.is_dome).await,
            None => Weather::unavailable(),
        };

        nfl::assemble_prediction(
            team1, team2, stats1, stats2, roster1, roster2, weather, team1_home,
        )
    }

    /// Persist a prediction for a scheduled game
    pub async fn save_nfl_prediction(
        &self,
        prediction: &NflPrediction,
        home_code: &str,
        target: SaveTarget<'_>,
    ) -> Result<()> {
        self.db
            .save_prediction(&prediction_row(prediction, home_code, target))
            .await
    }

    /// Save off the request path; failures are only logged.
    fn save_in_background(&self, row: Prediction) {
        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.save_prediction(&row).await {
                warn!("Failed to save prediction for {}: {}", row.game_id, e);
            }
        });
    }

    pub async fn nfl_games(&self, date: &str) -> Result<Vec<Game>> {
        self.nfl_schedule.fetch_games(Some(date)).await
    }

    /// Every game on `date` with a home-side prediction. Predictions that
    /// exceed the timeout are left off; the rest are saved in the background.
    pub async fn nfl_games_with_predictions(
        &self,
        date: &str,
    ) -> Result<Vec<GameWithPrediction<NflPrediction>>> {
        info!("📊 Fetching NFL games for {}...", date);
        let games = self.nfl_schedule.fetch_games(Some(date)).await?;
        info!("✓ Found {} games", games.len());

        let timeout = self.prediction_timeout();
        let tasks = games.into_iter().map(|game| async move {
            let home = game.home_team.code.clone();
            let away = game.away_team.code.clone();
            let predicted =
                tokio::time::timeout(timeout, self.predict_nfl(&home, &away, true, Some(date)))
                    .await;
            match predicted {
                Ok(prediction) => {
                    let target = SaveTarget {
                        game_id: &game.id,
                        game_date: date,
                    };
                    self.save_in_background(prediction_row(&prediction, &home, target));
                    GameWithPrediction {
                        game,
                        prediction: Some(prediction),
                    }
                }
                Err(_) => {
                    warn!("Failed to predict {} @ {}: prediction timeout", away, home);
                    GameWithPrediction {
                        game,
                        prediction: None,
                    }
                }
            }
        });

        let out = join_all(tasks).await;
        info!(
            "✓ Generated {} predictions",
            out.iter().filter(|g| g.prediction.is_some()).count()
        );
        Ok(out)
    }

    /// Games over the next two weeks that haven't finished, each predicted
    /// with the away team as team 1. Days that fail to load are skipped.
    pub async fn upcoming_nfl_games(&self) -> Vec<UpcomingGame> {
        let today = eastern_today();
        let days: Vec<String> = (0..UPCOMING_DAYS)
            .filter_map(|offset| shift_date(&today, offset))
            .collect();

        let fetched = join_all(days.iter().map(|d| self.nfl_schedule.fetch_games(Some(d.as_str())))).await;
        let games: Vec<Game> = days
            .iter()
            .zip(fetched)
            .flat_map(|(day, result)| match result {
                Ok(games) => games,
                Err(e) => {
                    debug!("Skipping {}: {}", day, e);
                    vec![]
                }
            })
            .filter(|g| g.status.is_upcoming_or_live())
            .collect();

        join_all(games.into_iter().map(|game| async move {
            let prediction = self
                .predict_nfl(
                    &game.away_team.code,
                    &game.home_team.code,
                    false,
                    Some(game.game_date.as_str()),
                )
                .await;
            UpcomingGame {
                id: game.id,
                team1: game.away_team.code,
                team2: game.home_team.code.clone(),
                home_team: game.home_team.code,
                game_time: game.date,
                game_date: game.game_date,
                venue: game.venue,
                broadcast: game.broadcast,
                status: game.status,
                prediction,
            }
        }))
        .await
    }

    // ── Results and grading ──────────────────────────────────────────────────

    /// Save final scores for the completed games on `date`
    pub async fn update_results(&self, date: &str) -> Result<usize> {
        let games = self.nfl_schedule.fetch_games(Some(date)).await?;
        let mut updated = 0;
        for game in games.iter().filter(|g| g.status.completed) {
            let (home_score, away_score) =
                (game.home_team.score_value(), game.away_team.score_value());
            if let Some(prev) = self.db.get_actual_result(&game.id).await? {
                if (prev.home_score, prev.away_score) != (home_score, away_score) {
                    info!(
                        "📝 Score correction for {}: {}-{} -> {}-{}",
                        game.id, prev.home_score, prev.away_score, home_score, away_score
                    );
                }
            }
            self.db
                .save_actual_result(
                    &game.id,
                    date,
                    &game.home_team.code,
                    &game.away_team.code,
                    home_score,
                    away_score,
                )
                .await?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Record reported prop outcomes; incomplete entries are ignored.
    pub async fn update_prop_results(
        &self,
        game_id: &str,
        props: &[PropResultUpdate],
    ) -> Result<usize> {
        let mut saved = 0;
        for p in props {
            if let (Some(player), Some(prop_type), Some(value)) =
                (&p.player_name, &p.prop_type, p.actual_value)
            {
                if player.is_empty() || prop_type.is_empty() {
                    continue;
                }
                self.db
                    .save_prop_result(game_id, player, prop_type, value)
                    .await?;
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Grade every pending prop from Sleeper season totals
    pub async fn grade_pending_props(&self) -> Result<usize> {
        let pending = self.db.get_pending_prop_predictions().await?;
        if pending.is_empty() {
            info!("   No pending prop predictions to update");
            return Ok(0);
        }

        let (players, stats) = tokio::join!(self.sleeper.players(), self.sleeper.season_stats());
        let mut updated = 0;
        for prop in &pending {
            let Some(player) = find_player(&players, &prop.player_name, &prop.team) else {
                continue;
            };
            let Some(line) = stats.get(&player.id) else {
                continue;
            };
            let Some(value) = actual_prop_value(&prop.prop_type, line) else {
                continue;
            };
            self.db
                .save_prop_result(&prop.game_id, &prop.player_name, &prop.prop_type, value)
                .await?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Predict and save today's games that haven't started and have no
    /// stored prediction yet.
    pub async fn auto_predict(&self) -> Result<usize> {
        info!("🤖 Running auto-predictions for upcoming games...");
        let games = self.nfl_schedule.fetch_games(None).await?;
        let mut predicted = 0;

        for game in games.iter().filter(|g| g.status.state == "pre") {
            let home = &game.home_team.code;
            let away = &game.away_team.code;
            let existing = self.db.get_predictions_by_date(&game.game_date).await?;
            let already = existing.iter().any(|r| {
                let p = &r.prediction;
                p.game_id == game.id || (&p.home_team == home && &p.away_team == away)
            });
            if already {
                info!("  ⏭️  Skipping {} @ {} - already predicted", away, home);
                continue;
            }

            let prediction = self
                .predict_nfl(away, home, false, Some(game.game_date.as_str()))
                .await;
            self.save_nfl_prediction(
                &prediction,
                home,
                SaveTarget {
                    game_id: &game.id,
                    game_date: &game.game_date,
                },
            )
            .await?;
            predicted += 1;
            info!(
                "  ✅ Predicted {} @ {}: {} {}% vs {} {}% ({})",
                away,
                home,
                prediction.team1.code,
                prediction.team1.probability,
                prediction.team2.code,
                prediction.team2.probability,
                prediction.confidence
            );
        }

        info!("🤖 Auto-prediction complete: {} new predictions saved", predicted);
        Ok(predicted)
    }

    // ── NFL props ────────────────────────────────────────────────────────────

    /// Player props for a matchup. Picks are stored when `save` is given.
    pub async fn nfl_same_game_parlay(
        &self,
        home: &str,
        away: &str,
        save: Option<SaveTarget<'_>>,
    ) -> NflParlayResponse {
        let (players, season, home_stats, away_stats, injuries) = tokio::join!(
            self.sleeper.players(),
            self.sleeper.season_stats(),
            self.team_stats.get(home),
            self.team_stats.get(away),
            self.injuries.report(),
        );
        let props = build_props(
            PropSide {
                team: home,
                stats: &home_stats,
            },
            PropSide {
                team: away,
                stats: &away_stats,
            },
            &players,
            &season,
            &injuries,
        );

        if let Some(target) = save {
            let saved = self.save_props(&props, target).await;
            info!("💾 Saved {} prop predictions for {} @ {}", saved, away, home);
        }
        parlay_response(home, away, props)
    }

    async fn save_props(&self, props: &[PropCard], target: SaveTarget<'_>) -> usize {
        let mut saved = 0;
        for prop in props.iter().filter(|p| !p.player.trim().is_empty()) {
            let row = PropPrediction {
                id: None,
                game_id: target.game_id.to_string(),
                game_date: target.game_date.to_string(),
                player_name: prop.player.clone(),
                team: prop.team.clone(),
                position: prop.position.clone(),
                prop_type: prop.prop.clone(),
                line: prop.line,
                prediction: prop.recommendation.clone(),
                confidence: prop.confidence.clone(),
                prediction_time: Utc::now(),
            };
            match self.db.save_prop_prediction(&row).await {
                Ok(()) => saved += 1,
                Err(e) => warn!("Error saving prop prediction for {}: {}", prop.player, e),
            }
        }
        saved
    }

    // ── NBA ──────────────────────────────────────────────────────────────────

    /// Predict an NBA matchup from season stats, recent form and the
    /// sportsbook's injury list.
    pub async fn predict_nba(
        &self,
        team1: &str,
        team2: &str,
        team1_home: bool,
        game_date: Option<&str>,
    ) -> NbaPrediction {
        let (players1, players2, stats1, stats2, book) = tokio::join!(
            self.nba_stats.team_players(team1),
            self.nba_stats.team_players(team2),
            self.nba_stats.team_stats(team1),
            self.nba_stats.team_stats(team2),
            self.draftkings.games(League::Nba, game_date),
        );

        let (home, away) = if team1_home { (team1, team2) } else { (team2, team1) };
        let listed = book.iter().find(|g| g.is_matchup(home, away));
        let injured1 = sportsbook_injuries(listed, team1);
        let injured2 = sportsbook_injuries(listed, team2);

        let mut ids = candidate_ids(&players1, &injured1);
        ids.extend(candidate_ids(&players2, &injured2));
        let recent = self.nba_stats.recent_form(&ids, RECENT_GAMES).await;

        let side1 = NbaSide {
            code: team1.to_string(),
            stats: stats1,
            players: nba::top_players(&players1, &injured1, &recent),
            injured: injured1,
        };
        let side2 = NbaSide {
            code: team2.to_string(),
            stats: stats2,
            players: nba::top_players(&players2, &injured2, &recent),
            injured: injured2,
        };
        nba::assemble_prediction(side1, side2, team1_home)
    }

    pub async fn nba_games(&self, date: &str) -> Result<Vec<Game>> {
        self.nba_schedule.fetch_games(Some(date)).await
    }

    /// NBA counterpart of [`Engine::nfl_games_with_predictions`]. NBA
    /// predictions are not stored.
    pub async fn nba_games_with_predictions(
        &self,
        date: &str,
    ) -> Result<Vec<GameWithPrediction<NbaPrediction>>> {
        info!("🏀 Fetching NBA games for {}...", date);
        let games = self.nba_schedule.fetch_games(Some(date)).await?;
        info!("✓ Found {} NBA games", games.len());

        let timeout = self.prediction_timeout();
        let tasks = games.into_iter().map(|game| async move {
            let home = game.home_team.code.clone();
            let away = game.away_team.code.clone();
            let predicted =
                tokio::time::timeout(timeout, self.predict_nba(&home, &away, true, Some(date)))
                    .await;
            if predicted.is_err() {
                warn!("Failed to predict {} @ {}: prediction timeout", away, home);
            }
            GameWithPrediction {
                game,
                prediction: predicted.ok(),
            }
        });
        Ok(join_all(tasks).await)
    }

    /// SGP picks, smart parlays and strategies for an NBA matchup
    pub async fn nba_same_game_parlay(
        &self,
        home: &str,
        away: &str,
        game_date: Option<&str>,
    ) -> NbaParlayResponse {
        let prediction = self.predict_nba(home, away, true, game_date).await;
        let book = self.draftkings.games(League::Nba, game_date).await;
        let listed = book.iter().find(|g| g.is_matchup(home, away));
        let (h, a) = prediction.home_away(home);
        nba_parlay_response(h, a, listed)
    }

    pub async fn nba_odds(&self, date: Option<&str>) -> Arc<Vec<DkGame>> {
        self.draftkings.games(League::Nba, date).await
    }
}

/// Storage row for a prediction, oriented home/away
pub fn prediction_row(prediction: &NflPrediction, home_code: &str, target: SaveTarget<'_>) -> Prediction {
    let (home, away) = prediction.home_away(home_code);
    Prediction {
        id: None,
        game_id: target.game_id.to_string(),
        game_date: target.game_date.to_string(),
        home_team: home.code.clone(),
        away_team: away.code.clone(),
        home_win_prob: home.probability,
        away_win_prob: away.probability,
        predicted_home_score: home.predicted_score,
        predicted_away_score: away.predicted_score,
        confidence: prediction.confidence.clone(),
        weather_condition: Some(prediction.weather.condition.clone()),
        weather_temp: Some(prediction.weather.temperature),
        prediction_time: Utc::now(),
    }
}

/// Season total that settles a stored prop, by prop type
pub fn actual_prop_value(prop_type: &str, stats: &StatLine) -> Option<f64> {
    let key = match prop_type {
        "Passing Yards" => "pass_yd",
        "Rushing Yards" => "rush_yd",
        "Receiving Yards" => "rec_yd",
        "Receptions" => "rec",
        "Passing TDs" => "pass_td",
        "Rushing TDs" => "rush_td",
        _ => return None,
    };
    Some(stats.get(key))
}

fn sportsbook_injuries(game: Option<&DkGame>, code: &str) -> Vec<String> {
    match game {
        Some(g) if g.home_team.code == code => g.home_team.injuries.clone(),
        Some(g) if g.away_team.code == code => g.away_team.injuries.clone(),
        _ => vec![],
    }
}

/// Ids of the players whose game logs feed the projections
fn candidate_ids(players: &[NbaPlayerStats], injured: &[String]) -> Vec<i64> {
    players
        .iter()
        .filter(|p| !injured.contains(&p.name))
        .take(TOP_PLAYERS_PER_TEAM)
        .map(|p| p.player_id)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::{engine, game};
    use super::*;

    fn stored(game_id: &str, home: &str, away: &str) -> Prediction {
        Prediction {
            id: None,
            game_id: game_id.into(),
            game_date: "2025-01-12".into(),
            home_team: home.into(),
            away_team: away.into(),
            home_win_prob: 60.0,
            away_win_prob: 40.0,
            predicted_home_score: 24,
            predicted_away_score: 20,
            confidence: "Medium".into(),
            weather_condition: None,
            weather_temp: None,
            prediction_time: Utc::now(),
        }
    }

    #[test]
    fn test_actual_prop_value_mapping() {
        let line: StatLine = [
            ("pass_yd".to_string(), 4183.0),
            ("rec".to_string(), 97.0),
            ("rush_td".to_string(), 2.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(actual_prop_value("Passing Yards", &line), Some(4183.0));
        assert_eq!(actual_prop_value("Receptions", &line), Some(97.0));
        assert_eq!(actual_prop_value("Rushing TDs", &line), Some(2.0));
        assert_eq!(actual_prop_value("Receiving Yards", &line), Some(0.0));
        assert_eq!(actual_prop_value("Points", &line), None);
    }

    #[test]
    fn test_candidate_ids_skip_injured() {
        let players: Vec<NbaPlayerStats> = (1..=7)
            .map(|i| NbaPlayerStats {
                player_id: i,
                name: format!("Player {}", i),
                ..Default::default()
            })
            .collect();
        let ids = candidate_ids(&players, &["Player 2".to_string()]);
        assert_eq!(ids, vec![1, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_update_results_saves_completed_only() {
        let engine = engine(vec![
            game("401", "KC", "BUF", "post", Some(("27", "24"))),
            game("402", "DAL", "PHI", "pre", None),
        ]);
        let updated = engine.update_results("2025-01-12").await.unwrap();
        assert_eq!(updated, 1);

        let result = engine.db().get_actual_result("401").await.unwrap().unwrap();
        assert_eq!(result.home_score, 27);
        assert_eq!(result.away_score, 24);
        assert_eq!(result.winner, "BUF");
        assert!(engine.db().get_actual_result("402").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_predict_skips_existing() {
        let engine = engine(vec![
            game("401", "KC", "BUF", "pre", None),
            game("402", "BAL", "PIT", "pre", None),
            game("404", "DAL", "PHI", "pre", None),
            game("405", "NYG", "WAS", "post", Some(("20", "17"))),
        ]);
        // Same game id, and same pairing under another id
        engine.db().save_prediction(&stored("401", "BUF", "KC")).await.unwrap();
        engine.db().save_prediction(&stored("999", "PIT", "BAL")).await.unwrap();

        let predicted = engine.auto_predict().await.unwrap();
        assert_eq!(predicted, 1);

        let rows = engine.db().get_predictions_by_date("2025-01-12").await.unwrap();
        let new = rows
            .iter()
            .find(|r| r.prediction.game_id == "404")
            .expect("prediction for 404");
        assert_eq!(new.prediction.home_team, "PHI");
        assert_eq!(new.prediction.away_team, "DAL");
        assert!((new.prediction.home_win_prob + new.prediction.away_win_prob - 100.0).abs() < 1e-6);
        assert!(rows.iter().all(|r| r.prediction.game_id != "405"));
    }

    #[tokio::test]
    async fn test_update_prop_results_ignores_incomplete() {
        let engine = engine(vec![]);
        let updates = vec![
            PropResultUpdate {
                player_name: Some("Josh Allen".into()),
                prop_type: Some("Passing Yards".into()),
                actual_value: Some(262.0),
            },
            PropResultUpdate {
                player_name: Some("James Cook".into()),
                prop_type: None,
                actual_value: Some(80.0),
            },
        ];
        assert_eq!(engine.update_prop_results("401", &updates).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_grade_pending_props_with_nothing_pending() {
        let engine = engine(vec![]);
        assert_eq!(engine.grade_pending_props().await.unwrap(), 0);
    }
}
