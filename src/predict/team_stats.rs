//! NFL team profiles built from the ESPN season record and Sleeper player
//! totals. Everything the scorer needs that neither source reports directly
//! (ratings, ranks, efficiency percentages) is estimated from yardage and
//! touchdowns.

use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use super::round1;
use crate::sources::cache::TtlCache;
use crate::sources::espn::{EspnClient, TeamRecord};
use crate::sources::sleeper::{team_players, SleeperClient, SleeperPlayer, StatLine};
use crate::teams;

/// Games assumed played when the record is empty (preseason)
const FALLBACK_GAMES: f64 = 11.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

impl WinLoss {
    /// Win fraction, 0.5 when no games are recorded
    pub fn pct(&self) -> f64 {
        let played = self.wins + self.losses;
        if played == 0 {
            0.5
        } else {
            self.wins as f64 / played as f64
        }
    }
}

/// Full scoring profile for one NFL team.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub home_record: WinLoss,
    pub away_record: WinLoss,

    pub points_per_game: f64,
    pub points_allowed_per_game: f64,
    pub yards_per_game: f64,
    pub yards_allowed_per_game: f64,
    pub passing_yards_per_game: f64,
    pub rushing_yards_per_game: f64,
    pub third_down_conversion: f64,
    pub red_zone_efficiency: f64,

    pub sacks_per_game: f64,
    pub tackles_for_loss: f64,
    pub pass_defense_rank: u32,
    pub rush_defense_rank: u32,

    pub turnover_differential: f64,
    pub interceptions_per_game: f64,
    pub fumbles_recovered: f64,
    pub penalties_per_game: f64,
    pub penalty_yards_per_game: f64,

    pub offensive_rating: f64,
    pub defensive_rating: f64,
    pub special_teams_rating: f64,
    pub time_of_possession: f64,

    /// "W" / "L" per game, most recent first. Not populated by any source yet.
    pub last_five_games: Vec<String>,
    pub points_in_last_three: f64,
    pub streak_type: String,
    pub streak_length: u32,

    pub key_injuries: u32,
    pub injury_severity: u32,
    pub starters_available: u32,
    pub quarterback_health: f64,

    pub days_since_last_game: i32,
    pub is_coming_off_bye: bool,
    pub consecutive_road_games: u32,
    pub travel_distance: f64,

    pub coach_win_percentage: f64,
    pub playoff_experience: u32,
    pub adjustment_rating: f64,

    pub division_record: String,
    pub conference_record: String,

    pub average_margin_of_victory: f64,
    pub come_from_behind_wins: u32,
    pub blowout_losses: u32,
    pub close_game_record: String,
}

impl TeamStats {
    pub fn record(&self) -> WinLoss {
        WinLoss {
            wins: self.wins,
            losses: self.losses,
        }
    }

    /// Points scored minus points allowed per game
    pub fn point_differential(&self) -> f64 {
        self.points_per_game - self.points_allowed_per_game
    }

    pub fn recent_wins(&self) -> usize {
        self.last_five_games.iter().filter(|r| *r == "W").count()
    }

    /// League-average profile used when a team can't be loaded.
    pub fn league_default() -> Self {
        TeamStats {
            wins: 6,
            losses: 5,
            ties: 0,
            home_record: WinLoss { wins: 3, losses: 3 },
            away_record: WinLoss { wins: 3, losses: 2 },
            points_per_game: 22.0,
            points_allowed_per_game: 21.0,
            yards_per_game: 350.0,
            yards_allowed_per_game: 340.0,
            passing_yards_per_game: 230.0,
            rushing_yards_per_game: 120.0,
            third_down_conversion: 40.0,
            red_zone_efficiency: 55.0,
            sacks_per_game: 2.5,
            tackles_for_loss: 6.0,
            pass_defense_rank: 16,
            rush_defense_rank: 16,
            turnover_differential: 0.0,
            interceptions_per_game: 0.8,
            fumbles_recovered: 7.0,
            penalties_per_game: 6.0,
            penalty_yards_per_game: 50.0,
            offensive_rating: 80.0,
            defensive_rating: 80.0,
            special_teams_rating: 75.0,
            time_of_possession: 30.0,
            last_five_games: Vec::new(),
            points_in_last_three: 65.0,
            streak_type: "W".into(),
            streak_length: 1,
            key_injuries: 2,
            injury_severity: 5,
            starters_available: 21,
            quarterback_health: 90.0,
            days_since_last_game: 7,
            is_coming_off_bye: false,
            consecutive_road_games: 0,
            travel_distance: 500.0,
            coach_win_percentage: 55.0,
            playoff_experience: 3,
            adjustment_rating: 75.0,
            division_record: "2-1".into(),
            conference_record: "4-3".into(),
            average_margin_of_victory: 2.0,
            come_from_behind_wins: 1,
            blowout_losses: 1,
            close_game_record: "3-2".into(),
        }
    }
}

/// Season totals summed over every player on a team.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeasonTotals {
    pub pass_yards: f64,
    pub pass_tds: f64,
    pub interceptions: f64,
    pub rush_yards: f64,
    pub rush_tds: f64,
    pub rec_yards: f64,
    pub rec_tds: f64,
    pub fumbles_lost: f64,
    pub tackles: f64,
    pub sacks: f64,
    pub def_interceptions: f64,
    /// Most games played by any of the team's quarterbacks
    pub qb_games: f64,
    /// Number of players contributing a stat line
    pub players: usize,
}

impl SeasonTotals {
    pub fn offense_yards(&self) -> f64 {
        self.pass_yards + self.rush_yards
    }

    pub fn touchdowns(&self) -> f64 {
        self.pass_tds + self.rush_tds + self.rec_tds
    }
}

pub fn sum_season_totals(players: &[(&SleeperPlayer, &StatLine)]) -> SeasonTotals {
    let mut t = SeasonTotals::default();
    for (player, s) in players {
        t.pass_yards += s.get("pass_yd");
        t.pass_tds += s.get("pass_td");
        t.interceptions += s.get("pass_int");
        t.rush_yards += s.get("rush_yd");
        t.rush_tds += s.get("rush_td");
        t.rec_yards += s.get("rec_yd");
        t.rec_tds += s.get("rec_td");
        t.fumbles_lost += s.get("fum_lost");
        t.tackles += s.get("idp_tkl");
        t.sacks += s.get("idp_sack");
        t.def_interceptions += s.get("idp_int");
        if player.position.as_deref() == Some("QB") {
            t.qb_games = t.qb_games.max(s.get("gp"));
        }
        t.players += 1;
    }
    t
}

/// Derive a scoring profile from a season record and team totals.
pub fn derive_team_stats(record: TeamRecord, totals: &SeasonTotals) -> TeamStats {
    let wins = record.wins;
    let losses = record.losses;
    let played = match wins + losses {
        0 => FALLBACK_GAMES,
        n => n as f64,
    };
    let games = if totals.qb_games > 0.0 {
        totals.qb_games
    } else {
        played
    };

    let offense = totals.offense_yards();
    let tds = totals.touchdowns();
    let ypg = offense / games;

    let ppg = round1(tds * 6.5 / games + 3.0);
    let def_rating = round1((100.0 - ypg / 4.0).clamp(30.0, 95.0));
    let papg = round1(28.0 - (def_rating - 60.0) / 5.0);
    let defense_rank = (33.0 - def_rating / 3.0).round().clamp(1.0, 32.0) as u32;
    let time_of_possession = if offense > 0.0 {
        round1(28.0 + totals.rush_yards / offense * 4.0)
    } else {
        30.0
    };

    let home_wins = wins / 2;
    let home_losses = losses / 2;

    TeamStats {
        wins,
        losses,
        ties: record.ties,
        home_record: WinLoss {
            wins: home_wins,
            losses: home_losses,
        },
        away_record: WinLoss {
            wins: wins - home_wins,
            losses: losses - home_losses,
        },
        points_per_game: ppg,
        points_allowed_per_game: papg,
        yards_per_game: ypg.round(),
        yards_allowed_per_game: (350.0 - (def_rating - 60.0) * 2.0).round(),
        passing_yards_per_game: (totals.pass_yards / games).round(),
        rushing_yards_per_game: (totals.rush_yards / games).round(),
        third_down_conversion: round1(35.0 + (ypg - 320.0) / 10.0),
        red_zone_efficiency: round1(50.0 + (tds / games - 2.0) * 8.0),
        sacks_per_game: round1(totals.sacks / games),
        tackles_for_loss: round1(totals.sacks * 1.5 / games),
        pass_defense_rank: defense_rank,
        rush_defense_rank: defense_rank,
        turnover_differential: (totals.def_interceptions
            - (totals.interceptions + totals.fumbles_lost))
            .round(),
        interceptions_per_game: round1(totals.def_interceptions / games),
        fumbles_recovered: totals.def_interceptions,
        penalties_per_game: 5.5,
        penalty_yards_per_game: 50.0,
        offensive_rating: round1(50.0 + ypg / 7.0),
        defensive_rating: def_rating,
        special_teams_rating: 75.0,
        time_of_possession,
        last_five_games: Vec::new(),
        points_in_last_three: (ppg * 3.0).round(),
        streak_type: if wins > losses { "W" } else { "L" }.into(),
        streak_length: wins.abs_diff(losses).min(3),
        key_injuries: 1,
        injury_severity: 3,
        starters_available: 21,
        quarterback_health: 95.0,
        days_since_last_game: 7,
        is_coming_off_bye: false,
        consecutive_road_games: 0,
        travel_distance: 500.0,
        coach_win_percentage: round1(wins as f64 / played * 100.0),
        playoff_experience: if wins >= 8 { 7 } else { 3 },
        adjustment_rating: round1(60.0 + wins as f64 * 2.0),
        division_record: format!("{}-{}", wins / 3, losses / 3),
        conference_record: format!(
            "{}-{}",
            (wins as f64 * 0.6).floor(),
            (losses as f64 * 0.6).floor()
        ),
        average_margin_of_victory: round1(ppg - papg),
        come_from_behind_wins: wins / 4,
        blowout_losses: losses / 5,
        close_game_record: format!(
            "{}-{}",
            (wins as f64 * 0.4).floor(),
            (losses as f64 * 0.4).floor()
        ),
    }
}

/// Per-team profile lookup with a one-hour cache.
pub struct TeamStatsService {
    espn: Arc<EspnClient>,
    sleeper: Arc<SleeperClient>,
    cache: TtlCache<String, Arc<TeamStats>>,
}

impl TeamStatsService {
    pub fn new(espn: Arc<EspnClient>, sleeper: Arc<SleeperClient>) -> Self {
        TeamStatsService {
            espn,
            sleeper,
            cache: TtlCache::new("NFL team stats", Duration::from_secs(60 * 60)),
        }
    }

    /// Profile for `code`; league defaults when the team is unknown or its
    /// data can't be loaded.
    pub async fn get(&self, code: &str) -> Arc<TeamStats> {
        let Some(team) = teams::nfl_team(code) else {
            return Arc::new(TeamStats::league_default());
        };

        let result = self
            .cache
            .get_or_fetch(code.to_string(), || async {
                let record = self.espn.fetch_team_record(team.espn_id).await?;
                let players = self.sleeper.players().await;
                let stats = self.sleeper.season_stats().await;
                let totals = sum_season_totals(&team_players(&players, &stats, code));
                if totals.players == 0 {
                    anyhow::bail!("no Sleeper stat lines for {}", code);
                }

                let derived = derive_team_stats(record, &totals);
                info!(
                    "✓ Loaded team stats for {}: {}-{} ({} PPG, {} YPG)",
                    code,
                    derived.wins,
                    derived.losses,
                    derived.points_per_game,
                    derived.yards_per_game
                );
                Ok(Arc::new(derived))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("Failed to fetch stats for {}: {}", code, e);
            Arc::new(TeamStats::league_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(wins: u32, losses: u32) -> TeamRecord {
        TeamRecord {
            wins,
            losses,
            ties: 0,
        }
    }

    fn player(id: &str, position: &str) -> SleeperPlayer {
        SleeperPlayer {
            id: id.into(),
            full_name: format!("Player {}", id),
            team: Some("KC".into()),
            position: Some(position.into()),
            number: "0".into(),
        }
    }

    fn line(pairs: &[(&str, f64)]) -> StatLine {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_sum_season_totals_tracks_qb_games() {
        let qb = player("1", "QB");
        let rb = player("2", "RB");
        let lb = player("3", "LB");
        let qb_line = line(&[("pass_yd", 2600.0), ("pass_td", 20.0), ("pass_int", 6.0), ("gp", 10.0)]);
        let rb_line = line(&[("rush_yd", 900.0), ("rush_td", 7.0), ("fum_lost", 2.0), ("gp", 11.0)]);
        let lb_line = line(&[("idp_tkl", 80.0), ("idp_sack", 4.0), ("idp_int", 3.0)]);

        let totals = sum_season_totals(&[(&qb, &qb_line), (&rb, &rb_line), (&lb, &lb_line)]);
        assert_eq!(totals.players, 3);
        assert_eq!(totals.qb_games, 10.0);
        assert_eq!(totals.offense_yards(), 3500.0);
        assert_eq!(totals.touchdowns(), 27.0);
        assert_eq!(totals.def_interceptions, 3.0);
    }

    #[test]
    fn test_derive_team_stats() {
        let totals = SeasonTotals {
            pass_yards: 2400.0,
            rush_yards: 1200.0,
            pass_tds: 16.0,
            rush_tds: 8.0,
            rec_tds: 0.0,
            interceptions: 5.0,
            fumbles_lost: 3.0,
            def_interceptions: 10.0,
            sacks: 30.0,
            qb_games: 10.0,
            players: 20,
            ..Default::default()
        };
        let s = derive_team_stats(record(7, 3), &totals);

        // 24 TDs × 6.5 / 10 + 3
        assert_relative_eq!(s.points_per_game, 18.6);
        // ypg 360 → 100 − 90 = 10, clamped up to 30
        assert_relative_eq!(s.defensive_rating, 30.0);
        assert_relative_eq!(s.points_allowed_per_game, 34.0);
        assert_eq!(s.yards_per_game, 360.0);
        assert_eq!(s.yards_allowed_per_game, 410.0);
        assert_relative_eq!(s.third_down_conversion, 39.0);
        assert_relative_eq!(s.red_zone_efficiency, 53.2);
        assert_eq!(s.pass_defense_rank, 23);
        assert_relative_eq!(s.offensive_rating, 101.4);
        assert_eq!(s.turnover_differential, 2.0);
        assert_relative_eq!(s.sacks_per_game, 3.0);
        assert_relative_eq!(s.tackles_for_loss, 4.5);
        assert_relative_eq!(s.coach_win_percentage, 70.0);
        assert_relative_eq!(s.adjustment_rating, 74.0);
        assert_eq!(s.home_record, WinLoss { wins: 3, losses: 1 });
        assert_eq!(s.away_record, WinLoss { wins: 4, losses: 2 });
        assert_eq!(s.streak_type, "W");
        assert_eq!(s.streak_length, 3);
        assert_eq!(s.come_from_behind_wins, 1);
        assert_eq!(s.playoff_experience, 3);
        assert_eq!(s.division_record, "2-1");
        assert_eq!(s.conference_record, "4-1");
        assert_eq!(s.close_game_record, "2-1");
        assert_relative_eq!(s.time_of_possession, 29.3);
    }

    #[test]
    fn test_winless_record_is_not_replaced() {
        let totals = SeasonTotals {
            pass_yards: 1000.0,
            qb_games: 5.0,
            players: 5,
            ..Default::default()
        };
        let s = derive_team_stats(record(0, 5), &totals);
        assert_eq!(s.wins, 0);
        assert_eq!(s.losses, 5);
        assert_eq!(s.streak_type, "L");
        assert_relative_eq!(s.coach_win_percentage, 0.0);
        assert_eq!(s.record().pct(), 0.0);
    }

    #[test]
    fn test_empty_record_uses_fallback_games() {
        let totals = SeasonTotals {
            rush_yards: 1100.0,
            players: 3,
            ..Default::default()
        };
        let s = derive_team_stats(record(0, 0), &totals);
        assert_eq!(s.rushing_yards_per_game, 100.0);
        assert_relative_eq!(s.time_of_possession, 32.0);
        assert_eq!(s.record().pct(), 0.5);
    }

    #[test]
    fn test_league_default_shape() {
        let d = TeamStats::league_default();
        assert_eq!(d.record(), WinLoss { wins: 6, losses: 5 });
        assert_relative_eq!(d.point_differential(), 1.0);
        assert_eq!(d.recent_wins(), 0);
    }
}
