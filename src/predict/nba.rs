//! NBA game predictions and per-player projections.

use serde::Serialize;
use std::collections::HashMap;

use super::{confidence_label, probability_pair, round1};
use crate::sources::nba_stats::{NbaPlayerStats, NbaTeamStats, RecentForm};
use crate::teams;

/// League-average points per game used to anchor predicted scores
const NBA_AVERAGE_POINTS: f64 = 112.0;
const HOME_COURT_POINTS: f64 = 3.0;
/// Season weight in the season/recent-form blend
const SEASON_WEIGHT: f64 = 0.6;
pub const TOP_PLAYERS_PER_TEAM: usize = 5;
/// Games of recent form blended into projections
pub const RECENT_GAMES: usize = 5;

/// Projected box-score line for one game
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NbaProjection {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
}

/// Season averages, blended 60/40 with recent form when a game log is
/// available. Rounded to one decimal.
pub fn blend_projection(season: &NbaPlayerStats, recent: Option<&RecentForm>) -> NbaProjection {
    let mix = |s: f64, r: Option<f64>| match r {
        Some(r) => round1(s * SEASON_WEIGHT + r * (1.0 - SEASON_WEIGHT)),
        None => round1(s),
    };
    NbaProjection {
        points: mix(season.points, recent.map(|r| r.points)),
        rebounds: mix(season.rebounds, recent.map(|r| r.rebounds)),
        assists: mix(season.assists, recent.map(|r| r.assists)),
        threes: mix(season.fg3_made, recent.map(|r| r.threes)),
    }
}

/// A player with their season line and game projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaRosterPlayer {
    #[serde(flatten)]
    pub stats: NbaPlayerStats,
    pub projected: NbaProjection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaRoster {
    pub top_players: Vec<NbaRosterPlayer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaTeamPrediction {
    pub code: String,
    pub name: String,
    pub probability: f64,
    pub stats: NbaTeamStats,
    pub predicted_score: i32,
    pub roster: NbaRoster,
    pub injured_players: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaPrediction {
    pub team1: NbaTeamPrediction,
    pub team2: NbaTeamPrediction,
    pub confidence: String,
    pub key_factors: Vec<String>,
}

impl NbaPrediction {
    /// Team 1 and team 2 in (home, away) order
    pub fn home_away(&self, home_code: &str) -> (&NbaTeamPrediction, &NbaTeamPrediction) {
        if self.team1.code == home_code {
            (&self.team1, &self.team2)
        } else {
            (&self.team2, &self.team1)
        }
    }
}

/// Everything known about one side before scoring
#[derive(Debug, Clone)]
pub struct NbaSide {
    pub code: String,
    pub stats: NbaTeamStats,
    pub players: Vec<NbaRosterPlayer>,
    pub injured: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NbaScore {
    pub prob1: f64,
    pub prob2: f64,
    pub score1: i32,
    pub score2: i32,
}

fn team_name(code: &str) -> String {
    teams::nba_team(code)
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Raw team-1 advantage before clamping
pub fn raw_score(s1: &NbaTeamStats, s2: &NbaTeamStats, team1_home: bool) -> f64 {
    let defense1 = s1.steals_per_game + s1.blocks_per_game;
    let defense2 = s2.steals_per_game + s2.blocks_per_game;
    let home = if team1_home {
        HOME_COURT_POINTS
    } else {
        -HOME_COURT_POINTS
    };

    50.0 + (s1.points_per_game - s2.points_per_game) * 1.2
        + (s1.fg_pct - s2.fg_pct) * 0.8
        + (s1.rebounds_per_game - s2.rebounds_per_game) * 0.3
        + (s1.assists_per_game - s2.assists_per_game) * 0.3
        + (s2.turnovers_per_game - s1.turnovers_per_game) * 0.5
        + (defense1 - defense2) * 0.4
        + home
}

fn predicted_points(ppg: f64, probability: f64) -> i32 {
    let baseline = ppg * 0.6 + NBA_AVERAGE_POINTS * 0.4;
    let points = baseline * (1.0 + (probability - 50.0) / 300.0);
    points.clamp(85.0, 145.0).round() as i32
}

pub fn score_matchup(s1: &NbaTeamStats, s2: &NbaTeamStats, team1_home: bool) -> NbaScore {
    let (prob1, prob2) = probability_pair(raw_score(s1, s2, team1_home));
    NbaScore {
        prob1,
        prob2,
        score1: predicted_points(s1.points_per_game, prob1),
        score2: predicted_points(s2.points_per_game, prob2),
    }
}

pub fn key_factors(
    team1: &str,
    team2: &str,
    s1: &NbaTeamStats,
    s2: &NbaTeamStats,
    team1_home: bool,
) -> Vec<String> {
    let name1 = team_name(team1);
    let name2 = team_name(team2);
    let pick = |first: bool| if first { &name1 } else { &name2 };
    let mut factors = Vec::new();

    let ppg_gap = s1.points_per_game - s2.points_per_game;
    if ppg_gap.abs() > 5.0 {
        factors.push(format!(
            "{} scores {:.1} more points per game",
            pick(ppg_gap > 0.0),
            ppg_gap.abs()
        ));
    }

    let fg_gap = s1.fg_pct - s2.fg_pct;
    if fg_gap.abs() > 2.0 {
        factors.push(format!(
            "{} shoots more efficiently ({:.1}% FG)",
            pick(fg_gap > 0.0),
            s1.fg_pct.max(s2.fg_pct)
        ));
    }

    let reb_gap = s1.rebounds_per_game - s2.rebounds_per_game;
    if reb_gap.abs() > 4.0 {
        factors.push(format!(
            "{} controls the glass (+{:.1} rebounds per game)",
            pick(reb_gap > 0.0),
            reb_gap.abs()
        ));
    }

    let tov_gap = s1.turnovers_per_game - s2.turnovers_per_game;
    if tov_gap.abs() > 2.0 {
        factors.push(format!(
            "{} protects the ball better ({:.1} fewer turnovers)",
            pick(tov_gap < 0.0),
            tov_gap.abs()
        ));
    }

    if s1.pace.max(s2.pace) >= 100.0 {
        factors.push(format!(
            "Fast pace expected ({:.1} possessions)",
            (s1.pace + s2.pace) / 2.0
        ));
    }

    if factors.is_empty() {
        return vec![
            "Both teams evenly matched".to_string(),
            format!("Home court could decide it for {}", pick(team1_home)),
        ];
    }
    factors
}

/// Top scorers not listed as injured, with projections attached.
pub fn top_players(
    players: &[NbaPlayerStats],
    injured: &[String],
    recent: &HashMap<i64, RecentForm>,
) -> Vec<NbaRosterPlayer> {
    players
        .iter()
        .filter(|p| !injured.iter().any(|name| name == &p.name))
        .take(TOP_PLAYERS_PER_TEAM)
        .map(|p| NbaRosterPlayer {
            projected: blend_projection(p, recent.get(&p.player_id)),
            stats: p.clone(),
        })
        .collect()
}

pub fn assemble_prediction(side1: NbaSide, side2: NbaSide, team1_home: bool) -> NbaPrediction {
    let score = score_matchup(&side1.stats, &side2.stats, team1_home);
    let key_factors = key_factors(&side1.code, &side2.code, &side1.stats, &side2.stats, team1_home);

    let team = |side: NbaSide, probability: f64, predicted_score: i32| NbaTeamPrediction {
        name: team_name(&side.code),
        code: side.code,
        probability: round1(probability),
        stats: side.stats,
        predicted_score,
        roster: NbaRoster {
            top_players: side.players,
        },
        injured_players: side.injured,
    };

    NbaPrediction {
        team1: team(side1, score.prob1, score.score1),
        team2: team(side2, score.prob2, score.score2),
        confidence: confidence_label(score.prob1, score.prob2).to_string(),
        key_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn player(id: i64, name: &str, points: f64) -> NbaPlayerStats {
        NbaPlayerStats {
            player_id: id,
            name: name.into(),
            team: "BOS".into(),
            games_played: 40,
            points,
            rebounds: 8.0,
            assists: 5.0,
            fg3_made: 3.0,
            ..Default::default()
        }
    }

    fn side(code: &str, stats: NbaTeamStats) -> NbaSide {
        NbaSide {
            code: code.into(),
            stats,
            players: vec![],
            injured: vec![],
        }
    }

    #[test]
    fn test_blend_projection() {
        let season = player(1, "Jayson Tatum", 27.0);
        let recent = RecentForm {
            games: 5,
            points: 32.0,
            rebounds: 6.0,
            assists: 4.0,
            threes: 4.5,
        };
        let p = blend_projection(&season, Some(&recent));
        assert_relative_eq!(p.points, 29.0);
        assert_relative_eq!(p.rebounds, 7.2);
        assert_relative_eq!(p.assists, 4.6);
        assert_relative_eq!(p.threes, 3.6);

        let plain = blend_projection(&season, None);
        assert_relative_eq!(plain.points, 27.0);
        assert_relative_eq!(plain.threes, 3.0);
    }

    #[test]
    fn test_equal_teams_home_court() {
        let s = NbaTeamStats::default_for("BOS");
        let score = score_matchup(&s, &s, true);
        assert_relative_eq!(score.prob1, 53.0);
        assert_relative_eq!(score.prob2, 47.0);
        // (110 × 0.6 + 44.8) × 1.01 = 111.9
        assert_eq!(score.score1, 112);
        assert_eq!(score.score2, 110);
    }

    #[test]
    fn test_probability_clamped() {
        let mut strong = NbaTeamStats::default_for("BOS");
        strong.points_per_game = 135.0;
        strong.fg_pct = 50.0;
        let weak = NbaTeamStats::default_for("WAS");
        let score = score_matchup(&strong, &weak, true);
        assert_eq!(score.prob1, 85.0);
        assert_eq!(score.prob2, 15.0);
        assert!(score.score1 <= 145);
    }

    #[test]
    fn test_key_factors() {
        let mut s1 = NbaTeamStats::default_for("BOS");
        s1.points_per_game = 118.0;
        let s2 = NbaTeamStats::default_for("NYK");
        let f = key_factors("BOS", "NYK", &s1, &s2, true);
        assert_eq!(f, vec!["Boston Celtics scores 8.0 more points per game"]);

        let even = key_factors("BOS", "NYK", &s2, &s2, false);
        assert_eq!(even[0], "Both teams evenly matched");
        assert_eq!(even[1], "Home court could decide it for New York Knicks");
    }

    #[test]
    fn test_top_players_skip_injured() {
        let players: Vec<_> = (0..8).map(|i| player(i, &format!("P{}", i), 30.0 - i as f64)).collect();
        let injured = vec!["P1".to_string()];
        let top = top_players(&players, &injured, &HashMap::new());
        assert_eq!(top.len(), TOP_PLAYERS_PER_TEAM);
        let names: Vec<_> = top.iter().map(|p| p.stats.name.as_str()).collect();
        assert_eq!(names, vec!["P0", "P2", "P3", "P4", "P5"]);
    }

    #[test]
    fn test_assemble_prediction() {
        let p = assemble_prediction(
            side("LAL", NbaTeamStats::default_for("LAL")),
            side("GSW", NbaTeamStats::default_for("GSW")),
            false,
        );
        assert_eq!(p.team1.name, "Los Angeles Lakers");
        assert_eq!(p.team1.probability, 47.0);
        assert_eq!(p.team2.probability, 53.0);
        assert_eq!(p.confidence, "Low");
        let (home, _) = p.home_away("GSW");
        assert_eq!(home.code, "GSW");
    }
}
