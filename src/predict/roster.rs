//! Depth-chart-lite NFL rosters: the statistically leading players at each
//! skill position plus the top tacklers, with per-game projections.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::round1;
use crate::sources::injuries::{is_player_out, InjuryEntry};
use crate::sources::sleeper::{team_players, SleeperPlayer, StatLine};

const DEFENSIVE_POSITIONS: &[&str] = &["LB", "DE", "DT", "CB", "S"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NflRoster {
    pub quarterbacks: Vec<RosterPlayer>,
    pub running_backs: Vec<RosterPlayer>,
    pub wide_receivers: Vec<RosterPlayer>,
    pub tight_ends: Vec<RosterPlayer>,
    pub defense: Vec<RosterPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayer {
    pub id: String,
    pub name: String,
    pub position: String,
    pub number: String,
    pub season_stats: SeasonStatSheet,
    pub projected_stats: Projection,
}

/// Season totals in display form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStatSheet {
    pub games_played: f64,
    pub completions: f64,
    pub attempts: f64,
    pub passing_yards: f64,
    #[serde(rename = "passingTDs")]
    pub passing_tds: f64,
    pub interceptions: f64,
    pub rushing_attempts: f64,
    pub rushing_yards: f64,
    #[serde(rename = "rushingTDs")]
    pub rushing_tds: f64,
    pub yards_per_carry: f64,
    pub receptions: f64,
    pub targets: f64,
    pub receiving_yards: f64,
    #[serde(rename = "receivingTDs")]
    pub receiving_tds: f64,
    pub yards_per_reception: f64,
    pub tackles: f64,
    pub sacks: f64,
    pub interceptions_defense: f64,
    pub pass_deflections: f64,
    pub forced_fumbles: f64,
}

impl SeasonStatSheet {
    pub fn from_line(s: &StatLine) -> Self {
        let rush_att = s.get("rush_att");
        let rec = s.get("rec");
        SeasonStatSheet {
            games_played: s.first_of(&["gp", "gms_active"]),
            completions: s.get("pass_cmp"),
            attempts: s.get("pass_att"),
            passing_yards: s.get("pass_yd"),
            passing_tds: s.get("pass_td"),
            interceptions: s.get("pass_int"),
            rushing_attempts: rush_att,
            rushing_yards: s.get("rush_yd"),
            rushing_tds: s.get("rush_td"),
            yards_per_carry: if rush_att > 0.0 {
                round1(s.get("rush_yd") / rush_att)
            } else {
                0.0
            },
            receptions: rec,
            targets: s.get("rec_tgt"),
            receiving_yards: s.get("rec_yd"),
            receiving_tds: s.get("rec_td"),
            yards_per_reception: if rec > 0.0 {
                round1(s.get("rec_yd") / rec)
            } else {
                0.0
            },
            tackles: s.get("idp_tkl_solo") + s.get("idp_tkl_ast"),
            sacks: s.get("idp_sack"),
            interceptions_defense: s.get("idp_int"),
            pass_deflections: s.get("idp_pass_def"),
            forced_fumbles: s.get("idp_ff"),
        }
    }
}

/// Per-game projection, pure season averages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub passing_yards: f64,
    #[serde(rename = "passingTDs")]
    pub passing_tds: f64,
    pub interceptions: f64,
    pub completions: f64,
    pub attempts: f64,
    pub rushing_attempts: f64,
    pub rushing_yards: f64,
    #[serde(rename = "rushingTDs")]
    pub rushing_tds: f64,
    pub receptions: f64,
    pub targets: f64,
    pub receiving_yards: f64,
    #[serde(rename = "receivingTDs")]
    pub receiving_tds: f64,
    pub tackles: f64,
    pub sacks: f64,
}

/// Which projection template a player uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Quarterback,
    RunningBack,
    PassCatcher,
    Defender,
}

pub fn project(season: &SeasonStatSheet, kind: ProjectionKind) -> Projection {
    let mut proj = Projection::default();
    let games = season.games_played;
    if games <= 0.0 {
        return proj;
    }

    let per_game = |v: f64| (v / games).round();
    let per_game1 = |v: f64| round1(v / games);

    match kind {
        ProjectionKind::Quarterback => {
            proj.passing_yards = per_game(season.passing_yards);
            proj.passing_tds = per_game1(season.passing_tds);
            proj.interceptions = per_game1(season.interceptions);
            proj.completions = per_game(season.completions);
            proj.attempts = per_game(season.attempts);
            proj.rushing_yards = per_game(season.rushing_yards);
            proj.rushing_tds = per_game1(season.rushing_tds);
        }
        ProjectionKind::RunningBack => {
            proj.rushing_attempts = per_game(season.rushing_attempts);
            proj.rushing_yards = per_game(season.rushing_yards);
            proj.rushing_tds = per_game1(season.rushing_tds);
            proj.receptions = per_game(season.receptions);
            proj.receiving_yards = per_game(season.receiving_yards);
            proj.receiving_tds = per_game1(season.receiving_tds);
        }
        ProjectionKind::PassCatcher => {
            proj.receptions = per_game(season.receptions);
            proj.targets = per_game(season.targets);
            proj.receiving_yards = per_game(season.receiving_yards);
            proj.receiving_tds = per_game1(season.receiving_tds);
        }
        ProjectionKind::Defender => {
            proj.tackles = per_game(season.tackles);
            proj.sacks = per_game1(season.sacks);
            proj.interceptions = per_game1(season.interceptions_defense);
        }
    }
    proj
}

struct Candidate<'a> {
    player: &'a SleeperPlayer,
    stats: &'a StatLine,
}

impl Candidate<'_> {
    fn position(&self) -> &str {
        self.player.position.as_deref().unwrap_or("")
    }

    fn into_roster_player(self, kind: ProjectionKind) -> RosterPlayer {
        let season = SeasonStatSheet::from_line(self.stats);
        let projected = project(&season, kind);
        RosterPlayer {
            id: self.player.id.clone(),
            name: self.player.full_name.clone(),
            position: self.position().to_string(),
            number: self.player.number.clone(),
            season_stats: season,
            projected_stats: projected,
        }
    }
}

/// Leaders by `key` among players at `positions`, highest first
fn leaders<'a>(
    pool: &[(&'a SleeperPlayer, &'a StatLine)],
    positions: &[&str],
    key: impl Fn(&StatLine) -> f64,
    take: usize,
) -> Vec<Candidate<'a>> {
    let mut picked: Vec<_> = pool
        .iter()
        .filter(|(p, s)| positions.contains(&p.position.as_deref().unwrap_or("")) && key(*s) > 0.0)
        .map(|(p, s)| Candidate {
            player: *p,
            stats: *s,
        })
        .collect();
    picked.sort_by(|a, b| key(b.stats).total_cmp(&key(a.stats)));
    picked.truncate(take);
    picked
}

/// Build a team's roster, leaving out anyone the injury report has as OUT.
pub fn build_roster(
    team: &str,
    players: &HashMap<String, SleeperPlayer>,
    stats: &HashMap<String, StatLine>,
    injuries: &HashMap<String, InjuryEntry>,
) -> NflRoster {
    let pool: Vec<_> = team_players(players, stats, team)
        .into_iter()
        .filter(|(p, _)| {
            let out = is_player_out(&p.full_name, injuries);
            if out {
                debug!("🚑 Excluding {} ({}) - OUT with injury", p.full_name, team);
            }
            !out
        })
        .collect();

    let tackles = |s: &StatLine| s.get("idp_tkl_solo") + s.get("idp_tkl_ast");
    let convert = |picked: Vec<Candidate>, kind| {
        picked
            .into_iter()
            .map(|c| c.into_roster_player(kind))
            .collect::<Vec<_>>()
    };

    let roster = NflRoster {
        quarterbacks: convert(
            leaders(&pool, &["QB"], |s| s.get("pass_yd"), 1),
            ProjectionKind::Quarterback,
        ),
        running_backs: convert(
            leaders(&pool, &["RB"], |s| s.get("rush_yd"), 2),
            ProjectionKind::RunningBack,
        ),
        wide_receivers: convert(
            leaders(&pool, &["WR"], |s| s.get("rec_yd"), 3),
            ProjectionKind::PassCatcher,
        ),
        tight_ends: convert(
            leaders(&pool, &["TE"], |s| s.get("rec_yd"), 1),
            ProjectionKind::PassCatcher,
        ),
        defense: convert(
            leaders(&pool, DEFENSIVE_POSITIONS, tackles, 3),
            ProjectionKind::Defender,
        ),
    };

    let first = |v: &[RosterPlayer]| v.first().map(|p| p.name.clone()).unwrap_or_default();
    info!(
        "✓ Loaded roster for {}: {}, {}, {}",
        team,
        first(&roster.quarterbacks),
        first(&roster.running_backs),
        first(&roster.wide_receivers)
    );
    roster
}
