//! NFL same-game props from Sleeper season totals.
//!
//! For each side we take the leading passer, rusher and pass catcher, compare
//! their per-game average to a book-style line shaded by the opponent's
//! scoring, and recommend OVER/UNDER when the gap exceeds five yards.

use serde::Serialize;
use std::collections::HashMap;

use super::strategies::{build_strategies, ParlayStrategies};
use super::{american_odds, round_half_up, PropCard, OVER, PASS, UNDER};
use crate::predict::team_stats::TeamStats;
use crate::sources::injuries::{is_player_out, InjuryEntry};
use crate::sources::sleeper::{team_players, SleeperPlayer, StatLine};

/// Per-leg decimal multiplier for the suggested parlay
const NFL_PARLAY_MULTIPLIER: f64 = 1.83;
/// Yards between average and book line needed to take a side
const EDGE_YARDS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Passing,
    Rushing,
    Receiving,
}

impl PropKind {
    pub fn label(&self) -> &'static str {
        match self {
            PropKind::Passing => "Passing Yards",
            PropKind::Rushing => "Rushing Yards",
            PropKind::Receiving => "Receiving Yards",
        }
    }

    /// Sleeper stat key for the season total
    pub fn stat_key(&self) -> &'static str {
        match self {
            PropKind::Passing => "pass_yd",
            PropKind::Rushing => "rush_yd",
            PropKind::Receiving => "rec_yd",
        }
    }

    fn positions(&self) -> &'static [&'static str] {
        match self {
            PropKind::Passing => &["QB"],
            PropKind::Rushing => &["RB"],
            PropKind::Receiving => &["WR", "TE"],
        }
    }

    /// Line shading from the opponent's points per game. Opponents that
    /// score a lot push game script away from this stat.
    pub fn opponent_adjustment(&self, opp_ppg: f64) -> f64 {
        let (high, shade) = match self {
            PropKind::Passing => (28.0, 10.0),
            PropKind::Rushing => (26.0, 8.0),
            PropKind::Receiving => (28.0, 6.0),
        };
        if opp_ppg > high {
            -shade
        } else if opp_ppg < 18.0 {
            shade
        } else {
            0.0
        }
    }

    /// QBs are graded on their own team's scoring, others on volume.
    pub fn confidence(&self, average: f64, own_ppg: f64) -> &'static str {
        let (value, high, medium) = match self {
            PropKind::Passing => (own_ppg, 24.0, 20.0),
            PropKind::Rushing => (average, 100.0, 60.0),
            PropKind::Receiving => (average, 90.0, 60.0),
        };
        if value > high {
            "High"
        } else if value > medium {
            "Medium"
        } else {
            "Low"
        }
    }
}

pub fn book_line(average: f64, kind: PropKind, opp_ppg: f64) -> f64 {
    round_half_up(average + kind.opponent_adjustment(opp_ppg) - 0.5)
}

pub fn recommend(average: f64, book: f64) -> &'static str {
    if average > book + EDGE_YARDS {
        OVER
    } else if average < book - EDGE_YARDS {
        UNDER
    } else {
        PASS
    }
}

fn confidence_score(label: &str) -> f64 {
    match label {
        "High" => 75.0,
        "Medium" => 60.0,
        _ => 45.0,
    }
}

/// One side of the matchup
pub struct PropSide<'a> {
    pub team: &'a str,
    pub stats: &'a TeamStats,
}

/// The stat leader for `kind` on a team, skipping injured players
fn leader<'a>(
    pool: &[(&'a SleeperPlayer, &'a StatLine)],
    kind: PropKind,
) -> Option<(&'a SleeperPlayer, &'a StatLine)> {
    pool.iter()
        .filter(|(p, s)| {
            kind.positions().contains(&p.position.as_deref().unwrap_or("")) && s.get(kind.stat_key()) > 0.0
        })
        .max_by(|a, b| a.1.get(kind.stat_key()).total_cmp(&b.1.get(kind.stat_key())))
        .copied()
}

/// Build the prop card for one player
pub fn prop_card(
    player: &SleeperPlayer,
    stats: &StatLine,
    kind: PropKind,
    team: &str,
    own_ppg: f64,
    opp_ppg: f64,
) -> PropCard {
    let games = match stats.get("gp") {
        g if g > 0.0 => g,
        _ => 1.0,
    };
    let average = round_half_up(stats.get(kind.stat_key()) / games);
    let book = book_line(average, kind, opp_ppg);
    let confidence = kind.confidence(average, own_ppg);

    PropCard {
        player: player.full_name.clone(),
        player_id: Some(player.id.clone()),
        team: team.to_string(),
        position: player.position.clone().unwrap_or_default(),
        prop: kind.label().to_string(),
        line: average,
        over: book,
        under: book,
        recommendation: recommend(average, book).to_string(),
        confidence: confidence.to_string(),
        score: confidence_score(confidence),
        edge: (average - book).abs(),
    }
}

fn healthy_players<'a>(
    players: &'a HashMap<String, SleeperPlayer>,
    stats: &'a HashMap<String, StatLine>,
    injuries: &HashMap<String, InjuryEntry>,
    team: &str,
) -> Vec<(&'a SleeperPlayer, &'a StatLine)> {
    team_players(players, stats, team)
        .into_iter()
        .filter(|(p, _)| !is_player_out(&p.full_name, injuries))
        .collect()
}

/// Props for both sides: QB, RB then WR/TE, home before away for each.
pub fn build_props(
    home: PropSide<'_>,
    away: PropSide<'_>,
    players: &HashMap<String, SleeperPlayer>,
    stats: &HashMap<String, StatLine>,
    injuries: &HashMap<String, InjuryEntry>,
) -> Vec<PropCard> {
    let home_pool = healthy_players(players, stats, injuries, home.team);
    let away_pool = healthy_players(players, stats, injuries, away.team);

    let mut props = Vec::new();
    for kind in [PropKind::Passing, PropKind::Rushing, PropKind::Receiving] {
        for (side, opponent, pool) in [(&home, &away, &home_pool), (&away, &home, &away_pool)] {
            if let Some((player, line)) = leader(pool, kind) {
                props.push(prop_card(
                    player,
                    line,
                    kind,
                    side.team,
                    side.stats.points_per_game,
                    opponent.stats.points_per_game,
                ));
            }
        }
    }
    props
}

/// Up to four High-confidence picks, else up to three of any confidence
pub fn suggested_parlay(props: &[PropCard]) -> Vec<PropCard> {
    let high: Vec<_> = props
        .iter()
        .filter(|p| p.confidence == "High" && p.is_active())
        .take(4)
        .cloned()
        .collect();
    if !high.is_empty() {
        return high;
    }
    props.iter().filter(|p| p.is_active()).take(3).cloned().collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NflParlayResponse {
    pub game: String,
    pub all_props: Vec<PropCard>,
    pub suggested_parlay: Vec<PropCard>,
    pub parlay_odds: String,
    pub parlay_strategies: ParlayStrategies,
}

pub fn parlay_response(home: &str, away: &str, props: Vec<PropCard>) -> NflParlayResponse {
    let suggested = suggested_parlay(&props);
    NflParlayResponse {
        game: format!("{} @ {}", away, home),
        parlay_odds: american_odds(NFL_PARLAY_MULTIPLIER, suggested.len(), false),
        parlay_strategies: build_strategies(&props),
        suggested_parlay: suggested,
        all_props: props,
    }
}
