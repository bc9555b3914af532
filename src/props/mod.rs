//! Player-prop recommendations and parlay construction.
//!
//! Every same-game-parlay response shares the [`PropCard`] shape so the
//! front end can render NFL and NBA picks the same way.

pub mod nfl;
pub mod parlay;
pub mod sgp;
pub mod strategies;

use serde::Serialize;

use crate::predict::nba::NbaTeamPrediction;
use crate::sources::draftkings::DkGame;
use parlay::{display_all, smart_parlays, DisplayParlays, GameContext, DEFAULT_BANKROLL};
use sgp::{book_lines, generate_picks, SgpContext, SgpPicks};
use strategies::{build_strategies, ParlayStrategies};

/// "OVER" | "UNDER" | "PASS"
pub const OVER: &str = "OVER";
pub const UNDER: &str = "UNDER";
pub const PASS: &str = "PASS";

/// One player prop as displayed and persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropCard {
    pub player: String,
    pub player_id: Option<String>,
    pub team: String,
    pub position: String,
    /// Prop type, e.g. "Passing Yards", "Points"
    pub prop: String,
    /// Our projection for the stat
    pub line: f64,
    /// Sportsbook number for the OVER side
    pub over: f64,
    /// Sportsbook number for the UNDER side
    pub under: f64,
    pub recommendation: String,
    /// "High" | "Medium" | "Low"
    pub confidence: String,
    /// Numeric confidence used for ranking (0–100)
    #[serde(skip)]
    pub score: f64,
    /// |projection − book line|
    #[serde(skip)]
    pub edge: f64,
}

impl PropCard {
    pub fn is_active(&self) -> bool {
        self.recommendation != PASS
    }
}

/// Round half up (toward +∞), the way sportsbook-style lines are rounded
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// "+N" American odds string, "N/A" for an empty parlay
pub fn american_odds(decimal_per_leg: f64, legs: usize, subtract_stake: bool) -> String {
    if legs == 0 {
        return "N/A".to_string();
    }
    let decimal = decimal_per_leg.powi(legs as i32);
    let american = if subtract_stake {
        (decimal - 1.0) * 100.0
    } else {
        decimal * 100.0
    };
    format!("+{}", american.round() as i64)
}

/// Numeric value of a "+N" odds string
pub fn parse_american_odds(odds: &str) -> Option<f64> {
    odds.trim().trim_start_matches('+').parse().ok()
}

/// NBA same-game parlay response: SGP tickets, smart parlays and the
/// shared prop cards with their strategies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaParlayResponse {
    pub game: String,
    pub sport: &'static str,
    pub all_props: Vec<PropCard>,
    pub sgp: SgpPicks,
    pub smart_parlays: DisplayParlays,
    pub parlay_strategies: ParlayStrategies,
}

/// Build every NBA prop view for a matchup. Sportsbook lines, total and
/// spread are used when DraftKings lists the game.
pub fn nba_parlay_response(
    home: &NbaTeamPrediction,
    away: &NbaTeamPrediction,
    book: Option<&DkGame>,
) -> NbaParlayResponse {
    let projected_total = book
        .and_then(|g| g.lines.total.line)
        .unwrap_or(home.stats.points_per_game + away.stats.points_per_game);
    // Sportsbook spreads are quoted against the favourite
    let spread = book
        .and_then(|g| g.lines.spread.home)
        .map(|s| -s)
        .unwrap_or((home.predicted_score - away.predicted_score) as f64);
    let pace = (home.stats.pace + away.stats.pace) / 2.0;

    let lines = book.map(|g| book_lines(&g.player_props)).unwrap_or_default();
    let picks = generate_picks(
        &home.roster.top_players,
        &away.roster.top_players,
        &SgpContext {
            team1_code: home.code.clone(),
            home_team: home.code.clone(),
            projected_total,
            pace,
        },
        &lines,
    );
    let parlays = smart_parlays(
        &picks.all_props,
        &GameContext {
            home_team: home.code.clone(),
            away_team: away.code.clone(),
            projected_total,
            spread,
            pace,
        },
    );

    let position = |name: &str| -> String {
        book.into_iter()
            .flat_map(|g| g.home_team.roster.iter().chain(&g.away_team.roster))
            .find(|p| p.name == name)
            .map(|p| p.position.clone())
            .unwrap_or_default()
    };
    let cards: Vec<PropCard> = picks
        .all_props
        .iter()
        .map(|p| p.to_card(&position(&p.player)))
        .collect();

    NbaParlayResponse {
        game: format!("{} @ {}", away.code, home.code),
        sport: "nba",
        parlay_strategies: build_strategies(&cards),
        all_props: cards,
        smart_parlays: display_all(&parlays, DEFAULT_BANKROLL),
        sgp: picks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(26.5), 27.0);
        assert_eq!(round_half_up(26.49), 26.0);
        assert_eq!(round_half_up(-7.5), -7.0);
    }

    #[test]
    fn test_american_odds() {
        assert_eq!(american_odds(1.83, 0, false), "N/A");
        assert_eq!(american_odds(1.83, 2, false), "+335");
        assert_eq!(american_odds(1.909, 3, true), "+596");
        assert_eq!(parse_american_odds("+596"), Some(596.0));
        assert_eq!(parse_american_odds("N/A"), None);
    }

    use crate::predict::nba::{NbaProjection, NbaRoster, NbaRosterPlayer};
    use crate::sources::nba_stats::{NbaPlayerStats, NbaTeamStats};

    fn team(code: &str, predicted: i32, players: &[(&str, f64)]) -> NbaTeamPrediction {
        let top_players = players
            .iter()
            .enumerate()
            .map(|(i, (name, points))| NbaRosterPlayer {
                stats: NbaPlayerStats {
                    player_id: i as i64 + 1,
                    name: name.to_string(),
                    team: code.into(),
                    games_played: 30,
                    points: *points,
                    rebounds: 5.0,
                    assists: 3.0,
                    ..Default::default()
                },
                projected: NbaProjection {
                    points: points + 1.2,
                    rebounds: 5.0,
                    assists: 3.0,
                    threes: 0.0,
                },
            })
            .collect();
        NbaTeamPrediction {
            code: code.into(),
            name: code.into(),
            probability: 50.0,
            stats: NbaTeamStats::default_for(code),
            predicted_score: predicted,
            roster: NbaRoster { top_players },
            injured_players: vec![],
        }
    }

    #[test]
    fn test_nba_parlay_response_without_book() {
        let home = team("BOS", 115, &[("Jayson Tatum", 27.0), ("Jaylen Brown", 23.0)]);
        let away = team("NYK", 108, &[("Jalen Brunson", 28.0)]);
        let resp = nba_parlay_response(&home, &away, None);

        assert_eq!(resp.game, "NYK @ BOS");
        assert_eq!(resp.sport, "nba");
        // Points only: no player reaches the other prop thresholds
        assert_eq!(resp.all_props.len(), 3);
        assert_eq!(resp.sgp.all_props.len(), 3);
        let tatum = &resp.all_props[0];
        assert_eq!(tatum.prop, "Points");
        assert_eq!(tatum.over, 28.0);
        assert_eq!(tatum.recommendation, OVER);
        assert_eq!(tatum.player_id.as_deref(), Some("1"));
        assert!(resp.smart_parlays.safe.is_some());
    }
}
