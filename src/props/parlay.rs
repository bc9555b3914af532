//! Smart parlays: three multi-leg bundles (safe, balanced, moonshot) cut
//! from the graded SGP props, with correlation-aware leg selection and
//! expected-value math for display.

use serde::Serialize;

use super::sgp::{SgpProp, StatKind};
use super::{american_odds, parse_american_odds, OVER};
use crate::predict::round1;

/// Decimal payout per leg at -110
const LEG_MULTIPLIER: f64 = 1.909;
pub const DEFAULT_BANKROLL: f64 = 1000.0;

/// Confidence (50–100) from the gap between projection and line
pub fn confidence_score(projection: f64, line: f64) -> f64 {
    let d = (projection - line).abs();
    if d >= 3.0 {
        75.0 + (d * 2.0).min(25.0)
    } else if d >= 2.0 {
        65.0 + (d - 2.0) * 10.0
    } else if d >= 1.0 {
        55.0 + (d - 1.0) * 10.0
    } else {
        50.0 + d * 5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredLeg {
    #[serde(flatten)]
    pub prop: SgpProp,
    pub confidence_score: f64,
}

impl ScoredLeg {
    pub fn new(prop: SgpProp) -> Self {
        let confidence_score = confidence_score(prop.projection, prop.line);
        ScoredLeg { prop, confidence_score }
    }

    /// Stretch lines are never bet
    fn is_active(&self) -> bool {
        !self.prop.is_stretch
    }

    fn is_over(&self) -> bool {
        self.is_active() && self.prop.pick == OVER
    }
}

#[derive(Debug, Clone)]
pub struct GameContext {
    pub home_team: String,
    pub away_team: String,
    pub projected_total: f64,
    /// Home margin; positive means the home side is favoured
    pub spread: f64,
    pub pace: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    #[serde(rename = "type")]
    pub kind: String,
    pub props: Vec<ScoredLeg>,
    pub reasoning: String,
    pub expected_hit_rate: f64,
}

fn first_n(legs: Vec<&ScoredLeg>, n: usize) -> Vec<ScoredLeg> {
    legs.into_iter().take(n).cloned().collect()
}

fn points_overs(legs: &[ScoredLeg], min: f64) -> Vec<&ScoredLeg> {
    legs.iter()
        .filter(|l| l.prop.prop_type == StatKind::Points && l.is_over() && l.confidence_score >= min)
        .collect()
}

fn player_of(leg: Option<&ScoredLeg>) -> Option<&str> {
    leg.map(|l| l.prop.player.as_str())
}

pub fn correlations(legs: &[ScoredLeg], ctx: &GameContext) -> Vec<Correlation> {
    let mut out = Vec::new();

    if ctx.projected_total >= 225.0 {
        let overs = points_overs(legs, 65.0);
        if overs.len() >= 3 {
            out.push(Correlation {
                kind: "high_scoring_game".into(),
                props: first_n(overs, 4),
                reasoning: format!(
                    "High total ({} pts) → Multiple players go OVER",
                    ctx.projected_total
                ),
                expected_hit_rate: 0.35,
            });
        }
    }

    if ctx.spread.abs() >= 7.0 {
        let favourite = if ctx.spread > 0.0 { &ctx.home_team } else { &ctx.away_team };
        let overs: Vec<&ScoredLeg> = legs
            .iter()
            .filter(|l| &l.prop.team == favourite && l.is_over() && l.confidence_score >= 65.0)
            .collect();
        if overs.len() >= 2 {
            out.push(Correlation {
                kind: "blowout".into(),
                props: first_n(overs, 3),
                reasoning: format!("{} favored by {} → Stars hit OVER", favourite, ctx.spread.abs()),
                expected_hit_rate: 0.38,
            });
        }
    }

    if ctx.pace >= 100.0 {
        let assists: Vec<&ScoredLeg> = legs
            .iter()
            .filter(|l| l.prop.prop_type == StatKind::Assists && l.is_over() && l.confidence_score >= 60.0)
            .collect();
        if assists.len() >= 2 {
            out.push(Correlation {
                kind: "fast_pace".into(),
                props: first_n(assists, 3),
                reasoning: format!("Fast pace ({}) → More possessions = more assists", ctx.pace),
                expected_hit_rate: 0.33,
            });
        }
    }

    let stars: Vec<&ScoredLeg> = points_overs(legs, 70.0)
        .into_iter()
        .filter(|l| l.prop.projection >= 25.0)
        .collect();
    if !stars.is_empty() && ctx.projected_total >= 220.0 {
        out.push(Correlation {
            kind: "star_player_team_total".into(),
            props: first_n(stars, 2),
            reasoning: "Star goes off → Team scores more".into(),
            expected_hit_rate: 0.32,
        });
    }

    // One points, one rebounds and one assists leg, each from a different player
    let find = |kind: StatKind, min: f64| {
        legs.iter()
            .find(|l| l.prop.prop_type == kind && l.confidence_score >= min)
    };
    let points = find(StatKind::Points, 70.0);
    let rebounds = find(StatKind::Rebounds, 65.0);
    let assists = find(StatKind::Assists, 65.0);
    let mut mixed: Vec<ScoredLeg> = points.into_iter().cloned().collect();
    if let Some(r) = rebounds.filter(|r| Some(r.prop.player.as_str()) != player_of(points)) {
        mixed.push(r.clone());
    }
    if let Some(a) = assists.filter(|a| {
        let name = Some(a.prop.player.as_str());
        name != player_of(points) && name != player_of(rebounds)
    }) {
        mixed.push(a.clone());
    }
    if mixed.len() >= 3 {
        out.push(Correlation {
            kind: "mixed_stats".into(),
            props: mixed,
            reasoning: "Different stat types reduce correlation risk".into(),
            expected_hit_rate: 0.40,
        });
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartParlay {
    #[serde(rename = "type")]
    pub kind: String,
    pub legs: Vec<ScoredLeg>,
    pub odds: String,
    pub estimated_hit_rate: String,
    pub recommended_units: f64,
    pub reasoning: String,
    pub avg_confidence: String,
    pub correlation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartParlays {
    pub safe: SmartParlay,
    pub balanced: SmartParlay,
    pub moonshot: SmartParlay,
    pub all_correlations: Vec<Correlation>,
}

fn avg_score(legs: &[ScoredLeg]) -> Option<f64> {
    if legs.is_empty() {
        return None;
    }
    Some(legs.iter().map(|l| l.confidence_score).sum::<f64>() / legs.len() as f64)
}

/// Every leg hitting at the legs' average confidence
fn combined_hit_rate(legs: &[ScoredLeg]) -> f64 {
    avg_score(legs).map_or(0.0, |avg| (avg / 100.0).powi(legs.len() as i32))
}

fn parlay(
    kind: &str,
    legs: Vec<ScoredLeg>,
    hit_rate: f64,
    units: f64,
    reasoning: String,
    correlation: Option<String>,
) -> SmartParlay {
    SmartParlay {
        kind: kind.to_string(),
        odds: american_odds(LEG_MULTIPLIER, legs.len(), true),
        estimated_hit_rate: format!("{:.1}%", hit_rate * 100.0),
        recommended_units: units,
        reasoning,
        avg_confidence: avg_score(&legs).map_or_else(|| "0".to_string(), |a| format!("{:.1}", a)),
        correlation,
        legs,
    }
}

pub fn smart_parlays(props: &[SgpProp], ctx: &GameContext) -> SmartParlays {
    let scored: Vec<ScoredLeg> = props.iter().cloned().map(ScoredLeg::new).collect();
    let correlations = correlations(&scored, ctx);

    let mut ranked: Vec<&ScoredLeg> = scored.iter().filter(|l| l.is_active()).collect();
    ranked.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));

    let safe_legs: Vec<ScoredLeg> = ranked.iter().take(4).map(|l| (*l).clone()).collect();
    let safe_hit = combined_hit_rate(&safe_legs);

    let lead = correlations.first();
    let balanced_legs: Vec<ScoredLeg> = match lead {
        Some(c) if c.props.len() >= 4 => c.props.iter().take(5).cloned().collect(),
        _ => ranked.iter().skip(4).take(5).map(|l| (*l).clone()).collect(),
    };
    let balanced_hit = lead.map_or_else(|| combined_hit_rate(&balanced_legs), |c| c.expected_hit_rate);

    let mut by_edge: Vec<&ScoredLeg> = scored
        .iter()
        .filter(|l| l.is_active() && l.confidence_score >= 50.0)
        .collect();
    by_edge.sort_by(|a, b| b.prop.edge.total_cmp(&a.prop.edge));
    let moonshot_legs: Vec<ScoredLeg> = by_edge.into_iter().take(7).cloned().collect();
    let moonshot_hit = 0.6_f64.powi(moonshot_legs.len() as i32);

    SmartParlays {
        safe: parlay(
            "SAFE",
            safe_legs,
            safe_hit,
            2.0,
            "Highest confidence picks - smaller payout but best chance to hit".into(),
            None,
        ),
        balanced: parlay(
            "BALANCED",
            balanced_legs,
            balanced_hit,
            1.5,
            match lead {
                Some(c) => format!("CORRELATED: {}", c.reasoning),
                None => "Mix of high/medium confidence - sweet spot for value".into(),
            },
            lead.map(|c| c.kind.clone()),
        ),
        moonshot: parlay(
            "MOONSHOT",
            moonshot_legs,
            moonshot_hit,
            0.5,
            "High risk, high reward - lottery ticket play".into(),
            None,
        ),
        all_correlations: correlations,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedValue {
    pub ev: String,
    pub ev_percent: String,
    #[serde(rename = "isPositiveEV")]
    pub is_positive_ev: bool,
}

/// EV of `stake` on a parlay paying `odds` ("+N") that hits with `hit_rate`
pub fn calculate_ev(hit_rate: f64, odds: &str, stake: f64) -> ExpectedValue {
    let payout = parse_american_odds(odds).unwrap_or(0.0) / 100.0 * stake;
    let ev = hit_rate * payout - (1.0 - hit_rate) * stake;
    let pct = if stake > 0.0 { ev / stake * 100.0 } else { 0.0 };
    ExpectedValue {
        ev: format!("{:.2}", ev),
        ev_percent: format!("{:.1}%", pct),
        is_positive_ev: ev > 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLeg {
    pub leg_number: usize,
    pub player: String,
    pub team: String,
    pub player_id: i64,
    pub prop: String,
    pub line: f64,
    pub pick: String,
    pub recommendation: String,
    pub projection: f64,
    pub edge: f64,
    pub confidence_score: f64,
    pub confidence: String,
    pub season_avg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayParlay {
    #[serde(rename = "type")]
    pub kind: String,
    pub emoji: String,
    pub odds: String,
    pub hit_rate: String,
    pub avg_confidence: String,
    pub reasoning: String,
    pub correlation: Option<String>,
    pub recommended_bet: String,
    pub potential_win: String,
    pub expected_value: String,
    pub ev_percent: String,
    #[serde(rename = "isPositiveEV")]
    pub is_positive_ev: bool,
    pub legs: Vec<DisplayLeg>,
}

/// Bet sizing and per-leg detail for the UI. `None` for an empty parlay.
pub fn format_for_display(parlay: &SmartParlay, bankroll: f64) -> Option<DisplayParlay> {
    if parlay.legs.is_empty() {
        return None;
    }
    let unit_size = bankroll * parlay.recommended_units / 100.0;
    let potential_win = parse_american_odds(&parlay.odds).unwrap_or(0.0) / 100.0 * unit_size;
    let hit_rate = parlay
        .estimated_hit_rate
        .trim_end_matches('%')
        .parse::<f64>()
        .unwrap_or(0.0)
        / 100.0;
    let ev = calculate_ev(hit_rate, &parlay.odds, unit_size);
    let emoji = match parlay.kind.as_str() {
        "SAFE" => "🔥",
        "BALANCED" => "💎",
        _ => "🎰",
    };

    let legs = parlay
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| {
            let p = &leg.prop;
            DisplayLeg {
                leg_number: i + 1,
                player: p.player.clone(),
                team: p.team.clone(),
                player_id: p.player_id,
                prop: p.prop_type.label().to_string(),
                line: p.line,
                pick: p.pick.clone(),
                recommendation: p.pick.clone(),
                projection: round1(p.projection),
                edge: round1(p.edge),
                confidence_score: leg.confidence_score.round(),
                confidence: format!("{:.0}%", leg.confidence_score),
                season_avg: if p.season_avg > 0.0 {
                    format!("{:.1}", p.season_avg)
                } else {
                    "N/A".to_string()
                },
            }
        })
        .collect();

    Some(DisplayParlay {
        kind: parlay.kind.clone(),
        emoji: emoji.to_string(),
        odds: parlay.odds.clone(),
        hit_rate: parlay.estimated_hit_rate.clone(),
        avg_confidence: format!("{}%", parlay.avg_confidence),
        reasoning: parlay.reasoning.clone(),
        correlation: parlay.correlation.clone(),
        recommended_bet: format!("{} units (${:.2})", parlay.recommended_units, unit_size),
        potential_win: format!("${:.2}", potential_win),
        expected_value: ev.ev,
        ev_percent: ev.ev_percent,
        is_positive_ev: ev.is_positive_ev,
        legs,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayParlays {
    pub safe: Option<DisplayParlay>,
    pub balanced: Option<DisplayParlay>,
    pub moonshot: Option<DisplayParlay>,
}

pub fn display_all(parlays: &SmartParlays, bankroll: f64) -> DisplayParlays {
    DisplayParlays {
        safe: format_for_display(&parlays.safe, bankroll),
        balanced: format_for_display(&parlays.balanced, bankroll),
        moonshot: format_for_display(&parlays.moonshot, bankroll),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::sgp::UsageTier;
    use crate::props::UNDER;
    use approx::assert_relative_eq;

    fn prop(player: &str, team: &str, kind: StatKind, pick: &str, projection: f64, line: f64) -> SgpProp {
        SgpProp {
            player: player.into(),
            player_id: 7,
            team: team.into(),
            prop_type: kind,
            line,
            pick: pick.into(),
            projection,
            season_avg: projection,
            confidence: 70.0,
            usage_tier: UsageTier::Primary,
            is_stretch: false,
            warning: None,
            alternative: None,
            edge: (projection - line).abs(),
        }
    }

    fn ctx(total: f64, spread: f64, pace: f64) -> GameContext {
        GameContext {
            home_team: "BOS".into(),
            away_team: "NYK".into(),
            projected_total: total,
            spread,
            pace,
        }
    }

    #[test]
    fn test_confidence_score_table() {
        assert_relative_eq!(confidence_score(30.0, 26.0), 83.0);
        assert_relative_eq!(confidence_score(20.0, 5.0), 100.0);
        assert_relative_eq!(confidence_score(22.5, 20.0), 70.0);
        assert_relative_eq!(confidence_score(21.5, 20.0), 60.0);
        assert_relative_eq!(confidence_score(20.4, 20.0), 52.0, epsilon = 1e-9);
    }

    #[test]
    fn test_correlations_detected() {
        let legs: Vec<ScoredLeg> = vec![
            prop("A", "BOS", StatKind::Points, OVER, 31.0, 27.0),
            prop("B", "BOS", StatKind::Points, OVER, 24.0, 21.5),
            prop("C", "NYK", StatKind::Points, OVER, 26.0, 23.0),
            prop("D", "NYK", StatKind::Assists, OVER, 9.5, 7.5),
            prop("E", "BOS", StatKind::Assists, OVER, 8.0, 6.5),
            prop("F", "NYK", StatKind::Rebounds, UNDER, 8.0, 11.0),
        ]
        .into_iter()
        .map(ScoredLeg::new)
        .collect();

        let found = correlations(&legs, &ctx(230.0, 8.0, 101.0));
        let kinds: Vec<_> = found.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["high_scoring_game", "blowout", "fast_pace", "star_player_team_total", "mixed_stats"]
        );
        assert_eq!(found[1].reasoning, "BOS favored by 8 → Stars hit OVER");
        assert!(found[1].props.iter().all(|l| l.prop.team == "BOS"));
        assert_eq!(found[3].props.len(), 2);

        // Away favourite, low total, slow pace
        let found = correlations(&legs, &ctx(200.0, -9.0, 95.0));
        assert_eq!(
            found.iter().map(|c| c.kind.as_str()).collect::<Vec<_>>(),
            vec!["blowout", "mixed_stats"]
        );
        assert_eq!(found[0].reasoning, "NYK favored by 9 → Stars hit OVER");
    }

    #[test]
    fn test_smart_parlay_bundles() {
        let props = vec![
            prop("A", "BOS", StatKind::Points, OVER, 31.0, 27.0),
            prop("B", "BOS", StatKind::Points, OVER, 24.0, 21.5),
            prop("C", "NYK", StatKind::Points, UNDER, 20.0, 21.5),
            prop("D", "NYK", StatKind::Assists, OVER, 7.0, 6.5),
            prop("E", "BOS", StatKind::Rebounds, OVER, 9.2, 9.0),
            prop("G", "NYK", StatKind::Points, OVER, 14.0, 13.5),
        ];
        let parlays = smart_parlays(&props, &ctx(210.0, 2.0, 97.0));

        assert!(parlays.all_correlations.is_empty());
        assert_eq!(parlays.safe.legs.len(), 4);
        assert_eq!(parlays.safe.legs[0].prop.player, "A");
        assert_eq!(parlays.safe.odds, "+1228");
        assert_eq!(parlays.safe.recommended_units, 2.0);

        assert_eq!(parlays.balanced.legs.len(), 2);
        assert_eq!(parlays.balanced.reasoning, "Mix of high/medium confidence - sweet spot for value");
        assert_eq!(parlays.balanced.correlation, None);

        assert_eq!(parlays.moonshot.legs.len(), 6);
        assert_eq!(parlays.moonshot.legs[0].prop.player, "A");
        assert_eq!(parlays.moonshot.estimated_hit_rate, "4.7%");
    }

    #[test]
    fn test_empty_props() {
        let parlays = smart_parlays(&[], &ctx(230.0, 0.0, 100.0));
        assert_eq!(parlays.safe.odds, "N/A");
        assert_eq!(parlays.safe.estimated_hit_rate, "0.0%");
        assert_eq!(parlays.safe.avg_confidence, "0");
        assert_eq!(parlays.moonshot.estimated_hit_rate, "100.0%");
        assert!(format_for_display(&parlays.safe, DEFAULT_BANKROLL).is_none());
    }

    #[test]
    fn test_calculate_ev() {
        let ev = calculate_ev(0.25, "+300", 100.0);
        assert_eq!(ev.ev, "0.00");
        assert!(!ev.is_positive_ev);

        let ev = calculate_ev(0.3, "+300", 100.0);
        assert_eq!(ev.ev, "20.00");
        assert_eq!(ev.ev_percent, "20.0%");
        assert!(ev.is_positive_ev);
    }

    #[test]
    fn test_format_for_display() {
        let props = vec![
            prop("A", "BOS", StatKind::Points, OVER, 31.04, 27.0),
            prop("B", "BOS", StatKind::Points, OVER, 24.0, 21.5),
        ];
        let parlays = smart_parlays(&props, &ctx(210.0, 0.0, 97.0));
        let shown = format_for_display(&parlays.safe, DEFAULT_BANKROLL).unwrap();

        assert_eq!(shown.emoji, "🔥");
        assert_eq!(shown.odds, "+264");
        assert_eq!(shown.recommended_bet, "2 units ($20.00)");
        assert_eq!(shown.potential_win, "$52.80");
        assert_eq!(shown.legs[0].leg_number, 1);
        assert_eq!(shown.legs[0].projection, 31.0);
        assert_eq!(shown.legs[0].line, 27.0);
        assert_eq!(shown.legs[1].confidence, "70%");
        assert_eq!(shown.legs[1].season_avg, "24.0");
    }
}
