//! NBA same-game parlay builder.
//!
//! Props are graded by the player's place in the team's scoring order: a
//! role player asked to beat their average by a wide margin is a trap, a
//! primary scorer in a high-total game is the safest leg on the board.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

use super::{round_half_up, PropCard, OVER, PASS, UNDER};
use crate::predict::nba::NbaRosterPlayer;
use crate::sources::draftkings::DkPlayerProps;
use crate::sources::nba_stats::NbaPlayerStats;

const SGP_LEG_MULTIPLIER: f64 = 1.7;
const SAFE_CONFIDENCE: f64 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTier {
    Primary,
    Secondary,
    Tertiary,
    RolePlayer,
}

impl UsageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageTier::Primary => "PRIMARY",
            UsageTier::Secondary => "SECONDARY",
            UsageTier::Tertiary => "TERTIARY",
            UsageTier::RolePlayer => "ROLE_PLAYER",
        }
    }

    pub fn safety_rating(&self) -> u8 {
        match self {
            UsageTier::Primary => 90,
            UsageTier::Secondary => 75,
            UsageTier::Tertiary => 55,
            UsageTier::RolePlayer => 30,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UsageTier::Primary => "Primary scorer/handler (20+ PPG)",
            UsageTier::Secondary => "Secondary option (15-20 PPG)",
            UsageTier::Tertiary => "Third option (10-15 PPG)",
            UsageTier::RolePlayer => "Role player (<10 PPG or limited usage)",
        }
    }

    fn is_top_two(&self) -> bool {
        matches!(self, UsageTier::Primary | UsageTier::Secondary)
    }
}

impl Serialize for UsageTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("UsageTier", 3)?;
        st.serialize_field("tier", self.as_str())?;
        st.serialize_field("description", self.description())?;
        st.serialize_field("safetyRating", &self.safety_rating())?;
        st.end()
    }
}

/// Tier from the player's scoring rank among `teammates` (which includes
/// the player)
pub fn usage_tier(player: &NbaPlayerStats, teammates: &[&NbaPlayerStats]) -> UsageTier {
    let mut order: Vec<&&NbaPlayerStats> = teammates.iter().collect();
    order.sort_by(|a, b| b.points.total_cmp(&a.points));
    let rank = order
        .iter()
        .position(|p| p.name == player.name)
        .map_or(0, |i| i + 1);
    let ppg = player.points;

    if (1..=2).contains(&rank) && ppg >= 20.0 {
        UsageTier::Primary
    } else if ((1..=4).contains(&rank) && ppg >= 15.0) || ppg >= 18.0 {
        UsageTier::Secondary
    } else if (10.0..15.0).contains(&ppg) {
        UsageTier::Tertiary
    } else {
        UsageTier::RolePlayer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatKind {
    Points,
    Assists,
    Rebounds,
    #[serde(rename = "3-Pointers")]
    Threes,
}

impl StatKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Points => "Points",
            StatKind::Assists => "Assists",
            StatKind::Rebounds => "Rebounds",
            StatKind::Threes => "3-Pointers",
        }
    }
}

/// Confidence (30–85) that the pick on `line` hits
pub fn prop_confidence(
    player: &NbaPlayerStats,
    kind: StatKind,
    line: f64,
    projection: f64,
    tier: UsageTier,
) -> f64 {
    let diff = projection - line;
    // A zero line happens for fringe players; treat it as no edge
    let diff_pct = if line > 0.0 { diff / line * 100.0 } else { 0.0 };

    let confidence = match kind {
        StatKind::Points if diff < 0.0 => {
            let mut c = 55.0 + diff_pct.abs() * 2.0;
            if tier == UsageTier::RolePlayer && line > projection * 1.2 {
                c += 15.0;
            }
            c
        }
        StatKind::Points => {
            let c = 50.0 + diff_pct * 1.5;
            match tier {
                UsageTier::RolePlayer => c - 25.0,
                UsageTier::Tertiary => c - 10.0,
                UsageTier::Primary => c + 10.0,
                UsageTier::Secondary => c,
            }
        }
        StatKind::Assists => {
            let mut c = 55.0 + diff_pct * 1.8;
            if player.assists >= 7.0 {
                c += 10.0;
            }
            if tier.is_top_two() {
                c += 5.0;
            }
            c
        }
        StatKind::Rebounds => {
            let mut c = 55.0 + diff_pct * 2.0;
            if player.rebounds >= 8.0 {
                c += 15.0;
                if tier == UsageTier::RolePlayer {
                    c += 5.0;
                }
            }
            c
        }
        StatKind::Threes => {
            let mut c = 50.0 + diff_pct * 2.0;
            if player.fg3_made >= 2.5 {
                c += 10.0;
            }
            c
        }
    };
    confidence.clamp(30.0, 85.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stretch {
    pub reason: String,
    pub alternative: String,
}

/// A points line that asks a low-usage player for far more than they average
pub fn stretch_line(player: &NbaPlayerStats, line: f64, tier: UsageTier) -> Option<Stretch> {
    let avg = player.points;
    if avg <= 0.0 {
        return None;
    }
    let stretch_pct = (line - avg) / avg * 100.0;

    match tier {
        UsageTier::RolePlayer if stretch_pct > 25.0 => Some(Stretch {
            reason: format!(
                "⚠️ ROLE PLAYER TRAP: {} averages {:.1} PPG but line is {}+ ({:.0}% increase)",
                player.name, avg, line, stretch_pct
            ),
            alternative: format!("Consider {} REBOUNDS or a PRIMARY scorer instead", player.name),
        }),
        UsageTier::Tertiary if stretch_pct > 35.0 => Some(Stretch {
            reason: format!(
                "⚠️ TERTIARY PLAYER RISK: {} averaging {:.1} PPG, asking for {:.0}% increase",
                player.name, avg, stretch_pct
            ),
            alternative: "Look for a SECONDARY or PRIMARY scorer instead".to_string(),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgpProp {
    pub player: String,
    pub player_id: i64,
    pub team: String,
    pub prop_type: StatKind,
    pub line: f64,
    pub pick: String,
    pub projection: f64,
    pub season_avg: f64,
    pub confidence: f64,
    pub usage_tier: UsageTier,
    pub is_stretch: bool,
    pub warning: Option<String>,
    pub alternative: Option<String>,
    pub edge: f64,
}

impl SgpProp {
    fn is_points_over(&self) -> bool {
        self.prop_type == StatKind::Points && self.pick == OVER
    }

    fn is_role_player_points_over(&self) -> bool {
        self.usage_tier == UsageTier::RolePlayer && self.is_points_over()
    }

    /// Card for the shared prop list. Stretch lines are shown as PASS.
    pub fn to_card(&self, position: &str) -> PropCard {
        let confidence = if self.confidence >= 70.0 {
            "High"
        } else if self.confidence >= 60.0 {
            "Medium"
        } else {
            "Low"
        };
        PropCard {
            player: self.player.clone(),
            player_id: Some(self.player_id.to_string()),
            team: self.team.clone(),
            position: position.to_string(),
            prop: self.prop_type.label().to_string(),
            line: self.projection,
            over: self.line,
            under: self.line,
            recommendation: if self.is_stretch { PASS } else { self.pick.as_str() }.to_string(),
            confidence: confidence.to_string(),
            score: self.confidence,
            edge: self.edge,
        }
    }
}

/// Game-level inputs for correlation checks
#[derive(Debug, Clone)]
pub struct SgpContext {
    pub team1_code: String,
    pub home_team: String,
    pub projected_total: f64,
    pub pace: f64,
}

/// Sportsbook lines keyed by (player name, prop type)
pub type BookLines = HashMap<(String, String), f64>;

pub fn book_lines(props: &[DkPlayerProps]) -> BookLines {
    props
        .iter()
        .flat_map(|pp| {
            pp.props
                .iter()
                .filter_map(move |p| Some(((pp.player_name.clone(), p.prop_type.clone()), p.line?)))
        })
        .collect()
}

fn build_prop(
    player: &NbaRosterPlayer,
    kind: StatKind,
    projection: f64,
    season_avg: f64,
    tier: UsageTier,
    book: &BookLines,
) -> SgpProp {
    let stats = &player.stats;
    let line = book
        .get(&(stats.name.clone(), kind.label().to_string()))
        .copied()
        .unwrap_or_else(|| round_half_up(projection - 0.5));
    let pick = if projection > line { OVER } else { UNDER };
    let stretch = match kind {
        StatKind::Points => stretch_line(stats, line, tier),
        _ => None,
    };

    SgpProp {
        player: stats.name.clone(),
        player_id: stats.player_id,
        team: stats.team.clone(),
        prop_type: kind,
        line,
        pick: pick.to_string(),
        projection,
        season_avg,
        confidence: prop_confidence(stats, kind, line, projection, tier),
        usage_tier: tier,
        is_stretch: stretch.is_some(),
        warning: stretch.as_ref().map(|s| s.reason.clone()),
        alternative: stretch.map(|s| s.alternative),
        edge: (projection - line).abs(),
    }
}

/// Every prop for one player: points always, the rest when the player
/// produces enough of the stat to be priced
pub fn player_props(player: &NbaRosterPlayer, tier: UsageTier, book: &BookLines) -> Vec<SgpProp> {
    let s = &player.stats;
    let proj = &player.projected;
    let mut props = vec![build_prop(player, StatKind::Points, proj.points, s.points, tier, book)];
    if s.assists >= 4.0 {
        props.push(build_prop(player, StatKind::Assists, proj.assists, s.assists, tier, book));
    }
    if s.rebounds >= 6.0 {
        props.push(build_prop(player, StatKind::Rebounds, proj.rebounds, s.rebounds, tier, book));
    }
    if s.fg3_made >= 1.5 {
        props.push(build_prop(player, StatKind::Threes, proj.threes, s.fg3_made, tier, book));
    }
    props
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgpCorrelation {
    #[serde(rename = "type")]
    pub kind: String,
    pub props: Vec<SgpProp>,
    pub confidence: u8,
    pub reasoning: String,
    pub warning: Option<String>,
}

pub fn correlations(props: &[SgpProp], ctx: &SgpContext) -> Vec<SgpCorrelation> {
    let mut out = Vec::new();

    if ctx.projected_total >= 225.0 {
        let scorers: Vec<SgpProp> = props
            .iter()
            .filter(|p| p.is_points_over() && p.usage_tier.is_top_two())
            .cloned()
            .collect();
        if scorers.len() >= 2 {
            out.push(SgpCorrelation {
                kind: "HIGH_SCORING_GAME".into(),
                props: scorers,
                confidence: 70,
                reasoning: format!(
                    "High total ({}) → Multiple PRIMARY/SECONDARY scorers likely hit OVER",
                    ctx.projected_total
                ),
                warning: Some("⚠️ Avoid adding role players - they may not benefit from pace".into()),
            });
        }
    }

    let star = props.iter().find(|p| {
        p.prop_type == StatKind::Points && p.projection >= 30.0 && p.usage_tier == UsageTier::Primary
    });
    if let Some(star) = star {
        let teammates: Vec<&str> = props
            .iter()
            .filter(|p| p.team == star.team && p.player != star.player && p.prop_type == StatKind::Points)
            .map(|p| p.player.as_str())
            .collect();
        if !teammates.is_empty() {
            out.push(SgpCorrelation {
                kind: "STAR_DOMINANCE".into(),
                props: vec![star.clone()],
                confidence: 65,
                reasoning: format!(
                    "{} projected for {}+ pts → May limit teammate scoring",
                    star.player, star.projection
                ),
                warning: Some(format!(
                    "⚠️ Be cautious pairing with {} OVER points",
                    teammates.join(", ")
                )),
            });
        }
    }

    let playmakers: Vec<SgpProp> = props
        .iter()
        .filter(|p| p.prop_type == StatKind::Assists && p.pick == OVER && p.season_avg >= 6.0)
        .cloned()
        .collect();
    if ctx.pace >= 100.0 && playmakers.len() >= 2 {
        out.push(SgpCorrelation {
            kind: "FAST_PACE_ASSISTS".into(),
            props: playmakers,
            confidence: 68,
            reasoning: format!(
                "Fast pace ({}) → More possessions = more assist opportunities",
                ctx.pace
            ),
            warning: None,
        });
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgpWarning {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub suggestion: String,
}

pub fn ticket_warnings(legs: &[SgpProp]) -> Vec<SgpWarning> {
    let mut warnings = Vec::new();

    let traps: Vec<&str> = legs
        .iter()
        .filter(|l| l.is_role_player_points_over())
        .map(|l| l.player.as_str())
        .collect();
    if !traps.is_empty() {
        warnings.push(SgpWarning {
            kind: "ROLE_PLAYER_TRAP".into(),
            severity: "HIGH".into(),
            message: format!(
                "⚠️ Contains {} role player OVER points: {}",
                traps.len(),
                traps.join(", ")
            ),
            suggestion: "Consider replacing with PRIMARY scorers or rebounds props".into(),
        });
    }

    // First-seen team order
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for leg in legs {
        match counts.iter_mut().find(|(t, _)| *t == leg.team) {
            Some((_, n)) => *n += 1,
            None => counts.push((&leg.team, 1)),
        }
    }
    for (team, count) in counts.into_iter().filter(|(_, n)| *n >= 6) {
        warnings.push(SgpWarning {
            kind: "TEAM_CONCENTRATION".into(),
            severity: "MEDIUM".into(),
            message: format!("⚠️ {} props from {} - High correlation risk", count, team),
            suggestion: "Diversify across both teams for safer parlay".into(),
        });
    }

    warnings
}

/// "+N" from 1.7 per leg, stake removed
pub fn sgp_odds(legs: usize) -> String {
    let decimal = SGP_LEG_MULTIPLIER.powi(legs as i32);
    format!("+{}", ((decimal - 1.0) * 100.0).round() as i64)
}

/// Chance every leg hits at the legs' average confidence
pub fn hit_rate(legs: &[SgpProp]) -> String {
    if legs.is_empty() {
        return "0%".to_string();
    }
    let avg = legs.iter().map(|l| l.confidence).sum::<f64>() / legs.len() as f64;
    format!("{}%", ((avg / 100.0).powi(legs.len() as i32) * 100.0).round() as i64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgpTicket {
    #[serde(rename = "type")]
    pub kind: String,
    pub emoji: String,
    pub legs: Vec<SgpProp>,
    pub estimated_odds: String,
    pub hit_rate: String,
    pub reasoning: String,
    pub warnings: Vec<SgpWarning>,
}

fn ticket(kind: &str, emoji: &str, reasoning: &str, legs: Vec<SgpProp>) -> SgpTicket {
    SgpTicket {
        kind: kind.to_string(),
        emoji: emoji.to_string(),
        estimated_odds: sgp_odds(legs.len()),
        hit_rate: hit_rate(&legs),
        reasoning: reasoning.to_string(),
        warnings: ticket_warnings(&legs),
        legs,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SgpRecommendations {
    pub conservative: SgpTicket,
    pub balanced: SgpTicket,
    pub aggressive: SgpTicket,
}

pub fn recommendations(safe: &[SgpProp]) -> SgpRecommendations {
    let mut sorted: Vec<&SgpProp> = safe.iter().collect();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let take = |keep: &dyn Fn(&SgpProp) -> bool, max: usize| -> Vec<SgpProp> {
        sorted.iter().filter(|p| keep(p)).take(max).map(|p| (*p).clone()).collect()
    };

    SgpRecommendations {
        conservative: ticket(
            "CONSERVATIVE",
            "🛡️",
            "PRIMARY/SECONDARY scorers only - Safest SGP for consistent hits",
            take(&|p| p.confidence >= 65.0 && p.usage_tier.is_top_two(), 6),
        ),
        balanced: ticket(
            "BALANCED",
            "⚖️",
            "Mix of stars and solid role players (avoiding point traps)",
            take(&|p| p.confidence >= 60.0 && !p.is_role_player_points_over(), 8),
        ),
        aggressive: ticket(
            "AGGRESSIVE",
            "🎰",
            "High risk, high reward - Lottery ticket parlay",
            take(&|p| p.confidence >= SAFE_CONFIDENCE, 12),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgpPicks {
    pub all_props: Vec<SgpProp>,
    pub safe_props: Vec<SgpProp>,
    pub correlations: Vec<SgpCorrelation>,
    pub recommendations: SgpRecommendations,
}

/// Props for both rosters, graded and bundled into three tickets
pub fn generate_picks(
    team1: &[NbaRosterPlayer],
    team2: &[NbaRosterPlayer],
    ctx: &SgpContext,
    book: &BookLines,
) -> SgpPicks {
    let team1_stats: Vec<&NbaPlayerStats> = team1.iter().map(|p| &p.stats).collect();
    let team2_stats: Vec<&NbaPlayerStats> = team2.iter().map(|p| &p.stats).collect();

    let all_props: Vec<SgpProp> = team1
        .iter()
        .chain(team2)
        .flat_map(|player| {
            let teammates = if player.stats.team == ctx.team1_code {
                &team1_stats
            } else {
                &team2_stats
            };
            let tier = usage_tier(&player.stats, teammates);
            player_props(player, tier, book)
        })
        .collect();

    let correlations = correlations(&all_props, ctx);
    let safe_props: Vec<SgpProp> = all_props
        .iter()
        .filter(|p| !p.is_stretch && p.confidence >= SAFE_CONFIDENCE)
        .cloned()
        .collect();

    SgpPicks {
        recommendations: recommendations(&safe_props),
        all_props,
        safe_props,
        correlations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::nba::NbaProjection;
    use crate::sources::draftkings::DkProp;

    fn stats(name: &str, team: &str, points: f64, rebounds: f64, assists: f64, threes: f64) -> NbaPlayerStats {
        NbaPlayerStats {
            player_id: name.len() as i64,
            name: name.into(),
            team: team.into(),
            games_played: 20,
            points,
            rebounds,
            assists,
            fg3_made: threes,
            ..Default::default()
        }
    }

    fn rostered(s: NbaPlayerStats, projected_points: f64) -> NbaRosterPlayer {
        NbaRosterPlayer {
            projected: NbaProjection {
                points: projected_points,
                rebounds: s.rebounds,
                assists: s.assists,
                threes: s.fg3_made,
            },
            stats: s,
        }
    }

    #[test]
    fn test_usage_tiers() {
        let star = stats("Star", "BOS", 27.0, 8.0, 5.0, 3.0);
        let second = stats("Second", "BOS", 21.0, 5.0, 4.0, 2.0);
        let third = stats("Third", "BOS", 16.0, 4.0, 2.0, 1.0);
        let role = stats("Role", "BOS", 12.0, 9.0, 1.0, 0.0);
        let bench = stats("Bench", "BOS", 6.0, 3.0, 1.0, 0.0);
        let team = vec![&bench, &star, &role, &third, &second];

        assert_eq!(usage_tier(&star, &team), UsageTier::Primary);
        assert_eq!(usage_tier(&second, &team), UsageTier::Primary);
        assert_eq!(usage_tier(&third, &team), UsageTier::Secondary);
        assert_eq!(usage_tier(&role, &team), UsageTier::Tertiary);
        assert_eq!(usage_tier(&bench, &team), UsageTier::RolePlayer);

        // 18+ is secondary regardless of rank
        let deep = stats("Deep", "BOS", 18.5, 3.0, 2.0, 1.0);
        let a = stats("A", "BOS", 30.0, 0.0, 0.0, 0.0);
        let b = stats("B", "BOS", 29.0, 0.0, 0.0, 0.0);
        let c = stats("C", "BOS", 28.0, 0.0, 0.0, 0.0);
        let d = stats("D", "BOS", 27.0, 0.0, 0.0, 0.0);
        assert_eq!(usage_tier(&deep, &[&a, &b, &c, &d, &deep]), UsageTier::Secondary);
    }

    #[test]
    fn test_prop_confidence_rules() {
        let p = stats("P", "BOS", 25.0, 9.0, 8.0, 3.0);
        // OVER points for a primary: 50 + (26−24)/24×100×1.5 + 10 = 72.5
        let c = prop_confidence(&p, StatKind::Points, 24.0, 26.0, UsageTier::Primary);
        assert!((c - 72.5).abs() < 1e-9);
        // Same line for a role player is penalised
        let c = prop_confidence(&p, StatKind::Points, 24.0, 26.0, UsageTier::RolePlayer);
        assert!((c - 37.5).abs() < 1e-9);
        // UNDER on an inflated role-player line: 55 + 20×2 + 15, capped
        let c = prop_confidence(&p, StatKind::Points, 15.0, 12.0, UsageTier::RolePlayer);
        assert_eq!(c, 85.0);
        // Assists: 55 + 12.5×1.8 + 10 + 5 = 92.5 → 85
        let c = prop_confidence(&p, StatKind::Assists, 8.0, 9.0, UsageTier::Secondary);
        assert_eq!(c, 85.0);
        // Rebounds with a big: 55 + 0 + 15 + 5
        let c = prop_confidence(&p, StatKind::Rebounds, 9.0, 9.0, UsageTier::RolePlayer);
        assert_eq!(c, 75.0);
        // Threes floor
        let c = prop_confidence(&p, StatKind::Threes, 4.0, 1.0, UsageTier::Primary);
        assert_eq!(c, 30.0);
        // Zero line has no edge
        let c = prop_confidence(&p, StatKind::Threes, 0.0, 0.4, UsageTier::Primary);
        assert_eq!(c, 60.0);
    }

    #[test]
    fn test_stretch_lines() {
        let role = stats("Ivica Zubac", "LAC", 12.0, 11.0, 1.0, 0.0);
        let trap = stretch_line(&role, 15.5, UsageTier::RolePlayer).unwrap();
        assert_eq!(
            trap.reason,
            "⚠️ ROLE PLAYER TRAP: Ivica Zubac averages 12.0 PPG but line is 15.5+ (29% increase)"
        );
        assert_eq!(trap.alternative, "Consider Ivica Zubac REBOUNDS or a PRIMARY scorer instead");
        assert!(stretch_line(&role, 14.5, UsageTier::RolePlayer).is_none());

        let tertiary = stretch_line(&role, 16.5, UsageTier::Tertiary).unwrap();
        assert!(tertiary.reason.starts_with("⚠️ TERTIARY PLAYER RISK"));
        assert!(stretch_line(&role, 16.5, UsageTier::Secondary).is_none());
    }

    #[test]
    fn test_player_props_generation_and_book_override() {
        let player = rostered(stats("Jayson Tatum", "BOS", 27.0, 8.5, 4.5, 3.1), 28.4);
        let book = book_lines(&[DkPlayerProps {
            player_name: "Jayson Tatum".into(),
            props: vec![DkProp {
                prop_type: "Rebounds".into(),
                line: Some(9.5),
                odds: Some(-110),
            }],
        }]);
        let props = player_props(&player, UsageTier::Primary, &book);
        let kinds: Vec<_> = props.iter().map(|p| p.prop_type).collect();
        assert_eq!(
            kinds,
            vec![StatKind::Points, StatKind::Assists, StatKind::Rebounds, StatKind::Threes]
        );

        let points = &props[0];
        assert_eq!(points.line, 28.0);
        assert_eq!(points.pick, OVER);
        assert!((points.edge - 0.4).abs() < 1e-9);

        // Book line wins over the generated one
        let rebounds = &props[2];
        assert_eq!(rebounds.line, 9.5);
        assert_eq!(rebounds.pick, UNDER);

        let bench = rostered(stats("Bench Guy", "BOS", 5.0, 2.0, 1.0, 0.2), 5.3);
        assert_eq!(player_props(&bench, UsageTier::RolePlayer, &BookLines::new()).len(), 1);
    }

    fn ctx(total: f64, pace: f64) -> SgpContext {
        SgpContext {
            team1_code: "BOS".into(),
            home_team: "BOS".into(),
            projected_total: total,
            pace,
        }
    }

    #[test]
    fn test_generate_picks_correlations() {
        let bos = vec![
            rostered(stats("Star One", "BOS", 29.0, 8.0, 7.2, 3.0), 31.2),
            rostered(stats("Wing Two", "BOS", 21.0, 5.0, 6.5, 2.0), 22.6),
            rostered(stats("Big Three", "BOS", 8.0, 10.0, 1.0, 0.0), 8.4),
        ];
        let nyk = vec![rostered(stats("Guard Four", "NYK", 24.0, 4.0, 8.3, 2.5), 24.8)];

        let picks = generate_picks(&bos, &nyk, &ctx(230.0, 101.0), &BookLines::new());
        let kinds: Vec<_> = picks.correlations.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["HIGH_SCORING_GAME", "STAR_DOMINANCE", "FAST_PACE_ASSISTS"]);

        let star = &picks.correlations[1];
        assert_eq!(star.reasoning, "Star One projected for 31.2+ pts → May limit teammate scoring");
        assert_eq!(
            star.warning.as_deref(),
            Some("⚠️ Be cautious pairing with Wing Two, Big Three OVER points")
        );

        assert!(picks.safe_props.iter().all(|p| !p.is_stretch && p.confidence >= 55.0));
        assert!(picks
            .recommendations
            .conservative
            .legs
            .iter()
            .all(|l| l.usage_tier.is_top_two() && l.confidence >= 65.0));

        let quiet = generate_picks(&bos, &nyk, &ctx(210.0, 96.0), &BookLines::new());
        assert_eq!(quiet.correlations.len(), 1);
    }

    fn leg(team: &str, tier: UsageTier, kind: StatKind, pick: &str, confidence: f64) -> SgpProp {
        SgpProp {
            player: format!("{} player", team),
            player_id: 1,
            team: team.into(),
            prop_type: kind,
            line: 10.0,
            pick: pick.into(),
            projection: 10.4,
            season_avg: 10.0,
            confidence,
            usage_tier: tier,
            is_stretch: false,
            warning: None,
            alternative: None,
            edge: 0.4,
        }
    }

    #[test]
    fn test_ticket_odds_hit_rate_and_warnings() {
        assert_eq!(sgp_odds(0), "+0");
        assert_eq!(sgp_odds(3), "+391");
        assert_eq!(hit_rate(&[]), "0%");

        let legs: Vec<_> = (0..6)
            .map(|_| leg("BOS", UsageTier::RolePlayer, StatKind::Points, OVER, 70.0))
            .collect();
        // 0.7^6 = 0.1176
        assert_eq!(hit_rate(&legs), "12%");

        let warnings = ticket_warnings(&legs);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].kind, "ROLE_PLAYER_TRAP");
        assert_eq!(warnings[0].severity, "HIGH");
        assert_eq!(warnings[1].message, "⚠️ 6 props from BOS - High correlation risk");
    }

    #[test]
    fn test_recommendation_filters() {
        let safe = vec![
            leg("BOS", UsageTier::RolePlayer, StatKind::Points, OVER, 64.0),
            leg("BOS", UsageTier::Primary, StatKind::Assists, OVER, 80.0),
            leg("NYK", UsageTier::Tertiary, StatKind::Rebounds, UNDER, 62.0),
            leg("NYK", UsageTier::Secondary, StatKind::Points, UNDER, 56.0),
        ];
        let recs = recommendations(&safe);
        assert_eq!(recs.conservative.legs.len(), 1);
        assert_eq!(recs.balanced.legs.len(), 2);
        assert_eq!(recs.aggressive.legs.len(), 4);
        assert_eq!(recs.aggressive.legs[0].confidence, 80.0);
        assert_eq!(recs.conservative.emoji, "🛡️");
        assert_eq!(recs.aggressive.estimated_odds, "+735");
    }

    #[test]
    fn test_usage_tier_serializes_with_rating() {
        let v = serde_json::to_value(UsageTier::RolePlayer).unwrap();
        assert_eq!(v["tier"], "ROLE_PLAYER");
        assert_eq!(v["safetyRating"], 30);
    }
}
