//! Four ready-made parlays cut from a game's prop list, from the safest
//! picks down to long-shot value.

use serde::Serialize;

use super::PropCard;

#[derive(Debug, Clone, Serialize)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub picks: Vec<PropCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParlayStrategies {
    pub conservative: Strategy,
    pub balanced: Strategy,
    pub aggressive: Strategy,
    pub risky: Strategy,
}

fn strategy(name: &str, description: &str, picks: Vec<PropCard>) -> Strategy {
    Strategy {
        name: name.to_string(),
        description: description.to_string(),
        picks,
    }
}

/// Active props ranked by score, then bucketed by confidence
pub fn build_strategies(props: &[PropCard]) -> ParlayStrategies {
    let mut active: Vec<&PropCard> = props.iter().filter(|p| p.is_active()).collect();
    active.sort_by(|a, b| b.score.total_cmp(&a.score));

    let pick = |keep: &dyn Fn(&PropCard) -> bool, max: usize| -> Vec<PropCard> {
        active.iter().filter(|p| keep(p)).take(max).map(|p| (*p).clone()).collect()
    };

    let conservative = pick(&|p| p.confidence == "High", 3);
    let balanced = pick(&|p| p.confidence == "High" || p.confidence == "Medium", 4);
    let aggressive = pick(&|_| true, 6);

    // Long shots: lower-confidence picks with the biggest gap to the book
    let mut long_shots: Vec<&PropCard> = active
        .iter()
        .copied()
        .filter(|p| p.confidence != "High")
        .collect();
    long_shots.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    let risky = long_shots.into_iter().take(5).cloned().collect();

    ParlayStrategies {
        conservative: strategy(
            "Conservative",
            "High-confidence picks only. Fewer legs, better odds of cashing.",
            conservative,
        ),
        balanced: strategy(
            "Balanced",
            "High and medium confidence picks mixed for solid value.",
            balanced,
        ),
        aggressive: strategy(
            "Aggressive",
            "Every active pick stacked for a bigger payout.",
            aggressive,
        ),
        risky: strategy(
            "Risky Value",
            "Lower-confidence plays with the largest edge over the line.",
            risky,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{OVER, PASS, UNDER};

    fn card(player: &str, confidence: &str, recommendation: &str, score: f64, edge: f64) -> PropCard {
        PropCard {
            player: player.into(),
            player_id: None,
            team: "BOS".into(),
            position: "F".into(),
            prop: "Points".into(),
            line: 20.0,
            over: 19.0,
            under: 19.0,
            recommendation: recommendation.into(),
            confidence: confidence.into(),
            score,
            edge,
        }
    }

    fn names(s: &Strategy) -> Vec<&str> {
        s.picks.iter().map(|p| p.player.as_str()).collect()
    }

    #[test]
    fn test_strategy_buckets() {
        let props = vec![
            card("a", "High", OVER, 80.0, 1.0),
            card("b", "Medium", UNDER, 62.0, 4.0),
            card("c", "High", PASS, 90.0, 0.0),
            card("d", "Low", OVER, 45.0, 6.0),
            card("e", "High", OVER, 84.0, 0.5),
            card("f", "Medium", OVER, 65.0, 2.0),
        ];
        let s = build_strategies(&props);
        assert_eq!(names(&s.conservative), vec!["e", "a"]);
        assert_eq!(names(&s.balanced), vec!["e", "a", "f", "b"]);
        assert_eq!(names(&s.aggressive), vec!["e", "a", "f", "b", "d"]);
        assert_eq!(names(&s.risky), vec!["d", "b", "f"]);
        assert_eq!(s.balanced.name, "Balanced");
    }

    #[test]
    fn test_empty_props() {
        let s = build_strategies(&[]);
        assert!(s.conservative.picks.is_empty());
        assert!(s.risky.picks.is_empty());
    }
}
