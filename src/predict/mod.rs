//! Game predictions for both leagues.
//!
//! The NFL scorer sums weighted team-stat differentials on a baseline of 50;
//! the NBA scorer does the same with per-game box-score aggregates. Both clamp
//! the result to [15, 85] so a single prediction never claims certainty.

pub mod nba;
pub mod nfl;
pub mod roster;
pub mod team_stats;

/// Lowest win probability (percent) either side can be given
pub const MIN_PROBABILITY: f64 = 15.0;
/// Highest win probability (percent) either side can be given
pub const MAX_PROBABILITY: f64 = 85.0;

/// "High" when the probability gap exceeds 30 points, "Medium" above 15.
pub fn confidence_label(p1: f64, p2: f64) -> &'static str {
    let gap = (p1 - p2).abs();
    if gap > 30.0 {
        "High"
    } else if gap > 15.0 {
        "Medium"
    } else {
        "Low"
    }
}

/// Clamp a raw team-1 score into a probability pair summing to 100.
pub fn probability_pair(raw: f64) -> (f64, f64) {
    let p1 = raw.clamp(MIN_PROBABILITY, MAX_PROBABILITY);
    (p1, 100.0 - p1)
}

/// Round to one decimal place
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
