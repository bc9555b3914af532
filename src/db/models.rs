use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which league a game or prediction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Nfl,
    Nba,
}

impl League {
    pub fn as_str(&self) -> &'static str {
        match self {
            League::Nfl => "nfl",
            League::Nba => "nba",
        }
    }
}

/// A stored game prediction (one row of `predictions`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Option<i64>,
    /// External (ESPN) event ID
    pub game_id: String,
    /// Game day in US Eastern time, YYYY-MM-DD
    pub game_date: String,
    pub home_team: String,
    pub away_team: String,
    /// Home win probability in percent (15.0–85.0)
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub predicted_home_score: i32,
    pub predicted_away_score: i32,
    /// "High" | "Medium" | "Low"
    pub confidence: String,
    pub weather_condition: Option<String>,
    pub weather_temp: Option<i32>,
    pub prediction_time: DateTime<Utc>,
}

/// A prediction joined with its recorded result, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub actual_home_score: Option<i32>,
    pub actual_away_score: Option<i32>,
    /// Winning team code or "TIE"
    pub actual_winner: Option<String>,
    /// Only populated by the historical-accuracy query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_correct: Option<bool>,
}

/// Final score of a completed game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualResult {
    pub id: Option<i64>,
    pub game_id: String,
    pub game_date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    /// Home code, away code, or "TIE"
    pub winner: String,
    pub updated_time: DateTime<Utc>,
}

/// A stored player-prop pick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropPrediction {
    pub id: Option<i64>,
    pub game_id: String,
    pub game_date: String,
    pub player_name: String,
    pub team: String,
    pub position: String,
    /// e.g. "Passing Yards", "Points"
    pub prop_type: String,
    pub line: f64,
    /// "OVER" | "UNDER" | "PASS"
    pub prediction: String,
    /// "High" | "Medium" | "Low"
    pub confidence: String,
    pub prediction_time: DateTime<Utc>,
}

/// One scheduled / live / final game as reported by a schedule provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub league: League,
    pub name: String,
    pub short_name: String,
    /// Kick-off / tip-off as an ISO-8601 UTC timestamp
    pub date: String,
    /// Kick-off day in US Eastern time, YYYY-MM-DD
    pub game_date: String,
    pub status: GameStatus,
    pub home_team: GameTeam,
    pub away_team: GameTeam,
    pub venue: String,
    pub broadcast: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    /// "pre" | "in" | "post"
    pub state: String,
    pub detail: String,
    pub completed: bool,
}

impl GameStatus {
    pub fn is_upcoming_or_live(&self) -> bool {
        self.state == "pre" || self.state == "in"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTeam {
    /// Internal team code (e.g. "KC", "GSW")
    pub code: String,
    pub name: String,
    /// Abbreviation exactly as the provider sent it
    pub abbreviation: String,
    pub score: Option<String>,
    /// Season record summary, "N/A" when missing
    pub record: String,
}

impl GameTeam {
    /// Parsed score, 0 when absent or malformed
    pub fn score_value(&self) -> i32 {
        self.score
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}
