//! Prediction, result and prop storage.
//!
//! Every backend implements [`Store`]. SQLite serves local runs; Postgres is
//! selected when a `POSTGRES_URL` is configured. Grading math lives here so
//! both backends report the same numbers.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub mod models;
pub mod postgres;
pub mod sqlite;

use models::*;
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Shared handle to the configured backend
pub type Database = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// "sqlite" | "postgres"
    fn backend(&self) -> &'static str;

    /// Insert or replace the prediction for (game_id, game_date)
    async fn save_prediction(&self, p: &Prediction) -> Result<()>;

    /// All predictions with their results (if any), newest game first
    async fn get_predictions_with_results(&self) -> Result<Vec<PredictionRecord>>;

    /// Last `limit` predictions with their results
    async fn get_recent_predictions(&self, limit: i64) -> Result<Vec<PredictionRecord>>;

    /// Predictions for one game day
    async fn get_predictions_by_date(&self, date: &str) -> Result<Vec<PredictionRecord>>;

    /// Predictions whose game has no recorded result yet
    async fn get_pending_predictions(&self) -> Result<Vec<Prediction>>;

    /// Graded predictions, optionally bounded by game date (inclusive).
    /// `prediction_correct` compares the predicted-score winner with the actual winner code.
    async fn get_historical_accuracy(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<PredictionRecord>>;

    /// Record a final score; the winner is derived from the scores
    async fn save_actual_result(
        &self,
        game_id: &str,
        game_date: &str,
        home_team: &str,
        away_team: &str,
        home_score: i32,
        away_score: i32,
    ) -> Result<()>;

    async fn get_actual_result(&self, game_id: &str) -> Result<Option<ActualResult>>;

    /// Grade every prediction that has a result and rebuild `accuracy_summary`
    async fn calculate_accuracy(&self) -> Result<AccuracyReport>;

    /// The last persisted accuracy snapshot
    async fn get_accuracy_summary(&self) -> Result<Option<AccuracySummary>>;

    /// Insert or replace a prop pick for (game_id, player_name, prop_type)
    async fn save_prop_prediction(&self, p: &PropPrediction) -> Result<()>;

    /// Record the observed value for a prop
    async fn save_prop_result(
        &self,
        game_id: &str,
        player_name: &str,
        prop_type: &str,
        actual_value: f64,
    ) -> Result<()>;

    /// Prop picks that have not been graded yet
    async fn get_pending_prop_predictions(&self) -> Result<Vec<PropPrediction>>;

    /// Grade every prop pick that has a result
    async fn calculate_prop_accuracy(&self) -> Result<PropAccuracyReport>;
}

/// Postgres when `postgres_url` is given, otherwise the SQLite file at `sqlite_path`
pub async fn connect(
    postgres_url: Option<&str>,
    max_connections: u32,
    sqlite_path: &str,
) -> Result<Database> {
    match postgres_url {
        Some(url) => {
            let store = PgStore::connect(url, max_connections).await?;
            info!("🗄️  Using PostgreSQL database");
            Ok(Arc::new(store))
        }
        None => {
            let store = SqliteStore::open(sqlite_path)?;
            info!("🗄️  Using SQLite database: {}", sqlite_path);
            Ok(Arc::new(store))
        }
    }
}

/// Throwaway SQLite database
#[cfg(test)]
pub fn in_memory() -> Database {
    Arc::new(SqliteStore::open(":memory:").unwrap())
}

/// OVER hits on actual > line, UNDER on actual < line. PASS never hits.
pub fn prop_hit(pick: &str, line: f64, actual: f64) -> bool {
    match pick {
        "OVER" => actual > line,
        "UNDER" => actual < line,
        _ => false,
    }
}

/// Winning team code, or "TIE"
pub fn winner_code(home: &str, away: &str, home_score: i32, away_score: i32) -> String {
    if home_score > away_score {
        home.to_string()
    } else if away_score > home_score {
        away.to_string()
    } else {
        "TIE".to_string()
    }
}

// ── Grading ───────────────────────────────────────────────────────────────────

/// Winner and score accuracy over predictions that have a result.
/// The favourite is the side with the higher win probability.
pub fn grade_predictions(total_predictions: i64, completed: &[PredictionRecord]) -> AccuracyReport {
    if completed.is_empty() {
        return AccuracyReport {
            total_predictions,
            ..AccuracyReport::default()
        };
    }

    let mut winner_correct = 0i64;
    let mut home_diff = 0i64;
    let mut away_diff = 0i64;
    let mut buckets = seeded_buckets();

    for rec in completed {
        let p = &rec.prediction;
        let predicted_winner = if p.home_win_prob > p.away_win_prob {
            &p.home_team
        } else {
            &p.away_team
        };
        let hit = rec.actual_winner.as_deref() == Some(predicted_winner.as_str());
        let bucket = buckets.entry(p.confidence.clone()).or_default();
        bucket.total += 1;
        if hit {
            winner_correct += 1;
            bucket.correct += 1;
        }
        home_diff += (p.predicted_home_score - rec.actual_home_score.unwrap_or(0)).abs() as i64;
        away_diff += (p.predicted_away_score - rec.actual_away_score.unwrap_or(0)).abs() as i64;
    }

    let n = completed.len() as f64;
    AccuracyReport {
        total_predictions,
        total_completed: completed.len() as i64,
        winner_correct,
        winner_accuracy: percent(winner_correct, completed.len() as i64),
        avg_home_score_diff: round1(home_diff as f64 / n),
        avg_away_score_diff: round1(away_diff as f64 / n),
        avg_total_score_diff: round1((home_diff + away_diff) as f64 / (n * 2.0)),
        by_confidence: finish_buckets(buckets),
    }
}

/// A prop pick joined with its observed value
#[derive(Debug, Clone)]
pub struct GradedProp {
    pub prediction: String,
    pub confidence: String,
    pub line: f64,
    pub actual_value: f64,
}

pub fn grade_props(total_props: i64, graded: &[GradedProp]) -> PropAccuracyReport {
    if graded.is_empty() {
        return PropAccuracyReport {
            total_props,
            ..PropAccuracyReport::default()
        };
    }

    let mut correct = 0i64;
    let mut buckets = seeded_buckets();
    for g in graded {
        let bucket = buckets.entry(g.confidence.clone()).or_default();
        bucket.total += 1;
        if prop_hit(&g.prediction, g.line, g.actual_value) {
            correct += 1;
            bucket.correct += 1;
        }
    }

    PropAccuracyReport {
        total_props,
        total_completed: graded.len() as i64,
        correct_predictions: correct,
        accuracy: percent(correct, graded.len() as i64),
        by_confidence: finish_buckets(buckets),
    }
}

impl AccuracyReport {
    /// Snapshot row written to `accuracy_summary`
    pub fn to_summary(&self, last_updated: DateTime<Utc>) -> AccuracySummary {
        let bucket = |label: &str| self.by_confidence.get(label).cloned().unwrap_or_default();
        let (high, medium, low) = (bucket("High"), bucket("Medium"), bucket("Low"));
        AccuracySummary {
            total_predictions: self.total_predictions,
            total_completed: self.total_completed,
            winner_correct: self.winner_correct,
            winner_accuracy: self.winner_accuracy,
            avg_home_score_diff: self.avg_home_score_diff,
            avg_away_score_diff: self.avg_away_score_diff,
            high_confidence_correct: high.correct,
            high_confidence_total: high.total,
            medium_confidence_correct: medium.correct,
            medium_confidence_total: medium.total,
            low_confidence_correct: low.correct,
            low_confidence_total: low.total,
            last_updated,
        }
    }
}

fn seeded_buckets() -> BTreeMap<String, ConfidenceBucket> {
    ["High", "Medium", "Low"]
        .into_iter()
        .map(|label| (label.to_string(), ConfidenceBucket::default()))
        .collect()
}

fn finish_buckets(
    mut buckets: BTreeMap<String, ConfidenceBucket>,
) -> BTreeMap<String, ConfidenceBucket> {
    for bucket in buckets.values_mut() {
        bucket.accuracy = percent(bucket.correct, bucket.total);
    }
    buckets
}

fn percent(correct: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(correct as f64 / total as f64 * 100.0)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBucket {
    pub correct: i64,
    pub total: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    pub total_predictions: i64,
    pub total_completed: i64,
    pub winner_correct: i64,
    pub winner_accuracy: f64,
    pub avg_home_score_diff: f64,
    pub avg_away_score_diff: f64,
    pub avg_total_score_diff: f64,
    pub by_confidence: BTreeMap<String, ConfidenceBucket>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropAccuracyReport {
    pub total_props: i64,
    pub total_completed: i64,
    pub correct_predictions: i64,
    pub accuracy: f64,
    pub by_confidence: BTreeMap<String, ConfidenceBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub total_predictions: i64,
    pub total_completed: i64,
    pub winner_correct: i64,
    pub winner_accuracy: f64,
    pub avg_home_score_diff: f64,
    pub avg_away_score_diff: f64,
    pub high_confidence_correct: i64,
    pub high_confidence_total: i64,
    pub medium_confidence_correct: i64,
    pub medium_confidence_total: i64,
    pub low_confidence_correct: i64,
    pub low_confidence_total: i64,
    pub last_updated: DateTime<Utc>,
}

/// Behaviour every backend must share, run against any [`Database`]
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use approx::assert_relative_eq;

    pub fn prediction(game_id: &str, date: &str, home_prob: f64, confidence: &str) -> Prediction {
        Prediction {
            id: None,
            game_id: game_id.into(),
            game_date: date.into(),
            home_team: "KC".into(),
            away_team: "BUF".into(),
            home_win_prob: home_prob,
            away_win_prob: 100.0 - home_prob,
            predicted_home_score: 27,
            predicted_away_score: 20,
            confidence: confidence.into(),
            weather_condition: Some("Clear".into()),
            weather_temp: Some(55),
            prediction_time: Utc::now(),
        }
    }

    pub fn prop(player: &str, prop_type: &str, pick: &str, line: f64, confidence: &str) -> PropPrediction {
        PropPrediction {
            id: None,
            game_id: "g1".into(),
            game_date: "2025-11-02".into(),
            player_name: player.into(),
            team: "KC".into(),
            position: "QB".into(),
            prop_type: prop_type.into(),
            line,
            prediction: pick.into(),
            confidence: confidence.into(),
            prediction_time: Utc::now(),
        }
    }

    /// Predictions, results and props written through the trait come back
    /// with the same upsert and grading behaviour. Expects an empty database.
    pub async fn round_trip(db: &Database) {
        db.save_prediction(&prediction("g1", "2025-11-02", 60.0, "Low")).await.unwrap();
        db.save_prediction(&prediction("g1", "2025-11-02", 80.0, "High")).await.unwrap();
        db.save_prediction(&prediction("g2", "2025-11-09", 58.0, "Low")).await.unwrap();

        let day = db.get_predictions_by_date("2025-11-02").await.unwrap();
        assert_eq!(day.len(), 1);
        assert_relative_eq!(day[0].prediction.home_win_prob, 80.0, epsilon = 1e-9);
        assert_eq!(day[0].prediction.weather_temp, Some(55));
        assert_eq!(db.get_recent_predictions(10).await.unwrap().len(), 2);

        db.save_actual_result("g1", "2025-11-02", "KC", "BUF", 10, 31).await.unwrap();
        db.save_actual_result("g1", "2025-11-02", "KC", "BUF", 30, 20).await.unwrap();
        let result = db.get_actual_result("g1").await.unwrap().expect("result stored");
        assert_eq!((result.home_score, result.winner.as_str()), (30, "KC"));
        assert!(db.get_actual_result("missing").await.unwrap().is_none());

        let pending = db.get_pending_predictions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].game_id, "g2");

        let graded = db.get_historical_accuracy(Some("2025-11-01"), None).await.unwrap();
        assert_eq!(graded.len(), 1);
        assert_eq!(graded[0].prediction_correct, Some(true));
        assert!(db
            .get_historical_accuracy(None, Some("2025-11-01"))
            .await
            .unwrap()
            .is_empty());
        let all = db.get_predictions_with_results().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].prediction.game_id, "g2");
        assert!(all[0].actual_winner.is_none());

        let report = db.calculate_accuracy().await.unwrap();
        assert_eq!((report.total_predictions, report.total_completed), (2, 1));
        assert_eq!(report.winner_correct, 1);
        db.calculate_accuracy().await.unwrap();
        let summary = db.get_accuracy_summary().await.unwrap().expect("summary row");
        assert_eq!(summary.high_confidence_correct, 1);
        assert_relative_eq!(summary.winner_accuracy, 100.0, epsilon = 1e-9);

        db.save_prop_prediction(&prop("Patrick Mahomes", "Passing Yards", "OVER", 250.0, "High"))
            .await
            .unwrap();
        db.save_prop_prediction(&prop("Patrick Mahomes", "Passing Yards", "OVER", 255.0, "High"))
            .await
            .unwrap();
        db.save_prop_prediction(&prop("Isiah Pacheco", "Rushing Yards", "UNDER", 60.0, "Medium"))
            .await
            .unwrap();
        assert_eq!(db.get_pending_prop_predictions().await.unwrap().len(), 2);

        db.save_prop_result("g1", "Patrick Mahomes", "Passing Yards", 301.0).await.unwrap();
        db.save_prop_result("g1", "Isiah Pacheco", "Rushing Yards", 75.0).await.unwrap();
        assert!(db.get_pending_prop_predictions().await.unwrap().is_empty());

        let props = db.calculate_prop_accuracy().await.unwrap();
        assert_eq!((props.total_props, props.total_completed), (2, 2));
        assert_eq!(props.correct_predictions, 1);
        assert_relative_eq!(props.accuracy, 50.0, epsilon = 1e-9);
    }
}

#[cfg(test)]
mod tests {
    use super::conformance::{prediction, round_trip};
    use super::*;
    use approx::assert_relative_eq;

    fn record(p: Prediction, scores: Option<(i32, i32)>) -> PredictionRecord {
        PredictionRecord {
            actual_winner: scores.map(|(h, a)| winner_code(&p.home_team, &p.away_team, h, a)),
            actual_home_score: scores.map(|s| s.0),
            actual_away_score: scores.map(|s| s.1),
            prediction: p,
            prediction_correct: None,
        }
    }

    #[test]
    fn test_winner_derivation() {
        assert_eq!(winner_code("KC", "BUF", 24, 21), "KC");
        assert_eq!(winner_code("KC", "BUF", 17, 21), "BUF");
        assert_eq!(winner_code("KC", "BUF", 20, 20), "TIE");
    }

    #[test]
    fn test_prop_grading_rules() {
        assert!(prop_hit("OVER", 250.0, 251.0));
        assert!(!prop_hit("OVER", 250.0, 250.0));
        assert!(prop_hit("UNDER", 250.0, 249.0));
        assert!(!prop_hit("UNDER", 250.0, 250.0));
        assert!(!prop_hit("PASS", 250.0, 400.0));
        assert!(!prop_hit("PASS", 250.0, 10.0));
    }

    #[test]
    fn test_grade_predictions_buckets_and_diffs() {
        // KC favoured in both; g1 KC wins, g2 BUF wins
        let completed = vec![
            record(prediction("g1", "2025-11-02", 80.0, "High"), Some((30, 20))),
            record(prediction("g2", "2025-11-09", 58.0, "Low"), Some((17, 24))),
        ];
        let report = grade_predictions(3, &completed);
        assert_eq!(report.total_completed, 2);
        assert_eq!(report.winner_correct, 1);
        assert_relative_eq!(report.winner_accuracy, 50.0, epsilon = 1e-9);
        // home |27-30| + |27-17| = 13, away |20-20| + |20-24| = 4
        assert_relative_eq!(report.avg_home_score_diff, 6.5, epsilon = 1e-9);
        assert_relative_eq!(report.avg_away_score_diff, 2.0, epsilon = 1e-9);
        assert_relative_eq!(report.avg_total_score_diff, 4.3, epsilon = 1e-9);

        let summary = report.to_summary(Utc::now());
        assert_eq!((summary.high_confidence_correct, summary.high_confidence_total), (1, 1));
        assert_eq!((summary.low_confidence_correct, summary.low_confidence_total), (0, 1));
        assert_eq!(summary.medium_confidence_total, 0);

        let empty = grade_predictions(4, &[]);
        assert_eq!(empty.total_predictions, 4);
        assert!(empty.by_confidence.is_empty());
    }

    #[test]
    fn test_grade_props() {
        let graded = vec![
            GradedProp {
                prediction: "OVER".into(),
                confidence: "High".into(),
                line: 250.0,
                actual_value: 301.0,
            },
            GradedProp {
                prediction: "PASS".into(),
                confidence: "Low".into(),
                line: 70.0,
                actual_value: 90.0,
            },
            GradedProp {
                prediction: "UNDER".into(),
                confidence: "Medium".into(),
                line: 60.0,
                actual_value: 75.0,
            },
        ];
        let report = grade_props(3, &graded);
        assert_eq!(report.correct_predictions, 1);
        assert_relative_eq!(report.accuracy, 33.3, epsilon = 1e-9);
        assert_eq!(report.by_confidence["Low"].total, 1);
    }

    #[tokio::test]
    async fn test_store_round_trip_sqlite() {
        let db = in_memory();
        assert_eq!(db.backend(), "sqlite");
        round_trip(&db).await;
    }

    /// Needs a scratch Postgres: `POSTGRES_URL=... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_store_round_trip_postgres() {
        let url = std::env::var("POSTGRES_URL").expect("POSTGRES_URL for the Postgres round trip");
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.clear().await.unwrap();
        let db: Database = Arc::new(store);
        assert_eq!(db.backend(), "postgres");
        round_trip(&db).await;
    }
}
