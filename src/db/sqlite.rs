use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use super::models::*;
use super::{
    grade_predictions, grade_props, winner_code, AccuracyReport, AccuracySummary, GradedProp,
    PropAccuracyReport, Store,
};

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at the given path.
    /// `":memory:"` gives a throwaway database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn records(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<PredictionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, map_prediction_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn save_prediction(&self, p: &Prediction) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (
                game_id, game_date, home_team, away_team,
                home_win_prob, away_win_prob,
                predicted_home_score, predicted_away_score,
                confidence, weather_condition, weather_temp, prediction_time
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
             ON CONFLICT(game_id, game_date) DO UPDATE SET
                home_team=excluded.home_team,
                away_team=excluded.away_team,
                home_win_prob=excluded.home_win_prob,
                away_win_prob=excluded.away_win_prob,
                predicted_home_score=excluded.predicted_home_score,
                predicted_away_score=excluded.predicted_away_score,
                confidence=excluded.confidence,
                weather_condition=excluded.weather_condition,
                weather_temp=excluded.weather_temp,
                prediction_time=excluded.prediction_time",
            params![
                p.game_id,
                p.game_date,
                p.home_team,
                p.away_team,
                p.home_win_prob,
                p.away_win_prob,
                p.predicted_home_score,
                p.predicted_away_score,
                p.confidence,
                p.weather_condition,
                p.weather_temp,
                p.prediction_time,
            ],
        )?;
        Ok(())
    }

    async fn get_predictions_with_results(&self) -> Result<Vec<PredictionRecord>> {
        self.records(
            &format!(
                "{PREDICTION_RECORD_SELECT}
                 ORDER BY p.game_date DESC, p.prediction_time DESC"
            ),
            &[],
        )
    }

    async fn get_recent_predictions(&self, limit: i64) -> Result<Vec<PredictionRecord>> {
        self.records(
            &format!(
                "{PREDICTION_RECORD_SELECT}
                 ORDER BY p.game_date DESC, p.prediction_time DESC LIMIT ?1"
            ),
            &[&limit],
        )
    }

    async fn get_predictions_by_date(&self, date: &str) -> Result<Vec<PredictionRecord>> {
        self.records(
            &format!(
                "{PREDICTION_RECORD_SELECT}
                 WHERE p.game_date = ?1
                 ORDER BY p.prediction_time DESC"
            ),
            &[&date],
        )
    }

    async fn get_pending_predictions(&self) -> Result<Vec<Prediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
                    p.home_win_prob, p.away_win_prob,
                    p.predicted_home_score, p.predicted_away_score,
                    p.confidence, p.weather_condition, p.weather_temp, p.prediction_time
             FROM predictions p
             LEFT JOIN actual_results r ON p.game_id = r.game_id
             WHERE r.home_score IS NULL
             ORDER BY p.game_date DESC",
        )?;
        let rows = stmt
            .query_map([], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn get_historical_accuracy(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<PredictionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
                    p.home_win_prob, p.away_win_prob,
                    p.predicted_home_score, p.predicted_away_score,
                    p.confidence, p.weather_condition, p.weather_temp, p.prediction_time,
                    r.home_score, r.away_score, r.winner,
                    CASE WHEN
                      (p.predicted_home_score > p.predicted_away_score AND r.winner = p.home_team) OR
                      (p.predicted_away_score > p.predicted_home_score AND r.winner = p.away_team)
                    THEN 1 ELSE 0 END AS prediction_correct
             FROM predictions p
             INNER JOIN actual_results r ON p.game_id = r.game_id
             WHERE (?1 IS NULL OR p.game_date >= ?1)
               AND (?2 IS NULL OR p.game_date <= ?2)
             ORDER BY p.game_date DESC",
        )?;
        let rows = stmt
            .query_map(params![start_date, end_date], |row| {
                let mut rec = map_prediction_record(row)?;
                rec.prediction_correct = Some(row.get::<_, bool>(16)?);
                Ok(rec)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn save_actual_result(
        &self,
        game_id: &str,
        game_date: &str,
        home_team: &str,
        away_team: &str,
        home_score: i32,
        away_score: i32,
    ) -> Result<()> {
        let winner = winner_code(home_team, away_team, home_score, away_score);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO actual_results (
                game_id, game_date, home_team, away_team,
                home_score, away_score, winner, updated_time
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
             ON CONFLICT(game_id) DO UPDATE SET
                game_date=excluded.game_date,
                home_team=excluded.home_team,
                away_team=excluded.away_team,
                home_score=excluded.home_score,
                away_score=excluded.away_score,
                winner=excluded.winner,
                updated_time=excluded.updated_time",
            params![
                game_id,
                game_date,
                home_team,
                away_team,
                home_score,
                away_score,
                winner,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    async fn get_actual_result(&self, game_id: &str) -> Result<Option<ActualResult>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, game_id, game_date, home_team, away_team,
                    home_score, away_score, winner, updated_time
             FROM actual_results WHERE game_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![game_id], map_actual_result)?;
        let result = rows.next().transpose()?;
        Ok(result)
    }

    async fn calculate_accuracy(&self) -> Result<AccuracyReport> {
        let mut conn = self.conn.lock().unwrap();

        let completed = {
            let mut stmt = conn.prepare(&format!(
                "{PREDICTION_RECORD_SELECT} WHERE r.home_score IS NOT NULL"
            ))?;
            let rows = stmt
                .query_map([], map_prediction_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let total_predictions: i64 =
            conn.query_row("SELECT COUNT(*) FROM predictions", [], |r| r.get(0))?;

        let report = grade_predictions(total_predictions, &completed);
        if completed.is_empty() {
            return Ok(report);
        }

        let s = report.to_summary(Utc::now());
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM accuracy_summary", [])?;
        tx.execute(
            "INSERT INTO accuracy_summary (
                total_predictions, total_completed, winner_correct, winner_accuracy,
                avg_home_score_diff, avg_away_score_diff,
                high_confidence_correct, high_confidence_total,
                medium_confidence_correct, medium_confidence_total,
                low_confidence_correct, low_confidence_total,
                last_updated
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                s.total_predictions,
                s.total_completed,
                s.winner_correct,
                s.winner_accuracy,
                s.avg_home_score_diff,
                s.avg_away_score_diff,
                s.high_confidence_correct,
                s.high_confidence_total,
                s.medium_confidence_correct,
                s.medium_confidence_total,
                s.low_confidence_correct,
                s.low_confidence_total,
                s.last_updated,
            ],
        )?;
        tx.commit()?;

        Ok(report)
    }

    async fn get_accuracy_summary(&self) -> Result<Option<AccuracySummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT total_predictions, total_completed, winner_correct, winner_accuracy,
                    avg_home_score_diff, avg_away_score_diff,
                    high_confidence_correct, high_confidence_total,
                    medium_confidence_correct, medium_confidence_total,
                    low_confidence_correct, low_confidence_total, last_updated
             FROM accuracy_summary ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], map_accuracy_summary)?;
        let summary = rows.next().transpose()?;
        Ok(summary)
    }

    async fn save_prop_prediction(&self, p: &PropPrediction) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prop_predictions (
                game_id, game_date, player_name, team, position,
                prop_type, line, prediction, confidence, prediction_time
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
             ON CONFLICT(game_id, player_name, prop_type) DO UPDATE SET
                game_date=excluded.game_date,
                team=excluded.team,
                position=excluded.position,
                line=excluded.line,
                prediction=excluded.prediction,
                confidence=excluded.confidence,
                prediction_time=excluded.prediction_time",
            params![
                p.game_id,
                p.game_date,
                p.player_name,
                p.team,
                p.position,
                p.prop_type,
                p.line,
                p.prediction,
                p.confidence,
                p.prediction_time,
            ],
        )?;
        Ok(())
    }

    async fn save_prop_result(
        &self,
        game_id: &str,
        player_name: &str,
        prop_type: &str,
        actual_value: f64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prop_results (game_id, player_name, prop_type, actual_value, updated_time)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(game_id, player_name, prop_type) DO UPDATE SET
                actual_value=excluded.actual_value,
                updated_time=excluded.updated_time",
            params![game_id, player_name, prop_type, actual_value, Utc::now()],
        )?;
        Ok(())
    }

    async fn get_pending_prop_predictions(&self) -> Result<Vec<PropPrediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT pp.id, pp.game_id, pp.game_date, pp.player_name, pp.team, pp.position,
                    pp.prop_type, pp.line, pp.prediction, pp.confidence, pp.prediction_time
             FROM prop_predictions pp
             LEFT JOIN prop_results pr ON pp.game_id = pr.game_id
               AND pp.player_name = pr.player_name
               AND pp.prop_type = pr.prop_type
             WHERE pr.actual_value IS NULL
             ORDER BY pp.game_date DESC",
        )?;
        let rows = stmt
            .query_map([], map_prop_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn calculate_prop_accuracy(&self) -> Result<PropAccuracyReport> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT p.prediction, p.confidence, p.line, r.actual_value
             FROM prop_predictions p
             INNER JOIN prop_results r ON p.game_id = r.game_id
               AND p.player_name = r.player_name
               AND p.prop_type = r.prop_type",
        )?;
        let graded = stmt
            .query_map([], |row| {
                Ok(GradedProp {
                    prediction: row.get(0)?,
                    confidence: row.get(1)?,
                    line: row.get(2)?,
                    actual_value: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let total_props: i64 =
            conn.query_row("SELECT COUNT(*) FROM prop_predictions", [], |r| r.get(0))?;

        Ok(grade_props(total_props, &graded))
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const PREDICTION_RECORD_SELECT: &str = "
    SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
           p.home_win_prob, p.away_win_prob,
           p.predicted_home_score, p.predicted_away_score,
           p.confidence, p.weather_condition, p.weather_temp, p.prediction_time,
           r.home_score, r.away_score, r.winner
    FROM predictions p
    LEFT JOIN actual_results r ON p.game_id = r.game_id";

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<Prediction> {
    Ok(Prediction {
        id: row.get(0)?,
        game_id: row.get(1)?,
        game_date: row.get(2)?,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        home_win_prob: row.get(5)?,
        away_win_prob: row.get(6)?,
        predicted_home_score: row.get(7)?,
        predicted_away_score: row.get(8)?,
        confidence: row.get(9)?,
        weather_condition: row.get(10)?,
        weather_temp: row.get(11)?,
        prediction_time: row.get(12)?,
    })
}

fn map_prediction_record(row: &rusqlite::Row) -> rusqlite::Result<PredictionRecord> {
    Ok(PredictionRecord {
        prediction: map_prediction(row)?,
        actual_home_score: row.get(13)?,
        actual_away_score: row.get(14)?,
        actual_winner: row.get(15)?,
        prediction_correct: None,
    })
}

fn map_actual_result(row: &rusqlite::Row) -> rusqlite::Result<ActualResult> {
    Ok(ActualResult {
        id: row.get(0)?,
        game_id: row.get(1)?,
        game_date: row.get(2)?,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        home_score: row.get(5)?,
        away_score: row.get(6)?,
        winner: row.get(7)?,
        updated_time: row.get(8)?,
    })
}

fn map_prop_prediction(row: &rusqlite::Row) -> rusqlite::Result<PropPrediction> {
    Ok(PropPrediction {
        id: row.get(0)?,
        game_id: row.get(1)?,
        game_date: row.get(2)?,
        player_name: row.get(3)?,
        team: row.get(4)?,
        position: row.get(5)?,
        prop_type: row.get(6)?,
        line: row.get(7)?,
        prediction: row.get(8)?,
        confidence: row.get(9)?,
        prediction_time: row.get(10)?,
    })
}

fn map_accuracy_summary(row: &rusqlite::Row) -> rusqlite::Result<AccuracySummary> {
    Ok(AccuracySummary {
        total_predictions: row.get(0)?,
        total_completed: row.get(1)?,
        winner_correct: row.get(2)?,
        winner_accuracy: row.get(3)?,
        avg_home_score_diff: row.get(4)?,
        avg_away_score_diff: row.get(5)?,
        high_confidence_correct: row.get(6)?,
        high_confidence_total: row.get(7)?,
        medium_confidence_correct: row.get(8)?,
        medium_confidence_total: row.get(9)?,
        low_confidence_correct: row.get(10)?,
        low_confidence_total: row.get(11)?,
        last_updated: row.get(12)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id              TEXT    NOT NULL,
    game_date            TEXT    NOT NULL,
    home_team            TEXT    NOT NULL,
    away_team            TEXT    NOT NULL,
    home_win_prob        REAL    NOT NULL,
    away_win_prob        REAL    NOT NULL,
    predicted_home_score INTEGER NOT NULL,
    predicted_away_score INTEGER NOT NULL,
    confidence           TEXT    NOT NULL,
    weather_condition    TEXT,
    weather_temp         INTEGER,
    prediction_time      TEXT    NOT NULL,
    UNIQUE(game_id, game_date)
);

CREATE TABLE IF NOT EXISTS actual_results (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id      TEXT    NOT NULL UNIQUE,
    game_date    TEXT    NOT NULL,
    home_team    TEXT    NOT NULL,
    away_team    TEXT    NOT NULL,
    home_score   INTEGER NOT NULL,
    away_score   INTEGER NOT NULL,
    winner       TEXT    NOT NULL,
    updated_time TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS accuracy_summary (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    total_predictions         INTEGER NOT NULL DEFAULT 0,
    total_completed           INTEGER NOT NULL DEFAULT 0,
    winner_correct            INTEGER NOT NULL DEFAULT 0,
    winner_accuracy           REAL    NOT NULL DEFAULT 0,
    avg_home_score_diff       REAL    NOT NULL DEFAULT 0,
    avg_away_score_diff       REAL    NOT NULL DEFAULT 0,
    high_confidence_correct   INTEGER NOT NULL DEFAULT 0,
    high_confidence_total     INTEGER NOT NULL DEFAULT 0,
    medium_confidence_correct INTEGER NOT NULL DEFAULT 0,
    medium_confidence_total   INTEGER NOT NULL DEFAULT 0,
    low_confidence_correct    INTEGER NOT NULL DEFAULT 0,
    low_confidence_total      INTEGER NOT NULL DEFAULT 0,
    last_updated              TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS prop_predictions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id         TEXT    NOT NULL,
    game_date       TEXT    NOT NULL,
    player_name     TEXT    NOT NULL,
    team            TEXT    NOT NULL,
    position        TEXT    NOT NULL,
    prop_type       TEXT    NOT NULL,
    line            REAL    NOT NULL,
    prediction      TEXT    NOT NULL,
    confidence      TEXT    NOT NULL,
    prediction_time TEXT    NOT NULL,
    UNIQUE(game_id, player_name, prop_type)
);

CREATE TABLE IF NOT EXISTS prop_results (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id      TEXT    NOT NULL,
    player_name  TEXT    NOT NULL,
    prop_type    TEXT    NOT NULL,
    actual_value REAL    NOT NULL,
    updated_time TEXT    NOT NULL,
    UNIQUE(game_id, player_name, prop_type)
);

CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(game_date);
CREATE INDEX IF NOT EXISTS idx_prop_predictions_game ON prop_predictions(game_id);
"#;
