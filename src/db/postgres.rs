use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use super::models::*;
use super::{
    grade_predictions, grade_props, winner_code, AccuracyReport, AccuracySummary, GradedProp,
    PropAccuracyReport, Store,
};

/// Postgres backend for hosted deployments. Same tables and upsert keys as
/// the SQLite schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Connected to PostgreSQL");

        let store = PgStore { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create tables and indexes (idempotent)
    async fn run_migrations(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Empty every table
    #[cfg(test)]
    pub async fn clear(&self) -> Result<()> {
        sqlx::query(
            "TRUNCATE predictions, actual_results, accuracy_summary, prop_predictions, prop_results",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn save_prediction(&self, p: &Prediction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO predictions (
                game_id, game_date, home_team, away_team,
                home_win_prob, away_win_prob,
                predicted_home_score, predicted_away_score,
                confidence, weather_condition, weather_temp, prediction_time
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (game_id, game_date) DO UPDATE SET
                home_team = EXCLUDED.home_team,
                away_team = EXCLUDED.away_team,
                home_win_prob = EXCLUDED.home_win_prob,
                away_win_prob = EXCLUDED.away_win_prob,
                predicted_home_score = EXCLUDED.predicted_home_score,
                predicted_away_score = EXCLUDED.predicted_away_score,
                confidence = EXCLUDED.confidence,
                weather_condition = EXCLUDED.weather_condition,
                weather_temp = EXCLUDED.weather_temp,
                prediction_time = EXCLUDED.prediction_time
            "#,
        )
        .bind(&p.game_id)
        .bind(&p.game_date)
        .bind(&p.home_team)
        .bind(&p.away_team)
        .bind(p.home_win_prob)
        .bind(p.away_win_prob)
        .bind(p.predicted_home_score)
        .bind(p.predicted_away_score)
        .bind(&p.confidence)
        .bind(&p.weather_condition)
        .bind(p.weather_temp)
        .bind(p.prediction_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_predictions_with_results(&self) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(&format!(
            "{PREDICTION_RECORD_SELECT} ORDER BY p.game_date DESC, p.prediction_time DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, map_prediction_record)
    }

    async fn get_recent_predictions(&self, limit: i64) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(&format!(
            "{PREDICTION_RECORD_SELECT} ORDER BY p.game_date DESC, p.prediction_time DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, map_prediction_record)
    }

    async fn get_predictions_by_date(&self, date: &str) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(&format!(
            "{PREDICTION_RECORD_SELECT} WHERE p.game_date = $1 ORDER BY p.prediction_time DESC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, map_prediction_record)
    }

    async fn get_pending_predictions(&self) -> Result<Vec<Prediction>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
                   p.home_win_prob, p.away_win_prob,
                   p.predicted_home_score, p.predicted_away_score,
                   p.confidence, p.weather_condition, p.weather_temp, p.prediction_time
            FROM predictions p
            LEFT JOIN actual_results r ON p.game_id = r.game_id
            WHERE r.home_score IS NULL
            ORDER BY p.game_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, map_prediction)
    }

    async fn get_historical_accuracy(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
                   p.home_win_prob, p.away_win_prob,
                   p.predicted_home_score, p.predicted_away_score,
                   p.confidence, p.weather_condition, p.weather_temp, p.prediction_time,
                   r.home_score AS actual_home_score,
                   r.away_score AS actual_away_score,
                   r.winner AS actual_winner,
                   ((p.predicted_home_score > p.predicted_away_score AND r.winner = p.home_team) OR
                    (p.predicted_away_score > p.predicted_home_score AND r.winner = p.away_team))
                     AS prediction_correct
            FROM predictions p
            INNER JOIN actual_results r ON p.game_id = r.game_id
            WHERE ($1::TEXT IS NULL OR p.game_date >= $1)
              AND ($2::TEXT IS NULL OR p.game_date <= $2)
            ORDER BY p.game_date DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, |row| {
            let mut rec = map_prediction_record(row)?;
            rec.prediction_correct = Some(row.try_get("prediction_correct")?);
            Ok(rec)
        })
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
        sqlx::query(
            r#"
            INSERT INTO actual_results (
                game_id, game_date, home_team, away_team,
                home_score, away_score, winner, updated_time
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (game_id) DO UPDATE SET
                game_date = EXCLUDED.game_date,
                home_team = EXCLUDED.home_team,
                away_team = EXCLUDED.away_team,
                home_score = EXCLUDED.home_score,
                away_score = EXCLUDED.away_score,
                winner = EXCLUDED.winner,
                updated_time = EXCLUDED.updated_time
            "#,
        )
        .bind(game_id)
        .bind(game_date)
        .bind(home_team)
        .bind(away_team)
        .bind(home_score)
        .bind(away_score)
        .bind(winner)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_actual_result(&self, game_id: &str) -> Result<Option<ActualResult>> {
        let row = sqlx::query(
            r#"
            SELECT id, game_id, game_date, home_team, away_team,
                   home_score, away_score, winner, updated_time
            FROM actual_results WHERE game_id = $1
            "#,
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_actual_result).transpose()?)
    }

    async fn calculate_accuracy(&self) -> Result<AccuracyReport> {
        let rows = sqlx::query(&format!(
            "{PREDICTION_RECORD_SELECT} WHERE r.home_score IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;
        let completed = map_rows(&rows, map_prediction_record)?;
        let total_predictions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await?;

        let report = grade_predictions(total_predictions, &completed);
        if completed.is_empty() {
            return Ok(report);
        }

        let s = report.to_summary(Utc::now());
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM accuracy_summary")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO accuracy_summary (
                total_predictions, total_completed, winner_correct, winner_accuracy,
                avg_home_score_diff, avg_away_score_diff,
                high_confidence_correct, high_confidence_total,
                medium_confidence_correct, medium_confidence_total,
                low_confidence_correct, low_confidence_total,
                last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(s.total_predictions)
        .bind(s.total_completed)
        .bind(s.winner_correct)
        .bind(s.winner_accuracy)
        .bind(s.avg_home_score_diff)
        .bind(s.avg_away_score_diff)
        .bind(s.high_confidence_correct)
        .bind(s.high_confidence_total)
        .bind(s.medium_confidence_correct)
        .bind(s.medium_confidence_total)
        .bind(s.low_confidence_correct)
        .bind(s.low_confidence_total)
        .bind(s.last_updated)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(report)
    }

    async fn get_accuracy_summary(&self) -> Result<Option<AccuracySummary>> {
        let row = sqlx::query(
            r#"
            SELECT total_predictions, total_completed, winner_correct, winner_accuracy,
                   avg_home_score_diff, avg_away_score_diff,
                   high_confidence_correct, high_confidence_total,
                   medium_confidence_correct, medium_confidence_total,
                   low_confidence_correct, low_confidence_total, last_updated
            FROM accuracy_summary ORDER BY id DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_accuracy_summary).transpose()?)
    }

    async fn save_prop_prediction(&self, p: &PropPrediction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO prop_predictions (
                game_id, game_date, player_name, team, position,
                prop_type, line, prediction, confidence, prediction_time
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (game_id, player_name, prop_type) DO UPDATE SET
                game_date = EXCLUDED.game_date,
                team = EXCLUDED.team,
                position = EXCLUDED.position,
                line = EXCLUDED.line,
                prediction = EXCLUDED.prediction,
                confidence = EXCLUDED.confidence,
                prediction_time = EXCLUDED.prediction_time
            "#,
        )
        .bind(&p.game_id)
        .bind(&p.game_date)
        .bind(&p.player_name)
        .bind(&p.team)
        .bind(&p.position)
        .bind(&p.prop_type)
        .bind(p.line)
        .bind(&p.prediction)
        .bind(&p.confidence)
        .bind(p.prediction_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_prop_result(
        &self,
        game_id: &str,
        player_name: &str,
        prop_type: &str,
        actual_value: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO prop_results (game_id, player_name, prop_type, actual_value, updated_time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (game_id, player_name, prop_type) DO UPDATE SET
                actual_value = EXCLUDED.actual_value,
                updated_time = EXCLUDED.updated_time
            "#,
        )
        .bind(game_id)
        .bind(player_name)
        .bind(prop_type)
        .bind(actual_value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_pending_prop_predictions(&self) -> Result<Vec<PropPrediction>> {
        let rows = sqlx::query(
            r#"
            SELECT pp.id, pp.game_id, pp.game_date, pp.player_name, pp.team, pp.position,
                   pp.prop_type, pp.line, pp.prediction, pp.confidence, pp.prediction_time
            FROM prop_predictions pp
            LEFT JOIN prop_results pr ON pp.game_id = pr.game_id
              AND pp.player_name = pr.player_name
              AND pp.prop_type = pr.prop_type
            WHERE pr.actual_value IS NULL
            ORDER BY pp.game_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        map_rows(&rows, map_prop_prediction)
    }

    async fn calculate_prop_accuracy(&self) -> Result<PropAccuracyReport> {
        let rows = sqlx::query(
            r#"
            SELECT p.prediction, p.confidence, p.line, r.actual_value
            FROM prop_predictions p
            INNER JOIN prop_results r ON p.game_id = r.game_id
              AND p.player_name = r.player_name
              AND p.prop_type = r.prop_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let graded = map_rows(&rows, |row| {
            Ok(GradedProp {
                prediction: row.try_get("prediction")?,
                confidence: row.try_get("confidence")?,
                line: row.try_get("line")?,
                actual_value: row.try_get("actual_value")?,
            })
        })?;
        let total_props: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prop_predictions")
            .fetch_one(&self.pool)
            .await?;

        Ok(grade_props(total_props, &graded))
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const PREDICTION_RECORD_SELECT: &str = "
    SELECT p.id, p.game_id, p.game_date, p.home_team, p.away_team,
           p.home_win_prob, p.away_win_prob,
           p.predicted_home_score, p.predicted_away_score,
           p.confidence, p.weather_condition, p.weather_temp, p.prediction_time,
           r.home_score AS actual_home_score,
           r.away_score AS actual_away_score,
           r.winner AS actual_winner
    FROM predictions p
    LEFT JOIN actual_results r ON p.game_id = r.game_id";

fn map_rows<T>(
    rows: &[PgRow],
    map: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>> {
    Ok(rows.iter().map(map).collect::<Result<Vec<_>, _>>()?)
}

fn map_prediction(row: &PgRow) -> Result<Prediction, sqlx::Error> {
    Ok(Prediction {
        id: Some(row.try_get("id")?),
        game_id: row.try_get("game_id")?,
        game_date: row.try_get("game_date")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        home_win_prob: row.try_get("home_win_prob")?,
        away_win_prob: row.try_get("away_win_prob")?,
        predicted_home_score: row.try_get("predicted_home_score")?,
        predicted_away_score: row.try_get("predicted_away_score")?,
        confidence: row.try_get("confidence")?,
        weather_condition: row.try_get("weather_condition")?,
        weather_temp: row.try_get("weather_temp")?,
        prediction_time: row.try_get("prediction_time")?,
    })
}

fn map_prediction_record(row: &PgRow) -> Result<PredictionRecord, sqlx::Error> {
    Ok(PredictionRecord {
        prediction: map_prediction(row)?,
        actual_home_score: row.try_get("actual_home_score")?,
        actual_away_score: row.try_get("actual_away_score")?,
        actual_winner: row.try_get("actual_winner")?,
        prediction_correct: None,
    })
}

fn map_actual_result(row: &PgRow) -> Result<ActualResult, sqlx::Error> {
    Ok(ActualResult {
        id: Some(row.try_get("id")?),
        game_id: row.try_get("game_id")?,
        game_date: row.try_get("game_date")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        winner: row.try_get("winner")?,
        updated_time: row.try_get("updated_time")?,
    })
}

fn map_prop_prediction(row: &PgRow) -> Result<PropPrediction, sqlx::Error> {
    Ok(PropPrediction {
        id: Some(row.try_get("id")?),
        game_id: row.try_get("game_id")?,
        game_date: row.try_get("game_date")?,
        player_name: row.try_get("player_name")?,
        team: row.try_get("team")?,
        position: row.try_get("position")?,
        prop_type: row.try_get("prop_type")?,
        line: row.try_get("line")?,
        prediction: row.try_get("prediction")?,
        confidence: row.try_get("confidence")?,
        prediction_time: row.try_get("prediction_time")?,
    })
}

fn map_accuracy_summary(row: &PgRow) -> Result<AccuracySummary, sqlx::Error> {
    Ok(AccuracySummary {
        total_predictions: row.try_get("total_predictions")?,
        total_completed: row.try_get("total_completed")?,
        winner_correct: row.try_get("winner_correct")?,
        winner_accuracy: row.try_get("winner_accuracy")?,
        avg_home_score_diff: row.try_get("avg_home_score_diff")?,
        avg_away_score_diff: row.try_get("avg_away_score_diff")?,
        high_confidence_correct: row.try_get("high_confidence_correct")?,
        high_confidence_total: row.try_get("high_confidence_total")?,
        medium_confidence_correct: row.try_get("medium_confidence_correct")?,
        medium_confidence_total: row.try_get("medium_confidence_total")?,
        low_confidence_correct: row.try_get("low_confidence_correct")?,
        low_confidence_total: row.try_get("low_confidence_total")?,
        last_updated: row.try_get("last_updated")?,
    })
}

/// Postgres schema, one statement per entry
const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id                   BIGSERIAL PRIMARY KEY,
        game_id              TEXT             NOT NULL,
        game_date            TEXT             NOT NULL,
        home_team            TEXT             NOT NULL,
        away_team            TEXT             NOT NULL,
        home_win_prob        DOUBLE PRECISION NOT NULL,
        away_win_prob        DOUBLE PRECISION NOT NULL,
        predicted_home_score INTEGER          NOT NULL,
        predicted_away_score INTEGER          NOT NULL,
        confidence           TEXT             NOT NULL,
        weather_condition    TEXT,
        weather_temp         INTEGER,
        prediction_time      TIMESTAMPTZ      NOT NULL,
        UNIQUE (game_id, game_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS actual_results (
        id           BIGSERIAL PRIMARY KEY,
        game_id      TEXT        NOT NULL UNIQUE,
        game_date    TEXT        NOT NULL,
        home_team    TEXT        NOT NULL,
        away_team    TEXT        NOT NULL,
        home_score   INTEGER     NOT NULL,
        away_score   INTEGER     NOT NULL,
        winner       TEXT        NOT NULL,
        updated_time TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accuracy_summary (
        id                        BIGSERIAL PRIMARY KEY,
        total_predictions         BIGINT           NOT NULL DEFAULT 0,
        total_completed           BIGINT           NOT NULL DEFAULT 0,
        winner_correct            BIGINT           NOT NULL DEFAULT 0,
        winner_accuracy           DOUBLE PRECISION NOT NULL DEFAULT 0,
        avg_home_score_diff       DOUBLE PRECISION NOT NULL DEFAULT 0,
        avg_away_score_diff       DOUBLE PRECISION NOT NULL DEFAULT 0,
        high_confidence_correct   BIGINT           NOT NULL DEFAULT 0,
        high_confidence_total     BIGINT           NOT NULL DEFAULT 0,
        medium_confidence_correct BIGINT           NOT NULL DEFAULT 0,
        medium_confidence_total   BIGINT           NOT NULL DEFAULT 0,
        low_confidence_correct    BIGINT           NOT NULL DEFAULT 0,
        low_confidence_total      BIGINT           NOT NULL DEFAULT 0,
        last_updated              TIMESTAMPTZ      NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prop_predictions (
        id              BIGSERIAL PRIMARY KEY,
        game_id         TEXT             NOT NULL,
        game_date       TEXT             NOT NULL,
        player_name     TEXT             NOT NULL,
        team            TEXT             NOT NULL,
        position        TEXT             NOT NULL,
        prop_type       TEXT             NOT NULL,
        line            DOUBLE PRECISION NOT NULL,
        prediction      TEXT             NOT NULL,
        confidence      TEXT             NOT NULL,
        prediction_time TIMESTAMPTZ      NOT NULL,
        UNIQUE (game_id, player_name, prop_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prop_results (
        id           BIGSERIAL PRIMARY KEY,
        game_id      TEXT             NOT NULL,
        player_name  TEXT             NOT NULL,
        prop_type    TEXT             NOT NULL,
        actual_value DOUBLE PRECISION NOT NULL,
        updated_time TIMESTAMPTZ      NOT NULL,
        UNIQUE (game_id, player_name, prop_type)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(game_date)",
    "CREATE INDEX IF NOT EXISTS idx_prop_predictions_game ON prop_predictions(game_id)",
];
