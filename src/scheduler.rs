//! Daily background job: settle yesterday's and today's results, grade
//! pending props, then predict today's games that have no stored pick.

use chrono::{Local, NaiveDate, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::Engine;
use crate::sources::{eastern_today, shift_date};

/// Pause between the job's steps
const STEP_PAUSE: Duration = Duration::from_secs(5);

/// How often the clock is checked
const CHECK_EVERY: Duration = Duration::from_secs(15 * 60);

/// What one run of the daily job changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyRun {
    pub results: usize,
    pub props: usize,
    pub predictions: usize,
}

/// True when the job is due: the local hour matches and it hasn't run today.
pub fn should_run(
    now_hour: u32,
    schedule_hour: u32,
    last_run_date: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    now_hour == schedule_hour && last_run_date != Some(today)
}

/// Start the scheduler unless the config disables it
pub fn start(engine: Arc<Engine>, config: &Config) -> Option<JoinHandle<()>> {
    if config.disable_scheduler {
        info!("⏸️  Daily scheduler disabled");
        return None;
    }
    Some(spawn(engine, config.schedule_hour))
}

/// Check the clock every quarter hour and run the job at most once a day,
/// during the local hour `hour`. The first check happens immediately, so a
/// start inside that hour runs the job right away.
pub fn spawn(engine: Arc<Engine>, hour: u32) -> JoinHandle<()> {
    info!("⏰ Auto-prediction scheduler enabled (runs daily at {}:00)", hour);
    info!("   - Updates completed game results");
    info!("   - Updates player prop results");
    info!("   - Generates predictions for upcoming games");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECK_EVERY);
        let mut last_run: Option<NaiveDate> = None;
        loop {
            interval.tick().await;
            let now = Local::now();
            if should_run(now.hour(), hour, last_run, now.date_naive()) {
                last_run = Some(now.date_naive());
                info!("⏰ Running daily job");
                let run = run_daily(&engine, STEP_PAUSE).await;
                info!(
                    "⏰ Daily job finished: {} results, {} props, {} predictions",
                    run.results, run.props, run.predictions
                );
            }
        }
    })
}

/// One pass of the job. Each step logs its own failure and the rest still run.
pub async fn run_daily(engine: &Engine, pause: Duration) -> DailyRun {
    let mut run = DailyRun::default();

    match engine.db().get_pending_predictions().await {
        Ok(pending) => info!("🔄 Auto-updating results from ESPN ({} pending)...", pending.len()),
        Err(e) => error!("❌ Failed to count pending predictions: {}", e),
    }
    let today = eastern_today();
    let dates = [shift_date(&today, -1), Some(today)];
    for date in dates.iter().flatten() {
        match engine.update_results(date).await {
            Ok(n) => run.results += n,
            Err(e) => error!("❌ Auto-update error for {}: {}", date, e),
        }
    }
    info!("✅ Auto-update complete: {} game results updated", run.results);
    if run.results > 0 {
        log_accuracy(engine).await;
    }

    tokio::time::sleep(pause).await;
    info!("🔄 Auto-updating player prop results...");
    match engine.grade_pending_props().await {
        Ok(n) => {
            run.props = n;
            info!("✅ Auto-prop-update complete: {} prop results updated", n);
        }
        Err(e) => error!("❌ Auto-prop-update error: {}", e),
    }

    tokio::time::sleep(pause).await;
    match engine.auto_predict().await {
        Ok(n) => run.predictions = n,
        Err(e) => error!("❌ Auto-prediction error: {}", e),
    }
    run
}

/// Regrade stored predictions and log the refreshed snapshot
async fn log_accuracy(engine: &Engine) {
    let db = engine.db();
    if let Err(e) = db.calculate_accuracy().await {
        error!("❌ Accuracy recalculation failed: {}", e);
        return;
    }
    match db.get_accuracy_summary().await {
        Ok(Some(s)) => info!(
            "📈 Winner accuracy: {}/{} ({:.1}%)",
            s.winner_correct, s.total_completed, s.winner_accuracy
        ),
        Ok(None) => {}
        Err(e) => error!("❌ Failed to read accuracy summary: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{engine, game};

    #[tokio::test]
    async fn test_daily_run_settles_then_predicts() {
        let engine = engine(vec![
            game("401", "KC", "BUF", "post", Some(("31", "17"))),
            game("402", "DAL", "PHI", "pre", None),
        ]);

        let run = run_daily(&engine, Duration::ZERO).await;
        // The fake schedule returns the same slate for yesterday and today
        assert_eq!(run.results, 2);
        assert_eq!(run.props, 0);
        assert_eq!(run.predictions, 1);

        let result = engine.db().get_actual_result("401").await.unwrap().unwrap();
        assert_eq!(result.winner, "BUF");
        let saved = engine
            .db()
            .get_predictions_by_date("2025-01-12")
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].prediction.game_id, "402");
        // Game 401 had no stored prediction, so no snapshot is written yet
        assert!(engine.db().get_accuracy_summary().await.unwrap().is_none());

        // A second pass finds the prediction already stored
        let again = run_daily(&engine, Duration::ZERO).await;
        assert_eq!(again.predictions, 0);
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_should_run_once_per_day_at_hour() {
        // Matching hour, never run
        assert!(should_run(8, 8, None, day(12)));
        // Wrong hour
        assert!(!should_run(7, 8, None, day(12)));
        assert!(!should_run(9, 8, Some(day(11)), day(12)));
        // Already ran today
        assert!(!should_run(8, 8, Some(day(12)), day(12)));
        // Ran yesterday
        assert!(should_run(8, 8, Some(day(11)), day(12)));
    }

    #[tokio::test]
    async fn test_start_respects_disabled_flag() {
        let mut config = Config::offline();
        config.disable_scheduler = true;
        assert!(start(Arc::new(engine(vec![])), &config).is_none());

        config.disable_scheduler = false;
        let handle = start(Arc::new(engine(vec![])), &config).expect("scheduler started");
        handle.abort();
    }
}
