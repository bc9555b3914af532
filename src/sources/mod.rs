//! Third-party data sources: schedules, player stats, weather, injuries and
//! sportsbook lines. Each client owns its own `reqwest::Client` and cache.

pub mod cache;
pub mod draftkings;
pub mod espn;
pub mod injuries;
pub mod nba_stats;
pub mod retry;
pub mod sleeper;
pub mod weather;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc,
    Weekday,
};
use reqwest::Client;
use thiserror::Error;

use crate::db::models::{Game, League};

/// Desktop browser UA for sites that reject bare HTTP clients
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Classified fetcher failures. Logged, never returned to API clients.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("Failed to decode {source_name} payload: {reason}")]
    Decode { source_name: String, reason: String },

    #[error("{0} returned no data")]
    Empty(String),

    #[error("{label} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        last: String,
    },
}

/// Trait every schedule (scoreboard) provider implements.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    /// Games whose Eastern kick-off date equals `date` (today when `None`).
    async fn fetch_games(&self, date: Option<&str>) -> Result<Vec<Game>>;

    fn league(&self) -> League;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

pub fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Same as [`http_client`] but identifying as a desktop browser.
pub fn browser_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

// ── Eastern time ─────────────────────────────────────────────────────────────

fn nth_sunday(year: i32, month: u32, n: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n as u8)
}

/// UTC instants at which US daylight time starts and ends in `year`
/// (2am local on the second Sunday of March / first Sunday of November).
fn dst_window(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDateTime::new(nth_sunday(year, 3, 2)?, NaiveTime::from_hms_opt(7, 0, 0)?);
    let end = NaiveDateTime::new(nth_sunday(year, 11, 1)?, NaiveTime::from_hms_opt(6, 0, 0)?);
    Some((start.and_utc(), end.and_utc()))
}

/// UTC offset of America/New_York at the given instant
pub fn eastern_offset(at: DateTime<Utc>) -> FixedOffset {
    let in_dst = dst_window(at.year())
        .map(|(start, end)| at >= start && at < end)
        .unwrap_or(false);
    let hours = if in_dst { -4 } else { -5 };
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Calendar date (YYYY-MM-DD) of the instant in US Eastern time
pub fn eastern_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&eastern_offset(at))
        .format("%Y-%m-%d")
        .to_string()
}

pub fn eastern_today() -> String {
    eastern_date(Utc::now())
}

/// Parse provider timestamps; ESPN omits seconds ("2025-01-12T18:00Z").
pub fn parse_event_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|n| n.and_utc())
}

/// `date` shifted by `days`, both as YYYY-MM-DD
pub fn shift_date(date: &str, days: i64) -> Option<String> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((d + Duration::days(days)).format("%Y-%m-%d").to_string())
}

/// Strict YYYY-MM-DD check for query parameters
pub fn is_iso_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
