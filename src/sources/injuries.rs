//! NFL injury report: nfl.com injury tables merged with a hand-maintained
//! list. nfl.com renders most of the page client-side, so the manual list is
//! often the only data available.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio::time::Duration;
use tracing::{debug, error, info};

use super::cache::TtlCache;
use super::{browser_client, SourceError};

/// Normalized player name → injury entry
pub type InjuryReport = Arc<HashMap<String, InjuryEntry>>;

static RE_NAME_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(Jr\.|Sr\.|III|II|IV)\.?$").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryEntry {
    pub team: String,
    pub position: String,
    pub injury: String,
    pub game_status: String,
    pub is_out: bool,
}

/// Players known to be out regardless of what the scrape finds
fn manual_injuries() -> HashMap<String, InjuryEntry> {
    HashMap::from([(
        "Bucky Irving".to_string(),
        InjuryEntry {
            team: "TB".into(),
            position: "RB".into(),
            injury: "Shoulder, Foot".into(),
            game_status: "OUT".into(),
            is_out: true,
        },
    )])
}

pub struct InjuryClient {
    http: Client,
    url: String,
    cache: TtlCache<&'static str, InjuryReport>,
}

impl InjuryClient {
    pub fn new(url: &str) -> Result<Self> {
        Ok(InjuryClient {
            http: browser_client(10)?,
            url: url.to_string(),
            cache: TtlCache::new("Injuries", Duration::from_secs(30 * 60)),
        })
    }

    /// Current report. Falls back to the manual list when nothing is cached
    /// and the page can't be fetched.
    pub async fn report(&self) -> InjuryReport {
        let result = self.cache.get_or_fetch("nfl", || self.scrape()).await;
        result.unwrap_or_else(|e| {
            let manual = manual_injuries();
            error!("❌ Error loading NFL injuries: {}", e);
            info!("📋 Using manual injury list ({} players)", manual.len());
            Arc::new(manual)
        })
    }

    async fn scrape(&self) -> Result<InjuryReport> {
        info!("🏥 Loading NFL injury data...");
        debug!("Fetching {}", self.url);
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Injury report request failed")?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "nfl.com".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        let body = resp.text().await.context("Failed to read injury report")?;
        let report = merge_with_manual(parse_injury_html(&body)?);
        let out = report.values().filter(|e| e.is_out).count();
        info!("✅ Loaded {} injured players ({} OUT/IR/PUP)", report.len(), out);
        Ok(Arc::new(report))
    }
}

/// Strip a trailing Jr./Sr./II/III/IV
pub fn normalize_name(name: &str) -> String {
    RE_NAME_SUFFIX.replace(name.trim(), "").trim().to_string()
}

fn status_is_out(status: &str) -> bool {
    let s = status.to_lowercase();
    s.contains("out") || s.contains("ir") || s.contains("pup")
}

/// Injury rows from the report page's team tables
pub fn parse_injury_html(body: &str) -> Result<HashMap<String, InjuryEntry>> {
    let doc = Html::parse_document(body);
    let sections = Selector::parse(".nfl-o-injury-report__team, .d3-o-table")
        .map_err(|e| anyhow::anyhow!("Invalid section selector: {:?}", e))?;
    let rows = Selector::parse("tr").map_err(|e| anyhow::anyhow!("Invalid row selector: {:?}", e))?;
    let cells = Selector::parse("td").map_err(|e| anyhow::anyhow!("Invalid cell selector: {:?}", e))?;

    let mut out = HashMap::new();
    for section in doc.select(&sections) {
        for row in section.select(&rows) {
            let text: Vec<String> = row
                .select(&cells)
                .map(|c| c.text().collect::<String>().trim().to_string())
                .collect();
            if text.len() < 4 {
                continue;
            }
            let status = if text[3].is_empty() {
                text.get(4).cloned().unwrap_or_default()
            } else {
                text[3].clone()
            };
            if text[0].is_empty() || status.is_empty() {
                continue;
            }
            out.insert(
                normalize_name(&text[0]),
                InjuryEntry {
                    team: String::new(),
                    position: text[1].clone(),
                    injury: text[2].clone(),
                    is_out: status_is_out(&status),
                    game_status: status,
                },
            );
        }
    }
    Ok(out)
}

/// Scraped entries overlaid with the manual list (manual wins)
pub fn merge_with_manual(mut scraped: HashMap<String, InjuryEntry>) -> HashMap<String, InjuryEntry> {
    scraped.extend(manual_injuries());
    scraped
}

/// Whether `player` is ruled out. Exact normalized-name match first, then any
/// OUT entry ending with the same last name.
pub fn is_player_out(player: &str, report: &HashMap<String, InjuryEntry>) -> bool {
    if player.trim().is_empty() || report.is_empty() {
        return false;
    }
    let name = normalize_name(player);
    if let Some(entry) = report.get(&name) {
        return entry.is_out;
    }
    let last = match name.rsplit(' ').next() {
        Some(l) if !l.is_empty() => l,
        _ => return false,
    };
    report
        .iter()
        .any(|(injured, entry)| entry.is_out && injured.ends_with(last))
}
