//! Sleeper fantasy API: the NFL player directory and season stat totals.
//!
//! Both payloads are large (the player directory is several MB) and change
//! slowly, so each is fetched once per hour and shared behind an `Arc`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::cache::TtlCache;
use super::{http_client, SourceError};

pub type PlayerDirectory = Arc<HashMap<String, SleeperPlayer>>;
pub type SeasonStats = Arc<HashMap<String, StatLine>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SleeperPlayer {
    pub id: String,
    pub full_name: String,
    pub team: Option<String>,
    pub position: Option<String>,
    pub number: String,
}

#[derive(Deserialize)]
struct RawPlayer {
    full_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    team: Option<String>,
    position: Option<String>,
    number: Option<serde_json::Value>,
}

/// Season totals for one player, keyed by Sleeper stat name
/// (`pass_yd`, `rush_td`, `idp_tkl_solo`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatLine(HashMap<String, f64>);

impl StatLine {
    /// Stat value, 0 when absent
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    /// First non-zero value among `keys`, 0 when none
    pub fn first_of(&self, keys: &[&str]) -> f64 {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| *v != 0.0)
            .unwrap_or(0.0)
    }
}

impl FromIterator<(String, f64)> for StatLine {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        StatLine(iter.into_iter().collect())
    }
}

pub struct SleeperClient {
    http: Client,
    season: u16,
    /// Base URL for overriding in tests
    base_url: String,
    players: TtlCache<&'static str, PlayerDirectory>,
    stats: TtlCache<u16, SeasonStats>,
}

impl SleeperClient {
    pub fn new(base_url: &str, season: u16) -> Result<Self> {
        let ttl = Duration::from_secs(60 * 60);
        Ok(SleeperClient {
            http: http_client(15)?,
            season,
            base_url: base_url.trim_end_matches('/').to_string(),
            players: TtlCache::new("Sleeper players", ttl),
            stats: TtlCache::new("Sleeper stats", ttl),
        })
    }

    async fn get_json(&self, url: &str, timeout_secs: u64) -> Result<serde_json::Value> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .send()
            .await
            .context("Sleeper request failed")?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "Sleeper".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        resp.json().await.context("Failed to parse Sleeper response")
    }

    /// Player directory keyed by Sleeper player id. Empty on failure.
    pub async fn players(&self) -> PlayerDirectory {
        let url = format!("{}/players/nfl", self.base_url);
        let result = self
            .players
            .get_or_fetch("nfl", || async {
                let raw = self.get_json(&url, 10).await?;
                let parsed = parse_players_response(&raw);
                if parsed.is_empty() {
                    return Err(SourceError::Empty("Sleeper players".into()).into());
                }
                info!("✓ Loaded Sleeper player database");
                Ok(Arc::new(parsed))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("⚠️  Failed to load Sleeper players: {}", e);
            Arc::new(HashMap::new())
        })
    }

    /// Regular-season totals keyed by Sleeper player id. Empty on failure.
    pub async fn season_stats(&self) -> SeasonStats {
        let season = self.season;
        let url = format!("{}/stats/nfl/regular/{}", self.base_url, season);
        let result = self
            .stats
            .get_or_fetch(season, || async {
                let raw = self.get_json(&url, 15).await?;
                let parsed = parse_stats_response(&raw);
                if parsed.is_empty() {
                    return Err(SourceError::Empty("Sleeper stats".into()).into());
                }
                info!("✓ Loaded {} NFL season stats from Sleeper", season);
                Ok(Arc::new(parsed))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("⚠️  Failed to load Sleeper stats: {}", e);
            Arc::new(HashMap::new())
        })
    }
}

pub fn parse_players_response(raw: &serde_json::Value) -> HashMap<String, SleeperPlayer> {
    let obj = match raw.as_object() {
        Some(o) => o,
        None => return HashMap::new(),
    };

    obj.iter()
        .filter_map(|(id, v)| {
            let p: RawPlayer = serde_json::from_value(v.clone()).ok()?;
            let full_name = p.full_name.or_else(|| match (&p.first_name, &p.last_name) {
                (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
                _ => None,
            })?;
            let number = match p.number {
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::String(s)) if !s.is_empty() => s,
                _ => "0".to_string(),
            };
            Some((
                id.clone(),
                SleeperPlayer {
                    id: id.clone(),
                    full_name,
                    team: p.team,
                    position: p.position,
                    number,
                },
            ))
        })
        .collect()
}

pub fn parse_stats_response(raw: &serde_json::Value) -> HashMap<String, StatLine> {
    let obj = match raw.as_object() {
        Some(o) => o,
        None => return HashMap::new(),
    };

    obj.iter()
        .filter_map(|(id, v)| {
            let line: StatLine = v
                .as_object()?
                .iter()
                .filter_map(|(k, n)| Some((k.clone(), n.as_f64()?)))
                .collect();
            Some((id.clone(), line))
        })
        .collect()
}

/// Players on `team` that have a stat line this season
pub fn team_players<'a>(
    players: &'a HashMap<String, SleeperPlayer>,
    stats: &'a HashMap<String, StatLine>,
    team: &str,
) -> Vec<(&'a SleeperPlayer, &'a StatLine)> {
    let mut out: Vec<_> = players
        .values()
        .filter(|p| p.team.as_deref() == Some(team))
        .filter_map(|p| stats.get(&p.id).map(|s| (p, s)))
        .collect();
    out.sort_by(|a, b| a.0.id.cmp(&b.0.id));
    out
}

/// Player on `team` with exactly this full name
pub fn find_player<'a>(
    players: &'a HashMap<String, SleeperPlayer>,
    name: &str,
    team: &str,
) -> Option<&'a SleeperPlayer> {
    players
        .values()
        .find(|p| p.full_name == name && p.team.as_deref() == Some(team))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_players() -> serde_json::Value {
        json!({
            "4046": {"full_name": "Patrick Mahomes", "last_name": "Mahomes", "team": "KC",
                     "position": "QB", "number": 15},
            "4866": {"first_name": "Travis", "last_name": "Kelce", "team": "KC",
                     "position": "TE", "number": null},
            "9999": {"full_name": "Free Agent", "team": null, "position": "WR"},
            "DEF_KC": {"team": "KC", "position": "DEF"}
        })
    }

    #[test]
    fn test_parse_players() {
        let players = parse_players_response(&fixture_players());
        assert_eq!(players.len(), 3);
        let pm = &players["4046"];
        assert_eq!(pm.full_name, "Patrick Mahomes");
        assert_eq!(pm.number, "15");
        let tk = &players["4866"];
        assert_eq!(tk.full_name, "Travis Kelce");
        assert_eq!(tk.number, "0");
        assert_eq!(players["9999"].team, None);
    }

    #[test]
    fn test_parse_stats_skips_non_numeric() {
        let raw = json!({
            "4046": {"pass_yd": 3928.0, "pass_td": 26, "gp": 16, "note": "x"},
            "bad": "nope"
        });
        let stats = parse_stats_response(&raw);
        assert_eq!(stats.len(), 1);
        let s = &stats["4046"];
        assert_eq!(s.get("pass_yd"), 3928.0);
        assert_eq!(s.get("pass_td"), 26.0);
        assert_eq!(s.get("rush_yd"), 0.0);
        assert_eq!(s.first_of(&["gms_active", "gp"]), 16.0);
    }

    #[test]
    fn test_team_players_and_exact_lookup() {
        let players = parse_players_response(&fixture_players());
        let stats = parse_stats_response(&json!({"4046": {"pass_yd": 100.0}}));
        let kc = team_players(&players, &stats, "KC");
        assert_eq!(kc.len(), 1);
        assert_eq!(kc[0].0.full_name, "Patrick Mahomes");

        assert_eq!(
            find_player(&players, "Travis Kelce", "KC").map(|p| p.id.as_str()),
            Some("4866")
        );
        assert!(find_player(&players, "T. Kelce", "KC").is_none());
        assert!(find_player(&players, "Travis Kelce", "BUF").is_none());
    }
}
