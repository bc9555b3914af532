//! stats.nba.com client: league-wide per-game player averages, team
//! aggregates derived from them, and per-player game logs.

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::TtlCache;
use super::retry::{with_retry, RetryPolicy};
use super::SourceError;
use crate::predict::round1;

/// "Player Name|TEAM" → season averages
pub type NbaPlayerTable = Arc<HashMap<String, NbaPlayerStats>>;

/// Per-game season averages for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaPlayerStats {
    pub player_id: i64,
    pub name: String,
    pub team: String,
    pub games_played: u32,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub fg_made: f64,
    pub fg_attempts: f64,
    pub fg3_made: f64,
    pub fg3_attempts: f64,
    pub ft_made: f64,
    pub ft_attempts: f64,
    pub plus_minus: f64,
    pub minutes: f64,
}

/// Team aggregates built from the player table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaTeamStats {
    pub team_code: String,
    pub games_played: u32,
    pub points_per_game: f64,
    pub rebounds_per_game: f64,
    pub assists_per_game: f64,
    pub steals_per_game: f64,
    pub blocks_per_game: f64,
    pub turnovers_per_game: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub offensive_rating: f64,
    pub defensive_rating: f64,
    pub pace: f64,
}

impl NbaTeamStats {
    pub fn default_for(team: &str) -> Self {
        NbaTeamStats {
            team_code: team.to_string(),
            games_played: 20,
            points_per_game: 110.0,
            rebounds_per_game: 45.0,
            assists_per_game: 25.0,
            steals_per_game: 8.0,
            blocks_per_game: 5.0,
            turnovers_per_game: 14.0,
            fg_pct: 46.0,
            fg3_pct: 36.0,
            ft_pct: 78.0,
            offensive_rating: 112.0,
            defensive_rating: 112.0,
            pace: 98.0,
        }
    }
}

/// One row of a player's game log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLogEntry {
    pub game_date: String,
    pub matchup: String,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
    pub minutes: f64,
}

/// Averages over a player's most recent games
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentForm {
    pub games: usize,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
}

pub struct NbaStatsClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    season: String,
    players: TtlCache<String, NbaPlayerTable>,
    game_logs: TtlCache<i64, Arc<Vec<GameLogEntry>>>,
    retry: RetryPolicy,
}

fn nba_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
    );
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    h.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    h.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    h
}

impl NbaStatsClient {
    pub fn new(base_url: &str, season: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .default_headers(nba_headers())
            .build()
            .context("Failed to build HTTP client")?;
        let ttl = Duration::from_secs(60 * 60);
        Ok(NbaStatsClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            season: season.to_string(),
            players: TtlCache::new("NBA stats", ttl),
            game_logs: TtlCache::new("NBA game logs", ttl),
            retry: RetryPolicy::default(),
        })
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("stats.nba.com request failed")?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "stats.nba.com".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        resp.json().await.context("Failed to parse stats.nba.com response")
    }

    fn league_dash_url(&self) -> Result<Url> {
        let mut params: Vec<(&str, &str)> = [
            "College", "Conference", "Country", "DateFrom", "DateTo", "Division", "DraftPick",
            "DraftYear", "GameScope", "GameSegment", "Height", "ISTRound", "Location", "Outcome",
            "PlayerExperience", "PlayerPosition", "SeasonSegment", "ShotClockRange",
            "StarterBench", "VsConference", "VsDivision", "Weight",
        ]
        .iter()
        .map(|k| (*k, ""))
        .collect();
        params.extend([
            ("LastNGames", "0"),
            ("LeagueID", "00"),
            ("MeasureType", "Base"),
            ("Month", "0"),
            ("OpponentTeamID", "0"),
            ("PORound", "0"),
            ("PaceAdjust", "N"),
            ("PerMode", "PerGame"),
            ("Period", "0"),
            ("PlusMinus", "N"),
            ("Rank", "N"),
            ("Season", self.season.as_str()),
            ("SeasonType", "Regular Season"),
            ("TeamID", "0"),
        ]);
        Url::parse_with_params(&format!("{}/leaguedashplayerstats", self.base_url), &params)
            .context("Invalid stats.nba.com URL")
    }

    /// League-wide player table. On failure returns the last good table,
    /// or an empty one.
    pub async fn player_stats(&self) -> NbaPlayerTable {
        let season = self.season.clone();
        let result = self
            .players
            .get_or_fetch(season.clone(), || async {
                let raw = self.get_json(self.league_dash_url()?).await?;
                let table = parse_league_dash_response(&raw);
                if table.is_empty() {
                    warn!("⚠️  No NBA stats data returned");
                    return Err(SourceError::Empty("stats.nba.com".into()).into());
                }
                info!(
                    "✓ Loaded {} NBA players from stats.nba.com ({} season)",
                    table.len(),
                    season
                );
                Ok(Arc::new(table))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("⚠️  Failed to fetch NBA stats: {}", e);
            Arc::new(HashMap::new())
        })
    }

    pub async fn team_players(&self, team: &str) -> Vec<NbaPlayerStats> {
        let table = self.player_stats().await;
        players_for_team(&table, team)
    }

    pub async fn team_stats(&self, team: &str) -> NbaTeamStats {
        aggregate_team_stats(team, &self.team_players(team).await)
    }

    /// Game log for one player, retried with backoff.
    pub async fn game_log(&self, player_id: i64) -> Result<Arc<Vec<GameLogEntry>>> {
        let url = Url::parse_with_params(
            &format!("{}/playergamelog", self.base_url),
            &[
                ("PlayerID", player_id.to_string()),
                ("Season", self.season.clone()),
                ("SeasonType", "Regular Season".to_string()),
            ],
        )
        .context("Invalid stats.nba.com URL")?;

        self.game_logs
            .get_or_fetch(player_id, || async {
                let label = format!("Game log {}", player_id);
                let raw = with_retry(self.retry, &label, || self.get_json(url.clone())).await?;
                Ok(Arc::new(parse_game_log_response(&raw)))
            })
            .await
    }

    /// Recent form for several players, four requests in flight at a time.
    /// Players whose log can't be fetched are left out.
    pub async fn recent_form(&self, player_ids: &[i64], last_n: usize) -> HashMap<i64, RecentForm> {
        stream::iter(player_ids.iter().copied())
            .map(|id| async move {
                match self.game_log(id).await {
                    Ok(log) => last_n_average(&log, last_n).map(|f| (id, f)),
                    Err(e) => {
                        warn!("NBA game log for {} unavailable: {}", id, e);
                        None
                    }
                }
            })
            .buffer_unordered(4)
            .filter_map(|x| async move { x })
            .collect()
            .await
    }
}

/// Zip `resultSets[0].headers` with each row of `rowSet`
fn result_set_rows(raw: &serde_json::Value) -> Vec<HashMap<&str, &serde_json::Value>> {
    let set = &raw["resultSets"][0];
    let headers: Vec<&str> = match set["headers"].as_array() {
        Some(h) => h.iter().filter_map(|v| v.as_str()).collect(),
        None => return vec![],
    };
    let rows = match set["rowSet"].as_array() {
        Some(r) => r,
        None => return vec![],
    };
    rows.iter()
        .filter_map(|row| {
            let cells = row.as_array()?;
            Some(headers.iter().copied().zip(cells.iter()).collect())
        })
        .collect()
}

fn num(row: &HashMap<&str, &serde_json::Value>, key: &str) -> f64 {
    row.get(key)
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0.0)
}

pub fn parse_league_dash_response(raw: &serde_json::Value) -> HashMap<String, NbaPlayerStats> {
    result_set_rows(raw)
        .into_iter()
        .filter_map(|row| {
            let name = row.get("PLAYER_NAME")?.as_str()?.to_string();
            let team = row.get("TEAM_ABBREVIATION")?.as_str()?.to_string();
            let stats = NbaPlayerStats {
                player_id: row.get("PLAYER_ID").and_then(|v| v.as_i64()).unwrap_or(0),
                games_played: num(&row, "GP") as u32,
                points: num(&row, "PTS"),
                rebounds: num(&row, "REB"),
                assists: num(&row, "AST"),
                steals: num(&row, "STL"),
                blocks: num(&row, "BLK"),
                turnovers: num(&row, "TOV"),
                fg_pct: num(&row, "FG_PCT"),
                fg3_pct: num(&row, "FG3_PCT"),
                ft_pct: num(&row, "FT_PCT"),
                fg_made: num(&row, "FGM"),
                fg_attempts: num(&row, "FGA"),
                fg3_made: num(&row, "FG3M"),
                fg3_attempts: num(&row, "FG3A"),
                ft_made: num(&row, "FTM"),
                ft_attempts: num(&row, "FTA"),
                plus_minus: num(&row, "PLUS_MINUS"),
                minutes: num(&row, "MIN"),
                name,
                team,
            };
            Some((format!("{}|{}", stats.name, stats.team), stats))
        })
        .collect()
}

/// Game-log rows, most recent first as stats.nba.com returns them
pub fn parse_game_log_response(raw: &serde_json::Value) -> Vec<GameLogEntry> {
    result_set_rows(raw)
        .into_iter()
        .map(|row| GameLogEntry {
            game_date: row
                .get("GAME_DATE")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            matchup: row
                .get("MATCHUP")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            points: num(&row, "PTS"),
            rebounds: num(&row, "REB"),
            assists: num(&row, "AST"),
            threes: num(&row, "FG3M"),
            minutes: num(&row, "MIN"),
        })
        .collect()
}

pub fn last_n_average(log: &[GameLogEntry], n: usize) -> Option<RecentForm> {
    let recent = &log[..log.len().min(n)];
    if recent.is_empty() {
        return None;
    }
    let k = recent.len() as f64;
    let avg = |f: fn(&GameLogEntry) -> f64| recent.iter().map(f).sum::<f64>() / k;
    Some(RecentForm {
        games: recent.len(),
        points: avg(|g| g.points),
        rebounds: avg(|g| g.rebounds),
        assists: avg(|g| g.assists),
        threes: avg(|g| g.threes),
    })
}

/// Players on `team`, highest scorers first
pub fn players_for_team(table: &HashMap<String, NbaPlayerStats>, team: &str) -> Vec<NbaPlayerStats> {
    let mut players: Vec<NbaPlayerStats> = table.values().filter(|p| p.team == team).cloned().collect();
    players.sort_by(|a, b| {
        b.points
            .partial_cmp(&a.points)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    players
}

/// Team totals as Σ(per-game × GP) / max GP; shooting splits as the
/// unweighted player mean.
pub fn aggregate_team_stats(team: &str, players: &[NbaPlayerStats]) -> NbaTeamStats {
    let max_gp = players.iter().map(|p| p.games_played).max().unwrap_or(0);
    if players.is_empty() || max_gp == 0 {
        return NbaTeamStats::default_for(team);
    }

    let games = max_gp as f64;
    let total = |f: fn(&NbaPlayerStats) -> f64| {
        players.iter().map(|p| f(p) * p.games_played as f64).sum::<f64>() / games
    };
    let mean = |f: fn(&NbaPlayerStats) -> f64| players.iter().map(f).sum::<f64>() / players.len() as f64;

    let points = total(|p| p.points);
    let assists = total(|p| p.assists);

    NbaTeamStats {
        team_code: team.to_string(),
        games_played: max_gp,
        points_per_game: round1(points),
        rebounds_per_game: round1(total(|p| p.rebounds)),
        assists_per_game: round1(assists),
        steals_per_game: round1(total(|p| p.steals)),
        blocks_per_game: round1(total(|p| p.blocks)),
        turnovers_per_game: round1(total(|p| p.turnovers)),
        fg_pct: round1(mean(|p| p.fg_pct) * 100.0),
        fg3_pct: round1(mean(|p| p.fg3_pct) * 100.0),
        ft_pct: round1(mean(|p| p.ft_pct) * 100.0),
        offensive_rating: round1(points * 1.1),
        defensive_rating: round1(110.0 - points / 10.0),
        pace: round1(95.0 + assists / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn league_fixture() -> serde_json::Value {
        json!({"resultSets": [{
            "headers": ["PLAYER_ID", "PLAYER_NAME", "TEAM_ABBREVIATION", "GP", "PTS", "REB",
                        "AST", "STL", "BLK", "TOV", "FG_PCT", "FG3_PCT", "FT_PCT", "FG3M", "MIN"],
            "rowSet": [
                [1628369, "Jayson Tatum", "BOS", 40, 27.0, 8.7, 5.9, 1.1, 0.5, 2.9, 0.452, 0.348, 0.833, 3.4, 36.2],
                [1627759, "Jaylen Brown", "BOS", 20, 23.0, 5.8, 4.3, 1.2, 0.3, 2.6, 0.470, 0.330, 0.740, 2.1, 34.0],
                [201939, "Stephen Curry", "GSW", 38, 24.4, 4.5, 6.0, 1.1, 0.4, 3.1, 0.448, 0.397, 0.929, 4.4, 32.4]
            ]
        }]})
    }

    #[test]
    fn test_parse_league_dash() {
        let table = parse_league_dash_response(&league_fixture());
        assert_eq!(table.len(), 3);
        let jt = &table["Jayson Tatum|BOS"];
        assert_eq!(jt.player_id, 1628369);
        assert_eq!(jt.games_played, 40);
        assert_relative_eq!(jt.points, 27.0);
        assert_relative_eq!(jt.fg3_made, 3.4);
        assert_relative_eq!(jt.steals, 1.1);
        assert!(parse_league_dash_response(&json!({})).is_empty());
    }

    #[test]
    fn test_team_aggregation() {
        let table = parse_league_dash_response(&league_fixture());
        let bos = players_for_team(&table, "BOS");
        assert_eq!(bos[0].name, "Jayson Tatum");

        let stats = aggregate_team_stats("BOS", &bos);
        // (27*40 + 23*20) / 40 = 38.5
        assert_relative_eq!(stats.points_per_game, 38.5);
        assert_eq!(stats.games_played, 40);
        assert_relative_eq!(stats.fg_pct, 46.1);
        assert_relative_eq!(stats.offensive_rating, 42.35, epsilon = 0.06);
        assert_relative_eq!(stats.defensive_rating, 106.15, epsilon = 0.06);
        // assists (5.9*40 + 4.3*20)/40 = 8.05 → pace 99.025
        assert_relative_eq!(stats.pace, 99.0);
    }

    #[test]
    fn test_team_defaults_when_no_players() {
        let stats = aggregate_team_stats("UTA", &[]);
        assert_eq!(stats, NbaTeamStats::default_for("UTA"));
        assert_relative_eq!(stats.pace, 98.0);
    }

    #[test]
    fn test_game_log_recent_form() {
        let raw = json!({"resultSets": [{
            "headers": ["GAME_DATE", "MATCHUP", "PTS", "REB", "AST", "FG3M", "MIN"],
            "rowSet": [
                ["JAN 10, 2025", "BOS vs. NYK", 30, 10, 6, 4, 38],
                ["JAN 08, 2025", "BOS @ MIA", 20, 6, 4, 2, 35],
                ["JAN 06, 2025", "BOS vs. ORL", 10, 2, 2, 0, 30]
            ]
        }]});
        let log = parse_game_log_response(&raw);
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].matchup, "BOS vs. NYK");

        let form = last_n_average(&log, 2).unwrap();
        assert_eq!(form.games, 2);
        assert_relative_eq!(form.points, 25.0);
        assert_relative_eq!(form.threes, 3.0);
        assert!(last_n_average(&[], 5).is_none());
    }
}
