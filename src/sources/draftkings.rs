//! DraftKings sportsbook lines and player props.
//!
//! The event-group JSON API is tried first. When it fails or returns nothing
//! for the requested day, the public league page is fetched and each event
//! cell's text is matched against the "XXX Team AT YYY Team" layout.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::cache::TtlCache;
use super::{eastern_date, parse_event_time, SourceError, BROWSER_USER_AGENT};
use crate::db::models::League;
use crate::teams::map_sportsbook_team;

const NBA_EVENT_GROUP: u32 = 42648;
const NFL_EVENT_GROUP: u32 = 88808;
const LEAGUE_PAGE_BASE: &str = "https://sportsbook.draftkings.com/leagues";

static RE_MATCHUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-Z]{2,3}\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s+AT\s+([A-Z]{2,3}\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
    )
    .unwrap()
});
static RE_SPREAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([+-]?\d+\.5)").unwrap());
static RE_TOTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[OU]\s*(\d+\.5)").unwrap());
static RE_ODDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([+-]\d{3,})").unwrap());
static RE_PLAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]+\s+[A-Z][a-z]+)").unwrap());
static RE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.5)").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkProp {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub line: Option<f64>,
    pub odds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkPlayerProps {
    pub player_name: String,
    pub props: Vec<DkProp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkPlayer {
    pub name: String,
    pub position: String,
    pub props: Vec<DkProp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkTeam {
    /// Sportsbook label as displayed
    pub name: String,
    /// Internal team code resolved from the label
    pub code: String,
    pub roster: Vec<DkPlayer>,
    pub injuries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadLine {
    pub home: Option<f64>,
    pub away: Option<f64>,
    pub home_odds: Option<i32>,
    pub away_odds: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MoneyLine {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalLine {
    pub line: Option<f64>,
    pub over: Option<i32>,
    pub under: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameLines {
    pub spread: SpreadLine,
    pub moneyline: MoneyLine,
    pub total: TotalLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkGame {
    pub event_id: String,
    pub game_date: String,
    pub game_time: String,
    pub home_team: DkTeam,
    pub away_team: DkTeam,
    pub lines: GameLines,
    pub player_props: Vec<DkPlayerProps>,
}

impl DkGame {
    /// Whether this event is the given matchup (internal codes)
    pub fn is_matchup(&self, home: &str, away: &str) -> bool {
        self.home_team.code == home && self.away_team.code == away
    }
}

pub struct DraftKingsClient {
    http: Client,
    /// Event-group API base, overridable in tests
    base_url: String,
    cache: TtlCache<String, Arc<Vec<DkGame>>>,
}

impl DraftKingsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(DraftKingsClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: TtlCache::new("DraftKings", Duration::from_secs(5 * 60)),
        })
    }

    /// Games for `league` on the given Eastern date (all listed games when
    /// `None`). Empty when both the API and the page fallback fail.
    pub async fn games(&self, league: League, date: Option<&str>) -> Arc<Vec<DkGame>> {
        let key = format!("{}:{}", league.as_str(), date.unwrap_or("all"));
        let result = self
            .cache
            .get_or_fetch(key, || async {
                let games = match self.fetch_event_group(league, date).await {
                    Ok(g) if !g.is_empty() => g,
                    Ok(_) => {
                        warn!("⚠️  No {} events in DraftKings API response", league.as_str());
                        self.fetch_league_page(league, date).await?
                    }
                    Err(e) => {
                        warn!("⚠️  DraftKings API failed: {}", e);
                        self.fetch_league_page(league, date).await?
                    }
                };
                info!(
                    "✅ Loaded {} {} games from DraftKings",
                    games.len(),
                    league.as_str().to_uppercase()
                );
                Ok(Arc::new(games))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("❌ DraftKings unavailable: {}", e);
            Arc::new(Vec::new())
        })
    }

    async fn fetch_event_group(&self, league: League, date: Option<&str>) -> Result<Vec<DkGame>> {
        let group = match league {
            League::Nba => NBA_EVENT_GROUP,
            League::Nfl => NFL_EVENT_GROUP,
        };
        let url = format!("{}/{}?format=json", self.base_url, group);
        debug!("Fetching {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DraftKings request failed")?;
        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "DraftKings".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }
        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse DraftKings response")?;
        Ok(parse_event_group(&raw, date))
    }

    async fn fetch_league_page(&self, league: League, date: Option<&str>) -> Result<Vec<DkGame>> {
        let path = match league {
            League::Nba => "basketball/nba",
            League::Nfl => "football/nfl",
        };
        let url = format!("{}/{}", LEAGUE_PAGE_BASE, path);
        debug!("Fetching {}", url);

        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "text/html")
            .send()
            .await
            .context("DraftKings page request failed")?;
        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "DraftKings page".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }
        let body = resp.text().await.context("Failed to read DraftKings page")?;
        let day = date.map(str::to_string).unwrap_or_else(super::eastern_today);
        let games = parse_league_page(&body, league, &day)?;
        if games.is_empty() {
            return Err(SourceError::Empty("DraftKings page".into()).into());
        }
        Ok(games)
    }
}

fn value_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_f64(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn value_odds(v: &serde_json::Value) -> Option<i32> {
    v.as_i64()
        .map(|n| n as i32)
        .or_else(|| v.as_str().and_then(|s| s.trim().replace('\u{2212}', "-").parse().ok()))
}

/// Prop category from a market name. Checked in order, so a combined
/// "Points + Rebounds + Assists" market reports as Points.
pub fn prop_type_from_market(market: &str) -> &'static str {
    let name = market.to_lowercase();
    if name.contains("points") {
        "Points"
    } else if name.contains("rebounds") {
        "Rebounds"
    } else if name.contains("assists") {
        "Assists"
    } else if name.contains("pts+reb+ast") || name.contains("points + rebounds + assists") {
        "Pts+Reb+Ast"
    } else if name.contains("steals") {
        "Steals"
    } else if name.contains("blocks") {
        "Blocks"
    } else if name.contains("3-pointers") || name.contains("threes") {
        "3-Pointers"
    } else if name.contains("turnovers") {
        "Turnovers"
    } else {
        "Other"
    }
}

fn markets(ev: &serde_json::Value) -> impl Iterator<Item = &serde_json::Value> {
    ev["displayGroups"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|g| g["markets"].as_array().into_iter().flatten())
}

/// Spread, moneyline and total from an event's markets
pub fn extract_lines(ev: &serde_json::Value) -> GameLines {
    let mut lines = GameLines::default();
    for market in markets(ev) {
        let name = market["name"].as_str().unwrap_or_default().to_lowercase();
        let outcomes = match market["outcomes"].as_array() {
            Some(o) if o.len() >= 2 => o,
            _ => continue,
        };
        if name.contains("spread") {
            lines.spread.home = value_f64(&outcomes[0]["line"]);
            lines.spread.away = value_f64(&outcomes[1]["line"]);
            lines.spread.home_odds = value_odds(&outcomes[0]["oddsAmerican"]);
            lines.spread.away_odds = value_odds(&outcomes[1]["oddsAmerican"]);
        }
        if name.contains("moneyline") {
            lines.moneyline.home = value_odds(&outcomes[0]["oddsAmerican"]);
            lines.moneyline.away = value_odds(&outcomes[1]["oddsAmerican"]);
        }
        if name.contains("total") {
            lines.total.line = value_f64(&outcomes[0]["line"]);
            lines.total.over = value_odds(&outcomes[0]["oddsAmerican"]);
            lines.total.under = value_odds(&outcomes[1]["oddsAmerican"]);
        }
    }
    lines
}

/// Player props grouped by player, in first-seen order
pub fn extract_player_props(ev: &serde_json::Value) -> Vec<DkPlayerProps> {
    let mut out: Vec<DkPlayerProps> = Vec::new();
    for market in markets(ev) {
        let name = market["name"].as_str().unwrap_or_default();
        let is_prop = ["Points", "Rebounds", "Assists", "Pts+Reb+Ast"]
            .iter()
            .any(|k| name.contains(k));
        if !is_prop {
            continue;
        }
        let prop_type = prop_type_from_market(name);
        for outcome in market["outcomes"].as_array().into_iter().flatten() {
            let player = outcome["participant"]
                .as_str()
                .filter(|s| !s.is_empty())
                .or_else(|| outcome["label"].as_str())
                .unwrap_or_default();
            if player.is_empty() {
                continue;
            }
            let prop = DkProp {
                prop_type: prop_type.to_string(),
                line: value_f64(&outcome["line"]),
                odds: value_odds(&outcome["oddsAmerican"]),
            };
            match out.iter_mut().find(|p| p.player_name == player) {
                Some(entry) => entry.props.push(prop),
                None => out.push(DkPlayerProps {
                    player_name: player.to_string(),
                    props: vec![prop],
                }),
            }
        }
    }
    out
}

/// Merge repeated players, keeping the first prop of each type
pub fn dedupe_roster(roster: Vec<DkPlayer>) -> Vec<DkPlayer> {
    let mut out: Vec<DkPlayer> = Vec::new();
    for player in roster {
        match out.iter_mut().find(|p| p.name == player.name) {
            Some(existing) => {
                for prop in player.props {
                    if !existing.props.iter().any(|p| p.prop_type == prop.prop_type) {
                        existing.props.push(prop);
                    }
                }
            }
            None => out.push(player),
        }
    }
    out
}

fn dk_team(label: &str, roster: Vec<DkPlayer>) -> DkTeam {
    DkTeam {
        name: label.trim().to_string(),
        code: map_sportsbook_team(label),
        roster,
        injuries: vec![],
    }
}

/// Games from an event-group payload, optionally limited to one Eastern date
pub fn parse_event_group(raw: &serde_json::Value, date: Option<&str>) -> Vec<DkGame> {
    let events = match raw["eventGroup"]["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    events
        .iter()
        .filter_map(|ev| {
            let start = ev["startDate"].as_str()?;
            let game_date = eastern_date(parse_event_time(start)?);
            if date.is_some_and(|d| d != game_date) {
                return None;
            }

            let name = ev["name"].as_str()?;
            let teams: Vec<&str> = name.split(" @ ").collect();
            let [away, home] = teams.as_slice() else {
                return None;
            };

            let player_props = extract_player_props(ev);
            let home_label = ev["teamName1"].as_str().unwrap_or_default();
            let (mut home_roster, mut away_roster) = (Vec::new(), Vec::new());
            for p in &player_props {
                let player = DkPlayer {
                    name: p.player_name.clone(),
                    position: "Unknown".into(),
                    props: p.props.clone(),
                };
                let on_home = p
                    .player_name
                    .split(' ')
                    .nth(1)
                    .is_some_and(|token| home_label.contains(token));
                if on_home {
                    home_roster.push(player);
                } else {
                    away_roster.push(player);
                }
            }

            Some(DkGame {
                event_id: value_string(&ev["eventId"])?,
                game_date,
                game_time: start.to_string(),
                home_team: dk_team(home, dedupe_roster(home_roster)),
                away_team: dk_team(away, dedupe_roster(away_roster)),
                lines: extract_lines(ev),
                player_props,
            })
        })
        .collect()
}

/// Matchup and lines from one event cell's text.
/// Returns (away label, home label, lines).
pub fn parse_text_lines(text: &str, league: League) -> Option<(String, String, GameLines)> {
    let caps = RE_MATCHUP.captures(text)?;
    let away = caps[1].trim().to_string();
    let home = caps[2].trim().to_string();

    let spread = RE_SPREAD
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok());
    let total = RE_TOTAL
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok());
    let odds: Vec<i32> = RE_ODDS
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    let mut lines = GameLines::default();
    lines.total.line = total;
    match league {
        League::Nba => {
            lines.spread.home = spread;
            lines.spread.away = spread.map(|s| -s);
            lines.spread.away_odds = Some(-110);
            lines.spread.home_odds = Some(-110);
            lines.total.over = Some(-110);
            lines.total.under = Some(-110);
            if odds.len() >= 2 {
                lines.spread.away_odds = Some(odds[0]);
                lines.spread.home_odds = Some(odds[1]);
            }
            if odds.len() >= 4 {
                lines.total.over = Some(odds[2]);
                lines.total.under = Some(odds[3]);
            }
            if odds.len() >= 6 {
                lines.moneyline.away = Some(odds[4]);
                lines.moneyline.home = Some(odds[5]);
            }
        }
        League::Nfl => {
            lines.spread.home = spread;
            lines.moneyline.home = odds.first().copied();
            lines.moneyline.away = odds.get(1).copied();
            lines.total.over = Some(-110);
            lines.total.under = Some(-110);
        }
    }
    Some((away, home, lines))
}

/// Player name, line, odds and prop type from one prop row's text
pub fn parse_text_prop(text: &str, league: League) -> Option<(String, DkProp)> {
    let player = RE_PLAYER.captures(text)?[1].to_string();
    let line = RE_LINE.captures(text)?[1].parse::<f64>().ok()?;
    let odds = RE_ODDS.captures(text).and_then(|c| c[1].parse().ok());
    let lower = text.to_lowercase();
    let prop_type = match league {
        League::Nba => {
            if lower.contains("point") {
                "Points"
            } else if lower.contains("rebound") {
                "Rebounds"
            } else if lower.contains("assist") {
                "Assists"
            } else if lower.contains("three") || lower.contains("3-pt") {
                "3-Pointers"
            } else {
                "Other"
            }
        }
        League::Nfl => {
            if lower.contains("pass") {
                "Passing Yards"
            } else if lower.contains("rush") {
                "Rushing Yards"
            } else if lower.contains("rec") {
                "Receiving Yards"
            } else if lower.contains("td") || lower.contains("touchdown") {
                "Touchdowns"
            } else if lower.contains("yds") || lower.contains("yards") {
                "Total Yards"
            } else {
                "Other"
            }
        }
    };
    Some((
        player,
        DkProp {
            prop_type: prop_type.to_string(),
            line: Some(line),
            odds,
        },
    ))
}

/// Games from the public league page. Players are split between the two
/// rosters alternately since the page carries no team attribution.
pub fn parse_league_page(body: &str, league: League, date: &str) -> Result<Vec<DkGame>> {
    let doc = Html::parse_document(body);
    let cells = Selector::parse(r#"[class*="event-cell"], [class*="parlay"]"#)
        .map_err(|e| anyhow::anyhow!("Invalid event selector: {:?}", e))?;
    let prop_rows = Selector::parse(r#"[class*="player"], [class*="outcome"], tbody tr"#)
        .map_err(|e| anyhow::anyhow!("Invalid prop selector: {:?}", e))?;

    let mut seen = HashSet::new();
    let mut games = Vec::new();
    for cell in doc.select(&cells) {
        let text = cell.text().collect::<Vec<_>>().join(" ");
        let Some((away, home, lines)) = parse_text_lines(&text, league) else {
            continue;
        };
        if !seen.insert(format!("{}-{}", away, home)) {
            continue;
        }

        let mut player_props: Vec<DkPlayerProps> = Vec::new();
        let (mut home_roster, mut away_roster): (Vec<DkPlayer>, Vec<DkPlayer>) = (vec![], vec![]);
        for row in cell.select(&prop_rows) {
            let row_text = row.text().collect::<Vec<_>>().join(" ");
            let Some((name, prop)) = parse_text_prop(&row_text, league) else {
                continue;
            };
            if player_props.iter().any(|p| p.player_name == name) {
                continue;
            }
            let player = DkPlayer {
                name: name.clone(),
                position: "Unknown".into(),
                props: vec![prop.clone()],
            };
            if home_roster.len() <= away_roster.len() {
                home_roster.push(player);
            } else {
                away_roster.push(player);
            }
            player_props.push(DkPlayerProps {
                player_name: name,
                props: vec![prop],
            });
        }

        games.push(DkGame {
            event_id: format!("{}-{}", league.as_str(), games.len()),
            game_date: date.to_string(),
            game_time: chrono::Utc::now().to_rfc3339(),
            home_team: dk_team(&home, home_roster),
            away_team: dk_team(&away, away_roster),
            lines,
            player_props,
        });
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_group() -> serde_json::Value {
        json!({"eventGroup": {"events": [
            {
                "eventId": 30512345,
                "name": "BOS Celtics @ NY Knicks",
                "startDate": "2025-01-11T00:30:00.0000000Z",
                "teamName1": "NY Knicks Brunson",
                "displayGroups": [
                    {"markets": [
                        {"name": "Spread", "outcomes": [
                            {"line": -3.5, "oddsAmerican": "-110"},
                            {"line": 3.5, "oddsAmerican": "-110"}]},
                        {"name": "Moneyline", "outcomes": [
                            {"oddsAmerican": "-165"}, {"oddsAmerican": "+140"}]},
                        {"name": "Total", "outcomes": [
                            {"line": 228.5, "oddsAmerican": "-112"},
                            {"line": 228.5, "oddsAmerican": "-108"}]}
                    ]},
                    {"markets": [
                        {"name": "Player Points", "outcomes": [
                            {"participant": "Jalen Brunson", "line": "27.5", "oddsAmerican": "-115"},
                            {"participant": "Jayson Tatum", "line": 28.5, "oddsAmerican": "+100"}]},
                        {"name": "Player Rebounds", "outcomes": [
                            {"label": "Jayson Tatum", "line": 8.5, "oddsAmerican": "-120"}]},
                        {"name": "Player Steals", "outcomes": [
                            {"participant": "Jrue Holiday", "line": 1.5, "oddsAmerican": "+120"}]}
                    ]}
                ]
            },
            {"eventId": "2", "name": "LAL Lakers @ GS Warriors", "startDate": "2025-01-12T03:00:00Z"},
            {"eventId": "3", "name": "Malformed", "startDate": "2025-01-10T23:00:00Z"}
        ]}})
    }

    #[test]
    fn test_parse_event_group_lines_and_props() {
        let games = parse_event_group(&event_group(), Some("2025-01-10"));
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.event_id, "30512345");
        assert_eq!(g.game_date, "2025-01-10");
        assert_eq!(g.away_team.code, "BOS");
        assert_eq!(g.home_team.code, "NYK");
        assert_eq!(g.lines.spread.home, Some(-3.5));
        assert_eq!(g.lines.moneyline.away, Some(140));
        assert_eq!(g.lines.total.line, Some(228.5));
        assert_eq!(g.lines.total.under, Some(-108));

        // Steals markets aren't collected as player props
        assert_eq!(g.player_props.len(), 2);
        let tatum = g.player_props.iter().find(|p| p.player_name == "Jayson Tatum").unwrap();
        assert_eq!(tatum.props.len(), 2);
        assert_eq!(tatum.props[1].prop_type, "Rebounds");

        assert_eq!(g.home_team.roster.len(), 1);
        assert_eq!(g.home_team.roster[0].name, "Jalen Brunson");
        assert_eq!(g.away_team.roster[0].name, "Jayson Tatum");
        assert_eq!(g.player_props[0].props[0].line, Some(27.5));
    }

    #[test]
    fn test_parse_event_group_without_date_filter() {
        let games = parse_event_group(&event_group(), None);
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].home_team.code, "GSW");
        assert!(games[1].is_matchup("GSW", "LAL"));
        assert!(parse_event_group(&json!({}), None).is_empty());
    }

    #[test]
    fn test_prop_type_order() {
        assert_eq!(prop_type_from_market("Player Points"), "Points");
        assert_eq!(prop_type_from_market("Points + Rebounds + Assists"), "Points");
        assert_eq!(prop_type_from_market("Pts+Reb+Ast"), "Pts+Reb+Ast");
        assert_eq!(prop_type_from_market("Threes Made"), "3-Pointers");
        assert_eq!(prop_type_from_market("Turnovers"), "Turnovers");
        assert_eq!(prop_type_from_market("Double-Double"), "Other");
    }

    #[test]
    fn test_dedupe_roster_merges_props() {
        let p = |name: &str, t: &str| DkPlayer {
            name: name.into(),
            position: "Unknown".into(),
            props: vec![DkProp { prop_type: t.into(), line: Some(1.5), odds: None }],
        };
        let out = dedupe_roster(vec![
            p("A B", "Points"),
            p("C D", "Points"),
            p("A B", "Rebounds"),
            p("A B", "Points"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].props.len(), 2);
    }

    #[test]
    fn test_text_fallback_full_layout() {
        let text = "DET Pistons AT BOS Celtics +7.5 -7.5 O 221.5 U 221.5 -110 -105 -115 +100 +250 -310";
        let (away, home, lines) = parse_text_lines(text, League::Nba).unwrap();
        assert_eq!(away, "DET Pistons");
        assert_eq!(home, "BOS Celtics");
        assert_eq!(lines.spread.home, Some(7.5));
        assert_eq!(lines.spread.away, Some(-7.5));
        assert_eq!(lines.total.line, Some(221.5));
        assert_eq!(lines.spread.away_odds, Some(-110));
        assert_eq!(lines.total.under, Some(100));
        assert_eq!(lines.moneyline.home, Some(-310));
        assert_eq!(map_sportsbook_team(&home), "BOS");
    }

    #[test]
    fn test_text_fallback_partial_odds() {
        let (_, _, lines) = parse_text_lines("GS Warriors AT SA Spurs -2.5 -115 -105", League::Nba).unwrap();
        assert_eq!(lines.spread.away_odds, Some(-115));
        assert_eq!(lines.total.over, Some(-110));
        assert_eq!(lines.moneyline.home, None);
        assert!(parse_text_lines("no matchup here", League::Nba).is_none());
    }

    #[test]
    fn test_league_page_fallback() {
        let html = r#"<html><body>
            <div class="sportsbook-event-cell">
              <span>DET Pistons AT BOS Celtics</span><span>+7.5 -7.5 O 221.5 -110 -110</span>
              <div class="player-row">Jayson Tatum Points 27.5 -115</div>
              <div class="player-row">Cade Cunningham Assists 9.5 +105</div>
            </div>
            <div class="sportsbook-event-cell"><span>DET Pistons AT BOS Celtics</span></div>
        </body></html>"#;
        let games = parse_league_page(html, League::Nba, "2025-01-10").unwrap();
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.event_id, "nba-0");
        assert_eq!(g.home_team.code, "BOS");
        assert_eq!(g.player_props.len(), 2);
        assert_eq!(g.home_team.roster[0].name, "Jayson Tatum");
        assert_eq!(g.away_team.roster[0].props[0].prop_type, "Assists");
    }
}
