use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{eastern_date, http_client, parse_event_time, ScheduleProvider, SourceError};
use crate::db::models::{Game, GameStatus, GameTeam, League};
use crate::teams;

/// Scoreboard and team-record client for ESPN's public site API.
pub struct EspnClient {
    http: Client,
    league: League,
    /// Base URL for overriding in tests
    base_url: String,
}

/// Season record parsed from an ESPN "W-L[-T]" summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl EspnClient {
    pub fn new(league: League, base_url: &str) -> Result<Self> {
        Ok(EspnClient {
            http: http_client(10)?,
            league,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn sport_path(&self) -> &'static str {
        match self.league {
            League::Nfl => "football/nfl",
            League::Nba => "basketball/nba",
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .context("ESPN request failed")?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "ESPN".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        resp.json().await.context("Failed to parse ESPN response")
    }

    /// Current season record for a team by its ESPN numeric id.
    pub async fn fetch_team_record(&self, espn_id: u32) -> Result<TeamRecord> {
        let url = format!("{}/{}/teams/{}", self.base_url, self.sport_path(), espn_id);
        let raw = self.get_json(&url, &[]).await?;
        parse_team_record(&raw).ok_or_else(|| {
            SourceError::Decode {
                source_name: "ESPN".into(),
                reason: format!("no record summary for team {}", espn_id),
            }
            .into()
        })
    }
}

#[async_trait]
impl ScheduleProvider for EspnClient {
    fn name(&self) -> &str {
        match self.league {
            League::Nfl => "ESPN NFL",
            League::Nba => "ESPN NBA",
        }
    }

    fn league(&self) -> League {
        self.league
    }

    async fn fetch_games(&self, date: Option<&str>) -> Result<Vec<Game>> {
        let url = format!("{}/{}/scoreboard", self.base_url, self.sport_path());
        let query: Vec<(&str, String)> = date
            .map(|d| vec![("dates", d.replace('-', ""))])
            .unwrap_or_default();
        let raw = self.get_json(&url, &query).await?;
        Ok(parse_scoreboard_response(&raw, self.league, date))
    }
}

fn team_name(league: League, code: &str) -> Option<&'static str> {
    match league {
        League::Nfl => teams::nfl_team(code).map(|t| t.name),
        League::Nba => teams::nba_team(code).map(|t| t.name),
    }
}

fn map_code(league: League, abbr: &str) -> String {
    match league {
        League::Nfl => teams::map_espn_nfl_code(abbr),
        League::Nba => teams::map_espn_nba_code(abbr),
    }
}

fn parse_competitor(c: &serde_json::Value, league: League) -> Option<GameTeam> {
    let abbreviation = c["team"]["abbreviation"].as_str()?.to_string();
    let code = map_code(league, &abbreviation);
    let name = team_name(league, &code)?.to_string();
    Some(GameTeam {
        code,
        name,
        abbreviation,
        score: c["score"].as_str().map(str::to_string),
        record: c["records"][0]["summary"]
            .as_str()
            .unwrap_or("N/A")
            .to_string(),
    })
}

/// Games from a scoreboard payload. Events with unknown teams are skipped;
/// with `date` set, only events on that Eastern calendar day are kept.
pub fn parse_scoreboard_response(
    raw: &serde_json::Value,
    league: League,
    date: Option<&str>,
) -> Vec<Game> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    events
        .iter()
        .filter_map(|ev| {
            let comp = &ev["competitions"][0];
            let competitors = comp["competitors"].as_array()?;
            let side = |which: &str| {
                competitors
                    .iter()
                    .find(|c| c["homeAway"].as_str() == Some(which))
            };
            let home_team = parse_competitor(side("home")?, league)?;
            let away_team = parse_competitor(side("away")?, league)?;

            let kickoff = ev["date"].as_str()?;
            let game_date = eastern_date(parse_event_time(kickoff)?);
            if date.is_some_and(|d| d != game_date) {
                return None;
            }

            let status = &comp["status"]["type"];
            let broadcast = comp["broadcasts"][0]["names"]
                .as_array()
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|n| n.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_else(|| "TBD".to_string());

            Some(Game {
                id: ev["id"].as_str()?.to_string(),
                league,
                name: ev["name"].as_str().unwrap_or_default().to_string(),
                short_name: ev["shortName"].as_str().unwrap_or_default().to_string(),
                date: kickoff.to_string(),
                game_date,
                status: GameStatus {
                    state: status["state"].as_str().unwrap_or("pre").to_string(),
                    detail: status["detail"].as_str().unwrap_or_default().to_string(),
                    completed: status["completed"].as_bool().unwrap_or(false),
                },
                home_team,
                away_team,
                venue: comp["venue"]["fullName"].as_str().unwrap_or("TBD").to_string(),
                broadcast,
            })
        })
        .collect()
}

/// Record from a `teams/{id}` payload (`team.record.items[0].summary`)
pub fn parse_team_record(raw: &serde_json::Value) -> Option<TeamRecord> {
    let summary = raw["team"]["record"]["items"][0]["summary"].as_str()?;
    parse_record_summary(summary)
}

/// "W-L" or "W-L-T"
pub fn parse_record_summary(summary: &str) -> Option<TeamRecord> {
    let mut parts = summary.split('-').map(|p| p.trim().parse::<u32>());
    let wins = parts.next()?.ok()?;
    let losses = parts.next()?.ok()?;
    let ties = match parts.next() {
        Some(t) => t.ok()?,
        None => 0,
    };
    Some(TeamRecord { wins, losses, ties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str, date: &str, home: &str, away: &str, state: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("{away} at {home}"),
            "shortName": format!("{away} @ {home}"),
            "date": date,
            "competitions": [{
                "competitors": [
                    {"homeAway": "home", "team": {"abbreviation": home}, "score": "24",
                     "records": [{"summary": "10-3"}]},
                    {"homeAway": "away", "team": {"abbreviation": away}, "score": "17"}
                ],
                "status": {"type": {"state": state, "detail": "Final", "completed": state == "post"}},
                "venue": {"fullName": "Arrowhead Stadium"},
                "broadcasts": [{"names": ["CBS", "Paramount+"]}]
            }]
        })
    }

    #[test]
    fn test_parse_scoreboard_maps_fields() {
        let raw = json!({"events": [event("401", "2025-01-12T18:00Z", "KC", "WSH", "post")]});
        let games = parse_scoreboard_response(&raw, League::Nfl, None);
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.id, "401");
        assert_eq!(g.game_date, "2025-01-12");
        assert_eq!(g.home_team.code, "KC");
        assert_eq!(g.home_team.name, "Kansas City Chiefs");
        assert_eq!(g.home_team.record, "10-3");
        assert_eq!(g.away_team.code, "WAS");
        assert_eq!(g.away_team.abbreviation, "WSH");
        assert_eq!(g.away_team.record, "N/A");
        assert_eq!(g.broadcast, "CBS, Paramount+");
        assert!(g.status.completed);
        assert_eq!(g.home_team.score_value(), 24);
    }

    #[test]
    fn test_parse_scoreboard_filters_eastern_date_and_unknown_teams() {
        let raw = json!({"events": [
            event("1", "2025-01-12T18:00Z", "KC", "BUF", "pre"),
            // 01:15 UTC on the 13th is still the 12th in New York
            event("2", "2025-01-13T01:15Z", "DAL", "PHI", "pre"),
            event("3", "2025-01-13T18:00Z", "GB", "CHI", "pre"),
            event("4", "2025-01-12T18:00Z", "XYZ", "CHI", "pre"),
        ]});
        let games = parse_scoreboard_response(&raw, League::Nfl, Some("2025-01-12"));
        let ids: Vec<_> = games.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_parse_scoreboard_nba_codes_and_defaults() {
        let mut ev = event("9", "2025-02-01T00:30Z", "GS", "NY", "pre");
        ev["competitions"][0]["broadcasts"] = json!([]);
        ev["competitions"][0]["venue"] = serde_json::Value::Null;
        let games = parse_scoreboard_response(&json!({"events": [ev]}), League::Nba, None);
        assert_eq!(games[0].home_team.code, "GSW");
        assert_eq!(games[0].away_team.code, "NYK");
        assert_eq!(games[0].venue, "TBD");
        assert_eq!(games[0].broadcast, "TBD");
        assert_eq!(games[0].game_date, "2025-01-31");
    }

    #[test]
    fn test_parse_scoreboard_without_events() {
        assert!(parse_scoreboard_response(&json!({}), League::Nfl, None).is_empty());
    }

    #[test]
    fn test_record_summary() {
        assert_eq!(
            parse_record_summary("11-5-1"),
            Some(TeamRecord { wins: 11, losses: 5, ties: 1 })
        );
        assert_eq!(
            parse_record_summary("0-4"),
            Some(TeamRecord { wins: 0, losses: 4, ties: 0 })
        );
        assert_eq!(parse_record_summary("N/A"), None);

        let raw = json!({"team": {"record": {"items": [{"summary": "9-2"}]}}});
        assert_eq!(parse_team_record(&raw).map(|r| r.wins), Some(9));
        assert_eq!(parse_team_record(&json!({"team": {}})), None);
    }
}
