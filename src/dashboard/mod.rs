use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::db::Database;
use crate::engine::{Engine, PropResultUpdate, SaveTarget};
use crate::sources::is_iso_date;
use crate::teams;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub db: Database,
    /// Reported by /api/health and stamped on the page body
    pub env_label: String,
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal(context: &str, e: anyhow::Error) -> ApiError {
    error!("{}: {:#}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": context, "message": e.to_string() })),
    )
}

/// Build the Axum router for the API and the embedded front end.
pub fn router(state: AppState) -> Router {
    let nba = Router::new()
        .route("/teams", get(nba_teams_handler))
        .route("/games", get(nba_games_handler))
        .route("/games-with-predictions", get(nba_games_with_predictions_handler))
        .route("/predict", get(nba_predict_handler))
        .route("/same-game-parlay", get(nba_parlay_handler))
        .route("/odds", get(nba_odds_handler));

    Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/teams", get(teams_handler))
        .route("/api/games", get(games_handler))
        .route("/api/games-with-predictions", get(games_with_predictions_handler))
        .route("/api/predict", get(predict_handler))
        .route("/api/upcoming-games", get(upcoming_handler))
        .route("/api/update-results", post(update_results_handler))
        .route("/api/accuracy", get(accuracy_handler))
        .route("/api/prop-accuracy", get(prop_accuracy_handler))
        .route("/api/update-prop-results", post(update_prop_results_handler))
        .route("/api/update-all-prop-results", post(update_all_prop_results_handler))
        .route("/api/history", get(history_handler))
        .route("/api/same-game-parlay", get(parlay_handler))
        .nest("/api/nba", nba)
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ── Query / body shapes ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictQuery {
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub home_team: Option<String>,
    pub game_date: Option<String>,
    pub game_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayQuery {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub game_id: Option<String>,
    pub game_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub date: Option<String>,
    /// Graded predictions from this game date on
    pub start: Option<String>,
    /// Graded predictions up to this game date
    pub end: Option<String>,
    /// `all=true` lists every prediction with its result
    pub all: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateResultsBody {
    pub date: Option<String>,
}


/// Requested date, or today's UTC date
fn resolve_date(date: Option<String>) -> Result<String, ApiError> {
    match date.filter(|d| !d.is_empty()) {
        Some(d) if is_iso_date(&d) => Ok(d),
        Some(_) => Err(bad_request("Invalid date, expected YYYY-MM-DD")),
        None => Ok(Utc::now().format("%Y-%m-%d").to_string()),
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

/// Both teams present and known to `known`; returns (team1, team2)
fn matchup<'a>(
    team1: &'a Option<String>,
    team2: &'a Option<String>,
    known: fn(&str) -> bool,
) -> Result<(&'a str, &'a str), ApiError> {
    let (Some(t1), Some(t2)) = (non_empty(team1), non_empty(team2)) else {
        return Err(bad_request("Both teams are required"));
    };
    if !known(t1) || !known(t2) {
        return Err(bad_request("Invalid team code"));
    }
    Ok((t1, t2))
}

fn save_target<'a>(game_id: &'a Option<String>, game_date: &'a Option<String>) -> Option<SaveTarget<'a>> {
    Some(SaveTarget {
        game_id: non_empty(game_id)?,
        game_date: non_empty(game_date)?,
    })
}

// ── Shared ───────────────────────────────────────────────────────────────────

/// Serve the front end, stamping the environment label on the body.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(render_index(&state.env_label))
}

fn render_index(env_label: &str) -> String {
    INDEX_HTML.replace(
        "<body>",
        &format!(r#"<body data-env="{}">"#, escape_attr(env_label)),
    )
}

/// Escape text for a double-quoted HTML attribute
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "env": state.env_label,
    }))
}

// ── NFL ──────────────────────────────────────────────────────────────────────

/// GET /api/teams
async fn teams_handler() -> impl IntoResponse {
    Json(teams::nfl_team_map())
}

/// GET /api/games?date=YYYY-MM-DD
async fn games_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Value> {
    let date = resolve_date(q.date)?;
    let games = state
        .engine
        .nfl_games(&date)
        .await
        .map_err(|e| internal("Failed to fetch games", e))?;
    Ok(Json(json!({ "date": date, "games": games })))
}

/// GET /api/games-with-predictions?date=YYYY-MM-DD
async fn games_with_predictions_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Value> {
    let date = resolve_date(q.date)?;
    let games = state
        .engine
        .nfl_games_with_predictions(&date)
        .await
        .map_err(|e| internal("Failed to fetch games with predictions", e))?;
    Ok(Json(json!({ "date": date, "games": games })))
}

/// GET /api/predict?team1&team2&homeTeam&gameDate&gameId
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PredictQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (team1, team2) = matchup(&q.team1, &q.team2, |c| teams::nfl_team(c).is_some())?;
    let team1_home = q.home_team.as_deref() == Some(team1);
    let prediction = state
        .engine
        .predict_nfl(team1, team2, team1_home, non_empty(&q.game_date))
        .await;

    if let Some(target) = save_target(&q.game_id, &q.game_date) {
        let home = if team1_home { team1 } else { team2 };
        state
            .engine
            .save_nfl_prediction(&prediction, home, target)
            .await
            .map_err(|e| internal("Failed to save prediction", e))?;
        info!("💾 Saved prediction for game {}", target.game_id);
    }
    Ok(Json(prediction))
}

/// GET /api/upcoming-games
async fn upcoming_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.upcoming_nfl_games().await)
}

/// POST /api/update-results
async fn update_results_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<UpdateResultsBody>>,
) -> ApiResult<Value> {
    let date = resolve_date(body.and_then(|Json(b)| b.date))?;
    let updated = state
        .engine
        .update_results(&date)
        .await
        .map_err(|e| internal("Failed to update results", e))?;
    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "message": format!("Updated {} completed game results", updated),
    })))
}

/// GET /api/accuracy
async fn accuracy_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .db
        .calculate_accuracy()
        .await
        .map_err(|e| internal("Failed to calculate accuracy", e))?;
    Ok(Json(report))
}

/// GET /api/prop-accuracy
async fn prop_accuracy_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .db
        .calculate_prop_accuracy()
        .await
        .map_err(|e| internal("Failed to calculate prop accuracy", e))?;
    Ok(Json(report))
}

/// POST /api/update-prop-results. Entries that don't parse are skipped.
async fn update_prop_results_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> ApiResult<Value> {
    let invalid = || bad_request("Invalid request. Provide gameId and props array.");
    let Json(raw) = body.ok_or_else(invalid)?;
    let game_id = raw
        .get("gameId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(invalid)?;
    let entries = raw.get("props").and_then(Value::as_array).ok_or_else(invalid)?;

    let props = parse_prop_updates(game_id, entries);
    let updated = state
        .engine
        .update_prop_results(game_id, &props)
        .await
        .map_err(|e| internal("Failed to update prop results", e))?;
    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "message": format!("Updated {} prop results", entries.len()),
    })))
}

fn parse_prop_updates(game_id: &str, entries: &[Value]) -> Vec<PropResultUpdate> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            match serde_json::from_value::<PropResultUpdate>(entry.clone()) {
                Ok(update) => Some(update),
                Err(e) => {
                    warn!("Skipping prop result {} for game {}: {}", i, game_id, e);
                    None
                }
            }
        })
        .collect()
}

/// POST /api/update-all-prop-results
async fn update_all_prop_results_handler(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let updated = state
        .engine
        .grade_pending_props()
        .await
        .map_err(|e| internal("Failed to update prop results", e))?;
    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "message": format!("Updated {} player prop results from Sleeper API", updated),
    })))
}

/// GET /api/history?limit=20, ?date=YYYY-MM-DD, ?start=&end= or ?all=true
async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Value> {
    let (start, end) = (non_empty(&q.start), non_empty(&q.end));
    let history = if let Some(date) = non_empty(&q.date) {
        state.db.get_predictions_by_date(date).await
    } else if start.is_some() || end.is_some() {
        state.db.get_historical_accuracy(start, end).await
    } else if q.all.as_deref() == Some("true") {
        state.db.get_predictions_with_results().await
    } else {
        let limit = q
            .limit
            .as_deref()
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(20);
        state.db.get_recent_predictions(limit).await
    }
    .map_err(|e| internal("Failed to fetch history", e))?;
    Ok(Json(json!({ "predictions": history })))
}

/// GET /api/same-game-parlay?homeTeam&awayTeam&gameId&gameDate
async fn parlay_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ParlayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(home), Some(away)) = (non_empty(&q.home_team), non_empty(&q.away_team)) else {
        return Err(bad_request("homeTeam and awayTeam parameters required"));
    };
    let response = state
        .engine
        .nfl_same_game_parlay(home, away, save_target(&q.game_id, &q.game_date))
        .await;
    Ok(Json(response))
}

// ── NBA ──────────────────────────────────────────────────────────────────────

/// GET /api/nba/teams
async fn nba_teams_handler() -> impl IntoResponse {
    Json(teams::nba_team_map())
}

/// GET /api/nba/games?date=YYYY-MM-DD
async fn nba_games_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Value> {
    let date = resolve_date(q.date)?;
    let games = state
        .engine
        .nba_games(&date)
        .await
        .map_err(|e| internal("Failed to fetch NBA games", e))?;
    Ok(Json(json!({ "date": date, "games": games })))
}

/// GET /api/nba/games-with-predictions?date=YYYY-MM-DD
async fn nba_games_with_predictions_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Value> {
    let date = resolve_date(q.date)?;
    let games = state
        .engine
        .nba_games_with_predictions(&date)
        .await
        .map_err(|e| internal("Failed to fetch NBA games with predictions", e))?;
    Ok(Json(json!({ "date": date, "games": games })))
}

/// GET /api/nba/predict?team1&team2&homeTeam&gameDate
async fn nba_predict_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PredictQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (team1, team2) = matchup(&q.team1, &q.team2, |c| teams::nba_team(c).is_some())?;
    let team1_home = q.home_team.as_deref() == Some(team1);
    let prediction = state
        .engine
        .predict_nba(team1, team2, team1_home, non_empty(&q.game_date))
        .await;
    Ok(Json(prediction))
}

/// GET /api/nba/same-game-parlay?homeTeam&awayTeam&gameDate
async fn nba_parlay_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ParlayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(home), Some(away)) = (non_empty(&q.home_team), non_empty(&q.away_team)) else {
        return Err(bad_request("homeTeam and awayTeam parameters required"));
    };
    let response = state
        .engine
        .nba_same_game_parlay(home, away, non_empty(&q.game_date))
        .await;
    Ok(Json(response))
}

/// GET /api/nba/odds?date=YYYY-MM-DD
async fn nba_odds_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Value> {
    let date = resolve_date(q.date)?;
    let games = state.engine.nba_odds(Some(date.as_str())).await;
    Ok(Json(json!({ "date": date, "games": games.as_slice() })))
}

/// Embedded single-file front end (HTML + CSS + JS)
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>LiveSports Picks</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --red: #ff4f6a;
    --amber: #ff9800;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  .tab { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .9rem; border-radius: 6px; cursor: pointer; font-weight: 600; }
  .tab.active { border-color: var(--accent); color: var(--text); background: rgba(108,99,255,.15); }
  input[type=date] { background: var(--card); border: 1px solid var(--border); color: var(--text); padding: .3rem .5rem; border-radius: 6px; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .stats-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
  .stat-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.2rem; }
  .stat-card .label { color: var(--muted); font-size: .8rem; text-transform: uppercase; letter-spacing: .06em; margin-bottom: .4rem; }
  .stat-card .value { font-size: 1.7rem; font-weight: 700; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .pill { display: inline-block; padding: .15rem .55rem; border-radius: 20px; font-size: .75rem; font-weight: 600; }
  .pill.High { background: rgba(0,200,150,.15); color: var(--green); }
  .pill.Medium { background: rgba(255,152,0,.15); color: var(--amber); }
  .pill.Low { background: rgba(255,79,106,.15); color: var(--red); }
  .pos { color: var(--green); }
  .neg { color: var(--red); }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .btn:hover { border-color: var(--accent); color: var(--accent); }
  .strategies { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 1rem; padding: 1rem; }
  .strategy h3 { font-size: .95rem; margin-bottom: .3rem; }
  .strategy p { color: var(--muted); font-size: .8rem; margin-bottom: .5rem; }
  .strategy li { font-size: .85rem; list-style: none; padding: .2rem 0; }
</style>
</head>
<body>
<header>
  <h1>🏈 LiveSports Picks</h1>
  <button class="tab active" data-sport="nfl">NFL</button>
  <button class="tab" data-sport="nba">NBA</button>
  <input type="date" id="date">
  <button class="btn" onclick="loadGames()">↻ Refresh</button>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="env"></span>
</header>

<main>
  <div class="stats-grid" id="accuracy">
    <div class="stat-card"><div class="label">Predictions</div><div class="value" id="a-total">–</div></div>
    <div class="stat-card"><div class="label">Completed</div><div class="value" id="a-completed">–</div></div>
    <div class="stat-card"><div class="label">Winner Accuracy</div><div class="value" id="a-winner">–</div></div>
    <div class="stat-card"><div class="label">Avg Score Error</div><div class="value" id="a-error">–</div></div>
    <div class="stat-card"><div class="label">Prop Accuracy</div><div class="value" id="a-props">–</div></div>
  </div>

  <div class="panel">
    <div class="panel-header">Games <span style="color:var(--muted);font-size:.8rem;" id="games-date"></span></div>
    <table>
      <thead><tr><th>Matchup</th><th>Status</th><th>Pick</th><th>Projected</th><th>Confidence</th><th>Key Factor</th><th></th></tr></thead>
      <tbody id="games-tbody"><tr><td colspan="7" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>

  <div class="panel" id="parlay-panel" style="display:none">
    <div class="panel-header"><span id="parlay-title">Same-Game Parlay</span><span id="parlay-odds" style="color:var(--muted);font-size:.8rem;"></span></div>
    <table>
      <thead><tr><th>Player</th><th>Team</th><th>Prop</th><th>Projection</th><th>Line</th><th>Pick</th><th>Confidence</th></tr></thead>
      <tbody id="props-tbody"></tbody>
    </table>
    <div class="strategies" id="strategies"></div>
  </div>
</main>

<script>
let sport = 'nfl';
const api = path => sport === 'nba' ? `/api/nba/${path}` : `/api/${path}`;
const todayET = () => new Date().toLocaleDateString('en-CA', { timeZone: 'America/New_York' });
const pill = c => `<span class="pill ${c}">${c}</span>`;

document.getElementById('env').textContent = document.body.dataset.env || '';
document.getElementById('date').value = todayET();
document.getElementById('date').addEventListener('change', loadGames);
document.querySelectorAll('.tab').forEach(t => t.addEventListener('click', () => {
  document.querySelectorAll('.tab').forEach(x => x.classList.remove('active'));
  t.classList.add('active');
  sport = t.dataset.sport;
  document.getElementById('parlay-panel').style.display = 'none';
  loadGames();
}));

async function loadAccuracy() {
  const [a, p] = await Promise.all([fetch('/api/accuracy'), fetch('/api/prop-accuracy')]);
  if (a.ok) {
    const s = await a.json();
    document.getElementById('a-total').textContent = s.totalPredictions;
    document.getElementById('a-completed').textContent = s.totalCompleted;
    document.getElementById('a-winner').textContent = s.totalCompleted ? s.winnerAccuracy.toFixed(1) + '%' : '–';
    document.getElementById('a-error').textContent = s.totalCompleted ? s.avgTotalScoreDiff.toFixed(1) : '–';
  }
  if (p.ok) {
    const s = await p.json();
    document.getElementById('a-props').textContent = s.totalCompleted ? s.accuracy.toFixed(1) + '%' : '–';
  }
}

async function loadGames() {
  const date = document.getElementById('date').value || todayET();
  const tbody = document.getElementById('games-tbody');
  tbody.innerHTML = '<tr><td colspan="7" class="empty">Loading…</td></tr>';
  const r = await fetch(api(`games-with-predictions?date=${date}`));
  if (!r.ok) { tbody.innerHTML = '<tr><td colspan="7" class="empty">Failed to load games</td></tr>'; return; }
  const body = await r.json();
  document.getElementById('games-date').textContent = body.date;
  if (!body.games.length) { tbody.innerHTML = '<tr><td colspan="7" class="empty">No games scheduled</td></tr>'; return; }
  tbody.innerHTML = body.games.map(g => {
    const p = g.prediction;
    const home = g.homeTeam.code, away = g.awayTeam.code;
    const score = (g.homeTeam.score != null) ? ` (${g.awayTeam.score}–${g.homeTeam.score})` : '';
    if (!p) return `<tr><td>${away} @ ${home}</td><td>${g.status.detail}${score}</td><td colspan="5" class="empty">No prediction</td></tr>`;
    const fav = p.team1.probability >= p.team2.probability ? p.team1 : p.team2;
    const [h, a] = p.team1.code === home ? [p.team1, p.team2] : [p.team2, p.team1];
    return `<tr>
      <td>${away} @ ${home}</td>
      <td>${g.status.detail}${score}</td>
      <td class="pos">${fav.code} ${fav.probability}%</td>
      <td>${a.predictedScore}–${h.predictedScore}</td>
      <td>${pill(p.confidence)}</td>
      <td style="color:var(--muted)">${p.keyFactors[0] || ''}</td>
      <td><button class="btn" onclick="loadParlay('${home}','${away}','${g.id}','${g.gameDate}')">Props</button></td>
    </tr>`;
  }).join('');
}

async function loadParlay(home, away, gameId, gameDate) {
  const panel = document.getElementById('parlay-panel');
  const r = await fetch(api(`same-game-parlay?homeTeam=${home}&awayTeam=${away}&gameId=${gameId}&gameDate=${gameDate}`));
  if (!r.ok) return;
  const body = await r.json();
  panel.style.display = '';
  document.getElementById('parlay-title').textContent = `Same-Game Parlay · ${body.game}`;
  document.getElementById('parlay-odds').textContent = body.parlayOdds ? `Suggested: ${body.parlayOdds}` : '';
  const props = body.allProps || [];
  document.getElementById('props-tbody').innerHTML = props.length ? props.map(p => `<tr>
    <td>${p.player}</td><td>${p.team}</td><td>${p.prop}</td><td>${p.line}</td><td>${p.over}</td>
    <td class="${p.recommendation === 'OVER' ? 'pos' : p.recommendation === 'UNDER' ? 'neg' : ''}">${p.recommendation}</td>
    <td>${pill(p.confidence)}</td>
  </tr>`).join('') : '<tr><td colspan="7" class="empty">No props available</td></tr>';
  const s = body.parlayStrategies || {};
  document.getElementById('strategies').innerHTML = ['conservative', 'balanced', 'aggressive', 'risky']
    .filter(k => s[k])
    .map(k => `<div class="strategy"><h3>${s[k].name}</h3><p>${s[k].description}</p><ul>${
      s[k].picks.map(p => `<li>${p.player} ${p.recommendation} ${p.over} ${p.prop}</li>`).join('') || '<li class="empty">No picks</li>'
    }</ul></div>`).join('');
}

loadAccuracy();
loadGames();
setInterval(loadAccuracy, 60000);
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> Arc<AppState> {
        let cfg = Config::offline();
        let db = crate::db::in_memory();
        let engine = Engine::new(cfg, db.clone()).unwrap();
        Arc::new(AppState {
            engine: Arc::new(engine),
            db,
            env_label: "test".into(),
        })
    }

    fn status<T>(r: Result<T, ApiError>) -> StatusCode {
        match r {
            Ok(_) => StatusCode::OK,
            Err((code, _)) => code,
        }
    }

    #[test]
    fn test_resolve_date() {
        assert_eq!(resolve_date(Some("2025-01-12".into())).unwrap(), "2025-01-12");
        assert!(resolve_date(Some("01/12/2025".into())).is_err());
        assert_eq!(resolve_date(None).unwrap().len(), 10);
        assert_eq!(resolve_date(Some(String::new())).unwrap().len(), 10);
    }

    #[test]
    fn test_save_target_needs_both_fields() {
        let id = Some("401".to_string());
        let date = Some("2025-01-12".to_string());
        assert!(save_target(&id, &date).is_some());
        assert!(save_target(&id, &None).is_none());
        assert!(save_target(&Some(String::new()), &date).is_none());
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health_handler(State(state())).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["env"], "test");
    }

    #[tokio::test]
    async fn test_predict_validation() {
        let missing = PredictQuery {
            team1: Some("KC".into()),
            ..Default::default()
        };
        let r = predict_handler(State(state()), Query(missing)).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);

        let unknown = PredictQuery {
            team1: Some("KC".into()),
            team2: Some("XYZ".into()),
            ..Default::default()
        };
        let r = predict_handler(State(state()), Query(unknown)).await;
        let Err((code, Json(body))) = r else {
            panic!("expected an error");
        };
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid team code");

        // NFL code that isn't an NBA team
        let nfl_only = PredictQuery {
            team1: Some("KC".into()),
            team2: Some("BUF".into()),
            ..Default::default()
        };
        let r = nba_predict_handler(State(state()), Query(nfl_only)).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parlay_requires_both_teams() {
        let q = ParlayQuery {
            home_team: Some("BUF".into()),
            ..Default::default()
        };
        let r = parlay_handler(State(state()), Query(q)).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_prop_results_rejects_bad_body() {
        let r = update_prop_results_handler(State(state()), None).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);

        let not_array = json!({ "gameId": "401", "props": "nope" });
        let r = update_prop_results_handler(State(state()), Some(Json(not_array))).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);

        let no_game = json!({ "gameId": "", "props": [] });
        let r = update_prop_results_handler(State(state()), Some(Json(no_game))).await;
        assert_eq!(status(r), StatusCode::BAD_REQUEST);

        let ok = json!({
            "gameId": "401",
            "props": [{ "playerName": "Josh Allen", "propType": "Passing Yards", "actualValue": 262 }]
        });
        let r = update_prop_results_handler(State(state()), Some(Json(ok))).await;
        assert_eq!(status(r), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_prop_results_skips_malformed_entries() {
        let mixed = json!({
            "gameId": "401",
            "props": [
                { "playerName": "Josh Allen", "propType": "Passing Yards", "actualValue": 262 },
                { "playerName": "James Cook", "propType": "Rushing Yards", "actualValue": "80" },
                7,
                { "playerName": "Dalton Kincaid", "propType": "Receptions", "actualValue": 5 }
            ]
        });
        let Ok(Json(body)) = update_prop_results_handler(State(state()), Some(Json(mixed))).await
        else {
            panic!("batch rejected");
        };
        assert_eq!(body["success"], true);
        assert_eq!(body["updated"], 2);
        assert_eq!(body["message"], "Updated 4 prop results");
    }

    #[test]
    fn test_index_escapes_env_label() {
        let html = render_index("prod");
        assert!(html.contains(r#"<body data-env="prod">"#));

        let html = render_index(r#""><script>alert(1)</script>"#);
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains(r#"data-env="&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;""#));
        assert_eq!(escape_attr("a&b'c"), "a&amp;b&#39;c");
    }

    #[tokio::test]
    async fn test_history_defaults() {
        let r = history_handler(State(state()), Query(HistoryQuery::default())).await;
        let Ok(Json(body)) = r else {
            panic!("history failed");
        };
        assert_eq!(body["predictions"], json!([]));
    }

    #[tokio::test]
    async fn test_history_date_range_grades_picks() {
        let state = state();
        state
            .db
            .save_prediction(&crate::db::models::Prediction {
                id: None,
                game_id: "401".into(),
                game_date: "2025-01-12".into(),
                home_team: "BUF".into(),
                away_team: "KC".into(),
                home_win_prob: 58.0,
                away_win_prob: 42.0,
                predicted_home_score: 27,
                predicted_away_score: 23,
                confidence: "Medium".into(),
                weather_condition: None,
                weather_temp: None,
                prediction_time: Utc::now(),
            })
            .await
            .unwrap();
        state
            .db
            .save_actual_result("401", "2025-01-12", "BUF", "KC", 24, 31)
            .await
            .unwrap();

        let q = HistoryQuery {
            start: Some("2025-01-01".into()),
            ..Default::default()
        };
        let Ok(Json(body)) = history_handler(State(state.clone()), Query(q)).await else {
            panic!("history failed");
        };
        assert_eq!(body["predictions"][0]["game_id"], "401");
        assert_eq!(body["predictions"][0]["prediction_correct"], false);

        let q = HistoryQuery {
            end: Some("2025-01-11".into()),
            ..Default::default()
        };
        let Ok(Json(body)) = history_handler(State(state), Query(q)).await else {
            panic!("history failed");
        };
        assert_eq!(body["predictions"], json!([]));
    }
}
