//! Pre-game NFL win probability.
//!
//! Team 1's score starts at 50 and each factor adds or subtracts points based
//! on the differential between the two teams. The total is clamped to
//! [15, 85] and team 2 gets the remainder. Factors are additive and
//! independent; none of them looks at another's output.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::roster::NflRoster;
use super::team_stats::TeamStats;
use super::{confidence_label, probability_pair, round1};
use crate::sources::weather::Weather;
use crate::teams;

/// League-average points per game used to anchor predicted scores
const NFL_AVERAGE_POINTS: f64 = 22.0;
const HOME_FIELD_POINTS: f64 = 3.0;

/// Each factor's contribution to team 1's raw score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorBreakdown {
    pub win_pct: f64,
    pub home_away: f64,
    pub point_differential: f64,
    pub rating: f64,
    pub momentum: f64,
    pub injuries: f64,
    pub qb_health: f64,
    pub rest: f64,
    pub travel: f64,
    pub weather: f64,
    pub turnovers: f64,
    pub red_zone: f64,
    pub third_down: f64,
    pub special_teams: f64,
    pub coaching: f64,
    pub adjustments: f64,
    pub defense: f64,
    pub penalties: f64,
    pub clutch: f64,
}

impl FactorBreakdown {
    pub fn total(&self) -> f64 {
        self.win_pct
            + self.home_away
            + self.point_differential
            + self.rating
            + self.momentum
            + self.injuries
            + self.qb_health
            + self.rest
            + self.travel
            + self.weather
            + self.turnovers
            + self.red_zone
            + self.third_down
            + self.special_teams
            + self.coaching
            + self.adjustments
            + self.defense
            + self.penalties
            + self.clutch
    }
}

/// Scored matchup before rosters and team metadata are attached
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupScore {
    pub factors: FactorBreakdown,
    /// Team 1 win probability, percent
    pub prob1: f64,
    pub prob2: f64,
    pub score1: i32,
    pub score2: i32,
    pub confidence: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPrediction {
    pub code: String,
    pub name: String,
    /// Win probability, percent with one decimal
    pub probability: f64,
    pub stats: Arc<TeamStats>,
    pub predicted_score: i32,
    pub roster: NflRoster,
}

/// Full prediction for one NFL matchup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NflPrediction {
    pub team1: TeamPrediction,
    pub team2: TeamPrediction,
    pub weather: Weather,
    pub confidence: String,
    pub key_factors: Vec<String>,
}

impl NflPrediction {
    /// Team 1 and team 2 in (home, away) order
    pub fn home_away(&self, home_code: &str) -> (&TeamPrediction, &TeamPrediction) {
        if self.team1.code == home_code {
            (&self.team1, &self.team2)
        } else {
            (&self.team2, &self.team1)
        }
    }
}

fn team_name(code: &str) -> String {
    teams::nfl_team(code)
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| code.to_string())
}

// ── Scoring ──────────────────────────────────────────────────────────────────

pub fn compute_factors(
    s1: &TeamStats,
    s2: &TeamStats,
    team1_home: bool,
    weather: &Weather,
) -> FactorBreakdown {
    let mut f = FactorBreakdown {
        win_pct: (s1.record().pct() - s2.record().pct()) * 15.0,
        ..Default::default()
    };

    f.home_away = if team1_home {
        (s1.home_record.pct() - s2.away_record.pct()) * 12.0 + HOME_FIELD_POINTS
    } else {
        (s1.away_record.pct() - s2.home_record.pct()) * 12.0 - HOME_FIELD_POINTS
    };

    f.point_differential = (s1.point_differential() - s2.point_differential()) * 0.4;

    let overall1 = (s1.offensive_rating + s1.defensive_rating) / 2.0;
    let overall2 = (s2.offensive_rating + s2.defensive_rating) / 2.0;
    f.rating = (overall1 - overall2) * 0.1;

    f.momentum = (s1.recent_wins() as f64 - s2.recent_wins() as f64) * 1.6;
    if s1.streak_type == "W" {
        f.momentum += s1.streak_length as f64 * 0.5;
    }
    if s2.streak_type == "W" {
        f.momentum -= s2.streak_length as f64 * 0.5;
    }

    let impact1 = (s1.key_injuries * s1.injury_severity) as f64 / 10.0;
    let impact2 = (s2.key_injuries * s2.injury_severity) as f64 / 10.0;
    f.injuries = (impact2 - impact1) * 0.9;
    f.qb_health = (s1.quarterback_health - s2.quarterback_health) * 0.08;

    if s1.is_coming_off_bye {
        f.rest += 2.5;
    }
    if s2.is_coming_off_bye {
        f.rest -= 2.5;
    }
    let rest_diff = s1.days_since_last_game - s2.days_since_last_game;
    if rest_diff.abs() >= 3 {
        f.rest += if rest_diff > 0 { 1.5 } else { -1.5 };
    }
    f.travel = (s2.travel_distance - s1.travel_distance) / 1000.0;

    if !weather.is_dome {
        // Cold favours the stronger run game
        if weather.temperature < 35 {
            f.weather += (s1.rushing_yards_per_game - s2.rushing_yards_per_game) / 30.0;
        }
        if weather.wind_speed > 15 {
            f.weather -= (s1.passing_yards_per_game - s2.passing_yards_per_game).abs() / 50.0;
        }
        if weather.precipitation > 30 {
            f.weather -= 1.5;
        }
    }

    f.turnovers = (s1.turnover_differential - s2.turnover_differential) * 0.35;
    f.red_zone = (s1.red_zone_efficiency - s2.red_zone_efficiency) * 0.08;
    f.third_down = (s1.third_down_conversion - s2.third_down_conversion) * 0.08;
    f.special_teams = (s1.special_teams_rating - s2.special_teams_rating) * 0.04;
    f.coaching = (s1.coach_win_percentage - s2.coach_win_percentage) * 0.05;
    f.adjustments = (s1.adjustment_rating - s2.adjustment_rating) * 0.03;

    let pass_def = (32 - s1.pass_defense_rank as i32) - (32 - s2.pass_defense_rank as i32);
    let rush_def = (32 - s1.rush_defense_rank as i32) - (32 - s2.rush_defense_rank as i32);
    f.defense = pass_def as f64 * 0.15 + rush_def as f64 * 0.15;

    f.penalties = (s2.penalties_per_game - s1.penalties_per_game) * 0.6;
    f.clutch = (s1.come_from_behind_wins as f64 - s2.come_from_behind_wins as f64) * 0.75;
    f
}

/// Points for one side, pulled heavily toward the league average.
fn predicted_points(ppg: f64, probability: f64, weather: &Weather) -> i32 {
    let baseline = ppg * 0.3 + NFL_AVERAGE_POINTS * 0.7;
    let advantage = (probability - 50.0) / 300.0;
    let mut points = (baseline * (1.0 + advantage)).clamp(10.0, 35.0);
    if !weather.is_dome && (weather.precipitation > 30 || weather.wind_speed > 20) {
        points *= 0.85;
    }
    points.round() as i32
}

pub fn score_matchup(
    s1: &TeamStats,
    s2: &TeamStats,
    team1_home: bool,
    weather: &Weather,
) -> MatchupScore {
    let factors = compute_factors(s1, s2, team1_home, weather);
    let (prob1, prob2) = probability_pair(50.0 + factors.total());

    MatchupScore {
        factors,
        prob1,
        prob2,
        score1: predicted_points(s1.points_per_game, prob1, weather),
        score2: predicted_points(s2.points_per_game, prob2, weather),
        confidence: confidence_label(prob1, prob2),
    }
}

/// Attach team metadata, rosters and key factors to a scored matchup.
#[allow(clippy::too_many_arguments)]
pub fn assemble_prediction(
    team1: &str,
    team2: &str,
    stats1: Arc<TeamStats>,
    stats2: Arc<TeamStats>,
    roster1: NflRoster,
    roster2: NflRoster,
    weather: Weather,
    team1_home: bool,
) -> NflPrediction {
    let score = score_matchup(&stats1, &stats2, team1_home, &weather);
    debug!("{} vs {} factor breakdown: {:?}", team1, team2, score.factors);
    let key_factors = key_factors(team1, team2, &stats1, &stats2, &weather, team1_home);

    NflPrediction {
        team1: TeamPrediction {
            code: team1.to_string(),
            name: team_name(team1),
            probability: round1(score.prob1),
            stats: stats1,
            predicted_score: score.score1,
            roster: roster1,
        },
        team2: TeamPrediction {
            code: team2.to_string(),
            name: team_name(team2),
            probability: round1(score.prob2),
            stats: stats2,
            predicted_score: score.score2,
            roster: roster2,
        },
        weather,
        confidence: score.confidence.to_string(),
        key_factors,
    }
}

// ── Key factors ──────────────────────────────────────────────────────────────

/// Human-readable reasons behind a prediction. Never empty.
pub fn key_factors(
    team1: &str,
    team2: &str,
    s1: &TeamStats,
    s2: &TeamStats,
    weather: &Weather,
    team1_home: bool,
) -> Vec<String> {
    let name1 = team_name(team1);
    let name2 = team_name(team2);
    // Name of team 1 when `first` holds, else team 2
    let pick = |first: bool| if first { &name1 } else { &name2 };
    let mut factors = Vec::new();

    let wins1 = s1.record().pct();
    let wins2 = s2.record().pct();
    if (wins1 - wins2).abs() > 0.2 {
        let better = if wins1 > wins2 { s1 } else { s2 };
        factors.push(format!(
            "{} has a significantly better overall record ({}-{})",
            pick(wins1 > wins2),
            better.wins,
            better.losses
        ));
    }

    if team1_home {
        if s1.home_record.pct() > 0.7 {
            factors.push(format!(
                "{} is dominant at home ({}-{})",
                name1, s1.home_record.wins, s1.home_record.losses
            ));
        }
        if s2.away_record.pct() < 0.3 {
            factors.push(format!(
                "{} struggles on the road ({}-{})",
                name2, s2.away_record.wins, s2.away_record.losses
            ));
        }
    }

    let diff1 = s1.point_differential();
    let diff2 = s2.point_differential();
    if (diff1 - diff2).abs() > 5.0 {
        factors.push(format!(
            "{} has superior point differential ({:+.1} pts/game)",
            pick(diff1 > diff2),
            diff1.max(diff2)
        ));
    }

    let recent1 = s1.recent_wins();
    let recent2 = s2.recent_wins();
    if recent1.abs_diff(recent2) >= 2 {
        let best = recent1.max(recent2);
        factors.push(format!(
            "{} is in better recent form ({}-{} in last 5)",
            pick(recent1 > recent2),
            best,
            5usize.saturating_sub(best)
        ));
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.streak_type == "W" && s.streak_length >= 3 {
            factors.push(format!(
                "{} riding a {}-game winning streak",
                name, s.streak_length
            ));
        }
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.key_injuries >= 3 || s.quarterback_health < 80.0 {
            factors.push(format!(
                "{} dealing with {} key injuries (QB health: {}%)",
                name, s.key_injuries, s.quarterback_health
            ));
        }
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.is_coming_off_bye {
            factors.push(format!(
                "{} coming off bye week with extra rest and preparation",
                name
            ));
        }
    }

    let rest_gap = (s1.days_since_last_game - s2.days_since_last_game).abs();
    if rest_gap >= 3 {
        factors.push(format!(
            "{} has {} more days of rest",
            pick(s1.days_since_last_game > s2.days_since_last_game),
            rest_gap
        ));
    }

    if weather.is_dome {
        factors.push("Indoor dome game - weather is not a factor".to_string());
    } else {
        if weather.temperature < 35 {
            factors.push(format!(
                "Cold weather ({}°F) favors strong rushing attacks",
                weather.temperature
            ));
        }
        if weather.wind_speed > 15 {
            factors.push(format!(
                "High winds ({} mph) will impact passing game",
                weather.wind_speed
            ));
        }
        if weather.precipitation > 30 {
            factors.push(format!(
                "{} conditions ({}% chance) likely to reduce scoring",
                weather.condition, weather.precipitation
            ));
        }
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.offensive_rating > 85.0 {
            factors.push(format!(
                "{} has elite offensive rating ({:.1})",
                name, s.offensive_rating
            ));
        }
    }
    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.defensive_rating > 85.0 {
            factors.push(format!(
                "{} has dominant defense ({:.1} rating)",
                name, s.defensive_rating
            ));
        }
    }

    if (s1.turnover_differential - s2.turnover_differential).abs() > 5.0 {
        factors.push(format!(
            "{} has major edge in turnover differential",
            pick(s1.turnover_differential > s2.turnover_differential)
        ));
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.red_zone_efficiency > 65.0 {
            factors.push(format!(
                "{} excellent in red zone ({:.1}% efficiency)",
                name, s.red_zone_efficiency
            ));
        }
    }

    if (s1.special_teams_rating - s2.special_teams_rating).abs() > 15.0 {
        factors.push(format!(
            "{} has significant special teams advantage",
            pick(s1.special_teams_rating > s2.special_teams_rating)
        ));
    }

    if (s1.coach_win_percentage - s2.coach_win_percentage).abs() > 15.0 {
        factors.push(format!(
            "{} has more experienced coaching staff",
            pick(s1.coach_win_percentage > s2.coach_win_percentage)
        ));
    }

    for (name, s) in [(&name1, s1), (&name2, s2)] {
        if s.come_from_behind_wins >= 3 {
            factors.push(format!(
                "{} proven in clutch situations ({} comeback wins)",
                name, s.come_from_behind_wins
            ));
        }
    }

    if factors.is_empty() {
        return vec![
            "Both teams evenly matched".to_string(),
            "Game could come down to final possession".to_string(),
        ];
    }
    factors
}
