//! Static team tables for both leagues plus the code mappings used by the
//! schedule and sportsbook sources.

use serde::Serialize;
use std::collections::BTreeMap;

/// NFL franchise with its stadium location
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NflTeam {
    #[serde(skip)]
    pub code: &'static str,
    pub name: &'static str,
    pub conference: &'static str,
    pub division: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub is_dome: bool,
    #[serde(skip)]
    pub espn_id: u32,
}

/// NBA franchise with its arena location
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaTeam {
    #[serde(skip)]
    pub code: &'static str,
    pub name: &'static str,
    pub conference: &'static str,
    pub division: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub arena: &'static str,
    #[serde(skip)]
    pub espn_id: u32,
}

macro_rules! nfl {
    ($code:literal, $name:literal, $conf:literal, $div:literal, $city:literal, $state:literal,
     $lat:literal, $lon:literal, $dome:literal, $espn:literal) => {
        NflTeam {
            code: $code,
            name: $name,
            conference: $conf,
            division: $div,
            city: $city,
            state: $state,
            lat: $lat,
            lon: $lon,
            is_dome: $dome,
            espn_id: $espn,
        }
    };
}

macro_rules! nba {
    ($code:literal, $name:literal, $conf:literal, $div:literal, $city:literal, $state:literal,
     $lat:literal, $lon:literal, $arena:literal, $espn:literal) => {
        NbaTeam {
            code: $code,
            name: $name,
            conference: $conf,
            division: $div,
            city: $city,
            state: $state,
            lat: $lat,
            lon: $lon,
            arena: $arena,
            espn_id: $espn,
        }
    };
}

pub static NFL_TEAMS: &[NflTeam] = &[
    nfl!("KC", "Kansas City Chiefs", "AFC", "West", "Kansas City", "MO", 39.0489, -94.4839, false, 12),
    nfl!("BUF", "Buffalo Bills", "AFC", "East", "Buffalo", "NY", 42.7738, -78.7870, false, 2),
    nfl!("BAL", "Baltimore Ravens", "AFC", "North", "Baltimore", "MD", 39.2780, -76.6227, false, 33),
    nfl!("MIA", "Miami Dolphins", "AFC", "East", "Miami Gardens", "FL", 25.9580, -80.2389, false, 15),
    nfl!("PHI", "Philadelphia Eagles", "NFC", "East", "Philadelphia", "PA", 39.9008, -75.1675, false, 21),
    nfl!("SF", "San Francisco 49ers", "NFC", "West", "Santa Clara", "CA", 37.4030, -121.9697, false, 25),
    nfl!("DAL", "Dallas Cowboys", "NFC", "East", "Arlington", "TX", 32.7473, -97.0945, true, 6),
    nfl!("DET", "Detroit Lions", "NFC", "North", "Detroit", "MI", 42.3400, -83.0456, true, 8),
    nfl!("CLE", "Cleveland Browns", "AFC", "North", "Cleveland", "OH", 41.5061, -81.6995, false, 5),
    nfl!("JAX", "Jacksonville Jaguars", "AFC", "South", "Jacksonville", "FL", 30.3240, -81.6373, false, 30),
    nfl!("CIN", "Cincinnati Bengals", "AFC", "North", "Cincinnati", "OH", 39.0954, -84.5160, false, 4),
    nfl!("HOU", "Houston Texans", "AFC", "South", "Houston", "TX", 29.6847, -95.4107, true, 34),
    nfl!("PIT", "Pittsburgh Steelers", "AFC", "North", "Pittsburgh", "PA", 40.4468, -80.0158, false, 23),
    nfl!("LAC", "Los Angeles Chargers", "AFC", "West", "Inglewood", "CA", 33.9535, -118.3392, false, 24),
    nfl!("IND", "Indianapolis Colts", "AFC", "South", "Indianapolis", "IN", 39.7601, -86.1639, true, 11),
    nfl!("DEN", "Denver Broncos", "AFC", "West", "Denver", "CO", 39.7439, -105.0201, false, 7),
    nfl!("LV", "Las Vegas Raiders", "AFC", "West", "Las Vegas", "NV", 36.0909, -115.1833, true, 13),
    nfl!("TEN", "Tennessee Titans", "AFC", "South", "Nashville", "TN", 36.1665, -86.7713, false, 10),
    nfl!("NE", "New England Patriots", "AFC", "East", "Foxborough", "MA", 42.0909, -71.2643, false, 17),
    nfl!("NYJ", "New York Jets", "AFC", "East", "East Rutherford", "NJ", 40.8135, -74.0745, false, 20),
    nfl!("MIN", "Minnesota Vikings", "NFC", "North", "Minneapolis", "MN", 44.9738, -93.2577, true, 16),
    nfl!("GB", "Green Bay Packers", "NFC", "North", "Green Bay", "WI", 44.5013, -88.0622, false, 9),
    nfl!("TB", "Tampa Bay Buccaneers", "NFC", "South", "Tampa", "FL", 27.9759, -82.5033, false, 27),
    nfl!("LAR", "Los Angeles Rams", "NFC", "West", "Inglewood", "CA", 33.9535, -118.3392, false, 14),
    nfl!("SEA", "Seattle Seahawks", "NFC", "West", "Seattle", "WA", 47.5952, -122.3316, false, 26),
    nfl!("NO", "New Orleans Saints", "NFC", "South", "New Orleans", "LA", 29.9511, -90.0812, true, 18),
    nfl!("ATL", "Atlanta Falcons", "NFC", "South", "Atlanta", "GA", 33.7554, -84.4008, true, 1),
    nfl!("CHI", "Chicago Bears", "NFC", "North", "Chicago", "IL", 41.8623, -87.6167, false, 3),
    nfl!("ARI", "Arizona Cardinals", "NFC", "West", "Glendale", "AZ", 33.5276, -112.2626, true, 22),
    nfl!("WAS", "Washington Commanders", "NFC", "East", "Landover", "MD", 38.9076, -76.8645, false, 28),
    nfl!("NYG", "New York Giants", "NFC", "East", "East Rutherford", "NJ", 40.8135, -74.0745, false, 19),
    nfl!("CAR", "Carolina Panthers", "NFC", "South", "Charlotte", "NC", 35.2258, -80.8530, false, 29),
];

pub static NBA_TEAMS: &[NbaTeam] = &[
    nba!("ATL", "Atlanta Hawks", "East", "Southeast", "Atlanta", "GA", 33.7573, -84.3963, "State Farm Arena", 1),
    nba!("BOS", "Boston Celtics", "East", "Atlantic", "Boston", "MA", 42.3662, -71.0621, "TD Garden", 2),
    nba!("BKN", "Brooklyn Nets", "East", "Atlantic", "Brooklyn", "NY", 40.6826, -73.9754, "Barclays Center", 17),
    nba!("CHA", "Charlotte Hornets", "East", "Southeast", "Charlotte", "NC", 35.2251, -80.8392, "Spectrum Center", 30),
    nba!("CHI", "Chicago Bulls", "East", "Central", "Chicago", "IL", 41.8807, -87.6742, "United Center", 4),
    nba!("CLE", "Cleveland Cavaliers", "East", "Central", "Cleveland", "OH", 41.4965, -81.6882, "Rocket Mortgage FieldHouse", 5),
    nba!("DAL", "Dallas Mavericks", "West", "Southwest", "Dallas", "TX", 32.7905, -96.8103, "American Airlines Center", 6),
    nba!("DEN", "Denver Nuggets", "West", "Northwest", "Denver", "CO", 39.7487, -105.0077, "Ball Arena", 7),
    nba!("DET", "Detroit Pistons", "East", "Central", "Detroit", "MI", 42.6970, -83.2456, "Little Caesars Arena", 8),
    nba!("GSW", "Golden State Warriors", "West", "Pacific", "San Francisco", "CA", 37.7680, -122.3878, "Chase Center", 9),
    nba!("HOU", "Houston Rockets", "West", "Southwest", "Houston", "TX", 29.7508, -95.3621, "Toyota Center", 10),
    nba!("IND", "Indiana Pacers", "East", "Central", "Indianapolis", "IN", 39.7640, -86.1555, "Gainbridge Fieldhouse", 11),
    nba!("LAC", "LA Clippers", "West", "Pacific", "Los Angeles", "CA", 34.0430, -118.2673, "Crypto.com Arena", 12),
    nba!("LAL", "Los Angeles Lakers", "West", "Pacific", "Los Angeles", "CA", 34.0430, -118.2673, "Crypto.com Arena", 13),
    nba!("MEM", "Memphis Grizzlies", "West", "Southwest", "Memphis", "TN", 35.1382, -90.0505, "FedExForum", 29),
    nba!("MIA", "Miami Heat", "East", "Southeast", "Miami", "FL", 25.7814, -80.1870, "Kaseya Center", 14),
    nba!("MIL", "Milwaukee Bucks", "East", "Central", "Milwaukee", "WI", 43.0435, -87.9170, "Fiserv Forum", 15),
    nba!("MIN", "Minnesota Timberwolves", "West", "Northwest", "Minneapolis", "MN", 44.9795, -93.2760, "Target Center", 16),
    nba!("NOP", "New Orleans Pelicans", "West", "Southwest", "New Orleans", "LA", 29.9490, -90.0821, "Smoothie King Center", 3),
    nba!("NYK", "New York Knicks", "East", "Atlantic", "New York", "NY", 40.7505, -73.9934, "Madison Square Garden", 18),
    nba!("OKC", "Oklahoma City Thunder", "West", "Northwest", "Oklahoma City", "OK", 35.4634, -97.5151, "Paycom Center", 25),
    nba!("ORL", "Orlando Magic", "East", "Southeast", "Orlando", "FL", 28.5392, -81.3839, "Kia Center", 19),
    nba!("PHI", "Philadelphia 76ers", "East", "Atlantic", "Philadelphia", "PA", 39.9012, -75.1720, "Wells Fargo Center", 20),
    nba!("PHX", "Phoenix Suns", "West", "Pacific", "Phoenix", "AZ", 33.4457, -112.0712, "Footprint Center", 21),
    nba!("POR", "Portland Trail Blazers", "West", "Northwest", "Portland", "OR", 45.5317, -122.6668, "Moda Center", 22),
    nba!("SAC", "Sacramento Kings", "West", "Pacific", "Sacramento", "CA", 38.5802, -121.4997, "Golden 1 Center", 23),
    nba!("SAS", "San Antonio Spurs", "West", "Southwest", "San Antonio", "TX", 29.4270, -98.4375, "Frost Bank Center", 24),
    nba!("TOR", "Toronto Raptors", "East", "Atlantic", "Toronto", "ON", 43.6435, -79.3791, "Scotiabank Arena", 28),
    nba!("UTA", "Utah Jazz", "West", "Northwest", "Salt Lake City", "UT", 40.7683, -111.9011, "Delta Center", 26),
    nba!("WAS", "Washington Wizards", "East", "Southeast", "Washington", "DC", 38.8981, -77.0209, "Capital One Arena", 27),
];

pub fn nfl_team(code: &str) -> Option<&'static NflTeam> {
    NFL_TEAMS.iter().find(|t| t.code == code)
}

pub fn nba_team(code: &str) -> Option<&'static NbaTeam> {
    NBA_TEAMS.iter().find(|t| t.code == code)
}

/// NFL table keyed by team code, the shape `/api/teams` returns
pub fn nfl_team_map() -> BTreeMap<&'static str, &'static NflTeam> {
    NFL_TEAMS.iter().map(|t| (t.code, t)).collect()
}

pub fn nba_team_map() -> BTreeMap<&'static str, &'static NbaTeam> {
    NBA_TEAMS.iter().map(|t| (t.code, t)).collect()
}

/// ESPN NFL abbreviation → internal code
pub fn map_espn_nfl_code(abbr: &str) -> String {
    match abbr {
        "JAC" => "JAX",
        "LVR" => "LV",
        "WSH" => "WAS",
        other => other,
    }
    .to_string()
}

/// ESPN NBA abbreviation → internal code
pub fn map_espn_nba_code(abbr: &str) -> String {
    match abbr {
        "GS" => "GSW",
        "NO" => "NOP",
        "NY" => "NYK",
        "SA" => "SAS",
        "UTAH" => "UTA",
        "WSH" => "WAS",
        "PHO" => "PHX",
        other => other,
    }
    .to_string()
}

/// Sportsbook team label → internal code.
///
/// Full franchise names resolve through the team tables; labels in
/// "XXX Nickname" form ("BOS Celtics") resolve through their prefix.
/// Unknown labels come back unchanged.
pub fn map_sportsbook_team(label: &str) -> String {
    let label = label.trim();
    let by_name = match label {
        "LA Clippers" | "Los Angeles Clippers" => Some("LAC"),
        "LA Lakers" | "Los Angeles Lakers" => Some("LAL"),
        _ => NBA_TEAMS
            .iter()
            .find(|t| t.name == label)
            .map(|t| t.code)
            .or_else(|| NFL_TEAMS.iter().find(|t| t.name == label).map(|t| t.code)),
    };
    if let Some(code) = by_name {
        return code.to_string();
    }

    if let Some((prefix, rest)) = label.split_once(' ') {
        let is_code = (2..=3).contains(&prefix.len())
            && prefix.chars().all(|c| c.is_ascii_uppercase())
            && !rest.trim().is_empty();
        if is_code {
            return match prefix {
                "NO" => "NOP",
                "GS" => "GSW",
                "SA" => "SAS",
                "PHO" => "PHX",
                "NY" => "NYK",
                other => other,
            }
            .to_string();
        }
    }
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_complete() {
        assert_eq!(NFL_TEAMS.len(), 32);
        assert_eq!(NBA_TEAMS.len(), 30);
        assert_eq!(nfl_team_map().len(), 32);
        assert_eq!(nba_team_map().len(), 30);
        assert!(nfl_team("DAL").unwrap().is_dome);
        assert!(!nfl_team("GB").unwrap().is_dome);
        assert_eq!(nba_team("GSW").unwrap().espn_id, 9);
        assert!(nfl_team("XXX").is_none());
    }

    #[test]
    fn test_espn_code_mapping() {
        assert_eq!(map_espn_nfl_code("WSH"), "WAS");
        assert_eq!(map_espn_nfl_code("JAC"), "JAX");
        assert_eq!(map_espn_nfl_code("KC"), "KC");
        assert_eq!(map_espn_nba_code("GS"), "GSW");
        assert_eq!(map_espn_nba_code("UTAH"), "UTA");
        assert_eq!(map_espn_nba_code("BOS"), "BOS");
    }

    #[test]
    fn test_sportsbook_labels() {
        assert_eq!(map_sportsbook_team("BOS Celtics"), "BOS");
        assert_eq!(map_sportsbook_team("GS Warriors"), "GSW");
        assert_eq!(map_sportsbook_team("PHO Suns"), "PHX");
        assert_eq!(map_sportsbook_team("Golden State Warriors"), "GSW");
        assert_eq!(map_sportsbook_team("LA Clippers"), "LAC");
        assert_eq!(map_sportsbook_team("Green Bay Packers"), "GB");
        assert_eq!(map_sportsbook_team("Mystery Team"), "Mystery Team");
    }
}
