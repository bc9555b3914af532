use clap::Parser;
use std::net::{IpAddr, SocketAddr};

/// NFL / NBA prediction and player-prop service
#[derive(Parser, Debug, Clone)]
#[command(name = "livesports-picks", version, about)]
pub struct Config {
    /// HTTP port for the API and dashboard
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Interface to bind the HTTP server on
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// SQLite database path, used when no Postgres URL is set
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    /// Postgres connection URL for hosted deployments; selects the Postgres backend
    #[arg(long, env = "POSTGRES_URL")]
    pub postgres_url: Option<String>,

    /// Fallback for platforms that export DATABASE_URL
    #[arg(long, env = "DATABASE_URL", hide = true)]
    pub database_url: Option<String>,

    /// Postgres pool size
    #[arg(long, env = "POSTGRES_MAX_CONNECTIONS", default_value = "5")]
    pub postgres_max_connections: u32,

    /// Environment label reported by /api/health
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub env_label: String,

    /// ESPN site API base URL
    #[arg(
        long,
        env = "ESPN_BASE_URL",
        default_value = "https://site.api.espn.com/apis/site/v2/sports"
    )]
    pub espn_base_url: String,

    /// Sleeper API base URL
    #[arg(
        long,
        env = "SLEEPER_BASE_URL",
        default_value = "https://api.sleeper.app/v1"
    )]
    pub sleeper_base_url: String,

    /// Open-Meteo forecast endpoint
    #[arg(
        long,
        env = "OPEN_METEO_URL",
        default_value = "https://api.open-meteo.com/v1/forecast"
    )]
    pub open_meteo_url: String,

    /// stats.nba.com base URL
    #[arg(
        long,
        env = "NBA_STATS_URL",
        default_value = "https://stats.nba.com/stats"
    )]
    pub nba_stats_url: String,

    /// NFL injury report page
    #[arg(
        long,
        env = "INJURIES_URL",
        default_value = "https://www.nfl.com/injuries/"
    )]
    pub injuries_url: String,

    /// DraftKings sportsbook event-group API
    #[arg(
        long,
        env = "DRAFTKINGS_URL",
        default_value = "https://sportsbook-nash-usva.draftkings.com/sites/US-VA-SB/api/v5/eventgroups"
    )]
    pub draftkings_url: String,

    /// NFL regular season used for Sleeper season stats
    #[arg(long, env = "NFL_SEASON", default_value = "2025")]
    pub nfl_season: u16,

    /// NBA season string used for stats.nba.com (e.g. 2024-25)
    #[arg(long, env = "NBA_SEASON", default_value = "2024-25")]
    pub nba_season: String,

    /// Local hour (0–23) at which the daily results/predictions job runs
    #[arg(long, env = "SCHEDULE_HOUR", default_value = "8")]
    pub schedule_hour: u32,

    /// Disable the daily background job
    #[arg(long, env = "DISABLE_SCHEDULER", default_value = "false")]
    pub disable_scheduler: bool,

    /// Per-game prediction timeout in seconds for bulk endpoints
    #[arg(long, env = "PREDICTION_TIMEOUT_SECS", default_value = "8")]
    pub prediction_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be non-zero");
        }
        if self.schedule_hour > 23 {
            anyhow::bail!("schedule_hour must be between 0 and 23");
        }
        if self.prediction_timeout_secs == 0 {
            anyhow::bail!("prediction_timeout_secs must be positive");
        }
        if self.bind_host.parse::<IpAddr>().is_err() {
            anyhow::bail!("bind_host must be an IP address (got {:?})", self.bind_host);
        }
        if self.postgres_url().is_some() && self.postgres_max_connections == 0 {
            anyhow::bail!("postgres_max_connections must be positive");
        }
        if !is_nba_season(&self.nba_season) {
            anyhow::bail!(
                "nba_season must look like YYYY-YY (got {:?})",
                self.nba_season
            );
        }
        Ok(())
    }

    /// Socket address for the HTTP listener; IPv6 hosts work unbracketed
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self.bind_host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Postgres URL when one is configured and non-empty. POSTGRES_URL wins
    /// over DATABASE_URL.
    pub fn postgres_url(&self) -> Option<&str> {
        [&self.postgres_url, &self.database_url]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.trim().is_empty())
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with every upstream pointed at a closed local port, so
    /// fetches fail fast
    pub fn offline() -> Self {
        let mut cfg = Config::parse_from(["livesports-picks"]);
        let dead = "http://127.0.0.1:9".to_string();
        cfg.espn_base_url = dead.clone();
        cfg.sleeper_base_url = dead.clone();
        cfg.open_meteo_url = dead.clone();
        cfg.nba_stats_url = dead.clone();
        cfg.injuries_url = dead.clone();
        cfg.draftkings_url = dead;
        cfg.postgres_url = None;
        cfg.database_url = None;
        cfg
    }
}

fn is_nba_season(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::parse_from(["livesports-picks"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = base();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.schedule_hour, 8);
    }

    #[test]
    fn test_rejects_bad_hour() {
        let mut cfg = base();
        cfg.schedule_hour = 24;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut cfg = base();
        cfg.prediction_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_nba_season_format() {
        assert!(is_nba_season("2024-25"));
        assert!(!is_nba_season("2024"));
        assert!(!is_nba_season("2024/25"));
        let mut cfg = base();
        cfg.nba_season = "24-25".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_listen_addr_ipv6() {
        let mut cfg = base();
        cfg.bind_host = "::1".into();
        cfg.port = 8080;
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "[::1]:8080");

        cfg.bind_host = "localhost:80".into();
        assert!(cfg.validate().is_err());
        assert!(cfg.listen_addr().is_err());
    }

    #[test]
    fn test_postgres_selection() {
        let mut cfg = base();
        cfg.postgres_url = None;
        cfg.database_url = None;
        assert_eq!(cfg.postgres_url(), None);
        cfg.postgres_url = Some("  ".into());
        assert_eq!(cfg.postgres_url(), None);
        cfg.postgres_url = Some("postgres://picks@db/picks".into());
        assert_eq!(cfg.postgres_url(), Some("postgres://picks@db/picks"));
        cfg.database_url = Some("postgres://other@db/picks".into());
        assert_eq!(cfg.postgres_url(), Some("postgres://picks@db/picks"));
        cfg.postgres_url = None;
        assert_eq!(cfg.postgres_url(), Some("postgres://other@db/picks"));
        cfg.postgres_max_connections = 0;
        assert!(cfg.validate().is_err());
    }
}
