use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::cache::TtlCache;
use super::{http_client, SourceError};

/// Game-day weather at a stadium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub condition: String,
    /// °F
    pub temperature: i32,
    /// mph
    pub wind_speed: i32,
    /// Precipitation probability, percent
    pub precipitation: i32,
    pub is_dome: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<i32>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_high: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_low: Option<i32>,
}

impl Weather {
    pub fn dome() -> Self {
        Weather {
            condition: "Dome".into(),
            temperature: 72,
            wind_speed: 0,
            precipitation: 0,
            is_dome: true,
            humidity: Some(50),
            source: "Indoor Stadium".into(),
            temp_high: None,
            temp_low: None,
        }
    }

    /// Neutral conditions used when the forecast can't be fetched
    pub fn unavailable() -> Self {
        Weather {
            condition: "Unknown".into(),
            temperature: 70,
            wind_speed: 5,
            precipitation: 0,
            is_dome: false,
            humidity: None,
            source: "API Unavailable".into(),
            temp_high: None,
            temp_low: None,
        }
    }
}

/// Open-Meteo daily forecast client
pub struct WeatherClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    cache: TtlCache<String, Weather>,
}

impl WeatherClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(WeatherClient {
            http: http_client(5)?,
            base_url: base_url.to_string(),
            cache: TtlCache::new("Weather", Duration::from_secs(30 * 60)),
        })
    }

    /// Forecast for `date` (YYYY-MM-DD) at the given stadium. Never fails:
    /// domes get fixed indoor conditions, errors get [`Weather::unavailable`].
    pub async fn forecast(&self, lat: f64, lon: f64, date: Option<&str>, is_dome: bool) -> Weather {
        if is_dome {
            return Weather::dome();
        }

        let key = format!("{:.4},{:.4},{}", lat, lon, date.unwrap_or("today"));
        let result = self
            .cache
            .get_or_fetch(key, || self.fetch(lat, lon, date))
            .await;

        result.unwrap_or_else(|e| {
            warn!("Weather API error: {}", e);
            Weather::unavailable()
        })
    }

    async fn fetch(&self, lat: f64, lon: f64, date: Option<&str>) -> Result<Weather> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,windspeed_10m_max,weathercode"
                        .to_string(),
                ),
                ("temperature_unit", "fahrenheit".to_string()),
                ("windspeed_unit", "mph".to_string()),
                ("timezone", "America/New_York".to_string()),
            ],
        )
        .context("Invalid Open-Meteo URL")?;
        debug!("Fetching forecast {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Open-Meteo request failed")?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "Open-Meteo".into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse Open-Meteo response")?;

        parse_forecast_response(&raw, date)
    }
}

/// Condition label for a WMO weather code
pub fn condition_from_code(code: i64, precip: f64, wind: i32) -> &'static str {
    let base = match code {
        0 => "Clear",
        1..=3 => "Cloudy",
        4..=67 => {
            if precip > 50.0 {
                "Rain"
            } else {
                "Light Rain"
            }
        }
        68..=77 => "Snow",
        78..=82 => "Heavy Rain",
        c if c >= 95 => "Thunderstorm",
        _ => "Clear",
    };
    if wind > 20 && code <= 3 {
        "Windy"
    } else {
        base
    }
}

/// Pick the day matching `date` (first day otherwise) from a daily forecast
pub fn parse_forecast_response(raw: &serde_json::Value, date: Option<&str>) -> Result<Weather> {
    let daily = &raw["daily"];
    let times = daily["time"].as_array().ok_or_else(|| SourceError::Decode {
        source_name: "Open-Meteo".into(),
        reason: "missing daily.time".into(),
    })?;

    let idx = date
        .and_then(|d| times.iter().position(|t| t.as_str() == Some(d)))
        .unwrap_or(0);
    let at = |field: &str| daily[field][idx].as_f64();

    let temp_max = at("temperature_2m_max").unwrap_or(70.0);
    let temp_min = at("temperature_2m_min").unwrap_or(55.0);
    let wind = at("windspeed_10m_max").unwrap_or(5.0).round() as i32;
    let precip = at("precipitation_probability_max").unwrap_or(0.0);
    let code = daily["weathercode"][idx].as_i64().unwrap_or(0);

    Ok(Weather {
        condition: condition_from_code(code, precip, wind).to_string(),
        temperature: ((temp_max + temp_min) / 2.0).round() as i32,
        wind_speed: wind,
        precipitation: precip.round() as i32,
        is_dome: false,
        humidity: Some(60),
        source: "Open-Meteo API".into(),
        temp_high: Some(temp_max.round() as i32),
        temp_low: Some(temp_min.round() as i32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> serde_json::Value {
        json!({"daily": {
            "time": ["2025-12-14", "2025-12-15"],
            "temperature_2m_max": [41.0, 28.4],
            "temperature_2m_min": [30.0, 15.1],
            "precipitation_probability_max": [10, 65],
            "windspeed_10m_max": [9.6, 22.3],
            "weathercode": [2, 73]
        }})
    }

    #[test]
    fn test_parse_forecast_picks_matching_day() {
        let w = parse_forecast_response(&fixture(), Some("2025-12-15")).unwrap();
        assert_eq!(w.condition, "Snow");
        assert_eq!(w.temperature, 22);
        assert_eq!(w.wind_speed, 22);
        assert_eq!(w.precipitation, 65);
        assert_eq!(w.temp_high, Some(28));
        assert_eq!(w.temp_low, Some(15));
        assert_eq!(w.source, "Open-Meteo API");
    }

    #[test]
    fn test_parse_forecast_falls_back_to_first_day() {
        let w = parse_forecast_response(&fixture(), Some("2026-01-01")).unwrap();
        assert_eq!(w.condition, "Cloudy");
        assert_eq!(w.temperature, 36);
        let w = parse_forecast_response(&fixture(), None).unwrap();
        assert_eq!(w.wind_speed, 10);
    }

    #[test]
    fn test_parse_forecast_rejects_bad_payload() {
        assert!(parse_forecast_response(&json!({"error": true}), None).is_err());
    }

    #[test]
    fn test_condition_codes() {
        assert_eq!(condition_from_code(0, 0.0, 5), "Clear");
        assert_eq!(condition_from_code(3, 0.0, 5), "Cloudy");
        assert_eq!(condition_from_code(61, 70.0, 5), "Rain");
        assert_eq!(condition_from_code(61, 20.0, 5), "Light Rain");
        assert_eq!(condition_from_code(75, 0.0, 5), "Snow");
        assert_eq!(condition_from_code(81, 0.0, 5), "Heavy Rain");
        assert_eq!(condition_from_code(85, 0.0, 5), "Clear");
        assert_eq!(condition_from_code(95, 0.0, 5), "Thunderstorm");
        assert_eq!(condition_from_code(1, 0.0, 25), "Windy");
        assert_eq!(condition_from_code(61, 70.0, 25), "Rain");
    }

    #[tokio::test]
    async fn test_dome_skips_network() {
        let client = WeatherClient::new("http://127.0.0.1:1/v1/forecast").unwrap();
        let w = client.forecast(32.7, -97.1, Some("2025-12-14"), true).await;
        assert_eq!(w, Weather::dome());
    }
}
