//! Open-Meteo weather client.
//!
//! Fetches current conditions at the corridor's configured weather
//! point so each sample can carry ambient weather alongside the
//! timings. Open-Meteo needs no API key.

use serde::Deserialize;
use traffic_map_geo::LatLon;
use traffic_map_sample_models::WeatherSnapshot;

use crate::{PollError, retry};

const API_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Open-Meteo current-conditions client.
pub struct WeatherClient {
    client: reqwest::Client,
}

impl WeatherClient {
    /// Creates a new weather client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches the current conditions at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] if the request fails or the response has
    /// no current-conditions block.
    pub async fn current(&self, point: LatLon) -> Result<WeatherSnapshot, PollError> {
        let lat = point.lat.to_string();
        let lon = point.lon.to_string();
        let body = retry::send_json(|| {
            self.client.get(API_URL).query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                (
                    "current",
                    "temperature_2m,precipitation,wind_speed_10m,weather_code",
                ),
                ("wind_speed_unit", "kmh"),
            ])
        })
        .await?;
        parse_snapshot(body)
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw forecast response, reduced to the current-conditions block.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<RawCurrent>,
}

#[derive(Debug, Deserialize)]
struct RawCurrent {
    #[serde(default)]
    temperature_2m: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
    #[serde(default)]
    weather_code: Option<i64>,
}

/// Maps a raw forecast body onto a [`WeatherSnapshot`].
fn parse_snapshot(body: serde_json::Value) -> Result<WeatherSnapshot, PollError> {
    let response: ForecastResponse = serde_json::from_value(body)?;
    let current = response.current.ok_or_else(|| PollError::Api {
        message: "forecast response has no current conditions".to_string(),
    })?;
    Ok(WeatherSnapshot {
        temperature_c: current.temperature_2m,
        precipitation_mm: current.precipitation,
        wind_speed_kph: current.wind_speed_10m,
        weather_code: current.weather_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_conditions() {
        let snapshot = parse_snapshot(serde_json::json!({
            "latitude": 45.69,
            "longitude": 9.66,
            "elevation": 249.0,
            "current_units": {
                "temperature_2m": "°C",
                "precipitation": "mm",
                "wind_speed_10m": "km/h"
            },
            "current": {
                "time": "2024-03-12T10:00",
                "temperature_2m": 11.4,
                "precipitation": 0.2,
                "wind_speed_10m": 7.9,
                "weather_code": 61
            }
        }))
        .unwrap();
        assert_eq!(snapshot.temperature_c, Some(11.4));
        assert_eq!(snapshot.precipitation_mm, Some(0.2));
        assert_eq!(snapshot.wind_speed_kph, Some(7.9));
        assert_eq!(snapshot.weather_code, Some(61));
    }

    #[test]
    fn missing_current_block_is_an_api_error() {
        let err = parse_snapshot(serde_json::json!({ "latitude": 45.69 })).unwrap_err();
        assert!(matches!(err, PollError::Api { .. }));
    }

    #[test]
    fn partial_current_block_keeps_what_it_has() {
        let snapshot = parse_snapshot(serde_json::json!({
            "current": { "temperature_2m": -2.5 }
        }))
        .unwrap();
        assert_eq!(snapshot.temperature_c, Some(-2.5));
        assert!(snapshot.precipitation_mm.is_none());
        assert!(snapshot.weather_code.is_none());
    }
}
