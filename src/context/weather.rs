//! Weather sub-client
//!
//! Uses the keyless Open-Meteo current-weather endpoint and renders a
//! one-line summary for the prompt.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

use super::{Coordinates, WeatherLookup};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Open-Meteo forecast response
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    /// Celsius
    temperature: f64,
    /// km/h
    windspeed: f64,
    /// WMO weather interpretation code
    weathercode: u8,
}

/// Map a WMO weather code to a short description
const fn describe(code: u8) -> &'static str {
    match code {
        0 => "clear sky",
        1..=2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 => "rain",
        71..=77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95..=99 => "thunderstorm",
        _ => "unsettled",
    }
}

/// Weather client for current conditions
pub struct WeatherClient {
    client: reqwest::Client,
}

impl WeatherClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherLookup for WeatherClient {
    async fn current(&self, coords: Coordinates) -> Result<String> {
        let response = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", coords.lat.to_string()),
                ("longitude", coords.lon.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::upstream_request("open-meteo", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_upstream("open-meteo", status, &body));
        }

        let forecast: ForecastResponse = response.json().await?;
        let current = forecast.current_weather;

        Ok(format!(
            "{}, {:.0}°C, wind {:.0} km/h",
            describe(current.weathercode),
            current.temperature,
            current.windspeed
        ))
    }
}
