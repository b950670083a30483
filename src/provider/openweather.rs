//! OpenWeather current-conditions client.
//!
//! Tries the One Call endpoint first (carries the UV index) and falls back
//! to the basic current-weather endpoint. Neither reports irradiance, so it
//! is estimated from cloud cover and UV.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{estimate_irradiance, Location, Provider, ProviderReading};
use crate::error::ProviderError;
use crate::models::Source;

// ---

pub struct OpenWeatherProvider {
    client: Client,
    base_url: String,
    api_key: String,
    location: Location,
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: Option<OneCallCurrent>,
}

#[derive(Debug, Deserialize)]
struct OneCallCurrent {
    temp: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    clouds: Option<f64>,
    uvi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BasicResponse {
    main: Option<BasicMain>,
    wind: Option<BasicWind>,
    clouds: Option<BasicClouds>,
}

#[derive(Debug, Deserialize)]
struct BasicMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BasicWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BasicClouds {
    all: Option<f64>,
}

impl From<OneCallCurrent> for ProviderReading {
    fn from(c: OneCallCurrent) -> Self {
        // ---
        ProviderReading {
            temperature: c.temp,
            humidity: c.humidity,
            wind_speed: c.wind_speed,
            cloudiness: c.clouds,
            uv_index: c.uvi,
            irradiance: c.clouds.map(|clouds| estimate_irradiance(clouds, c.uvi)),
        }
    }
}

impl From<BasicResponse> for ProviderReading {
    fn from(b: BasicResponse) -> Self {
        // ---
        let cloudiness = b.clouds.and_then(|c| c.all);
        ProviderReading {
            temperature: b.main.as_ref().and_then(|m| m.temp),
            humidity: b.main.as_ref().and_then(|m| m.humidity),
            wind_speed: b.wind.and_then(|w| w.speed),
            cloudiness,
            uv_index: None,
            irradiance: cloudiness.map(|clouds| estimate_irradiance(clouds, None)),
        }
    }
}

impl OpenWeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        location: Location,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        // ---
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            location,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        // ---
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("Fetching current conditions from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("lat", self.location.latitude), ("lon", self.location.longitude)])
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .query(extra)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("{path} returned HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidData(format!("{path}: {e}")))
    }

    async fn one_call(&self) -> Result<ProviderReading, ProviderError> {
        // ---
        let body: OneCallResponse = self
            .get_json("3.0/onecall", &[("exclude", "minutely,hourly,daily,alerts")])
            .await?;
        body.current
            .map(ProviderReading::from)
            .ok_or_else(|| ProviderError::InvalidData("onecall response has no 'current'".into()))
    }

    async fn basic(&self) -> Result<ProviderReading, ProviderError> {
        // ---
        let body: BasicResponse = self.get_json("2.5/weather", &[]).await?;
        Ok(body.into())
    }
}

#[async_trait]
impl Provider for OpenWeatherProvider {
    fn source(&self) -> Source {
        Source::LiveWeather
    }

    /// Current conditions only; no lookback.
    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        vec![today]
    }

    async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
        // ---
        match self.one_call().await {
            Ok(reading) => Ok(reading),
            Err(e) => {
                tracing::warn!("One Call endpoint failed: {}, trying basic weather endpoint", e);
                self.basic().await
            }
        }
    }
}
