//! NASA POWER daily point client (all-sky surface shortwave irradiance).
//!
//! The service publishes with a lag of a day or more, so "now" is served
//! from the most recent day in a short lookback window that has a value.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::{Location, Provider, ProviderReading};
use crate::error::ProviderError;
use crate::models::Source;

const PARAMETER: &str = "ALLSKY_SFC_SW_DWN";

// ---

pub struct NasaPowerProvider {
    client: Client,
    base_url: String,
    location: Location,
    lookback_days: u32,
}

impl NasaPowerProvider {
    pub fn new(
        base_url: impl Into<String>,
        location: Location,
        lookback_days: u32,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        // ---
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            location,
            lookback_days: lookback_days.max(1),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, HashMap<String, f64>>,
}

/// Extract the irradiance for `date` from a POWER JSON body.
fn parse_irradiance(body: &str, date: NaiveDate) -> Result<ProviderReading, ProviderError> {
    // ---
    let response: PowerResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidData(format!("unexpected POWER response: {e}")))?;

    let key = date.format("%Y%m%d").to_string();
    let irradiance = response
        .properties
        .parameter
        .get(PARAMETER)
        .and_then(|by_day| by_day.get(&key))
        .copied()
        .ok_or_else(|| ProviderError::InvalidData(format!("no {PARAMETER} value for {key}")))?;

    Ok(ProviderReading {
        irradiance: Some(irradiance),
        ..Default::default()
    })
}

#[async_trait]
impl Provider for NasaPowerProvider {
    fn source(&self) -> Source {
        Source::LiveSolar
    }

    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        // ---
        (1..=self.lookback_days)
            .filter_map(|days_back| today.checked_sub_days(chrono::Days::new(days_back.into())))
            .collect()
    }

    async fn fetch(&self, date: NaiveDate) -> Result<ProviderReading, ProviderError> {
        // ---
        let day = date.format("%Y%m%d").to_string();
        tracing::debug!("Fetching {} for {} from {}", PARAMETER, day, self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("start", day.as_str()),
                ("end", day.as_str()),
                ("community", "RE"),
                ("parameters", PARAMETER),
                ("format", "JSON"),
                ("header", "true"),
            ])
            .query(&[
                ("latitude", self.location.latitude),
                ("longitude", self.location.longitude),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("POWER API returned HTTP {status}")));
        }

        let body = response.text().await?;
        parse_irradiance(&body, date)
    }
}
