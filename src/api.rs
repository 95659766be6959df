//! Geocoding provider seam and its HTTP adapter.

use crate::coords::check_coordinate;
use crate::error::ProviderError;
use crate::regions::BoundingBox;
use async_trait::async_trait;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("geotrust/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
    pub viewbox: BoundingBox,
    pub bounded: bool,
    pub country_codes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub viewbox: BoundingBox,
    pub bounded: bool,
    pub country_codes: Option<String>,
    pub limit: usize,
}

/// Address payload as returned by the provider.
///
/// `lat`/`lon` arrive as strings from Nominatim-compatible services but some
/// return numbers, so they stay raw until [`ProviderPlace::coordinates`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlace {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Map<String, Value>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
}

fn coord_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

impl ProviderPlace {
    /// The place's own coordinates, when the provider sent structurally
    /// valid ones.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = coord_value(self.lat.as_ref())?;
        let lon = coord_value(self.lon.as_ref())?;
        check_coordinate(lat, lon).ok()?;
        Some((lat, lon))
    }
}

/// Reverse and forward geocoding against an external service.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn reverse(&self, query: &ReverseQuery) -> Result<ProviderPlace, ProviderError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ProviderPlace>, ProviderError>;

    fn name(&self) -> &str;
}

/// Nominatim-compatible HTTP provider (OpenStreetMap, LocationIQ and friends).
pub struct NominatimProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NominatimProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .wrap_err("Failed to create geocoding HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn common_params(
        &self,
        viewbox: &BoundingBox,
        bounded: bool,
        country_codes: &Option<String>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("viewbox", viewbox.viewbox()),
            ("bounded", if bounded { "1" } else { "0" }.to_string()),
        ];
        if let Some(codes) = country_codes.as_ref().filter(|c| !c.is_empty()) {
            params.push(("countrycodes", codes.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        debug!("Geocoding provider answered {} for /{}", status, path);
        if status != StatusCode::OK {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_body(&body)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if let Some(status) = e.status() {
        ProviderError::from_status(status.as_u16())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Decodes a provider body. Nominatim reports "not found" as a 200 with an
/// `error` field, so that is checked first.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    if let Some(error) = value.get("error") {
        debug!("Provider returned error payload: {}", error);
        return Err(ProviderError::NotFound);
    }

    serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl GeocodingProvider for NominatimProvider {
    async fn reverse(&self, query: &ReverseQuery) -> Result<ProviderPlace, ProviderError> {
        let mut params = vec![
            ("lat", query.lat.to_string()),
            ("lon", query.lon.to_string()),
        ];
        params.extend(self.common_params(&query.viewbox, query.bounded, &query.country_codes));

        self.get_json("reverse", &params).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ProviderPlace>, ProviderError> {
        let mut params = vec![
            ("q", query.text.clone()),
            ("limit", query.limit.clamp(1, 10).to_string()),
        ];
        params.extend(self.common_params(&query.viewbox, query.bounded, &query.country_codes));

        self.get_json("search", &params).await
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}
