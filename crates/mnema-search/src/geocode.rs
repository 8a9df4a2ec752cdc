//! Nominatim geocoding client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use mnema_core::defaults::{GEOCODER_TIMEOUT_SECS, GEOCODER_URL, GEOCODER_USER_AGENT};
use mnema_core::{Error, GeoPoint, Geocoder, Result};

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GEOCODER_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(Duration::from_secs(GEOCODER_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    /// Resolve a place name to its best-match coordinate.
    ///
    /// Transport errors and non-success statuses are logged and collapse
    /// to `Ok(None)`: a flaky upstream degrades place search to empty
    /// results instead of failing the whole query.
    async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(place, error = %e, "geocode request failed");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            warn!(place, status = %response.status(), "geocoder returned error status");
            return Ok(None);
        }

        let hits: Vec<NominatimHit> = response.json().await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!(place, "no geocoder match");
            return Ok(None);
        };

        let latitude: f64 = hit
            .lat
            .parse()
            .map_err(|_| Error::Geocode(format!("unparseable latitude: {}", hit.lat)))?;
        let longitude: f64 = hit
            .lon
            .parse()
            .map_err(|_| Error::Geocode(format!("unparseable longitude: {}", hit.lon)))?;

        debug!(place, latitude, longitude, "geocoded place");
        Ok(Some(GeoPoint { latitude, longitude }))
    }
}
