//! Nominatim / OpenStreetMap geocoder client.
//!
//! Used when no Google API key is configured. The public instance allows
//! at most **1 request per second**; incident lists are small and geocoded
//! one at a time, so no extra throttling is applied here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;
use safestreet_incident_models::Coordinate;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider};

/// Nominatim geocoder restricted to one country.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_code: String,
}

impl NominatimGeocoder {
    #[must_use]
    pub const fn new(client: reqwest::Client, base_url: String, country_code: String) -> Self {
        Self {
            client,
            base_url,
            country_code,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Nominatim
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", address),
                ("countrycodes", self.country_code.as_str()),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(GeocodeError::Provider {
                status: resp.status().to_string(),
                message: None,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(GeocodedAddress {
        coordinate: Coordinate::new(lat, lon),
        matched_address: first["display_name"].as_str().map(String::from),
        provider: GeocodingProvider::Nominatim,
    }))
}
