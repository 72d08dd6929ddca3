//! Google Maps Geocoding API client.
//!
//! Issues `GET {base_url}?address=...&region=au&key=...` and reads the
//! first entry of `results`. The API always answers HTTP 200 and reports
//! the outcome in a top-level `status` field, so the status is what
//! decides between a hit, a miss, and an error.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use std::str::FromStr as _;

use async_trait::async_trait;
use safestreet_incident_models::Coordinate;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider};

/// Values of the response's `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GoogleStatus {
    /// At least one result was returned.
    Ok,
    /// The address was valid but matched nothing.
    ZeroResults,
    /// Per-second quota exceeded.
    OverQueryLimit,
    /// Daily quota or billing problem.
    OverDailyLimit,
    /// API key missing, invalid, or not authorised for geocoding.
    RequestDenied,
    /// The query was missing or malformed.
    InvalidRequest,
    /// Transient server-side failure.
    UnknownError,
}

/// Google geocoder bound to one API key and region.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    region: String,
    api_key: String,
}

impl GoogleGeocoder {
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        base_url: String,
        region: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            base_url,
            region,
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Google
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("address", address),
                ("region", self.region.as_str()),
                ("key", self.api_key.as_str()),
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

/// Parses a Geocoding API JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let raw_status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Google response missing 'status'".to_string(),
    })?;

    let status = GoogleStatus::from_str(raw_status).map_err(|_| GeocodeError::Parse {
        message: format!("Unrecognised Google status '{raw_status}'"),
    })?;

    match status {
        GoogleStatus::Ok => {}
        GoogleStatus::ZeroResults => return Ok(None),
        GoogleStatus::OverQueryLimit | GoogleStatus::OverDailyLimit => {
            return Err(GeocodeError::RateLimited);
        }
        GoogleStatus::RequestDenied | GoogleStatus::InvalidRequest | GoogleStatus::UnknownError => {
            return Err(GeocodeError::Provider {
                status: status.to_string(),
                message: body["error_message"].as_str().map(String::from),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|r| r.first()) else {
        return Ok(None);
    };

    let location = &first["geometry"]["location"];
    let lat = location["lat"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Google response".to_string(),
    })?;
    let lng = location["lng"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lng in Google response".to_string(),
    })?;

    Ok(Some(GeocodedAddress {
        coordinate: Coordinate::new(lat, lng),
        matched_address: first["formatted_address"].as_str().map(String::from),
        provider: GeocodingProvider::Google,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_result() {
        let body = serde_json::json!({
            "status": "OK",
            "results": [
                {
                    "formatted_address": "12 Main St, Sydney NSW 2000, Australia",
                    "geometry": { "location": { "lat": -33.86, "lng": 151.2 } }
                },
                {
                    "formatted_address": "12 Main St, Sydney WA, Australia",
                    "geometry": { "location": { "lat": -31.95, "lng": 115.86 } }
                }
            ]
        });
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.coordinate.latitude - -33.86).abs() < 1e-9);
        assert!((result.coordinate.longitude - 151.2).abs() < 1e-9);
        assert_eq!(
            result.matched_address.as_deref(),
            Some("12 Main St, Sydney NSW 2000, Australia")
        );
        assert_eq!(result.provider, GeocodingProvider::Google);
    }

    #[test]
    fn zero_results_is_a_miss() {
        let body = serde_json::json!({ "status": "ZERO_RESULTS", "results": [] });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn ok_with_empty_results_is_a_miss() {
        let body = serde_json::json!({ "status": "OK", "results": [] });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn quota_statuses_are_rate_limited() {
        for status in ["OVER_QUERY_LIMIT", "OVER_DAILY_LIMIT"] {
            let body = serde_json::json!({ "status": status, "results": [] });
            assert!(matches!(
                parse_response(&body),
                Err(GeocodeError::RateLimited)
            ));
        }
    }

    #[test]
    fn denied_carries_error_message() {
        let body = serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        });
        match parse_response(&body) {
            Err(GeocodeError::Provider { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message.as_deref(), Some("The provided API key is invalid."));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_a_parse_error() {
        let body = serde_json::json!({ "status": "MAYBE" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
