#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for SafeStreet incident addresses.
//!
//! Turns an incident's address fragments into a display string
//! ([`address`]) and resolves that string to a coordinate through one of
//! the providers configured via TOML files in `services/`:
//!
//! 1. **Google Maps Geocoding** (priority 1): requires an API key from
//!    the environment, region-biased to Australia.
//! 2. **Nominatim / OpenStreetMap** (priority 2): no key, restricted to
//!    Australian results.
//!
//! A lookup never panics and is never retried: zero results come back as
//! `Ok(None)` and provider or transport failures as [`GeocodeError`].
//! Callers treat both as "this address could not be plotted".

pub mod address;
pub mod dedup;
pub mod google;
pub mod nominatim;
pub mod service_registry;

use std::time::Duration;

use async_trait::async_trait;
use safestreet_incident_models::Coordinate;
use thiserror::Error;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Where the address resolved to.
    pub coordinate: Coordinate,
    /// The canonical address returned by the provider.
    pub matched_address: Option<String>,
    /// Which provider resolved this address.
    pub provider: GeocodingProvider,
}

/// Which geocoding provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GeocodingProvider {
    /// Google Maps Geocoding API.
    Google,
    /// Nominatim / OpenStreetMap.
    Nominatim,
    /// In-memory provider used by tests and offline tooling.
    Static,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Quota or rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider answered with a non-success status.
    #[error("Provider returned {status}{}", detail_suffix(.message.as_deref()))]
    Provider {
        /// Provider status code.
        status: String,
        /// Optional provider-supplied explanation.
        message: Option<String>,
    },

    /// The lookup did not finish within the configured limit.
    #[error("Lookup timed out after {0:?}")]
    TimedOut(Duration),
}

fn detail_suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

/// Resolves a free-form address string to a coordinate.
///
/// Implementations must be region-biased to the application's target
/// country and must return the first result only.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Which provider backs this geocoder.
    fn provider(&self) -> GeocodingProvider;

    /// Geocodes a single address.
    ///
    /// Returns `Ok(None)` when the provider has no result for the address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the provider
    /// reports an error status.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// User agent sent with every provider request. Nominatim's usage policy
/// rejects anonymous clients.
pub const USER_AGENT: &str = concat!("safestreet/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client used by all providers.
///
/// # Errors
///
/// Returns [`GeocodeError::Http`] if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, GeocodeError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}
