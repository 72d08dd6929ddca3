//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`]. [`select_geocoder`] picks the
//! first enabled service whose requirements (e.g. an API key) are met.

use std::sync::Arc;

use serde::Deserialize;

use crate::Geocoder;
use crate::google::GoogleGeocoder;
use crate::nominatim::NominatimGeocoder;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"google"`, `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order; lower values are tried first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Maps Geocoding API.
    Google {
        /// API endpoint.
        base_url: String,
        /// ccTLD region bias (e.g. `"au"`).
        region: String,
        /// Environment variable holding the API key.
        api_key_env: String,
    },
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// API endpoint.
        base_url: String,
        /// ISO country code results are restricted to.
        region: String,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { base_url, .. }
            | ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Returns the country the provider is biased or restricted to.
    #[must_use]
    pub fn region(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { region, .. }
            | ProviderConfig::Nominatim { region, .. } => region,
        }
    }

    /// Builds a geocoder for this service, or `None` if a requirement is
    /// missing. `env` resolves environment variable names.
    pub fn build(
        &self,
        client: &reqwest::Client,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<Arc<dyn Geocoder>> {
        match &self.provider {
            ProviderConfig::Google {
                base_url,
                region,
                api_key_env,
            } => {
                let Some(api_key) = env(api_key_env).filter(|k| !k.trim().is_empty()) else {
                    log::debug!("Skipping geocoding service '{}': {api_key_env} not set", self.id);
                    return None;
                };
                Some(Arc::new(GoogleGeocoder::new(
                    client.clone(),
                    base_url.clone(),
                    region.clone(),
                    api_key,
                )))
            }
            ProviderConfig::Nominatim { base_url, region } => Some(Arc::new(
                NominatimGeocoder::new(client.clone(), base_url.clone(), region.clone()),
            )),
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google", include_str!("../services/google.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Selects the highest-priority enabled service that can be built, reading
/// API keys from the process environment.
#[must_use]
pub fn select_geocoder(client: &reqwest::Client) -> Option<Arc<dyn Geocoder>> {
    select_geocoder_with_env(client, |name| std::env::var(name).ok())
}

/// Like [`select_geocoder`] but with an explicit environment lookup.
pub fn select_geocoder_with_env(
    client: &reqwest::Client,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Arc<dyn Geocoder>> {
    enabled_services().iter().find_map(|svc| {
        let geocoder = svc.build(client, &env)?;
        log::info!("Using geocoding service '{}' ({})", svc.id, svc.name);
        Some(geocoder)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeocodingProvider;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_target_australia() {
        for svc in &all_services() {
            assert!(!svc.base_url().is_empty(), "Service {} has empty base_url", svc.id);
            assert_eq!(svc.region(), "au", "Service {} not biased to au", svc.id);
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn prefers_google_when_key_present() {
        let client = reqwest::Client::new();
        let geocoder = select_geocoder_with_env(&client, |name| {
            (name == "GOOGLE_MAPS_API_KEY").then(|| "k".to_string())
        })
        .unwrap();
        assert_eq!(geocoder.provider(), GeocodingProvider::Google);
    }

    #[test]
    fn falls_back_to_nominatim_without_key() {
        let client = reqwest::Client::new();
        let geocoder = select_geocoder_with_env(&client, |_| None).unwrap();
        assert_eq!(geocoder.provider(), GeocodingProvider::Nominatim);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let client = reqwest::Client::new();
        let geocoder = select_geocoder_with_env(&client, |_| Some("   ".to_string())).unwrap();
        assert_eq!(geocoder.provider(), GeocodingProvider::Nominatim);
    }
}
