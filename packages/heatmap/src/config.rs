//! Environment-driven pipeline configuration.
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `SAFESTREET_INCIDENTS_URL` | backend incidents endpoint | none |
//! | `GOOGLE_MAPS_API_KEY` | map embedding + Google geocoding key | none |
//! | `SAFESTREET_LOOKUP_TIMEOUT_SECS` | per-lookup timeout, `0` disables | `10` |
//! | `SAFESTREET_HTTP_TIMEOUT_SECS` | HTTP client timeout | `30` |
//! | `SAFESTREET_DEDUPE_ADDRESSES` | reuse lookups for identical addresses | `false` |
//! | `SAFESTREET_UTC_OFFSET_MINUTES` | offset used to display dates | `600` |

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset as _, Utc};
use safestreet_geocoder::Geocoder;

use crate::enricher::IncidentEnricher;
use crate::marker::MarkerRegistry;

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// AEST.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 600;

/// A configuration variable had an unusable value.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value '{value}' for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Tunables for the heat-map pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapConfig {
    pub incidents_url: Option<String>,
    pub maps_api_key: Option<String>,
    pub lookup_timeout: Option<Duration>,
    pub http_timeout: Duration,
    pub dedupe_addresses: bool,
    pub display_offset: FixedOffset,
}

impl HeatmapConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `env`, which resolves variable names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| {
            env(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let lookup_secs: u64 = parse_var(
            "SAFESTREET_LOOKUP_TIMEOUT_SECS",
            non_empty("SAFESTREET_LOOKUP_TIMEOUT_SECS"),
            DEFAULT_LOOKUP_TIMEOUT_SECS,
        )?;
        let http_secs: u64 = parse_var(
            "SAFESTREET_HTTP_TIMEOUT_SECS",
            non_empty("SAFESTREET_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let dedupe_addresses: bool = parse_var(
            "SAFESTREET_DEDUPE_ADDRESSES",
            non_empty("SAFESTREET_DEDUPE_ADDRESSES"),
            false,
        )?;
        let offset_minutes: i32 = parse_var(
            "SAFESTREET_UTC_OFFSET_MINUTES",
            non_empty("SAFESTREET_UTC_OFFSET_MINUTES"),
            DEFAULT_UTC_OFFSET_MINUTES,
        )?;

        let display_offset =
            FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| ConfigError {
                var: "SAFESTREET_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "offset out of range".to_string(),
            })?;

        Ok(Self {
            incidents_url: non_empty("SAFESTREET_INCIDENTS_URL"),
            maps_api_key: non_empty("GOOGLE_MAPS_API_KEY"),
            lookup_timeout: (lookup_secs > 0).then(|| Duration::from_secs(lookup_secs)),
            http_timeout: Duration::from_secs(http_secs),
            dedupe_addresses,
            display_offset,
        })
    }

    /// An enricher tuned by this configuration.
    #[must_use]
    pub fn enricher(
        &self,
        geocoder: Arc<dyn Geocoder>,
        registry: Arc<MarkerRegistry>,
    ) -> IncidentEnricher {
        IncidentEnricher::new(geocoder, registry)
            .with_lookup_timeout(self.lookup_timeout)
            .with_dedupe_addresses(self.dedupe_addresses)
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            incidents_url: None,
            maps_api_key: None,
            lookup_timeout: Some(Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS)),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            dedupe_addresses: false,
            display_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value.parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = HeatmapConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HeatmapConfig::default());
        assert_eq!(config.display_offset.local_minus_utc(), 600 * 60);
    }

    #[test]
    fn reads_overrides() {
        let config = HeatmapConfig::from_lookup(lookup(&[
            ("SAFESTREET_INCIDENTS_URL", "http://localhost:3000/api/incidents"),
            ("GOOGLE_MAPS_API_KEY", "abc"),
            ("SAFESTREET_LOOKUP_TIMEOUT_SECS", "0"),
            ("SAFESTREET_DEDUPE_ADDRESSES", "true"),
            ("SAFESTREET_UTC_OFFSET_MINUTES", "480"),
        ]))
        .unwrap();

        assert_eq!(
            config.incidents_url.as_deref(),
            Some("http://localhost:3000/api/incidents")
        );
        assert_eq!(config.maps_api_key.as_deref(), Some("abc"));
        assert_eq!(config.lookup_timeout, None);
        assert!(config.dedupe_addresses);
        assert_eq!(config.display_offset.local_minus_utc(), 480 * 60);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = HeatmapConfig::from_lookup(lookup(&[("GOOGLE_MAPS_API_KEY", "  ")])).unwrap();
        assert_eq!(config.maps_api_key, None);
    }

    #[test]
    fn rejects_garbage() {
        let err =
            HeatmapConfig::from_lookup(lookup(&[("SAFESTREET_LOOKUP_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
        assert_eq!(err.var, "SAFESTREET_LOOKUP_TIMEOUT_SECS");
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert!(
            HeatmapConfig::from_lookup(lookup(&[("SAFESTREET_UTC_OFFSET_MINUTES", "100000")]))
                .is_err()
        );
    }
}
