//! Incident type → marker color table.
//!
//! The table ships as `markers.toml`, embedded at compile time. It is
//! parsed into a [`MarkerRegistry`] value that callers construct once and
//! hand to whatever needs it; nothing here is global or mutable.

use std::collections::BTreeSet;

use safestreet_incident_models::MarkerColor;
use serde::{Deserialize, Serialize};

const MARKERS_TOML: &str = include_str!("../markers.toml");

/// Errors from loading a marker table.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The TOML was malformed or a color failed validation.
    #[error("Invalid marker table: {0}")]
    Toml(#[from] toml::de::Error),

    /// The same incident type was listed twice.
    #[error("Duplicate marker entry for incident type '{0}'")]
    Duplicate(String),
}

/// One row of the marker table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerEntry {
    /// Incident type label, matched exactly.
    #[serde(alias = "incident_type")]
    pub incident_type: String,
    /// Marker color for that label.
    pub color: MarkerColor,
}

#[derive(Deserialize)]
struct MarkerTable {
    fallback: MarkerColor,
    #[serde(default, rename = "marker")]
    markers: Vec<MarkerEntry>,
}

/// Read-only lookup from incident type to marker color.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    entries: Vec<MarkerEntry>,
    fallback: MarkerColor,
}

impl MarkerRegistry {
    /// Parses a marker table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the TOML is malformed, a color is not
    /// `#RRGGBB`, or a label appears more than once.
    pub fn from_toml(toml_str: &str) -> Result<Self, RegistryError> {
        let table: MarkerTable = toml::de::from_str(toml_str)?;

        let mut seen = BTreeSet::new();
        for entry in &table.markers {
            if !seen.insert(entry.incident_type.as_str()) {
                return Err(RegistryError::Duplicate(entry.incident_type.clone()));
            }
        }

        Ok(Self {
            entries: table.markers,
            fallback: table.fallback,
        })
    }

    /// Returns the color for `incident_type`, or the fallback color if the
    /// label is not in the table.
    #[must_use]
    pub fn lookup(&self, incident_type: &str) -> &MarkerColor {
        self.entries
            .iter()
            .find(|e| e.incident_type == incident_type)
            .map_or(&self.fallback, |e| &e.color)
    }

    /// The color used for unlisted incident types.
    #[must_use]
    pub const fn fallback(&self) -> &MarkerColor {
        &self.fallback
    }

    /// Table entries in file order, for rendering a legend.
    #[must_use]
    pub fn legend(&self) -> &[MarkerEntry] {
        &self.entries
    }
}

impl Default for MarkerRegistry {
    /// Loads the embedded `markers.toml`.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is malformed (this is a compile-time
    /// guarantee since the table is embedded).
    fn default() -> Self {
        Self::from_toml(MARKERS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded markers.toml: {e}"))
    }
}
