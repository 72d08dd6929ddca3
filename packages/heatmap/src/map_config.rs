//! How the map widget is embedded.

use safestreet_incident_models::Coordinate;
use serde::{Deserialize, Serialize};

/// Geographic centre of Australia.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(-25.2744, 133.7751);

/// `(max viewport width exclusive, zoom)` pairs, checked in order.
const ZOOM_BREAKPOINTS: &[(u32, u8)] = &[(640, 3), (1024, 4)];

/// Zoom for viewports at or above the last breakpoint.
const WIDE_ZOOM: u8 = 5;

/// Zoom level for a viewport `width` pixels wide.
#[must_use]
pub fn zoom_for_width(width: u32) -> u8 {
    ZOOM_BREAKPOINTS
        .iter()
        .find(|(max, _)| width < *max)
        .map_or(WIDE_ZOOM, |(_, zoom)| *zoom)
}

/// One map style rule, in the provider's `featureType`/`elementType`
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStyleRule {
    pub feature_type: String,
    pub element_type: String,
    pub stylers: Vec<MapStyler>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStyler {
    pub visibility: String,
}

/// Hides point-of-interest labels so incident markers stand out.
#[must_use]
pub fn hide_poi_labels() -> MapStyleRule {
    MapStyleRule {
        feature_type: "poi".to_string(),
        element_type: "labels".to_string(),
        stylers: vec![MapStyler {
            visibility: "off".to_string(),
        }],
    }
}

/// Everything a client needs to embed the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    /// Provider API key. `None` when not configured.
    pub api_key: Option<String>,
    pub center: Coordinate,
    pub zoom: u8,
    pub styles: Vec<MapStyleRule>,
}

impl MapConfig {
    /// Configuration for a viewport `width` pixels wide.
    #[must_use]
    pub fn for_viewport(api_key: Option<String>, width: u32) -> Self {
        Self {
            api_key,
            center: DEFAULT_CENTER,
            zoom: zoom_for_width(width),
            styles: vec![hide_poi_labels()],
        }
    }
}
