#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the heat-map server.
//!
//! These are kept apart from the pipeline's own types so the JSON
//! contract can evolve independently of the view internals.

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Query parameters for the map configuration endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigParams {
    /// Viewport width in CSS pixels.
    pub width: Option<u32>,
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLegendEntry {
    pub incident_type: String,
    /// `#RRGGBB`.
    pub color: String,
}

/// Marker color legend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLegend {
    /// Known incident types in table order.
    pub entries: Vec<ApiLegendEntry>,
    /// Color used for any type not listed.
    pub fallback: String,
}

/// Coarse view state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiViewState {
    Loading,
    Failed,
    Ready,
}

/// `GET /api/incidents` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncidents {
    pub state: ApiViewState,
    /// Set when `state` is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub map_ready: bool,
    /// Records received from the backend.
    pub record_count: usize,
    /// Records that made it onto the map.
    pub plotted_count: usize,
    /// Currently selected incident, if any.
    pub selected_id: Option<String>,
    /// Currently hovered incident, if any.
    pub hovered_id: Option<String>,
    /// One point feature per plotted incident.
    pub markers: FeatureCollection,
}

/// How an enrichment pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiPlotOutcome {
    Applied,
    Skipped,
    Discarded,
}

/// Response for endpoints that may trigger an enrichment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlotResult {
    pub outcome: ApiPlotOutcome,
    /// Lookups issued. Zero unless `outcome` is `applied`.
    pub attempted: usize,
    pub plotted: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incidents_omit_message_unless_failed() {
        let body = ApiIncidents {
            state: ApiViewState::Ready,
            message: None,
            map_ready: true,
            record_count: 2,
            plotted_count: 1,
            selected_id: None,
            hovered_id: None,
            markers: FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["plottedCount"], 1);
        assert!(json.get("message").is_none());
        assert_eq!(json["markers"]["type"], "FeatureCollection");
    }

    #[test]
    fn map_config_width_is_optional() {
        let params: MapConfigParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.width, None);
    }
}
