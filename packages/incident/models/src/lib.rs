#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record, coordinate, and plotted incident types.
//!
//! [`IncidentRecord`] is the raw shape served by the SafeStreet backend.
//! [`PlottedIncident`] is the derived, ephemeral shape produced once a
//! record's address has been geocoded; it is rebuilt on every enrichment
//! pass and never persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One reported road incident as received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Opaque unique identifier. The backend may send a string or a number.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Incident type label (open set, e.g. `"Collision"`).
    pub incident_type: String,
    /// When the incident occurred.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    /// Free-text vehicle type.
    #[serde(default)]
    pub vehicle_type: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// House/street number.
    #[serde(default)]
    pub street_number: Option<String>,
    /// Street name.
    #[serde(default)]
    pub location: Option<String>,
    /// Nearest cross street.
    #[serde(default)]
    pub cross_street: Option<String>,
    /// Suburb.
    #[serde(default)]
    pub suburb: Option<String>,
    /// State abbreviation (e.g. `"NSW"`).
    #[serde(default)]
    pub state: Option<String>,
}

impl IncidentRecord {
    /// Date portion in `en-AU` order (`DD/MM/YYYY`), shifted into `offset`.
    #[must_use]
    pub fn display_date(&self, offset: FixedOffset) -> String {
        self.date.with_timezone(&offset).format("%d/%m/%Y").to_string()
    }

    /// Time portion in `en-AU` 12-hour style (`3:05 pm`), shifted into
    /// `offset`.
    #[must_use]
    pub fn display_time(&self, offset: FixedOffset) -> String {
        self.date.with_timezone(&offset).format("%-I:%M %P").to_string()
    }

    /// Description with surrounding whitespace removed, or `None` if blank.
    #[must_use]
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// An incident whose address resolved to a coordinate, ready to plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlottedIncident {
    /// The source record, unchanged.
    #[serde(flatten)]
    pub record: IncidentRecord,
    /// Where the formatted address geocoded to.
    pub coordinate: Coordinate,
    /// Marker color resolved from the incident type.
    pub display_color: MarkerColor,
    /// The address string that was geocoded.
    pub address_string: String,
}

impl PlottedIncident {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// A `#RRGGBB` marker color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkerColor(String);

/// Error returned when a string is not a `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid marker color '{value}': expected #RRGGBB")]
pub struct InvalidColorError {
    /// The rejected input.
    pub value: String,
}

impl MarkerColor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MarkerColor {
    type Err = InvalidColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == 7
            && s.starts_with('#')
            && s[1..].chars().all(|c| c.is_ascii_hexdigit());

        if valid {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(InvalidColorError {
                value: s.to_string(),
            })
        }
    }
}

impl TryFrom<String> for MarkerColor {
    type Error = InvalidColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MarkerColor> for String {
    fn from(color: MarkerColor) -> Self {
        color.0
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Uint(n) => n.to_string(),
    })
}

/// Naive layouts the backend has been seen to emit. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 timestamp, with or without an offset.
///
/// # Errors
///
/// Returns the underlying parse error if no supported layout matches.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let s = s.trim();
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or(rfc_err),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}
