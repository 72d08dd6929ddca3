//! Display address construction for incident records.
//!
//! Incident records carry their location as loose fragments (street
//! number, street, cross street, suburb, state), any of which may be
//! missing. This module joins the present fragments into the one-line
//! string that is both shown to users and sent to the geocoder:
//!
//! ```text
//! 12, Main St, near George St, Sydney, NSW, Australia
//! ```

use safestreet_incident_models::IncidentRecord;

/// Country literal appended to every address.
pub const COUNTRY: &str = "Australia";

/// Separator between address fragments.
const SEPARATOR: &str = ", ";

/// Returns the fragment with surrounding whitespace removed, or `None` if
/// it is absent or blank.
fn present(fragment: Option<&str>) -> Option<&str> {
    fragment.map(str::trim).filter(|s| !s.is_empty())
}

/// Builds the one-line display address for an incident.
///
/// Fragments appear in fixed order: street number, location,
/// `near {cross street}`, suburb, state, then [`COUNTRY`]. Absent or blank
/// fragments are skipped entirely, so the result never contains empty
/// segments or doubled separators.
#[must_use]
pub fn format_incident_address(record: &IncidentRecord) -> String {
    let cross = present(record.cross_street.as_deref()).map(|s| format!("near {s}"));

    let fragments = [
        present(record.street_number.as_deref()),
        present(record.location.as_deref()),
        cross.as_deref(),
        present(record.suburb.as_deref()),
        present(record.state.as_deref()),
        Some(COUNTRY),
    ];

    fragments
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
