#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident retrieval.
//!
//! An [`IncidentSource`] produces the raw incident collection for the
//! heat-map. The production source is [`http::HttpIncidentSource`], a
//! plain `GET` against the backend; [`file::FileIncidentSource`] reads the
//! same JSON from disk for offline use.
//!
//! Fetches are never retried and a body that does not decode in full is
//! rejected outright. Callers surface the error and let the user reload.

pub mod file;
pub mod http;

use async_trait::async_trait;
use safestreet_incident_models::IncidentRecord;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Errors that can occur while retrieving incidents.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a JSON array of incident records.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can produce the full incident collection.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Short description used in logs (URL or path).
    fn describe(&self) -> String;

    /// Retrieves every incident record.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if retrieval fails or the payload does not
    /// decode as a whole.
    async fn fetch(&self) -> Result<Vec<IncidentRecord>, FetchError>;
}

/// Decodes a JSON array of incident records, all or nothing.
///
/// # Errors
///
/// Returns [`FetchError::Json`] if any part of the body fails to decode.
pub fn decode_records(origin: &str, text: &str) -> Result<Vec<IncidentRecord>, FetchError> {
    serde_json::from_str(text).map_err(|e| {
        let preview = preview(text);
        log::error!(
            "Failed to decode incidents.\n  \
             origin: {origin}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        FetchError::Json(e)
    })
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_array() {
        let text = r#"[
            {"id": "a", "incidentType": "Collision", "date": "2024-03-09T04:05:00Z",
             "vehicleType": "Car", "location": "Main St"},
            {"id": 7, "incidentType": "Other", "date": "2024-03-10T10:00:00",
             "vehicleType": "Bicycle"}
        ]"#;
        let records = decode_records("test", text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "7");
    }

    #[test]
    fn truncated_body_is_rejected_entirely() {
        let text = r#"[{"id": "a", "incidentType": "Collision", "date": "2024-03-09T04:05:00Z",
             "vehicleType": "Car"}, {"id": "b", "incidentT"#;
        assert!(matches!(
            decode_records("test", text),
            Err(FetchError::Json(_))
        ));
    }

    #[test]
    fn one_bad_record_rejects_the_batch() {
        let text = r#"[
            {"id": "a", "incidentType": "Collision", "date": "2024-03-09T04:05:00Z", "vehicleType": "Car"},
            {"id": "b", "incidentType": "Collision", "date": "not a date", "vehicleType": "Car"}
        ]"#;
        assert!(decode_records("test", text).is_err());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(BODY_PREVIEW_LEN);
        let p = preview(&text);
        assert!(p.len() <= BODY_PREVIEW_LEN);
        assert!(text.starts_with(p));
    }
}
