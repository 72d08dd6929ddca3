//! Incident retrieval from a local JSON file.

use std::path::PathBuf;

use async_trait::async_trait;
use safestreet_incident_models::IncidentRecord;

use crate::{FetchError, IncidentSource, decode_records};

/// Reads incidents from a file containing the backend's JSON array.
pub struct FileIncidentSource {
    path: PathBuf,
}

impl FileIncidentSource {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl IncidentSource for FileIncidentSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<IncidentRecord>, FetchError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let records = decode_records(&self.describe(), &text)?;
        log::info!("Loaded {} incidents from {}", records.len(), self.path.display());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_records_from_disk() {
        let path = std::env::temp_dir().join("safestreet_file_source_test.json");
        std::fs::write(
            &path,
            r#"[{"id":"1","incidentType":"Near Miss","date":"2024-03-09T04:05:00Z","vehicleType":"Bus"}]"#,
        )
        .unwrap();

        let records = FileIncidentSource::new(path.clone()).fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vehicle_type, "Bus");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("safestreet_file_source_missing.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            FileIncidentSource::new(path).fetch().await,
            Err(FetchError::Io(_))
        ));
    }
}
