//! Sequential geocoding of incident records into plotted incidents.
//!
//! A pass formats each record's address, waits for the geocoder, and keeps
//! the record only if a coordinate came back. Records are processed one at
//! a time in input order, so the output order is the input order with the
//! failures removed. Failures are logged and otherwise dropped; nothing is
//! retried.

use std::sync::Arc;
use std::time::Duration;

use safestreet_geocoder::address::format_incident_address;
use safestreet_geocoder::dedup::DedupGeocoder;
use safestreet_geocoder::{GeocodeError, GeocodedAddress, Geocoder};
use safestreet_incident_models::{IncidentRecord, PlottedIncident};

use crate::marker::MarkerRegistry;
use crate::progress::ProgressCallback;

/// Counts from one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Records a lookup was issued for.
    pub attempted: usize,
    /// Records that resolved and were plotted.
    pub plotted: usize,
    /// Records whose lookup missed or failed.
    pub dropped: usize,
}

/// The result of one completed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    /// Plotted incidents in input order.
    pub plotted: Vec<PlottedIncident>,
    /// Pass counters.
    pub report: EnrichmentReport,
}

/// Turns incident records into [`PlottedIncident`]s.
pub struct IncidentEnricher {
    geocoder: Arc<dyn Geocoder>,
    registry: Arc<MarkerRegistry>,
    lookup_timeout: Option<Duration>,
    dedupe_addresses: bool,
}

impl IncidentEnricher {
    #[must_use]
    pub const fn new(geocoder: Arc<dyn Geocoder>, registry: Arc<MarkerRegistry>) -> Self {
        Self {
            geocoder,
            registry,
            lookup_timeout: None,
            dedupe_addresses: false,
        }
    }

    /// Treats any lookup slower than `timeout` as a failed lookup.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Reuses the outcome for identical address strings within a pass.
    #[must_use]
    pub const fn with_dedupe_addresses(mut self, dedupe: bool) -> Self {
        self.dedupe_addresses = dedupe;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    /// Whether a pass over `records` would do any work.
    #[must_use]
    pub const fn should_run(records: &[IncidentRecord], ready: bool) -> bool {
        ready && !records.is_empty()
    }

    /// Runs one full pass.
    ///
    /// Returns `None` without touching the geocoder when the map is not
    /// ready or there are no records; the caller should keep whatever it
    /// was showing before.
    pub async fn enrich(
        &self,
        records: &[IncidentRecord],
        ready: bool,
        progress: &dyn ProgressCallback,
    ) -> Option<Enrichment> {
        if !Self::should_run(records, ready) {
            log::trace!(
                "Skipping enrichment (ready={ready}, records={})",
                records.len()
            );
            return None;
        }

        let geocoder: Arc<dyn Geocoder> = if self.dedupe_addresses {
            Arc::new(DedupGeocoder::new(self.geocoder.clone()))
        } else {
            self.geocoder.clone()
        };

        progress.set_total(records.len() as u64);
        progress.set_message(format!("Geocoding {} incidents", records.len()));

        let mut plotted = Vec::with_capacity(records.len());
        let mut report = EnrichmentReport::default();

        for record in records {
            let address = format_incident_address(record);
            report.attempted += 1;

            match self.lookup(geocoder.as_ref(), &address).await {
                Ok(Some(geocoded)) => {
                    plotted.push(PlottedIncident {
                        record: record.clone(),
                        coordinate: geocoded.coordinate,
                        display_color: self.registry.lookup(&record.incident_type).clone(),
                        address_string: address,
                    });
                }
                Ok(None) => {
                    log::debug!("No geocode result for incident {} ('{address}')", record.id);
                    report.dropped += 1;
                }
                Err(e) => {
                    log::warn!("Geocoding failed for incident {} ('{address}'): {e}", record.id);
                    report.dropped += 1;
                }
            }

            progress.inc(1);
        }

        report.plotted = plotted.len();
        log::info!(
            "Enrichment complete: {} plotted, {} dropped of {} incidents",
            report.plotted,
            report.dropped,
            report.attempted
        );
        progress.finish(format!(
            "{} of {} incidents plotted",
            report.plotted, report.attempted
        ));

        Some(Enrichment { plotted, report })
    }

    async fn lookup(
        &self,
        geocoder: &dyn Geocoder,
        address: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, geocoder.geocode(address))
                .await
                .unwrap_or(Err(GeocodeError::TimedOut(limit))),
            None => geocoder.geocode(address).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use async_trait::async_trait;
    use chrono::{TimeZone as _, Utc};
    use safestreet_geocoder::GeocodingProvider;
    use safestreet_incident_models::Coordinate;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Geocoder backed by a fixed address → coordinate table. Records every
    /// address it was asked about. Addresses in `hang` never resolve.
    #[derive(Default)]
    pub struct FakeGeocoder {
        pub hits: BTreeMap<String, Coordinate>,
        pub errors: Vec<String>,
        pub hang: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        pub fn with_hit(mut self, address: &str, coordinate: Coordinate) -> Self {
            self.hits.insert(address.to_string(), coordinate);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        fn provider(&self) -> GeocodingProvider {
            GeocodingProvider::Static
        }

        async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            self.calls.lock().unwrap().push(address.to_string());
            if self.hang.iter().any(|a| a == address) {
                std::future::pending::<()>().await;
            }
            if self.errors.iter().any(|a| a == address) {
                return Err(GeocodeError::Provider {
                    status: "UNKNOWN_ERROR".to_string(),
                    message: None,
                });
            }
            Ok(self.hits.get(address).map(|c| GeocodedAddress {
                coordinate: *c,
                matched_address: None,
                provider: GeocodingProvider::Static,
            }))
        }
    }

    pub fn record(id: &str, incident_type: &str, location: &str, suburb: &str) -> IncidentRecord {
        IncidentRecord {
            id: id.to_string(),
            incident_type: incident_type.to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 9, 4, 5, 0).unwrap(),
            vehicle_type: "Car".to_string(),
            description: None,
            street_number: None,
            location: Some(location.to_string()),
            cross_street: None,
            suburb: Some(suburb.to_string()),
            state: None,
        }
    }

    fn enricher(geocoder: Arc<FakeGeocoder>) -> IncidentEnricher {
        IncidentEnricher::new(geocoder, Arc::new(MarkerRegistry::default()))
    }

    #[tokio::test]
    async fn two_record_scenario() {
        let mut first = record("1", "Collision", "Main St", "Sydney");
        first.street_number = Some("12".to_string());
        first.state = Some("NSW".to_string());
        let mut second = record("2", "Other", "", "Perth");
        second.state = Some("WA".to_string());

        let geocoder = Arc::new(FakeGeocoder::default().with_hit(
            "12, Main St, Sydney, NSW, Australia",
            Coordinate::new(-33.86, 151.2),
        ));
        let enricher = enricher(geocoder.clone());

        let result = enricher
            .enrich(&[first, second], true, &NullProgress)
            .await
            .unwrap();

        assert_eq!(result.plotted.len(), 1);
        let plotted = &result.plotted[0];
        assert_eq!(plotted.address_string, "12, Main St, Sydney, NSW, Australia");
        assert_eq!(&plotted.display_color, enricher.registry().lookup("Collision"));
        assert_eq!(plotted.coordinate, Coordinate::new(-33.86, 151.2));
        assert_eq!(
            geocoder.calls.lock().unwrap()[1],
            "Perth, WA, Australia",
            "second record is still looked up"
        );
        assert_eq!(
            result.report,
            EnrichmentReport {
                attempted: 2,
                plotted: 1,
                dropped: 1
            }
        );
    }

    #[tokio::test]
    async fn failure_in_the_middle_preserves_order() {
        let records: Vec<_> = (0..5)
            .map(|i| record(&i.to_string(), "Collision", &format!("{i} St"), "Sydney"))
            .collect();

        let mut geocoder = FakeGeocoder::default();
        for i in 0..5 {
            let addr = format!("{i} St, Sydney, Australia");
            if i == 2 {
                geocoder.errors.push(addr);
            } else {
                geocoder.hits.insert(addr, Coordinate::new(-33.0, 151.0 + f64::from(i)));
            }
        }

        let result = enricher(Arc::new(geocoder))
            .enrich(&records, true, &NullProgress)
            .await
            .unwrap();

        let ids: Vec<&str> = result.plotted.iter().map(PlottedIncident::id).collect();
        assert_eq!(ids, vec!["0", "1", "3", "4"]);
    }

    #[tokio::test]
    async fn not_ready_makes_no_calls() {
        let records: Vec<_> = (0..3)
            .map(|i| record(&i.to_string(), "Collision", "Main St", "Sydney"))
            .collect();
        let geocoder = Arc::new(FakeGeocoder::default());
        let enricher = enricher(geocoder.clone());

        assert!(enricher.enrich(&records, false, &NullProgress).await.is_none());
        assert_eq!(geocoder.call_count(), 0);

        enricher.enrich(&records, true, &NullProgress).await.unwrap();
        assert_eq!(geocoder.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_records_make_no_calls() {
        let geocoder = Arc::new(FakeGeocoder::default());
        assert!(
            enricher(geocoder.clone())
                .enrich(&[], true, &NullProgress)
                .await
                .is_none()
        );
        assert_eq!(geocoder.call_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_addresses_are_each_geocoded_by_default() {
        let records = vec![
            record("a", "Collision", "Main St", "Sydney"),
            record("b", "Near Miss", "Main St", "Sydney"),
        ];
        let geocoder = Arc::new(
            FakeGeocoder::default()
                .with_hit("Main St, Sydney, Australia", Coordinate::new(-33.86, 151.2)),
        );

        let result = enricher(geocoder.clone())
            .enrich(&records, true, &NullProgress)
            .await
            .unwrap();

        assert_eq!(result.plotted.len(), 2);
        assert_eq!(geocoder.call_count(), 2);
    }

    #[tokio::test]
    async fn dedupe_keeps_count_and_order() {
        let records = vec![
            record("a", "Collision", "Main St", "Sydney"),
            record("b", "Near Miss", "Hay St", "Perth"),
            record("c", "Other", "Main St", "Sydney"),
        ];
        let geocoder = Arc::new(
            FakeGeocoder::default()
                .with_hit("Main St, Sydney, Australia", Coordinate::new(-33.86, 151.2))
                .with_hit("Hay St, Perth, Australia", Coordinate::new(-31.95, 115.86)),
        );

        let result = enricher(geocoder.clone())
            .with_dedupe_addresses(true)
            .enrich(&records, true, &NullProgress)
            .await
            .unwrap();

        let ids: Vec<&str> = result.plotted.iter().map(PlottedIncident::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(geocoder.call_count(), 2);
        assert_ne!(result.plotted[0].display_color, result.plotted[2].display_color);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_lookup_times_out_and_is_dropped() {
        let records = vec![
            record("slow", "Collision", "Nowhere Rd", "Sydney"),
            record("fast", "Collision", "Main St", "Sydney"),
        ];
        let mut geocoder = FakeGeocoder::default()
            .with_hit("Main St, Sydney, Australia", Coordinate::new(-33.86, 151.2));
        geocoder.hang.push("Nowhere Rd, Sydney, Australia".to_string());

        let result = enricher(Arc::new(geocoder))
            .with_lookup_timeout(Some(Duration::from_secs(5)))
            .enrich(&records, true, &NullProgress)
            .await
            .unwrap();

        assert_eq!(result.plotted.len(), 1);
        assert_eq!(result.plotted[0].id(), "fast");
        assert_eq!(result.report.dropped, 1);
    }
}
