//! Per-pass deduplication of identical address lookups.
//!
//! Two incidents at the same address produce the same address string, and
//! without this wrapper each one costs a provider call. [`DedupGeocoder`]
//! remembers the outcome for each string for as long as it lives (callers
//! create one per enrichment pass). Hits and misses are remembered; errors
//! are not, so a transient failure for one record does not condemn the
//! next record at the same address.
//!
//! Every caller still receives its own answer, so the number and order of
//! plotted incidents is the same with or without the wrapper.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider};

/// A [`Geocoder`] that memoizes outcomes by exact address string.
pub struct DedupGeocoder {
    inner: Arc<dyn Geocoder>,
    seen: Mutex<BTreeMap<String, Option<GeocodedAddress>>>,
}

impl DedupGeocoder {
    #[must_use]
    pub fn new(inner: Arc<dyn Geocoder>) -> Self {
        Self {
            inner,
            seen: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of distinct addresses with a remembered outcome.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Geocoder for DedupGeocoder {
    fn provider(&self) -> GeocodingProvider {
        self.inner.provider()
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let cached = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned();

        if let Some(outcome) = cached {
            log::trace!("Reusing geocode outcome for '{address}'");
            return Ok(outcome);
        }

        let outcome = self.inner.geocode(address).await?;

        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string(), outcome.clone());

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safestreet_incident_models::Coordinate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl Geocoder for Counting {
        fn provider(&self) -> GeocodingProvider {
            GeocodingProvider::Static
        }

        async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(GeocodeError::RateLimited);
            }
            if address.starts_with("nowhere") {
                return Ok(None);
            }
            Ok(Some(GeocodedAddress {
                coordinate: Coordinate::new(-33.86, 151.2),
                matched_address: None,
                provider: GeocodingProvider::Static,
            }))
        }
    }

    #[tokio::test]
    async fn repeated_address_hits_provider_once() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail_first: false,
        });
        let dedup = DedupGeocoder::new(inner.clone());

        let a = dedup.geocode("12, Main St, Australia").await.unwrap();
        let b = dedup.geocode("12, Main St, Australia").await.unwrap();
        let miss1 = dedup.geocode("nowhere, Australia").await.unwrap();
        let miss2 = dedup.geocode("nowhere, Australia").await.unwrap();

        assert_eq!(a, b);
        assert!(miss1.is_none() && miss2.is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(dedup.len(), 2);
    }

    #[tokio::test]
    async fn errors_are_not_remembered() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail_first: true,
        });
        let dedup = DedupGeocoder::new(inner.clone());

        assert!(dedup.geocode("12, Main St, Australia").await.is_err());
        assert!(dedup.is_empty());
        assert!(dedup.geocode("12, Main St, Australia").await.unwrap().is_some());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
