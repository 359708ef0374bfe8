//! Place resolution
//!
//! Resolves free-text destination queries: first against the static local
//! table (synchronous, no network), then through a remote geocoder. When
//! both miss, the failure carries local-table suggestions but never picks
//! one on the caller's behalf.

pub mod table;

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::Geocoder;
use serde::{Deserialize, Serialize};
use table::{PlaceTable, PLACE_TABLE};
use tracing::{debug, info, warn};

/// Maximum number of suggestions attached to a `NotFound`
pub const MAX_SUGGESTIONS: usize = 3;

/// Where a match came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSource {
    Local,
    Remote,
}

/// A resolved destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub coordinate: Coordinate,
    pub display_name: String,
    pub source: PlaceSource,
}

impl PlaceMatch {
    pub fn new(coordinate: Coordinate, display_name: impl Into<String>, source: PlaceSource) -> Self {
        Self {
            coordinate,
            display_name: display_name.into(),
            source,
        }
    }
}

/// Trim and case-fold a query
pub fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Resolves queries against the local table, then a geocoder
#[derive(Debug)]
pub struct PlaceResolver<G> {
    geocoder: G,
    table: &'static PlaceTable,
}

impl<G: Geocoder> PlaceResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            table: &PLACE_TABLE,
        }
    }

    /// Local-table lookup only
    pub fn resolve_local(&self, query: &str) -> Option<PlaceMatch> {
        let key = normalize(query);
        self.table
            .get(&key)
            .map(|coord| PlaceMatch::new(coord, query.trim(), PlaceSource::Local))
    }

    /// Up to three local keys containing the normalized query
    pub fn suggestions(&self, query: &str) -> Vec<String> {
        let key = normalize(query);
        if key.is_empty() {
            return Vec::new();
        }
        self.table
            .keys_containing(&key)
            .take(MAX_SUGGESTIONS)
            .map(str::to_string)
            .collect()
    }

    /// Resolve a query to a place
    ///
    /// Fails with `Error::NotFound` carrying suggestions when neither the
    /// table nor the geocoder knows the place, including on network errors.
    pub async fn resolve(&self, query: &str) -> Result<PlaceMatch> {
        if normalize(query).is_empty() {
            return Err(Error::NotFound {
                query: query.to_string(),
                suggestions: Vec::new(),
            });
        }

        if let Some(hit) = self.resolve_local(query) {
            debug!(query, "resolved from local table");
            return Ok(hit);
        }

        match self.geocoder.geocode(query).await {
            Ok(Some(loc)) => {
                let coordinate = loc.coordinate();
                if let Err(e) = coordinate.validate() {
                    warn!(query, error = %e, "geocoder returned out-of-range coordinate");
                } else {
                    info!(query, name = %loc.display_name, "resolved via geocoder");
                    return Ok(PlaceMatch::new(coordinate, loc.display_name, PlaceSource::Remote));
                }
            }
            Ok(None) => debug!(query, "geocoder has no results"),
            Err(e) => warn!(query, error = %e, "geocoding failed"),
        }

        Err(Error::NotFound {
            query: query.to_string(),
            suggestions: self.suggestions(query),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder stub that counts calls
    enum Stub {
        Empty,
        Fails,
        Finds(GeoLocation),
    }

    struct StubGeocoder {
        mode: Stub,
        calls: AtomicUsize,
    }

    impl StubGeocoder {
        fn new(mode: Stub) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Geocoder for StubGeocoder {
        async fn geocode(&self, _query: &str) -> Result<Option<GeoLocation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                Stub::Empty => Ok(None),
                Stub::Fails => Err(Error::Network("connection refused".to_string())),
                Stub::Finds(loc) => Ok(Some(loc.clone())),
            }
        }
    }

    fn suggestions_of(err: Error) -> Vec<String> {
        match err {
            Error::NotFound { suggestions, .. } => suggestions,
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multilingual_keys_resolve_locally() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Fails));

        for query in ["東京", "东京", "tokyo", "TOKYO", "  Tokyo "] {
            let hit = resolver.resolve(query).await.unwrap();
            assert_eq!(hit.coordinate, Coordinate::new(139.7671, 35.6812));
            assert_eq!(hit.source, PlaceSource::Local);
        }
        assert_eq!(resolver.geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_display_name_is_trimmed_query() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Empty));
        let hit = resolver.resolve("  Tokyo Tower ").await.unwrap();
        assert_eq!(hit.display_name, "Tokyo Tower");
    }

    #[tokio::test]
    async fn test_remote_fallback() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Finds(GeoLocation {
            lat: 48.8582,
            lng: 2.2945,
            display_name: "Tour Eiffel".to_string(),
        })));

        let hit = resolver.resolve("Eiffel Tower").await.unwrap();
        assert_eq!(hit.source, PlaceSource::Remote);
        assert_eq!(hit.display_name, "Tour Eiffel");
        assert_eq!(hit.coordinate, Coordinate::new(2.2945, 48.8582));
        assert_eq!(resolver.geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_place_without_suggestions() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Empty));
        let err = resolver.resolve("zzqx").await.unwrap_err();
        assert!(suggestions_of(err).is_empty());
    }

    #[tokio::test]
    async fn test_partial_match_suggests_on_no_results() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Empty));
        let err = resolver.resolve("kyo").await.unwrap_err();
        let suggestions = suggestions_of(err);
        assert!(suggestions.contains(&"tokyo".to_string()));
        assert_eq!(suggestions, vec!["tokyo", "kyoto", "tokyo tower"]);
    }

    #[tokio::test]
    async fn test_partial_match_suggests_on_network_error() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Fails));
        let err = resolver.resolve("Osak").await.unwrap_err();
        assert_eq!(suggestions_of(err), vec!["osaka", "osaka castle"]);
    }

    #[tokio::test]
    async fn test_out_of_range_remote_result_is_rejected() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Finds(GeoLocation {
            lat: 123.0,
            lng: 0.0,
            display_name: "Nowhere".to_string(),
        })));
        assert!(resolver.resolve("nowhere").await.is_err());
    }

    #[tokio::test]
    async fn test_blank_query_skips_network() {
        let resolver = PlaceResolver::new(StubGeocoder::new(Stub::Empty));
        let err = resolver.resolve("   ").await.unwrap_err();
        assert!(suggestions_of(err).is_empty());
        assert_eq!(resolver.geocoder.calls.load(Ordering::SeqCst), 0);
    }
}
