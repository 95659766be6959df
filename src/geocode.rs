//! Address lookup with coordinate reconciliation.
//!
//! A provider address is never trusted on its name alone: the coordinates the
//! provider reports for that address are compared against the input, and a
//! large gap is surfaced as a warning. Provider failures of any kind degrade
//! to the formatted input coordinates.

use crate::api::{GeocodingProvider, ProviderPlace, ReverseQuery, SearchQuery};
use crate::coords::{check_coordinate, format_coordinates};
use crate::distance::distance_km;
use crate::error::ProviderError;
use crate::models::{CoordinateValidation, GeocodeResult, GeocodeSource, LocationSample, SampleSource};
use crate::regions::RegionRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 5.0;
pub const DEFAULT_COLLISION_DISTANCE_KM: f64 = 50.0;

/// Structured address parts, in display order.
pub const ADDRESS_COMPONENTS: &[&str] = &[
    "house_number",
    "road",
    "neighbourhood",
    "suburb",
    "city",
    "state",
    "postcode",
    "country",
];

/// Display address for a provider place: `display_name` when present,
/// otherwise the structured parts joined with ", ".
pub fn format_address(place: &ProviderPlace) -> Option<String> {
    if let Some(name) = place.display_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    format_components(&place.address)
}

fn format_components(address: &Map<String, Value>) -> Option<String> {
    let parts: Vec<&str> = ADDRESS_COMPONENTS
        .iter()
        .filter_map(|key| address.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join(", "))
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub timeout: Duration,
    pub max_distance_km: f64,
    pub collision_distance_km: f64,
    pub country_codes: Option<String>,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::api::DEFAULT_PROVIDER_TIMEOUT_MS),
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            collision_distance_km: DEFAULT_COLLISION_DISTANCE_KM,
            country_codes: None,
        }
    }
}

pub struct GeocodingReconciler {
    provider: Arc<dyn GeocodingProvider>,
    registry: Arc<RegionRegistry>,
    settings: ReconcilerSettings,
}

impl GeocodingReconciler {
    pub fn new(
        provider: Arc<dyn GeocodingProvider>,
        registry: Arc<RegionRegistry>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Reverse-geocodes `(lat, lng)` and cross-checks the answer.
    ///
    /// Never fails: provider errors, timeouts and coordinate-less answers all
    /// produce a `Fallback` result carrying the formatted input coordinates.
    pub async fn reconcile_address(
        &self,
        lat: f64,
        lng: f64,
        region_hint: Option<&str>,
        max_distance_km: Option<f64>,
    ) -> GeocodeResult {
        if let Err(e) = check_coordinate(lat, lng) {
            warn!("Refusing to geocode invalid coordinates ({}, {}): {}", lat, lng, e);
            return GeocodeResult {
                address: Some(format_coordinates(lat, lng)),
                source: GeocodeSource::Fallback,
                error_message: Some(e.to_string()),
                coordinate_validation: CoordinateValidation {
                    is_valid: false,
                    distance_from_input_km: None,
                    warnings: vec![format!("Input coordinates are invalid: {}", e)],
                },
            };
        }

        let hinted = region_hint.and_then(|hint| {
            let region = self.registry.get(hint);
            if region.is_none() {
                warn!("Unknown region hint '{}'; using country bounds", hint);
            }
            region
        });

        let query = ReverseQuery {
            lat,
            lon: lng,
            viewbox: match hinted {
                Some(region) => self.registry.bounds(region),
                None => self.registry.country_box(),
            },
            bounded: true,
            country_codes: self.settings.country_codes.clone(),
        };

        let place = match self.bounded(self.provider.reverse(&query)).await {
            Ok(place) => place,
            Err(e) => {
                warn!(
                    "Reverse geocoding via {} failed for ({}, {}): {}",
                    self.provider.name(),
                    lat,
                    lng,
                    e
                );
                return fallback(lat, lng, e.to_string());
            }
        };

        let Some((place_lat, place_lng)) = place.coordinates() else {
            warn!("Provider returned no coordinates for ({}, {})", lat, lng);
            return fallback(lat, lng, "Provider returned no coordinates".to_string());
        };

        let max_distance = max_distance_km
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.settings.max_distance_km);
        let distance = distance_km(lat, lng, place_lat, place_lng);
        let mut validation = CoordinateValidation {
            is_valid: true,
            distance_from_input_km: Some(distance),
            warnings: Vec::new(),
        };

        if distance > max_distance {
            validation.is_valid = false;
            validation.warnings.push(format!(
                "Address location is {:.1} km from the input coordinates (limit {:.1} km).",
                distance, max_distance
            ));
        }
        if distance > self.settings.collision_distance_km {
            validation.warnings.push(format!(
                "Possible place-name collision: the resolved address is {:.0} km away and may refer to a different place with the same name.",
                distance
            ));
        }
        if let Some(region) = hinted {
            if !self.registry.is_within(region, place_lat, place_lng) {
                validation.warnings.push(format!(
                    "Resolved address lies outside the expected region {}.",
                    region.name
                ));
            }
        }
        if !self.registry.country_box().contains(place_lat, place_lng) {
            validation
                .warnings
                .push("Resolved address lies outside the service country.".to_string());
        }

        if validation.is_valid {
            debug!("Address for ({}, {}) reconciled within {:.2} km", lat, lng, distance);
        } else {
            warn!(
                "Address for ({}, {}) is {:.1} km from input; flagged invalid",
                lat, lng, distance
            );
        }

        GeocodeResult {
            address: format_address(&place),
            source: GeocodeSource::Provider,
            error_message: None,
            coordinate_validation: validation,
        }
    }

    /// Forward-geocodes a manually typed address into a `Manual` sample.
    ///
    /// Returns `None` when the provider fails or finds nothing usable.
    pub async fn resolve_manual_pick(
        &self,
        text: &str,
        region_hint: Option<&str>,
        timestamp_millis: i64,
    ) -> Option<(LocationSample, Option<String>)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let query = SearchQuery {
            text: text.to_string(),
            viewbox: self.registry.query_box(region_hint),
            bounded: true,
            country_codes: self.settings.country_codes.clone(),
            limit: 5,
        };

        let places = match self.bounded(self.provider.search(&query)).await {
            Ok(places) => places,
            Err(e) => {
                warn!("Address search for '{}' failed: {}", text, e);
                return None;
            }
        };

        let picked = places.iter().find_map(|place| {
            let (lat, lng) = place.coordinates()?;
            check_coordinate(lat, lng).ok()?;
            Some((lat, lng, format_address(place)))
        });

        match picked {
            Some((lat, lng, address)) => {
                info!("Manual pick '{}' resolved to ({}, {})", text, lat, lng);
                let sample = LocationSample::new(lat, lng, 0.0, timestamp_millis, SampleSource::Manual);
                Some((sample, address))
            }
            None => {
                info!("Manual pick '{}' produced no usable result", text);
                None
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.settings.timeout, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout))
    }
}

fn fallback(lat: f64, lng: f64, error: String) -> GeocodeResult {
    GeocodeResult {
        address: Some(format_coordinates(lat, lng)),
        source: GeocodeSource::Fallback,
        error_message: Some(error),
        coordinate_validation: CoordinateValidation {
            is_valid: true,
            distance_from_input_km: None,
            warnings: vec!["Address unavailable; showing raw coordinates.".to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedProvider {
        reverse: Result<ProviderPlace, ProviderError>,
        search: Result<Vec<ProviderPlace>, ProviderError>,
    }

    impl CannedProvider {
        fn answering(place: ProviderPlace) -> Self {
            Self {
                reverse: Ok(place),
                search: Ok(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GeocodingProvider for CannedProvider {
        async fn reverse(&self, _query: &ReverseQuery) -> Result<ProviderPlace, ProviderError> {
            self.reverse.clone()
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<ProviderPlace>, ProviderError> {
            self.search.clone()
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn place(display_name: Option<&str>, lat: f64, lon: f64) -> ProviderPlace {
        ProviderPlace {
            display_name: display_name.map(String::from),
            address: Map::new(),
            lat: Some(json!(lat.to_string())),
            lon: Some(json!(lon.to_string())),
        }
    }

    fn reconciler(provider: CannedProvider) -> GeocodingReconciler {
        GeocodingReconciler::new(
            Arc::new(provider),
            Arc::new(RegionRegistry::builtin()),
            ReconcilerSettings::default(),
        )
    }

    #[test]
    fn test_format_prefers_display_name() {
        let mut p = place(Some("Koramangala, Bengaluru"), 12.93, 77.62);
        p.address.insert("road".into(), json!("80 Feet Road"));
        assert_eq!(format_address(&p).as_deref(), Some("Koramangala, Bengaluru"));
    }

    #[test]
    fn test_format_components_in_order() {
        let mut p = place(Some("  "), 12.93, 77.62);
        p.address.insert("country".into(), json!("India"));
        p.address.insert("road".into(), json!("80 Feet Road"));
        p.address.insert("house_number".into(), json!("12"));
        p.address.insert("postcode".into(), json!(560034));
        p.address.insert("suburb".into(), json!(""));
        p.address.insert("city".into(), json!("Bengaluru"));

        assert_eq!(
            format_address(&p).as_deref(),
            Some("12, 80 Feet Road, Bengaluru, India")
        );
    }

    #[test]
    fn test_format_nothing_usable() {
        assert_eq!(format_address(&ProviderPlace::default()), None);
    }

    #[tokio::test]
    async fn test_identical_coordinates_are_valid() {
        let engine = reconciler(CannedProvider::answering(place(
            Some("MG Road, Bengaluru"),
            12.9756,
            77.6066,
        )));
        let result = engine.reconcile_address(12.9756, 77.6066, None, None).await;

        assert_eq!(result.source, GeocodeSource::Provider);
        assert_eq!(result.address.as_deref(), Some("MG Road, Bengaluru"));
        assert!(result.coordinate_validation.is_valid);
        assert!(result.coordinate_validation.distance_from_input_km.unwrap() < 1e-6);
        assert!(result.coordinate_validation.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_distant_address_flagged() {
        // ~10 km away
        let engine = reconciler(CannedProvider::answering(place(Some("Elsewhere"), 13.0616, 77.6066)));
        let result = engine.reconcile_address(12.9716, 77.6066, None, None).await;

        assert!(!result.coordinate_validation.is_valid);
        assert_eq!(result.coordinate_validation.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_caller_threshold_overrides_default() {
        let engine = reconciler(CannedProvider::answering(place(Some("Elsewhere"), 13.0616, 77.6066)));
        let result = engine.reconcile_address(12.9716, 77.6066, None, Some(20.0)).await;

        assert!(result.coordinate_validation.is_valid);
    }

    #[tokio::test]
    async fn test_unusable_caller_threshold_uses_default() {
        let engine = reconciler(CannedProvider::answering(place(Some("Elsewhere"), 13.0616, 77.6066)));

        for bad in [f64::NAN, -1.0, 0.0, f64::INFINITY] {
            let result = engine.reconcile_address(12.9716, 77.6066, None, Some(bad)).await;
            assert!(!result.coordinate_validation.is_valid, "threshold {bad} disabled the check");
        }
    }

    #[tokio::test]
    async fn test_null_island_from_provider_falls_back() {
        let engine = reconciler(CannedProvider::answering(place(Some("Null Island"), 0.0, 0.0)));
        let result = engine.reconcile_address(19.0760, 72.8777, None, None).await;

        assert_eq!(result.source, GeocodeSource::Fallback);
        assert_eq!(result.address.as_deref(), Some("19.076000, 72.877700"));
        assert!(result.coordinate_validation.distance_from_input_km.is_none());
    }

    #[tokio::test]
    async fn test_name_collision_warning() {
        // Input in Hyderabad, provider resolves to Bengaluru
        let engine = reconciler(CannedProvider::answering(place(
            Some("Jayanagar, Bengaluru"),
            12.9250,
            77.5938,
        )));
        let result = engine
            .reconcile_address(17.3850, 78.4867, Some("Hyderabad"), None)
            .await;

        let warnings = &result.coordinate_validation.warnings;
        assert!(!result.coordinate_validation.is_valid);
        assert!(warnings.iter().any(|w| w.contains("collision")));
        assert!(warnings.iter().any(|w| w.contains("expected region Hyderabad")));
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let engine = reconciler(CannedProvider {
            reverse: Err(ProviderError::RateLimited),
            search: Ok(Vec::new()),
        });
        let result = engine.reconcile_address(19.0760, 72.8777, None, None).await;

        assert_eq!(result.source, GeocodeSource::Fallback);
        assert_eq!(result.address.as_deref(), Some("19.076000, 72.877700"));
        assert_eq!(
            result.error_message,
            Some(ProviderError::RateLimited.to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_coordinates_fall_back() {
        let engine = reconciler(CannedProvider::answering(ProviderPlace {
            display_name: Some("Somewhere".into()),
            ..Default::default()
        }));
        let result = engine.reconcile_address(19.0760, 72.8777, None, None).await;

        assert_eq!(result.source, GeocodeSource::Fallback);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn test_invalid_input_skips_provider() {
        let engine = reconciler(CannedProvider {
            reverse: Err(ProviderError::Server(500)),
            search: Ok(Vec::new()),
        });
        let result = engine.reconcile_address(0.0, 0.0, None, None).await;

        assert_eq!(result.source, GeocodeSource::Fallback);
        assert!(!result.coordinate_validation.is_valid);
        assert_eq!(
            result.error_message,
            Some(crate::error::CoordinateError::NullIsland.to_string())
        );
    }

    #[tokio::test]
    async fn test_manual_pick_skips_unusable_results() {
        let engine = reconciler(CannedProvider {
            reverse: Err(ProviderError::NotFound),
            search: Ok(vec![
                ProviderPlace::default(),
                place(Some("Andheri East, Mumbai"), 19.1136, 72.8697),
            ]),
        });

        let (sample, address) = engine
            .resolve_manual_pick("Andheri East", Some("Mumbai"), 7)
            .await
            .unwrap();

        assert_eq!(sample.source, SampleSource::Manual);
        assert_eq!(sample.timestamp_millis, 7);
        assert_eq!(address.as_deref(), Some("Andheri East, Mumbai"));
    }

    #[tokio::test]
    async fn test_manual_pick_blank_or_failed() {
        let engine = reconciler(CannedProvider {
            reverse: Err(ProviderError::NotFound),
            search: Err(ProviderError::Unauthorized),
        });

        assert!(engine.resolve_manual_pick("   ", None, 0).await.is_none());
        assert!(engine.resolve_manual_pick("Powai", None, 0).await.is_none());
    }
}
