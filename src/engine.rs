//! In-process entry points used by the rest of the CRM.
//!
//! [`LocationEngine`] bundles the capture policy, jump detector and geocoding
//! reconciler behind the four calls attendance and visit workflows need. It
//! holds no per-request state, so one instance can serve any number of
//! concurrent callers.

use crate::api::{GeocodingProvider, NominatimProvider};
use crate::capture::{self, CaptureConfig, GpsValidationResult, LocationSource};
use crate::config::Config;
use crate::geocode::{GeocodingReconciler, ReconcilerSettings};
use crate::jump::JumpDetector;
use crate::location::{FixedLocationSource, IpLocationSource};
use crate::models::{GeocodeResult, JumpResult, LocationSample};
use crate::quality::{self, QualityTier};
use crate::regions::RegionRegistry;
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

pub struct LocationEngine {
    source: Arc<dyn LocationSource>,
    capture: CaptureConfig,
    high_accuracy_meters: f64,
    jumps: JumpDetector,
    reconciler: GeocodingReconciler,
    registry: Arc<RegionRegistry>,
}

impl LocationEngine {
    pub fn new(
        source: Arc<dyn LocationSource>,
        provider: Arc<dyn GeocodingProvider>,
        registry: Arc<RegionRegistry>,
        capture: CaptureConfig,
        jumps: JumpDetector,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            source,
            capture,
            high_accuracy_meters: capture::DEFAULT_HIGH_ACCURACY_METERS,
            jumps,
            reconciler: GeocodingReconciler::new(provider, Arc::clone(&registry), settings),
            registry,
        }
    }

    /// Wires the production adapters from configuration: IP geolocation or
    /// the manual point for positions, the HTTP provider for addresses.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(config.regions.load_registry()?);

        let source: Arc<dyn LocationSource> = if config.location.auto_locate {
            Arc::new(IpLocationSource::new(
                &config.location.lookup_ip,
                config.location.ip_accuracy_meters,
            ))
        } else {
            Arc::new(FixedLocationSource::new(
                config.location.manual_lat,
                config.location.manual_lon,
            ))
        };

        let geocoding = &config.geocoding;
        let provider = Arc::new(NominatimProvider::new(
            &geocoding.base_url,
            geocoding.api_key.clone(),
            &geocoding.user_agent,
            geocoding.timeout(),
        )?);

        info!(
            "Location engine ready with {} regions (auto_locate={})",
            registry.len(),
            config.location.auto_locate
        );

        Ok(Self::new(
            source,
            provider,
            registry,
            config.capture.policy(),
            JumpDetector::new(config.jump.max_speed_kmh),
            geocoding.reconciler_settings(),
        )
        .with_high_accuracy_meters(config.capture.high_accuracy_meters))
    }

    pub fn with_high_accuracy_meters(mut self, meters: f64) -> Self {
        self.high_accuracy_meters = meters;
        self
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// One capture with the engine's policy, or `config` when given.
    pub async fn capture_location(&self, config: Option<&CaptureConfig>) -> GpsValidationResult {
        capture::capture_location(self.source.as_ref(), config.unwrap_or(&self.capture)).await
    }

    /// Capture with a tighter soft threshold (the configured high-accuracy
    /// threshold unless overridden).
    pub async fn get_high_accuracy_location(
        &self,
        max_accuracy_meters: Option<f64>,
    ) -> GpsValidationResult {
        capture::get_high_accuracy_location(
            self.source.as_ref(),
            Some(max_accuracy_meters.unwrap_or(self.high_accuracy_meters)),
            &self.capture,
        )
        .await
    }

    pub async fn reconcile_address(
        &self,
        lat: f64,
        lng: f64,
        expected_region_hint: Option<&str>,
        max_distance_km: Option<f64>,
    ) -> GeocodeResult {
        self.reconciler
            .reconcile_address(lat, lng, expected_region_hint, max_distance_km)
            .await
    }

    pub async fn resolve_manual_pick(
        &self,
        text: &str,
        region_hint: Option<&str>,
        timestamp_millis: i64,
    ) -> Option<(LocationSample, Option<String>)> {
        self.reconciler
            .resolve_manual_pick(text, region_hint, timestamp_millis)
            .await
    }

    pub fn detect_jump(
        &self,
        prev: &LocationSample,
        next: &LocationSample,
        max_speed_kmh: Option<f64>,
    ) -> JumpResult {
        self.jumps.detect(prev, next, max_speed_kmh)
    }

    pub fn classify_quality(&self, accuracy_meters: f64) -> QualityTier {
        quality::classify(accuracy_meters).tier
    }
}
