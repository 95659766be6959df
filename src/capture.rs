//! GPS capture policy.
//!
//! One call drives exactly one request against a [`LocationSource`] and turns
//! the outcome into a [`GpsValidationResult`]. The policy accepts anything
//! short of catastrophic: structurally invalid coordinates and fixes worse
//! than the unusable cutoff are the only rejections. Everything else is
//! accepted, with warnings for fair and worse accuracy.
//!
//! Retries are left to the caller.

use crate::coords::{check_coordinate, validate_sample};
use crate::error::PositionError;
use crate::models::{LocationSample, SampleSource, ValidationResult};
use crate::quality::{classify, QualityTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ACCURACY_METERS: f64 = 100.0;
pub const DEFAULT_HIGH_ACCURACY_METERS: f64 = 50.0;
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 15_000;

/// Options handed to the device for a single fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRequest {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

/// A raw fix as reported by the device, before any policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub timestamp_millis: i64,
}

/// A capability that can produce one position fix.
///
/// Implemented by the device adapters in [`crate::location`]; tests supply
/// their own.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self, request: &PositionRequest) -> Result<Fix, PositionError>;

    /// How samples from this source are labelled.
    fn kind(&self) -> SampleSource;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Soft threshold: fixes above it are accepted with an extra warning.
    pub max_accuracy_meters: f64,
    pub timeout_ms: u64,
    pub enable_high_accuracy: bool,
    /// Always 0 in practice: never reuse a cached fix.
    pub maximum_age_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_accuracy_meters: DEFAULT_MAX_ACCURACY_METERS,
            timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            enable_high_accuracy: true,
            maximum_age_ms: 0,
        }
    }
}

impl CaptureConfig {
    pub fn request(&self) -> PositionRequest {
        PositionRequest {
            enable_high_accuracy: self.enable_high_accuracy,
            timeout_ms: self.timeout_ms,
            maximum_age_ms: self.maximum_age_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsValidationResult {
    pub success: bool,
    pub sample: Option<LocationSample>,
    pub quality: Option<QualityTier>,
    pub requires_manual_selection: bool,
    pub error: Option<String>,
    pub validation: ValidationResult,
}

impl GpsValidationResult {
    fn rejected(error: String, sample: Option<LocationSample>, quality: Option<QualityTier>) -> Self {
        let mut validation = ValidationResult::default();
        validation.push_error(error.clone());
        Self {
            success: false,
            sample,
            quality,
            requires_manual_selection: true,
            error: Some(error),
            validation,
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.validation.warnings
    }
}

/// Requests one fix and applies the acceptance policy.
pub async fn capture_location(
    source: &dyn LocationSource,
    config: &CaptureConfig,
) -> GpsValidationResult {
    let request = config.request();
    debug!(
        "Requesting position fix (high_accuracy={}, timeout={}ms)",
        request.enable_high_accuracy, request.timeout_ms
    );

    // The source is expected to honour the timeout itself; this bounds it
    // regardless.
    let outcome = tokio::time::timeout(
        Duration::from_millis(request.timeout_ms),
        source.current_position(&request),
    )
    .await
    .unwrap_or(Err(PositionError::Timeout));

    let fix = match outcome {
        Ok(fix) => fix,
        Err(e) => {
            warn!("Position request failed: {:?}", e);
            return GpsValidationResult::rejected(e.to_string(), None, None);
        }
    };

    let sample = LocationSample::new(
        fix.latitude,
        fix.longitude,
        fix.accuracy,
        fix.timestamp_millis,
        source.kind(),
    );
    evaluate_sample(sample, config.max_accuracy_meters)
}

/// Capture with a caller-supplied tighter threshold. The threshold only
/// changes warnings; the unusable cutoff is still the only accuracy rejection.
pub async fn get_high_accuracy_location(
    source: &dyn LocationSource,
    max_accuracy_meters: Option<f64>,
    base: &CaptureConfig,
) -> GpsValidationResult {
    let config = CaptureConfig {
        max_accuracy_meters: max_accuracy_meters.unwrap_or(DEFAULT_HIGH_ACCURACY_METERS),
        enable_high_accuracy: true,
        maximum_age_ms: 0,
        ..*base
    };
    capture_location(source, &config).await
}

/// Applies the structural gate and the accuracy tiers to a sample.
pub fn evaluate_sample(sample: LocationSample, max_accuracy_meters: f64) -> GpsValidationResult {
    if let Err(e) = check_coordinate(sample.latitude, sample.longitude) {
        warn!(
            "Rejecting fix ({}, {}): {}",
            sample.latitude, sample.longitude, e
        );
        return GpsValidationResult::rejected(
            format!("Invalid location received: {}. Please select the location manually.", e),
            Some(sample),
            Some(QualityTier::Unusable),
        );
    }

    let assessment = classify(sample.accuracy);
    if !assessment.tier.is_acceptable() {
        warn!(
            "Rejecting fix with accuracy {}m (tier {})",
            sample.accuracy, assessment.tier
        );
        let message = assessment
            .warning
            .unwrap_or_else(|| "GPS accuracy is too low.".to_string());
        return GpsValidationResult::rejected(message, Some(sample), Some(assessment.tier));
    }

    let mut validation = ValidationResult::valid();
    if let Some(warning) = assessment.warning {
        validation.push_warning(warning);
    }
    if sample.accuracy > max_accuracy_meters {
        validation.push_warning(format!(
            "Accuracy {}m exceeds the requested {}m.",
            sample.accuracy.round(),
            max_accuracy_meters
        ));
    }

    if validation.warnings.is_empty() {
        debug!("Accepted fix with {} accuracy", assessment.tier);
    } else {
        info!(
            "Accepted fix with {} accuracy ({}m) and {} warning(s)",
            assessment.tier,
            sample.accuracy.round(),
            validation.warnings.len()
        );
    }

    GpsValidationResult {
        success: true,
        sample: Some(sample),
        quality: Some(assessment.tier),
        requires_manual_selection: false,
        error: None,
        validation,
    }
}

/// Builds a sample from a manual location pick. Accuracy is 0 because the
/// user chose the point explicitly.
pub fn manual_sample(
    latitude: f64,
    longitude: f64,
    timestamp_millis: i64,
) -> Result<LocationSample, ValidationResult> {
    let sample = LocationSample::new(latitude, longitude, 0.0, timestamp_millis, SampleSource::Manual);
    let validation = validate_sample(&sample);
    if validation.is_valid {
        Ok(sample)
    } else {
        Err(validation)
    }
}
