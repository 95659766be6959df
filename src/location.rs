//! Device-side [`LocationSource`] adapters.
//!
//! [`IpLocationSource`] resolves a coarse network position through IP
//! geolocation (IpApi), labelled `Network`. [`FixedLocationSource`] reports a
//! configured point, labelled `Manual`, for hosts without any positioning
//! hardware.

use crate::capture::{Fix, LocationSource, PositionRequest};
use crate::error::PositionError;
use crate::models::SampleSource;
use async_trait::async_trait;
use chrono::Utc;
use ipgeolocate::{Locator, Service};
use std::time::Duration;
use tracing::{error, info};

/// IP lookups are city-level at best.
pub const DEFAULT_IP_ACCURACY_METERS: f64 = 2000.0;

pub struct IpLocationSource {
    ip: String,
    accuracy_meters: f64,
}

impl IpLocationSource {
    /// # Arguments
    ///
    /// * `ip` - Address to geolocate, usually the host's public address.
    /// * `accuracy_meters` - Accuracy radius reported for every fix, since the
    ///   lookup service does not provide one.
    pub fn new(ip: &str, accuracy_meters: f64) -> Self {
        Self {
            ip: ip.to_string(),
            accuracy_meters,
        }
    }
}

#[async_trait]
impl LocationSource for IpLocationSource {
    /// Looks up the configured IP address.
    ///
    /// Service failures map to `PositionUnavailable`; unparseable coordinates
    /// in the response do too, rather than defaulting to some fixed point.
    async fn current_position(&self, request: &PositionRequest) -> Result<Fix, PositionError> {
        let lookup = Locator::get(&self.ip, Service::IpApi);
        let loc = match tokio::time::timeout(Duration::from_millis(request.timeout_ms), lookup).await
        {
            Ok(Ok(loc)) => loc,
            Ok(Err(e)) => {
                error!("Error using geolocation service: {}", e);
                return Err(PositionError::PositionUnavailable);
            }
            Err(_) => return Err(PositionError::Timeout),
        };

        let (Ok(latitude), Ok(longitude)) = (loc.latitude.parse::<f64>(), loc.longitude.parse::<f64>())
        else {
            error!(
                "Geolocation returned unparseable coordinates ({}, {})",
                loc.latitude, loc.longitude
            );
            return Err(PositionError::PositionUnavailable);
        };

        info!("Geolocation successful - ({}, {}) near {}", latitude, longitude, loc.city);
        Ok(Fix {
            latitude,
            longitude,
            accuracy: self.accuracy_meters,
            timestamp_millis: Utc::now().timestamp_millis(),
        })
    }

    fn kind(&self) -> SampleSource {
        SampleSource::Network
    }
}

/// Always reports the same point; stamped with the current time.
pub struct FixedLocationSource {
    latitude: f64,
    longitude: f64,
}

impl FixedLocationSource {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_position(&self, _request: &PositionRequest) -> Result<Fix, PositionError> {
        Ok(Fix {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: 0.0,
            timestamp_millis: Utc::now().timestamp_millis(),
        })
    }

    fn kind(&self) -> SampleSource {
        SampleSource::Manual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{capture_location, CaptureConfig};
    use crate::quality::QualityTier;

    #[tokio::test]
    async fn test_fixed_source_is_accepted_as_manual() {
        let source = FixedLocationSource::new(18.5204, 73.8567);
        let result = capture_location(&source, &CaptureConfig::default()).await;

        assert!(result.success);
        let sample = result.sample.unwrap();
        assert_eq!(sample.source, SampleSource::Manual);
        assert_eq!(result.quality, Some(QualityTier::Excellent));
        assert!(sample.timestamp_millis > 0);
    }

    #[tokio::test]
    async fn test_fixed_source_at_null_island_rejected() {
        let source = FixedLocationSource::new(0.0, 0.0);
        let result = capture_location(&source, &CaptureConfig::default()).await;

        assert!(!result.success);
        assert!(result.requires_manual_selection);
    }

    #[test]
    fn test_ip_source_labels_network() {
        let source = IpLocationSource::new("1.1.1.1", DEFAULT_IP_ACCURACY_METERS);
        assert_eq!(source.kind(), SampleSource::Network);
    }
}
