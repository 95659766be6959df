//! Impossible-travel detection between two samples.
//!
//! The detector is stateless: callers pass both samples explicitly and decide
//! for themselves whether a flagged jump warns or blocks.

use crate::coords::check_coordinate;
use crate::distance::{distance_km, speed_kmh};
use crate::models::{JumpResult, LocationSample};
use tracing::{debug, warn};

pub const DEFAULT_MAX_SPEED_KMH: f64 = 200.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Flags movement between `prev` and `next` faster than `max_speed_kmh`.
///
/// Zero or negative elapsed time is never a jump, so clock skew does not
/// produce false positives.
pub fn detect_jump(prev: &LocationSample, next: &LocationSample, max_speed_kmh: f64) -> JumpResult {
    // Subtract in f64: the i64 difference can overflow for extreme stamps.
    let time_elapsed_hours =
        (next.timestamp_millis as f64 - prev.timestamp_millis as f64) / MILLIS_PER_HOUR;

    let invalid = check_coordinate(prev.latitude, prev.longitude)
        .and_then(|_| check_coordinate(next.latitude, next.longitude))
        .err();
    if let Some(e) = invalid {
        debug!("Skipping jump check: {}", e);
        return JumpResult {
            is_unrealistic: false,
            distance_km: 0.0,
            speed_kmh: 0.0,
            time_elapsed_hours,
            reason: Some(format!("cannot evaluate movement: {}", e)),
        };
    }

    let distance = distance_km(prev.latitude, prev.longitude, next.latitude, next.longitude);

    if time_elapsed_hours <= 0.0 {
        return JumpResult {
            is_unrealistic: false,
            distance_km: distance,
            speed_kmh: 0.0,
            time_elapsed_hours,
            reason: None,
        };
    }

    let speed = speed_kmh(distance, time_elapsed_hours);
    let is_unrealistic = speed > max_speed_kmh;

    let reason = if is_unrealistic {
        let reason = format!(
            "implied speed {:.0} km/h over {} exceeds {:.0} km/h ({:.1} km)",
            speed,
            format_elapsed(time_elapsed_hours),
            max_speed_kmh,
            distance
        );
        warn!("Location jump detected: {}", reason);
        Some(reason)
    } else {
        None
    };

    JumpResult {
        is_unrealistic,
        distance_km: distance,
        speed_kmh: speed,
        time_elapsed_hours,
        reason,
    }
}

fn format_elapsed(hours: f64) -> String {
    let minutes = hours * 60.0;
    if minutes < 1.0 {
        format!("{:.0} s", minutes * 60.0)
    } else if minutes < 120.0 {
        format!("{:.0} min", minutes)
    } else {
        format!("{:.1} h", hours)
    }
}

/// Detector bound to a deployment's speed cap.
#[derive(Debug, Clone, Copy)]
pub struct JumpDetector {
    max_speed_kmh: f64,
}

impl Default for JumpDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPEED_KMH)
    }
}

impl JumpDetector {
    pub fn new(max_speed_kmh: f64) -> Self {
        Self { max_speed_kmh }
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    /// Uses the override when given, else the configured cap.
    pub fn detect(
        &self,
        prev: &LocationSample,
        next: &LocationSample,
        max_speed_kmh: Option<f64>,
    ) -> JumpResult {
        detect_jump(prev, next, max_speed_kmh.unwrap_or(self.max_speed_kmh))
    }
}
