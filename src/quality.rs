//! Accuracy tiers for position fixes.
//!
//! These thresholds are the single source of truth for both the capture
//! policy and anything that reports on sample quality.

use crate::coords::is_valid_coordinate;
use crate::models::LocationSample;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EXCELLENT_MAX_METERS: f64 = 10.0;
pub const GOOD_MAX_METERS: f64 = 50.0;
pub const FAIR_MAX_METERS: f64 = 100.0;
pub const POOR_MAX_METERS: f64 = 500.0;
/// Anything less accurate than this is unusable.
pub const VERY_POOR_MAX_METERS: f64 = 2000.0;

/// Ordered best to worst, so `tier <= QualityTier::Good` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
    Unusable,
}

impl QualityTier {
    /// Whether the capture policy accepts a fix of this tier.
    pub fn is_acceptable(self) -> bool {
        self != QualityTier::Unusable
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
            QualityTier::VeryPoor => "very poor",
            QualityTier::Unusable => "unusable",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub tier: QualityTier,
    pub warning: Option<String>,
}

/// Maps a reported accuracy radius to a tier and an optional warning.
///
/// Negative or non-finite accuracy is treated as unusable.
pub fn classify(accuracy_meters: f64) -> QualityAssessment {
    if !accuracy_meters.is_finite() || accuracy_meters < 0.0 {
        return QualityAssessment {
            tier: QualityTier::Unusable,
            warning: Some(format!(
                "Reported accuracy {} is not a valid measurement.",
                accuracy_meters
            )),
        };
    }

    let accuracy = accuracy_meters.round();
    let (tier, warning) = if accuracy_meters <= EXCELLENT_MAX_METERS {
        (QualityTier::Excellent, None)
    } else if accuracy_meters <= GOOD_MAX_METERS {
        (QualityTier::Good, None)
    } else if accuracy_meters <= FAIR_MAX_METERS {
        (
            QualityTier::Fair,
            Some(format!(
                "GPS accuracy is fair ({}m). Location may be slightly off.",
                accuracy
            )),
        )
    } else if accuracy_meters <= POOR_MAX_METERS {
        (
            QualityTier::Poor,
            Some(format!(
                "GPS accuracy is poor ({}m). Consider moving to an open area.",
                accuracy
            )),
        )
    } else if accuracy_meters <= VERY_POOR_MAX_METERS {
        (
            QualityTier::VeryPoor,
            Some(format!(
                "GPS accuracy is very poor ({}m). Location may be significantly off; verify before continuing.",
                accuracy
            )),
        )
    } else {
        (
            QualityTier::Unusable,
            Some(format!(
                "GPS accuracy is too low ({}m). Please select the location manually.",
                accuracy
            )),
        )
    };

    QualityAssessment { tier, warning }
}

/// Tier for a complete sample; structurally invalid coordinates are unusable
/// regardless of the reported accuracy.
pub fn classify_sample(sample: &LocationSample) -> QualityAssessment {
    if !is_valid_coordinate(sample.latitude, sample.longitude) {
        return QualityAssessment {
            tier: QualityTier::Unusable,
            warning: Some("Coordinates are invalid. Please select the location manually.".into()),
        };
    }
    classify(sample.accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleSource;
    use proptest::prelude::*;

    #[test]
    fn test_excellent() {
        let q = classify(5.0);
        assert_eq!(q.tier, QualityTier::Excellent);
        assert!(q.warning.is_none());
    }

    #[test]
    fn test_fair_has_warning() {
        let q = classify(75.0);
        assert_eq!(q.tier, QualityTier::Fair);
        assert!(q.warning.is_some());
    }

    #[test]
    fn test_unusable_above_cutoff() {
        assert_eq!(classify(2500.0).tier, QualityTier::Unusable);
        assert_eq!(classify(f64::NAN).tier, QualityTier::Unusable);
        assert_eq!(classify(-1.0).tier, QualityTier::Unusable);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(classify(10.0).tier, QualityTier::Excellent);
        assert_eq!(classify(50.0).tier, QualityTier::Good);
        assert_eq!(classify(100.0).tier, QualityTier::Fair);
        assert_eq!(classify(500.0).tier, QualityTier::Poor);
        assert_eq!(classify(2000.0).tier, QualityTier::VeryPoor);
        assert_eq!(classify(2000.1).tier, QualityTier::Unusable);
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(QualityTier::Excellent < QualityTier::Good);
        assert!(QualityTier::VeryPoor < QualityTier::Unusable);
        assert!(QualityTier::VeryPoor.is_acceptable());
        assert!(!QualityTier::Unusable.is_acceptable());
    }

    #[test]
    fn test_invalid_sample_is_unusable() {
        let sample = LocationSample::new(0.0, 0.0, 3.0, 0, SampleSource::Gps);
        assert_eq!(classify_sample(&sample).tier, QualityTier::Unusable);
    }

    proptest! {
        #[test]
        fn prop_classify_is_pure(accuracy in 0.0f64..5000.0) {
            prop_assert_eq!(classify(accuracy), classify(accuracy));
        }

        #[test]
        fn prop_tier_monotonic(a in 0.0f64..5000.0, b in 0.0f64..5000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo).tier <= classify(hi).tier);
        }
    }
}
