//! Great-circle distance and derived speed.

/// Mean Earth radius used for all haversine math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two lat/lng points in kilometers.
///
/// Total for finite input. NaN input yields NaN, so run the coordinate
/// sanity check first.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);

    // Rounding can push `a` a hair above 1 for near-antipodal points.
    // `clamp` keeps NaN as NaN.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Haversine distance in meters.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    distance_km(lat1, lng1, lat2, lng2) * 1000.0
}

/// Average speed over a window. Callers guard `elapsed_hours <= 0`.
pub fn speed_kmh(distance_km: f64, elapsed_hours: f64) -> f64 {
    distance_km / elapsed_hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mumbai_to_delhi() {
        let d = distance_km(19.0760, 72.8777, 28.7041, 77.1025);
        assert!(d > 1150.0 && d < 1165.0, "Expected ~1155 km, got {d}");
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(distance_km(12.9716, 77.5946, 12.9716, 77.5946), 0.0);
    }

    #[test]
    fn test_meters_matches_km() {
        let km = distance_km(18.5204, 73.8567, 19.0760, 72.8777);
        let m = distance_meters(18.5204, 73.8567, 19.0760, 72.8777);
        assert!((m - km * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_is_half_circumference() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((d - half).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(distance_km(f64::NAN, 0.0, 1.0, 1.0).is_nan());
        assert!(distance_km(1.0, 1.0, 2.0, f64::NAN).is_nan());
        assert!(distance_meters(f64::NAN, f64::NAN, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_speed() {
        assert_eq!(speed_kmh(300.0, 0.5), 600.0);
    }

    proptest! {
        #[test]
        fn prop_symmetric(
            lat1 in -90.0f64..=90.0, lng1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0, lng2 in -180.0f64..=180.0,
        ) {
            let ab = distance_km(lat1, lng1, lat2, lng2);
            let ba = distance_km(lat2, lng2, lat1, lng1);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_identity(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
            prop_assert_eq!(distance_km(lat, lng, lat, lng), 0.0);
        }

        #[test]
        fn prop_deterministic(
            lat1 in -90.0f64..=90.0, lng1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0, lng2 in -180.0f64..=180.0,
        ) {
            prop_assert_eq!(
                distance_km(lat1, lng1, lat2, lng2).to_bits(),
                distance_km(lat1, lng1, lat2, lng2).to_bits()
            );
        }
    }
}
