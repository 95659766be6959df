//! Error types shared across the engine.
//!
//! None of these escape the public operations as `Err`; they are folded into
//! result values (`GpsValidationResult::error`, `GeocodeResult::error_message`)
//! so a caller always gets something usable back.

use thiserror::Error;

/// Structural problems with a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("coordinates must be finite numbers")]
    NotFinite,
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinates (0, 0) indicate a failed fix")]
    NullIsland,
}

/// Failures reported by a device location capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("Location permission denied. Please enable location access or pick the location manually.")]
    PermissionDenied,
    #[error("Location unavailable. Please check GPS settings or pick the location manually.")]
    PositionUnavailable,
    #[error("Location request timed out. Please try again or pick the location manually.")]
    Timeout,
    #[error("Location is not supported on this device: {0}")]
    Unsupported(String),
}

/// Failures talking to the geocoding provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("geocoding provider rejected the API key")]
    Unauthorized,
    #[error("geocoding provider rate limit exceeded")]
    RateLimited,
    #[error("geocoding provider unavailable (HTTP {0})")]
    Server(u16),
    #[error("geocoding provider returned HTTP {0}")]
    Status(u16),
    #[error("geocoding request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("no result for the requested location")]
    NotFound,
}

impl ProviderError {
    /// Maps a non-success HTTP status to the provider error taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ProviderError::Unauthorized,
            429 => ProviderError::RateLimited,
            404 => ProviderError::NotFound,
            500..=599 => ProviderError::Server(status),
            other => ProviderError::Status(other),
        }
    }
}
