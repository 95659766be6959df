use serde::{Deserialize, Serialize};

/// Where a [`LocationSample`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SampleSource {
    Gps,
    Manual,
    Network,
}

/// A single time-stamped position reading.
///
/// Samples are plain values: the capture policy or a manual address pick
/// creates them and nothing mutates them afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy radius in meters.
    pub accuracy: f64,
    pub timestamp_millis: i64,
    pub source: SampleSource,
}

impl LocationSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        timestamp_millis: i64,
        source: SampleSource,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp_millis,
            source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(error.into());
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpResult {
    pub is_unrealistic: bool,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub time_elapsed_hours: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeocodeSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateValidation {
    pub is_valid: bool,
    pub distance_from_input_km: Option<f64>,
    pub warnings: Vec<String>,
}

/// Outcome of an address lookup. Always usable: on provider trouble the
/// address is the formatted input coordinates and `source` is `Fallback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub address: Option<String>,
    pub source: GeocodeSource,
    pub error_message: Option<String>,
    pub coordinate_validation: CoordinateValidation,
}
