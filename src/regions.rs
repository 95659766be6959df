//! Service regions and the country query window.
//!
//! The registry is built once at startup, either from the built-in metro table
//! or from a CSV file, and shared read-only behind an `Arc` afterwards.

use crate::distance::distance_km;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Degrees added around a region center when building a provider window.
pub const DEFAULT_BBOX_BUFFER_DEG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }

    /// Nominatim-style `viewbox` value: `left,top,right,bottom`.
    pub fn viewbox(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lng, self.max_lat, self.max_lng, self.min_lat
        )
    }
}

/// India, used as the default provider window.
pub const INDIA_BOUNDING_BOX: BoundingBox = BoundingBox {
    min_lat: 6.5,
    max_lat: 37.5,
    min_lng: 68.0,
    max_lng: 97.5,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_km: f64,
}

impl Region {
    pub fn new(name: &str, center_lat: f64, center_lng: f64, radius_km: f64) -> Self {
        Self {
            name: name.to_string(),
            center_lat,
            center_lng,
            radius_km,
        }
    }
}

// name, lat, lng, radius km
const BUILTIN_REGIONS: &[(&str, f64, f64, f64)] = &[
    ("Mumbai", 19.0760, 72.8777, 50.0),
    ("Delhi", 28.7041, 77.1025, 50.0),
    ("Bengaluru", 12.9716, 77.5946, 40.0),
    ("Chennai", 13.0827, 80.2707, 40.0),
    ("Kolkata", 22.5726, 88.3639, 40.0),
    ("Hyderabad", 17.3850, 78.4867, 40.0),
    ("Pune", 18.5204, 73.8567, 30.0),
    ("Ahmedabad", 23.0225, 72.5714, 30.0),
];

#[derive(Debug, Clone)]
pub struct RegionRegistry {
    // keyed by lowercase name
    regions: HashMap<String, Region>,
    country_box: BoundingBox,
    buffer_deg: f64,
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RegionRegistry {
    pub fn new(regions: Vec<Region>, country_box: BoundingBox, buffer_deg: f64) -> Self {
        let regions = regions
            .into_iter()
            .map(|r| (r.name.to_lowercase(), r))
            .collect();

        Self {
            regions,
            country_box,
            buffer_deg,
        }
    }

    /// The compiled-in metro table with the India country window.
    pub fn builtin() -> Self {
        Self::builtin_with(INDIA_BOUNDING_BOX, DEFAULT_BBOX_BUFFER_DEG)
    }

    /// The compiled-in metro table with a deployment's own window settings.
    pub fn builtin_with(country_box: BoundingBox, buffer_deg: f64) -> Self {
        let regions = BUILTIN_REGIONS
            .iter()
            .map(|&(name, lat, lng, radius)| Region::new(name, lat, lng, radius))
            .collect();

        Self::new(regions, country_box, buffer_deg)
    }

    /// Loads regions from a CSV file with `name,center_lat,center_lng,radius_km`
    /// columns. Header lookup is case-insensitive; malformed rows are skipped.
    pub fn from_csv(
        path: impl AsRef<Path>,
        country_box: BoundingBox,
        buffer_deg: f64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .wrap_err_with(|| format!("Failed to open region table '{}'", path.display()))?;

        let headers = rdr
            .headers()
            .wrap_err("Failed to read region table headers")?
            .clone();

        let find_col = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(name)
            })
        };

        let column = |name: &str| {
            find_col(name).ok_or_else(|| {
                eyre!(
                    "Region table is missing '{}' column. Headers found: {:?}",
                    name,
                    headers
                )
            })
        };

        let idx_name = column("name")?;
        let idx_lat = column("center_lat")?;
        let idx_lng = column("center_lng")?;
        let idx_radius = column("radius_km")?;

        let mut regions = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping unreadable region row {}: {}", line + 2, e);
                    continue;
                }
            };

            let field = |idx: usize| record.get(idx).unwrap_or("");
            let name = field(idx_name);
            let parsed = (
                field(idx_lat).parse::<f64>(),
                field(idx_lng).parse::<f64>(),
                field(idx_radius).parse::<f64>(),
            );

            match parsed {
                (Ok(lat), Ok(lng), Ok(radius))
                    if !name.is_empty()
                        && crate::coords::is_valid_coordinate(lat, lng)
                        && radius > 0.0 =>
                {
                    regions.push(Region::new(name, lat, lng, radius));
                }
                _ => warn!("Skipping invalid region row {}: {:?}", line + 2, record),
            }
        }

        info!(
            "Loaded {} regions from '{}'",
            regions.len(),
            path.display()
        );
        Ok(Self::new(regions, country_box, buffer_deg))
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn country_box(&self) -> BoundingBox {
        self.country_box
    }

    /// Provider search window for a region: its center plus the fixed buffer.
    pub fn bounds(&self, region: &Region) -> BoundingBox {
        BoundingBox {
            min_lat: region.center_lat - self.buffer_deg,
            max_lat: region.center_lat + self.buffer_deg,
            min_lng: region.center_lng - self.buffer_deg,
            max_lng: region.center_lng + self.buffer_deg,
        }
    }

    /// Window for an optional region hint, falling back to the country box.
    pub fn query_box(&self, hint: Option<&str>) -> BoundingBox {
        match hint.and_then(|h| self.get(h)) {
            Some(region) => self.bounds(region),
            None => self.country_box,
        }
    }

    pub fn is_within(&self, region: &Region, lat: f64, lng: f64) -> bool {
        distance_km(region.center_lat, region.center_lng, lat, lng) <= region.radius_km
    }

    /// The nearest region whose radius covers the point, if any.
    pub fn containing(&self, lat: f64, lng: f64) -> Option<&Region> {
        self.regions
            .values()
            .map(|r| (r, distance_km(r.center_lat, r.center_lng, lat, lng)))
            .filter(|(r, d)| *d <= r.radius_km)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, _)| r)
    }
}
