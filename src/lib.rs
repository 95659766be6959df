//! Location trust and reconciliation for field-service check-ins.
//!
//! Turns raw device fixes into accept/warn/reject decisions, flags impossible
//! travel between samples, and cross-checks reverse-geocoded addresses against
//! the coordinates they came from. Everything here is stateless apart from the
//! read-only [`regions::RegionRegistry`]; see [`engine::LocationEngine`] for
//! the entry points.

pub mod api;
pub mod capture;
pub mod config;
pub mod coords;
pub mod distance;
pub mod engine;
pub mod error;
pub mod geocode;
pub mod jump;
pub mod location;
pub mod logging;
pub mod models;
pub mod quality;
pub mod regions;
