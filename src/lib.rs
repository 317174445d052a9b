//! Region Resolver Library
//!
//! Resolves the country a device is in from the radio signals it observes
//! (Bluetooth beacons, Wi-Fi access points, cell towers) and its IP address.
//! Exposed as a library for integration tests and embedding.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{RegionService, DEFAULT_LOOKUP_TIMEOUT};
pub use config::load_config;
pub use domain::entities::{
    CellId, MacAddr, Observation, Radio, RegionVote, ResolutionResult, SignalKey, SignalRecord,
};
pub use domain::errors::LookupError;
pub use domain::ports::{GeoResolver, SignalStore};
pub use domain::services::{CountryNames, RegionTable, ScoreAggregator, SourceFusion};
pub use domain::value_objects::{CountryCode, Fallback, SignalKind};
