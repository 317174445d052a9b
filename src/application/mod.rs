//! Application Layer
//!
//! Use cases that wire domain services to the outbound ports.

mod region_service;

pub use region_service::{RegionService, DEFAULT_LOOKUP_TIMEOUT};
