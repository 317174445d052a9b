//! GeoIP Resolver Port
//!
//! Defines the interface for resolving IP addresses to countries.

use crate::domain::errors::LookupError;
use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use std::net::IpAddr;

/// Resolver for IP address to country.
///
/// This is an outbound port that abstracts the GeoIP database.
/// Implementations may use MaxMind GeoLite2, IP2Location, or other databases.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolve an IP address to its country.
    ///
    /// Returns `Ok(None)` when the database has no entry for the IP
    /// (private, loopback and reserved ranges included).
    async fn resolve(&self, ip: IpAddr) -> Result<Option<CountryCode>, LookupError>;
}
