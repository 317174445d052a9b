//! MaxMind GeoIP Resolver
//!
//! Implements GeoResolver using a MaxMind GeoLite2 country database.

use crate::domain::errors::LookupError;
use crate::domain::ports::GeoResolver;
use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use maxminddb::{MaxMindDBError, Reader};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;

/// MaxMind GeoIP resolver.
///
/// Uses the MaxMind GeoLite2 database to resolve IP addresses
/// to country codes. The reader is memory resident, so lookups do not
/// block.
pub struct MaxMindGeoResolver {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindGeoResolver {
    /// Load a GeoIP database from a file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Database build metadata, for startup logging.
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

#[derive(Debug, Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountryResp {
    country: Option<Country>,
}

#[async_trait]
impl GeoResolver for MaxMindGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<Option<CountryCode>, LookupError> {
        let resp: CountryResp = match self.reader.lookup(ip) {
            Ok(resp) => resp,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(e) => return Err(LookupError::Unavailable(e.to_string())),
        };

        Ok(resp
            .country
            .and_then(|c| c.iso_code)
            .and_then(|iso| CountryCode::parse(&iso)))
    }
}
