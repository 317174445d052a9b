//! Region Service - Main application use case
//!
//! Orchestrates a resolution: coalescing observations, fetching every
//! source concurrently, and handing the evidence to source fusion. This is
//! the primary interface for the inbound adapter.

use crate::domain::entities::{Observation, ResolutionResult, SignalKey, SignalRecord};
use crate::domain::errors::LookupError;
use crate::domain::ports::{GeoResolver, SignalStore};
use crate::domain::services::{Evidence, RegionTable, SourceFusion, SourceOutcome};
use crate::domain::value_objects::{CountryCode, SignalKind};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a single store or IP lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(500);

/// Region service - main application use case.
///
/// This service orchestrates a resolution:
/// 1. Coalesces duplicate observations per signal kind (first wins)
/// 2. Reads bluetooth, wifi and cellular shards and the IP lookup concurrently
/// 3. Degrades a failed or timed-out read to an unavailable source
/// 4. Runs source fusion over the gathered evidence
///
/// It keeps no per-request state; one instance serves all requests.
pub struct RegionService {
    store: Arc<dyn SignalStore>,
    geo_resolver: Option<Arc<dyn GeoResolver>>,
    fusion: SourceFusion,
    lookup_timeout: Duration,
}

impl RegionService {
    /// Create a new region service.
    pub fn new(
        store: Arc<dyn SignalStore>,
        geo_resolver: Option<Arc<dyn GeoResolver>>,
        table: Arc<RegionTable>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            geo_resolver,
            fusion: SourceFusion::new(table),
            lookup_timeout,
        }
    }

    /// Resolve the region for a set of observations and a client IP.
    ///
    /// Never fails: sources that cannot be read are skipped and a
    /// resolution with no usable evidence is simply not found. Dropping the
    /// returned future cancels every outstanding sub-lookup.
    pub async fn resolve(
        &self,
        observations: &[Observation],
        client_ip: Option<IpAddr>,
    ) -> ResolutionResult {
        let [bluetooth_keys, wifi_keys, cell_keys] = Self::partition(observations);

        let (bluetooth, wifi, cellular, ip) = tokio::join!(
            self.fetch(SignalKind::Bluetooth, bluetooth_keys),
            self.fetch(SignalKind::Wifi, wifi_keys),
            self.fetch(SignalKind::Cellular, cell_keys),
            self.lookup_ip(client_ip),
        );

        let evidence = Evidence {
            bluetooth,
            wifi,
            cellular,
            ip,
        };
        let result = self.fusion.fuse(&evidence);

        tracing::debug!(
            "resolved observations={} ip={:?} -> region={:?} fallback={}",
            observations.len(),
            client_ip,
            result.region,
            result.fallback
        );

        result
    }

    /// Split observations into per-kind key lists, dropping repeated keys.
    fn partition(observations: &[Observation]) -> [Vec<SignalKey>; 3] {
        let mut seen = HashSet::with_capacity(observations.len());
        let mut keys: [Vec<SignalKey>; 3] = Default::default();

        for observation in observations {
            if !seen.insert((observation.kind(), observation.key())) {
                continue;
            }
            let slot = match observation.kind() {
                SignalKind::Bluetooth => 0,
                SignalKind::Wifi => 1,
                SignalKind::Cellular => 2,
            };
            keys[slot].push(observation.key());
        }

        keys
    }

    /// Read one shard, bounded by the lookup timeout.
    async fn fetch(
        &self,
        kind: SignalKind,
        keys: Vec<SignalKey>,
    ) -> SourceOutcome<Vec<SignalRecord>> {
        if keys.is_empty() {
            return SourceOutcome::Available(Vec::new());
        }

        let lookup = self.store.lookup(kind, &keys);
        match self.bounded(lookup).await {
            Ok(records) => {
                tracing::debug!("{} lookup: {} keys, {} records", kind, keys.len(), records.len());
                SourceOutcome::Available(records)
            }
            Err(e) => {
                tracing::warn!("{} lookup degraded: {}", kind, e);
                SourceOutcome::Unavailable
            }
        }
    }

    /// Resolve the client IP, bounded by the lookup timeout.
    async fn lookup_ip(&self, client_ip: Option<IpAddr>) -> SourceOutcome<Option<CountryCode>> {
        let (Some(ip), Some(resolver)) = (client_ip, self.geo_resolver.as_ref()) else {
            return SourceOutcome::Available(None);
        };

        match self.bounded(resolver.resolve(ip)).await {
            Ok(region) => SourceOutcome::Available(region),
            Err(e) => {
                tracing::warn!("ip lookup degraded for {}: {}", ip, e);
                SourceOutcome::Unavailable
            }
        }
    }

    async fn bounded<T, F>(&self, lookup: F) -> Result<T, LookupError>
    where
        F: std::future::Future<Output = Result<T, LookupError>>,
    {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.lookup_timeout)),
        }
    }

    /// The region table this service resolves against.
    pub fn region_table(&self) -> &RegionTable {
        self.fusion.table()
    }

    pub fn has_geo_resolver(&self) -> bool {
        self.geo_resolver.is_some()
    }
}
