//! Region Resolver - country lookup service with hexagonal architecture
//!
//! This is the composition root that wires together all the components.

use region_resolver::adapters::inbound::{ApiServer, ApiState};
use region_resolver::adapters::outbound::{
    DashMapSignalStore, MaxMindGeoResolver, SqliteSignalStore,
};
use region_resolver::config::load_config;
use region_resolver::infrastructure::shutdown_signal;
use region_resolver::{CountryNames, GeoResolver, RegionService, RegionTable, SignalStore};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting region resolver listen={} lookup_timeout={}ms",
        cfg.listen_addr,
        cfg.lookup_timeout_ms
    );

    // ===== COMPOSITION ROOT =====

    // 1. Region table (embedded unless overridden)
    let table = match &cfg.mcc_table_path {
        Some(path) => {
            let table = RegionTable::from_file(path)?;
            tracing::info!("MCC table loaded from {} ({} codes)", path, table.len());
            table
        }
        None => {
            let table = RegionTable::embedded()?;
            tracing::info!("MCC table loaded (embedded, {} codes)", table.len());
            table
        }
    };

    let names = CountryNames::embedded()?;

    // 2. Signal store (SQLite shards or empty DashMap)
    let store: Arc<dyn SignalStore> = match &cfg.db_path {
        Some(path) => {
            let store = SqliteSignalStore::open(path)?;
            tracing::info!("signal shards opened from {}", path);
            Arc::new(store)
        }
        None => {
            tracing::warn!("no shard database configured, serving from an empty store");
            Arc::new(DashMapSignalStore::new())
        }
    };

    // 3. GeoIP resolver (MaxMind). A broken database disables IP lookup.
    let geo_resolver: Option<Arc<dyn GeoResolver>> = match &cfg.geoip_path {
        Some(path) => match MaxMindGeoResolver::from_file(path) {
            Ok(g) => {
                tracing::info!("GeoIP DB loaded from {} ({})", path, g.database_type());
                Some(Arc::new(g) as Arc<dyn GeoResolver>)
            }
            Err(e) => {
                tracing::error!("failed to load GeoIP DB from {}: {:?}", path, e);
                None
            }
        },
        None => {
            tracing::info!("no GeoIP DB configured, IP lookup disabled");
            None
        }
    };

    // 4. Application service
    let service = Arc::new(RegionService::new(
        store,
        geo_resolver,
        Arc::new(table),
        cfg.lookup_timeout(),
    ));

    // 5. Inbound adapter
    let server = ApiServer::new(
        cfg.listen_addr.clone(),
        ApiState::new(service, Arc::new(names), cfg.trust_forwarded),
    );
    server.run(shutdown_signal()).await
}
