mod dashmap_signal_store;
mod maxmind_geo_resolver;
mod sqlite_signal_store;

pub use dashmap_signal_store::DashMapSignalStore;
pub use maxmind_geo_resolver::MaxMindGeoResolver;
pub use sqlite_signal_store::SqliteSignalStore;
