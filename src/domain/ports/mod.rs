mod geo_resolver;
mod signal_store;

pub use geo_resolver::GeoResolver;
pub use signal_store::SignalStore;
