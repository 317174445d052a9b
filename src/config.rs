use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// SQLite shard database. Unset serves from an empty in-memory store.
    pub db_path: Option<String>,
    pub geoip_path: Option<String>,
    /// MCC table override. Unset uses the embedded table.
    pub mcc_table_path: Option<String>,
    pub lookup_timeout_ms: u64,
    pub trust_forwarded: bool,
    pub debug: bool,
}

impl Config {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            db_path: None,
            geoip_path: None,
            mcc_table_path: None,
            lookup_timeout_ms: 500,
            trust_forwarded: true,
            debug: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Build the config from an arbitrary variable source.
fn load_config_from<F>(var: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = var("REGION_RESOLVER_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let db_path = var("REGION_RESOLVER_DB_PATH").filter(|v| !v.is_empty());
    let geoip_path = var("REGION_RESOLVER_GEOIP_PATH").filter(|v| !v.is_empty());
    let mcc_table_path = var("REGION_RESOLVER_MCC_TABLE_PATH").filter(|v| !v.is_empty());

    let lookup_timeout_ms = var("REGION_RESOLVER_LOOKUP_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(defaults.lookup_timeout_ms);

    let trust_forwarded = var("REGION_RESOLVER_TRUST_FORWARDED")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(defaults.trust_forwarded);

    let debug = var("DEBUG").is_some();

    Ok(Config {
        listen_addr,
        db_path,
        geoip_path,
        mcc_table_path,
        lookup_timeout_ms,
        trust_forwarded,
        debug,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8000");
        assert!(cfg.db_path.is_none());
        assert!(cfg.trust_forwarded);
        assert_eq!(cfg.lookup_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_config_defaults() {
        let cfg = load_with(&[]);
        assert_eq!(cfg.listen_addr, "0.0.0.0:8000");
        assert!(cfg.geoip_path.is_none());
        assert!(cfg.mcc_table_path.is_none());
        assert_eq!(cfg.lookup_timeout_ms, 500);
        assert!(!cfg.debug);
    }

    #[test]
    fn test_load_config_with_paths() {
        let cfg = load_with(&[
            ("REGION_RESOLVER_DB_PATH", "/data/shards.db"),
            ("REGION_RESOLVER_GEOIP_PATH", "/data/GeoLite2-Country.mmdb"),
            ("REGION_RESOLVER_MCC_TABLE_PATH", "/data/mcc.json"),
        ]);
        assert_eq!(cfg.db_path.as_deref(), Some("/data/shards.db"));
        assert_eq!(cfg.geoip_path.as_deref(), Some("/data/GeoLite2-Country.mmdb"));
        assert_eq!(cfg.mcc_table_path.as_deref(), Some("/data/mcc.json"));
    }

    #[test]
    fn test_empty_paths_are_unset() {
        let cfg = load_with(&[("REGION_RESOLVER_DB_PATH", "")]);
        assert!(cfg.db_path.is_none());
    }

    #[test]
    fn test_load_config_with_custom_listen_addr() {
        let cfg = load_with(&[("REGION_RESOLVER_LISTEN_ADDR", "127.0.0.1:9000")]);
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_load_config_with_lookup_timeout() {
        let cfg = load_with(&[("REGION_RESOLVER_LOOKUP_TIMEOUT_MS", "250")]);
        assert_eq!(cfg.lookup_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_config_parse_error_uses_default() {
        let cfg = load_with(&[("REGION_RESOLVER_LOOKUP_TIMEOUT_MS", "not_a_number")]);
        assert_eq!(cfg.lookup_timeout_ms, 500);

        let cfg = load_with(&[("REGION_RESOLVER_LOOKUP_TIMEOUT_MS", "0")]);
        assert_eq!(cfg.lookup_timeout_ms, 500);
    }

    #[test]
    fn test_trust_forwarded_flag() {
        assert!(!load_with(&[("REGION_RESOLVER_TRUST_FORWARDED", "false")]).trust_forwarded);
        assert!(!load_with(&[("REGION_RESOLVER_TRUST_FORWARDED", "0")]).trust_forwarded);
        assert!(load_with(&[("REGION_RESOLVER_TRUST_FORWARDED", "TRUE")]).trust_forwarded);
        assert!(load_with(&[("REGION_RESOLVER_TRUST_FORWARDED", "1")]).trust_forwarded);
    }

    #[test]
    fn test_load_config_with_debug() {
        let cfg = load_with(&[("DEBUG", "1")]);
        assert!(cfg.debug);
    }

    #[test]
    fn test_load_config_reads_environment() {
        std::env::set_var("REGION_RESOLVER_GEOIP_PATH", "/path/to/GeoLite2.mmdb");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.geoip_path, Some("/path/to/GeoLite2.mmdb".to_string()));
        std::env::remove_var("REGION_RESOLVER_GEOIP_PATH");
    }

    #[test]
    fn test_config_debug() {
        let cfg = Config::default();
        let debug_str = format!("{:?}", cfg);
        assert!(debug_str.contains("listen_addr"));
        assert!(debug_str.contains("0.0.0.0:8000"));
    }
}
