//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of region resolution.
//! They have no external dependencies and contain only business logic.

use crate::domain::value_objects::{CountryCode, Fallback, SignalKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// 48-bit hardware address of a Bluetooth beacon or Wi-Fi access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Parse `01:23:45:67:89:ab`, `01-23-45-67-89-ab` or `0123456789ab`.
    pub fn parse(s: &str) -> Option<Self> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// All-zero and broadcast addresses never identify a real station.
    pub fn is_valid_station(&self) -> bool {
        self.0 != [0u8; 6] && self.0 != [0xffu8; 6]
    }
}

impl fmt::Display for MacAddr {
    /// Formats as 12 lowercase hex digits, the form shard tables key on.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Radio technology of a cell tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radio {
    Gsm,
    Wcdma,
    Lte,
}

impl Radio {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gsm" => Some(Self::Gsm),
            "wcdma" | "umts" => Some(Self::Wcdma),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Numeric code used by the cell shard table.
    pub fn code(&self) -> i64 {
        match self {
            Self::Gsm => 0,
            Self::Wcdma => 2,
            Self::Lte => 3,
        }
    }
}

/// Identity of a cell tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub radio: Radio,
    /// Mobile country code
    pub mcc: u16,
    /// Mobile network code
    pub mnc: u16,
    /// Location/tracking area code
    pub lac: u32,
    pub cid: u64,
}

impl CellId {
    pub fn new(radio: Radio, mcc: u16, mnc: u16, lac: u32, cid: u64) -> Self {
        Self {
            radio,
            mcc,
            mnc,
            lac,
            cid,
        }
    }
}

/// Key identifying one stored record within its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKey {
    Mac(MacAddr),
    Cell(CellId),
}

impl SignalKey {
    /// Mobile country code, for cell keys only.
    pub fn mcc(&self) -> Option<u16> {
        match self {
            Self::Cell(cell) => Some(cell.mcc),
            Self::Mac(_) => None,
        }
    }
}

/// A single signal seen by the device in this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    kind: SignalKind,
    key: SignalKey,
}

impl Observation {
    pub fn bluetooth(mac: MacAddr) -> Self {
        Self {
            kind: SignalKind::Bluetooth,
            key: SignalKey::Mac(mac),
        }
    }

    pub fn wifi(mac: MacAddr) -> Self {
        Self {
            kind: SignalKind::Wifi,
            key: SignalKey::Mac(mac),
        }
    }

    pub fn cell(cell: CellId) -> Self {
        Self {
            kind: SignalKind::Cellular,
            key: SignalKey::Cell(cell),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn key(&self) -> SignalKey {
        self.key
    }
}

/// Snapshot of what the store knows about one station or tower.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub key: SignalKey,
    /// Region the record was last placed in, if ever resolved
    pub region: Option<CountryCode>,
    /// Number of independent sightings accumulated so far
    pub samples: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl SignalRecord {
    /// Create a record stamped with the current time.
    pub fn new(key: SignalKey, region: Option<CountryCode>, samples: u64) -> Self {
        let now = SystemTime::now();
        Self {
            key,
            region,
            samples,
            created: now,
            modified: now,
        }
    }
}

/// One signal type's aggregated opinion about the region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionVote {
    pub region: CountryCode,
    /// Summed sample count of the winning group
    pub weight: f64,
    pub kind: SignalKind,
}

/// Final answer of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolutionResult {
    /// Resolved region, `None` when nothing could be determined
    pub region: Option<CountryCode>,
    pub fallback: Fallback,
}

impl ResolutionResult {
    pub fn found(region: CountryCode, fallback: Fallback) -> Self {
        Self {
            region: Some(region),
            fallback,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}
