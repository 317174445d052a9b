//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Country code (ISO 3166-1 alpha-2), always upper case.
///
/// Ordering is lexicographic and is what the score aggregator falls back
/// to when two regions tie exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code, normalizing to upper case.
    ///
    /// # Examples
    /// ```
    /// use region_resolver::CountryCode;
    ///
    /// assert_eq!(CountryCode::parse("gb").unwrap().as_str(), "GB");
    /// assert!(CountryCode::parse("GBR").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(s.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid country code: {:?}", value))
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// Kind of radio signal an observation or stored record belongs to.
///
/// Each kind is backed by its own logical shard in the signal store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Bluetooth,
    Wifi,
    Cellular,
}

impl SignalKind {
    /// All kinds, highest trust first.
    pub const ALL: [SignalKind; 3] = [Self::Bluetooth, Self::Wifi, Self::Cellular];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Wifi => "wifi",
            Self::Cellular => "cellular",
        }
    }

    /// Short-range kinds carry no mobile country code and are trusted outright.
    pub fn is_short_range(&self) -> bool {
        matches!(self, Self::Bluetooth | Self::Wifi)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a resolution had to lean on IP geolocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Fallback {
    /// A radio source decided the region on its own.
    #[default]
    #[serde(rename = "none")]
    None,
    /// The region came from, or was confirmed by, the IP lookup.
    #[serde(rename = "ipf")]
    Ipf,
}

impl Fallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ipf => "ipf",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== CountryCode Tests =====

    #[test]
    fn test_country_code_parse_normalizes_case() {
        let tests = vec![("gb", "GB"), ("De", "DE"), ("US", "US"), (" fr ", "FR")];

        for (input, expected) in tests {
            assert_eq!(
                CountryCode::parse(input).map(|c| c.as_str().to_string()),
                Some(expected.to_string()),
                "Failed for input: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_country_code_parse_rejects_invalid() {
        let invalid_inputs = vec!["", "G", "GBR", "12", "G1", "??"];

        for input in invalid_inputs {
            assert!(
                CountryCode::parse(input).is_none(),
                "Should reject input: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_country_code_ordering_is_lexicographic() {
        let mut codes = vec![
            CountryCode::parse("US").unwrap(),
            CountryCode::parse("DE").unwrap(),
            CountryCode::parse("GB").unwrap(),
        ];
        codes.sort();

        let sorted: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(sorted, vec!["DE", "GB", "US"]);
    }

    #[test]
    fn test_country_code_serde() {
        let code = CountryCode::parse("jp").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"JP\"");

        let parsed: CountryCode = serde_json::from_str("\"se\"").unwrap();
        assert_eq!(parsed.as_str(), "SE");

        assert!(serde_json::from_str::<CountryCode>("\"SWE\"").is_err());
    }

    #[test]
    fn test_country_code_display() {
        assert_eq!(format!("{}", CountryCode::parse("br").unwrap()), "BR");
    }

    // ===== SignalKind Tests =====

    #[test]
    fn test_signal_kind_priority_order() {
        assert_eq!(
            SignalKind::ALL,
            [SignalKind::Bluetooth, SignalKind::Wifi, SignalKind::Cellular]
        );
    }

    #[test]
    fn test_signal_kind_short_range() {
        assert!(SignalKind::Bluetooth.is_short_range());
        assert!(SignalKind::Wifi.is_short_range());
        assert!(!SignalKind::Cellular.is_short_range());
    }

    #[test]
    fn test_signal_kind_display() {
        assert_eq!(format!("{}", SignalKind::Bluetooth), "bluetooth");
        assert_eq!(format!("{}", SignalKind::Wifi), "wifi");
        assert_eq!(format!("{}", SignalKind::Cellular), "cellular");
    }

    // ===== Fallback Tests =====

    #[test]
    fn test_fallback_default_is_none() {
        assert_eq!(Fallback::default(), Fallback::None);
        assert!(Fallback::default().is_none());
        assert!(!Fallback::Ipf.is_none());
    }

    #[test]
    fn test_fallback_serializes_wire_names() {
        assert_eq!(serde_json::to_string(&Fallback::Ipf).unwrap(), "\"ipf\"");
        assert_eq!(serde_json::to_string(&Fallback::None).unwrap(), "\"none\"");
    }
}
