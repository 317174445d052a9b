//! Region Mapping Table
//!
//! Static reference data mapping mobile country codes to the countries they
//! may belong to. Loaded once at start and shared read-only afterwards.

use crate::domain::value_objects::CountryCode;
use std::collections::{BTreeSet, HashMap};

/// Mapping shipped with the binary.
const EMBEDDED_MCC_TABLE: &str = include_str!("../../../data/mcc_regions.json");

/// Reference data that failed validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegionTableError {
    #[error("malformed mapping document: {0}")]
    Malformed(String),
    #[error("invalid mobile country code {0:?}")]
    InvalidMcc(String),
    #[error("mobile country code {0} has no candidate countries")]
    NoCandidates(u16),
    #[error("mobile country code {mcc} lists invalid country {country:?}")]
    InvalidCountry { mcc: u16, country: String },
}

/// Mobile country code to candidate countries.
///
/// Every entry holds at least one candidate. More than one candidate means
/// the code is genuinely shared (e.g. 234 covers GB and the Crown
/// Dependencies). Candidates are kept sorted.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    entries: HashMap<u16, Vec<CountryCode>>,
}

impl RegionTable {
    /// Load the table embedded in the binary.
    pub fn embedded() -> anyhow::Result<Self> {
        Ok(Self::from_json(EMBEDDED_MCC_TABLE)?)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&raw)?)
    }

    /// Parse a `{"mcc": ["CC", ...]}` document.
    pub fn from_json(raw: &str) -> Result<Self, RegionTableError> {
        let doc: HashMap<String, Vec<String>> =
            serde_json::from_str(raw).map_err(|e| RegionTableError::Malformed(e.to_string()))?;

        let mut entries = HashMap::with_capacity(doc.len());
        for (key, countries) in doc {
            let mcc: u16 = key
                .trim()
                .parse()
                .ok()
                .filter(|m| (1..=999).contains(m))
                .ok_or_else(|| RegionTableError::InvalidMcc(key.clone()))?;

            let mut candidates = BTreeSet::new();
            for country in countries {
                let code = CountryCode::parse(&country)
                    .ok_or(RegionTableError::InvalidCountry { mcc, country })?;
                candidates.insert(code);
            }
            if candidates.is_empty() {
                return Err(RegionTableError::NoCandidates(mcc));
            }

            entries.insert(mcc, candidates.into_iter().collect());
        }

        Ok(Self { entries })
    }

    /// Candidate countries for a mobile country code; empty when unknown.
    pub fn candidates(&self, mcc: u16) -> &[CountryCode] {
        self.entries.get(&mcc).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_ambiguous(&self, mcc: u16) -> bool {
        self.candidates(mcc).len() > 1
    }

    /// The one country every given code could belong to, if exactly one.
    ///
    /// An unknown code contributes an empty candidate set and so rules out
    /// any common country.
    pub fn common_country<I>(&self, mccs: I) -> Option<CountryCode>
    where
        I: IntoIterator<Item = u16>,
    {
        let mut common: Option<BTreeSet<&CountryCode>> = None;
        for mcc in mccs {
            let candidates: BTreeSet<&CountryCode> = self.candidates(mcc).iter().collect();
            common = Some(match common {
                None => candidates,
                Some(acc) => acc.intersection(&candidates).copied().collect(),
            });
        }

        match common {
            Some(set) if set.len() == 1 => set.into_iter().next().cloned(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    #[test]
    fn test_embedded_table_loads() {
        let table = RegionTable::embedded().unwrap();
        assert!(table.len() > 200);
    }

    #[test]
    fn test_embedded_unique_mappings() {
        let table = RegionTable::embedded().unwrap();

        assert_eq!(table.candidates(235), &[cc("GB")]);
        assert_eq!(table.candidates(262), &[cc("DE")]);
        assert!(!table.is_ambiguous(262));
    }

    #[test]
    fn test_embedded_ambiguous_mappings() {
        let table = RegionTable::embedded().unwrap();

        assert!(table.is_ambiguous(234));
        assert!(table.candidates(234).contains(&cc("GB")));
        assert!(table.is_ambiguous(310));
        assert!(table.candidates(310).contains(&cc("US")));
        assert!(!table.candidates(310).contains(&cc("GB")));
    }

    #[test]
    fn test_unknown_mcc_has_no_candidates() {
        let table = RegionTable::embedded().unwrap();
        assert!(table.candidates(999).is_empty());
        assert!(!table.is_ambiguous(999));
    }

    #[test]
    fn test_candidates_are_sorted_and_deduplicated() {
        let table = RegionTable::from_json(r#"{"234": ["je", "GB", "GB", "GG"]}"#).unwrap();
        assert_eq!(table.candidates(234), &[cc("GB"), cc("GG"), cc("JE")]);
    }

    #[test]
    fn test_from_json_rejects_empty_candidates() {
        let err = RegionTable::from_json(r#"{"262": []}"#).unwrap_err();
        assert!(matches!(err, RegionTableError::NoCandidates(262)));
    }

    #[test]
    fn test_from_json_rejects_bad_keys_and_countries() {
        assert!(matches!(
            RegionTable::from_json(r#"{"abc": ["DE"]}"#),
            Err(RegionTableError::InvalidMcc(_))
        ));
        assert!(matches!(
            RegionTable::from_json(r#"{"0": ["DE"]}"#),
            Err(RegionTableError::InvalidMcc(_))
        ));
        assert!(matches!(
            RegionTable::from_json(r#"{"262": ["DEU"]}"#),
            Err(RegionTableError::InvalidCountry { mcc: 262, .. })
        ));
        assert!(matches!(
            RegionTable::from_json("not json"),
            Err(RegionTableError::Malformed(_))
        ));
    }

    #[test]
    fn test_common_country_intersection() {
        let raw = r#"{
            "310": ["US", "GU", "MP"],
            "311": ["US", "GU"],
            "316": ["US"],
            "234": ["GB", "JE"]
        }"#;
        let table = RegionTable::from_json(raw).unwrap();

        assert_eq!(table.common_country([310, 316]), Some(cc("US")));
        assert_eq!(table.common_country([316]), Some(cc("US")));
        assert_eq!(table.common_country([310, 311]), None);
        assert_eq!(table.common_country([310, 234]), None);
        assert_eq!(table.common_country([316, 999]), None);
        assert_eq!(table.common_country(Vec::<u16>::new()), None);
    }

    #[test]
    fn test_from_file_nonexistent() {
        assert!(RegionTable::from_file("/nonexistent/mcc_regions.json").is_err());
    }
}
