//! Country display names, keyed by ISO code.

use crate::domain::value_objects::CountryCode;
use std::collections::HashMap;

const EMBEDDED_COUNTRY_NAMES: &str = include_str!("../../../data/country_names.json");

#[derive(Debug, Clone, thiserror::Error)]
pub enum CountryNamesError {
    #[error("malformed country name document: {0}")]
    Malformed(String),
    #[error("invalid country code {0:?}")]
    InvalidCountry(String),
    #[error("country {0} has an empty name")]
    EmptyName(String),
}

/// English short names for country codes.
#[derive(Debug, Clone, Default)]
pub struct CountryNames {
    names: HashMap<CountryCode, String>,
}

impl CountryNames {
    pub fn embedded() -> anyhow::Result<Self> {
        Ok(Self::from_json(EMBEDDED_COUNTRY_NAMES)?)
    }

    /// Parse a `{"CC": "Name"}` document.
    pub fn from_json(raw: &str) -> Result<Self, CountryNamesError> {
        let doc: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|e| CountryNamesError::Malformed(e.to_string()))?;

        let mut names = HashMap::with_capacity(doc.len());
        for (code, name) in doc {
            let country =
                CountryCode::parse(&code).ok_or(CountryNamesError::InvalidCountry(code))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(CountryNamesError::EmptyName(country.to_string()));
            }
            names.insert(country, name.to_string());
        }

        Ok(Self { names })
    }

    pub fn name(&self, country: &CountryCode) -> Option<&str> {
        self.names.get(country).map(String::as_str)
    }

    /// Name for display, the code itself when no name is known.
    pub fn display_name<'a>(&'a self, country: &'a CountryCode) -> &'a str {
        self.name(country).unwrap_or(country.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
