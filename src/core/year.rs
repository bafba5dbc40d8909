use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Calendar tax year (Quebec and federal years both run January to December)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct TaxYear(pub i32);

impl TaxYear {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaxYear {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaxYear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn display_is_plain_year() {
        assert_eq!(TaxYear(2024).to_string(), "2024");
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("2023".parse::<TaxYear>().unwrap(), TaxYear(2023));
        assert_eq!(" 2025 ".parse::<TaxYear>().unwrap(), TaxYear(2025));
        assert!("twenty".parse::<TaxYear>().is_err());
    }

    /// Year-keyed JSON maps deserialize with the year as key
    #[test]
    fn usable_as_json_map_key() {
        let map: BTreeMap<TaxYear, u32> = serde_json::from_str(r#"{"2024": 1, "2023": 2}"#).unwrap();
        let years: Vec<_> = map.keys().copied().collect();
        assert_eq!(years, vec![TaxYear(2023), TaxYear(2024)]);
    }
}
