//! Differential checks against reference values produced outside this crate.

use super::household::FamilyInput;
use super::money::round_cents;
use super::pipeline::{Calculation, Pipeline};
use super::program::{CalcError, ProgramId};
use super::year::TaxYear;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Output key for the aggregate, alongside program ids.
pub const DISPOSABLE_INCOME: &str = "disposable_income";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GoldenError {
    #[error("failed to parse golden records: {0}")]
    Parse(String),
    #[error("record {record}: unknown output key '{key}'")]
    UnknownKey { record: u32, key: String },
    #[error("record {record} ({year}): {source}")]
    Calculation {
        record: u32,
        year: TaxYear,
        source: CalcError,
    },
}

/// One household with reference amounts for one or more years.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenRecord {
    pub id: u32,
    pub household: FamilyInput,
    /// Output key, then year, then reference amount
    pub expected: BTreeMap<String, BTreeMap<TaxYear, Decimal>>,
}

impl GoldenRecord {
    pub fn years(&self) -> Vec<TaxYear> {
        let mut years: Vec<TaxYear> = self
            .expected
            .values()
            .flat_map(|by_year| by_year.keys().copied())
            .collect();
        years.sort();
        years.dedup();
        years
    }
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<GoldenRecord>, GoldenError> {
    serde_json::from_reader(reader).map_err(|e| GoldenError::Parse(e.to_string()))
}

/// Comparison of one output key for one record and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyComparison {
    pub record: u32,
    pub tax_year: TaxYear,
    pub key: String,
    pub expected: Decimal,
    pub actual: Decimal,
    /// Difference of magnitudes, always non-negative
    pub difference: Decimal,
    pub matches: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKey {
    Program(ProgramId),
    DisposableIncome,
}

impl OutputKey {
    fn parse(record: u32, key: &str) -> Result<Self, GoldenError> {
        if key == DISPOSABLE_INCOME {
            return Ok(OutputKey::DisposableIncome);
        }
        key.parse()
            .map(OutputKey::Program)
            .map_err(|_| GoldenError::UnknownKey {
                record,
                key: key.to_string(),
            })
    }

    fn value(self, calc: &Calculation) -> Decimal {
        match self {
            OutputKey::Program(id) => calc.total(id),
            OutputKey::DisposableIncome => calc.disposable_income,
        }
    }
}

/// Runs `record` for each year it has expectations for. Amounts are compared
/// as magnitudes since the reference reports deductions unsigned.
pub fn compare_record(
    pipeline: &Pipeline<'_>,
    record: &GoldenRecord,
    tolerance: Decimal,
) -> Result<Vec<KeyComparison>, GoldenError> {
    let keys = record
        .expected
        .keys()
        .map(|key| OutputKey::parse(record.id, key).map(|parsed| (key, parsed)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut comparisons = Vec::new();
    for year in record.years() {
        let household = record.household.clone().for_year(year);
        let calc = pipeline
            .calculate(&household)
            .map_err(|source| GoldenError::Calculation {
                record: record.id,
                year,
                source,
            })?;

        for (key, parsed) in &keys {
            let Some(expected) = record.expected[*key].get(&year) else {
                continue;
            };
            let actual = parsed.value(&calc);
            let difference = round_cents((actual.abs() - expected.abs()).abs());
            let matches = difference <= tolerance;
            if !matches {
                log::warn!(
                    "record {} ({year}): {key} expected {expected}, got {actual}",
                    record.id
                );
            }
            comparisons.push(KeyComparison {
                record: record.id,
                tax_year: year,
                key: key.to_string(),
                expected: *expected,
                actual,
                difference,
                matches,
            });
        }
    }
    Ok(comparisons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::test_store;
    use rust_decimal_macros::dec;

    const RECORDS: &str = r#"[
        {
            "id": 1,
            "household": {
                "status": "single",
                "adult1": {"age": 30, "work_income": "45000"}
            },
            "expected": {
                "pension_plan": {"2023": "2656.00", "2024": "2656.00"},
                "employment_insurance": {"2024": 594},
                "gst_credit": {"2024": "519.40"}
            }
        }
    ]"#;

    fn records() -> Vec<GoldenRecord> {
        read_records(RECORDS.as_bytes()).unwrap()
    }

    #[test]
    fn record_years_are_collected_across_keys() {
        assert_eq!(records()[0].years(), vec![TaxYear(2023), TaxYear(2024)]);
    }

    #[test]
    fn compares_magnitudes_within_tolerance() {
        let pipeline = Pipeline::new(test_store()).unwrap();
        let comparisons = compare_record(&pipeline, &records()[0], dec!(1)).unwrap();
        assert_eq!(comparisons.len(), 4);
        assert!(comparisons.iter().all(|c| c.matches), "{comparisons:#?}");

        let gst = comparisons.iter().find(|c| c.key == "gst_credit").unwrap();
        assert_eq!(gst.difference, dec!(0.40));
    }

    #[test]
    fn tight_tolerance_reports_mismatch() {
        let pipeline = Pipeline::new(test_store()).unwrap();
        let comparisons = compare_record(&pipeline, &records()[0], dec!(0.01)).unwrap();
        let failed: Vec<_> = comparisons.iter().filter(|c| !c.matches).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key, "gst_credit");
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut record = records().remove(0);
        record
            .expected
            .insert("capital_gains".into(), BTreeMap::from([(TaxYear(2024), dec!(1))]));
        let pipeline = Pipeline::new(test_store()).unwrap();
        assert_eq!(
            compare_record(&pipeline, &record, dec!(1)),
            Err(GoldenError::UnknownKey {
                record: 1,
                key: "capital_gains".into()
            })
        );
    }

    #[test]
    fn unsupported_year_surfaces_as_calculation_error() {
        let mut record = records().remove(0);
        record
            .expected
            .insert(DISPOSABLE_INCOME.into(), BTreeMap::from([(TaxYear(2019), dec!(1))]));
        let pipeline = Pipeline::new(test_store()).unwrap();
        assert!(matches!(
            compare_record(&pipeline, &record, dec!(1)),
            Err(GoldenError::Calculation { year: TaxYear(2019), .. })
        ));
    }
}
