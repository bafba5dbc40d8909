//! Per-year parameter tables, loaded and validated once at startup.

use super::primitives::{Bracket, TwoTier};
use super::program::{CalcError, ProgramId};
use super::year::TaxYear;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("{program}: cannot parse parameters: {message}")]
    Parse { program: ProgramId, message: String },
    #[error("{program} {year}: '{field}' boundaries must be strictly increasing with only the last band unbounded")]
    Bracket {
        program: ProgramId,
        year: TaxYear,
        field: String,
    },
    #[error("{program} {year}: rate '{field}' = {value} is outside [0, 1]")]
    Rate {
        program: ProgramId,
        year: TaxYear,
        field: String,
        value: Decimal,
    },
    #[error("{program} {year}: '{field}' = {value} must be non-negative{reason}")]
    Threshold {
        program: ProgramId,
        year: TaxYear,
        field: String,
        value: Decimal,
        reason: &'static str,
    },
    #[error("{program} {year}: '{upper}' must be at least '{lower}'")]
    Order {
        program: ProgramId,
        year: TaxYear,
        lower: String,
        upper: String,
    },
    #[error("no parameter table registered for {0}")]
    MissingProgram(ProgramId),
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

/// Typed constants of one program for one year.
pub trait ProgramParams: DeserializeOwned + Send + Sync + 'static {
    fn validate(&self, check: &Check) -> Result<(), ParamError>;
}

/// Validation context: which table is being checked.
pub struct Check {
    program: ProgramId,
    year: TaxYear,
}

impl Check {
    pub fn new(program: ProgramId, year: TaxYear) -> Self {
        Check { program, year }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn year(&self) -> TaxYear {
        self.year
    }

    pub fn rate(&self, field: &str, value: Decimal) -> Result<(), ParamError> {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(ParamError::Rate {
                program: self.program,
                year: self.year,
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    pub fn rates(&self, fields: &[(&str, Decimal)]) -> Result<(), ParamError> {
        fields.iter().try_for_each(|(field, value)| self.rate(field, *value))
    }

    pub fn threshold(&self, field: &str, value: Decimal) -> Result<(), ParamError> {
        if value < Decimal::ZERO {
            return Err(self.threshold_error(field, value, ""));
        }
        Ok(())
    }

    pub fn thresholds(&self, fields: &[(&str, Decimal)]) -> Result<(), ParamError> {
        fields
            .iter()
            .try_for_each(|(field, value)| self.threshold(field, *value))
    }

    /// `upper` must not fall below `lower`, e.g. an eligible age range.
    pub fn ordered(&self, lower: (&str, u32), upper: (&str, u32)) -> Result<(), ParamError> {
        if upper.1 < lower.1 {
            return Err(ParamError::Order {
                program: self.program,
                year: self.year,
                lower: lower.0.to_string(),
                upper: upper.0.to_string(),
            });
        }
        Ok(())
    }

    pub fn brackets(&self, field: &str, brackets: &[Bracket]) -> Result<(), ParamError> {
        let invalid = || ParamError::Bracket {
            program: self.program,
            year: self.year,
            field: field.to_string(),
        };
        let (last, bounded) = brackets.split_last().ok_or_else(invalid)?;
        let mut lower = Decimal::ZERO;
        for bracket in bounded {
            let upper = bracket.upto.ok_or_else(invalid)?;
            if upper <= lower {
                return Err(invalid());
            }
            lower = upper;
        }
        if last.upto.is_some() {
            return Err(invalid());
        }
        for (i, bracket) in brackets.iter().enumerate() {
            self.rate(&format!("{field}[{i}].rate"), bracket.rate)?;
        }
        Ok(())
    }

    /// Thresholds ordered and the first tier reaching its base before the
    /// second tier starts, so the schedule has no jump.
    pub fn two_tier(&self, field: &str, tier: &TwoTier) -> Result<(), ParamError> {
        self.thresholds(&[
            (format!("{field}.first_threshold").as_str(), tier.first_threshold),
            (format!("{field}.second_threshold").as_str(), tier.second_threshold),
            (format!("{field}.base").as_str(), tier.base),
            (format!("{field}.max").as_str(), tier.max),
        ])?;
        self.rates(&[
            (format!("{field}.first_rate").as_str(), tier.first_rate),
            (format!("{field}.second_rate").as_str(), tier.second_rate),
        ])?;
        if tier.second_threshold < tier.first_threshold {
            return Err(self.threshold_error(
                &format!("{field}.second_threshold"),
                tier.second_threshold,
                " and at least the first threshold",
            ));
        }
        if !tier.is_continuous() {
            return Err(self.threshold_error(
                &format!("{field}.base"),
                tier.base,
                " and reachable before the second threshold",
            ));
        }
        Ok(())
    }

    fn threshold_error(&self, field: &str, value: Decimal, reason: &'static str) -> ParamError {
        ParamError::Threshold {
            program: self.program,
            year: self.year,
            field: field.to_string(),
            value,
            reason,
        }
    }
}

/// Constants of one program bound to the year they were looked up for.
#[derive(Debug)]
pub struct ParameterTable<'a, P> {
    year: TaxYear,
    params: &'a P,
}

impl<P> ParameterTable<'_, P> {
    pub fn year(&self) -> TaxYear {
        self.year
    }
}

impl<P> Deref for ParameterTable<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.params
    }
}

/// Where parameter files come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamSource {
    /// Tables compiled into the binary
    #[default]
    Embedded,
    /// `<dir>/<program>.json`
    Dir(PathBuf),
}

impl ParamSource {
    fn read(&self, program: ProgramId) -> Result<String, ParamError> {
        match self {
            ParamSource::Embedded => Ok(embedded(program).to_string()),
            ParamSource::Dir(dir) => read_file(&dir.join(format!("{program}.json"))),
        }
    }
}

fn read_file(path: &Path) -> Result<String, ParamError> {
    std::fs::read_to_string(path).map_err(|e| ParamError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn embedded(program: ProgramId) -> &'static str {
    match program {
        ProgramId::EmploymentInsurance => include_str!("../../params/employment_insurance.json"),
        ProgramId::ParentalInsurance => include_str!("../../params/parental_insurance.json"),
        ProgramId::PensionPlan => include_str!("../../params/pension_plan.json"),
        ProgramId::HealthServicesFund => include_str!("../../params/health_services_fund.json"),
        ProgramId::PrescriptionDrugInsurance => {
            include_str!("../../params/prescription_drug_insurance.json")
        }
        ProgramId::QuebecIncomeTax => include_str!("../../params/quebec_income_tax.json"),
        ProgramId::FederalIncomeTax => include_str!("../../params/federal_income_tax.json"),
        ProgramId::SocialAssistance => include_str!("../../params/social_assistance.json"),
        ProgramId::FamilyAllowance => include_str!("../../params/family_allowance.json"),
        ProgramId::WorkPremium => include_str!("../../params/work_premium.json"),
        ProgramId::SolidarityCredit => include_str!("../../params/solidarity_credit.json"),
        ProgramId::ChildcareCredit => include_str!("../../params/childcare_credit.json"),
        ProgramId::ShelterAllowance => include_str!("../../params/shelter_allowance.json"),
        ProgramId::MedicalExpenseCredit => include_str!("../../params/medical_expense_credit.json"),
        ProgramId::SeniorAssistance => include_str!("../../params/senior_assistance.json"),
        ProgramId::SchoolSupplies => include_str!("../../params/school_supplies.json"),
        ProgramId::ChildBenefit => include_str!("../../params/child_benefit.json"),
        ProgramId::GstCredit => include_str!("../../params/gst_credit.json"),
        ProgramId::WorkersBenefit => include_str!("../../params/workers_benefit.json"),
        ProgramId::OldAgeSecurity => include_str!("../../params/old_age_security.json"),
        ProgramId::MedicalExpenseSupplement => {
            include_str!("../../params/medical_expense_supplement.json")
        }
    }
}

type AnyTables = Box<dyn Any + Send + Sync>;

/// Immutable registry of every program's tables, keyed by program then year.
#[derive(Default)]
pub struct ParameterStore {
    tables: HashMap<ProgramId, AnyTables>,
    raw: HashMap<ProgramId, BTreeMap<TaxYear, serde_json::Value>>,
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut programs: Vec<_> = self.raw.keys().collect();
        programs.sort();
        f.debug_struct("ParameterStore")
            .field("programs", &programs)
            .finish()
    }
}

impl ParameterStore {
    /// Load and validate every catalog table. Any failure aborts the load.
    pub fn load(source: &ParamSource) -> Result<Self, ParamError> {
        let mut store = ParameterStore::default();
        super::catalog::register_parameters(&mut store, source)?;
        for program in ProgramId::ALL {
            if !store.raw.contains_key(&program) {
                return Err(ParamError::MissingProgram(program));
            }
        }
        log::info!(
            "loaded parameters for {} programs ({} year tables)",
            store.raw.len(),
            store.raw.values().map(BTreeMap::len).sum::<usize>()
        );
        Ok(store)
    }

    pub fn embedded() -> Result<Self, ParamError> {
        Self::load(&ParamSource::Embedded)
    }

    /// Parse `program`'s file as `{ "<year>": P }` and validate each year.
    pub fn register<P: ProgramParams>(
        &mut self,
        program: ProgramId,
        source: &ParamSource,
    ) -> Result<(), ParamError> {
        let text = source.read(program)?;
        self.register_json::<P>(program, &text)
    }

    pub fn register_json<P: ProgramParams>(
        &mut self,
        program: ProgramId,
        text: &str,
    ) -> Result<(), ParamError> {
        let parse_error = |e: serde_json::Error, year: Option<TaxYear>| ParamError::Parse {
            program,
            message: match year {
                Some(year) => format!("{year}: {e}"),
                None => e.to_string(),
            },
        };
        let raw: BTreeMap<TaxYear, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| parse_error(e, None))?;

        let mut typed = BTreeMap::new();
        for (year, value) in &raw {
            let params: P =
                serde_json::from_value(value.clone()).map_err(|e| parse_error(e, Some(*year)))?;
            params.validate(&Check::new(program, *year))?;
            typed.insert(*year, params);
        }
        log::debug!("{program}: loaded years {:?}", raw.keys().map(|y| y.value()).collect::<Vec<_>>());

        self.tables.insert(program, Box::new(typed));
        self.raw.insert(program, raw);
        Ok(())
    }

    /// Typed lookup. A table registered under a different type counts as
    /// unregistered.
    pub fn lookup<P: ProgramParams>(
        &self,
        program: ProgramId,
        year: TaxYear,
    ) -> Result<ParameterTable<'_, P>, CalcError> {
        let tables = self
            .tables
            .get(&program)
            .and_then(|t| t.downcast_ref::<BTreeMap<TaxYear, P>>())
            .ok_or_else(|| CalcError::UnknownProgram(program.to_string()))?;
        let params = tables
            .get(&year)
            .ok_or(CalcError::UnsupportedYear { program, year })?;
        Ok(ParameterTable { year, params })
    }

    /// Raw table for auditing.
    pub fn describe(&self, name: &str, year: TaxYear) -> Result<&serde_json::Value, CalcError> {
        let program: ProgramId = name.parse()?;
        self.raw
            .get(&program)
            .ok_or_else(|| CalcError::UnknownProgram(name.to_string()))?
            .get(&year)
            .ok_or(CalcError::UnsupportedYear { program, year })
    }

    pub fn years(&self, program: ProgramId) -> Vec<TaxYear> {
        self.raw
            .get(&program)
            .map(|years| years.keys().copied().collect())
            .unwrap_or_default()
    }
}

/// Shared store for unit tests, loaded from the embedded tables.
#[cfg(test)]
pub(crate) fn test_store() -> &'static ParameterStore {
    use std::sync::OnceLock;
    static STORE: OnceLock<ParameterStore> = OnceLock::new();
    STORE.get_or_init(|| ParameterStore::embedded().expect("embedded parameters are valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        brackets: Vec<Bracket>,
        rate: Decimal,
        threshold: Decimal,
    }

    impl ProgramParams for Sample {
        fn validate(&self, check: &Check) -> Result<(), ParamError> {
            check.brackets("brackets", &self.brackets)?;
            check.rate("rate", self.rate)?;
            check.threshold("threshold", self.threshold)
        }
    }

    fn sample_json(upto2: &str, rate: &str, threshold: &str) -> String {
        format!(
            r#"{{"2024": {{
                "brackets": [{{"upto": "1000", "rate": "0.1"}}, {{"upto": {upto2}, "rate": "0.2"}}, {{"upto": null, "rate": "0.3"}}],
                "rate": "{rate}",
                "threshold": "{threshold}"
            }}}}"#
        )
    }

    #[test]
    fn registers_and_looks_up_typed_table() {
        let mut store = ParameterStore::default();
        store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("\"2000\"", "0.5", "10"))
            .unwrap();
        let table = store
            .lookup::<Sample>(ProgramId::FederalIncomeTax, TaxYear(2024))
            .unwrap();
        assert_eq!(table.year(), TaxYear(2024));
        assert_eq!(table.rate, dec!(0.5));
        assert_eq!(store.years(ProgramId::FederalIncomeTax), vec![TaxYear(2024)]);
    }

    #[test]
    fn missing_year_is_unsupported() {
        let mut store = ParameterStore::default();
        store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("\"2000\"", "0.5", "10"))
            .unwrap();
        let err = store
            .lookup::<Sample>(ProgramId::FederalIncomeTax, TaxYear(2025))
            .unwrap_err();
        assert_eq!(
            err,
            CalcError::UnsupportedYear {
                program: ProgramId::FederalIncomeTax,
                year: TaxYear(2025)
            }
        );
    }

    #[test]
    fn unregistered_program_is_unknown() {
        let store = ParameterStore::default();
        assert!(matches!(
            store.lookup::<Sample>(ProgramId::GstCredit, TaxYear(2024)),
            Err(CalcError::UnknownProgram(_))
        ));
        assert!(matches!(
            store.describe("not_a_program", TaxYear(2024)),
            Err(CalcError::UnknownProgram(_))
        ));
    }

    #[test]
    fn rejects_non_increasing_brackets() {
        let mut store = ParameterStore::default();
        let err = store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("\"900\"", "0.5", "10"))
            .unwrap_err();
        assert!(matches!(err, ParamError::Bracket { .. }));
    }

    #[test]
    fn rejects_unbounded_middle_bracket() {
        let mut store = ParameterStore::default();
        let err = store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("null", "0.5", "10"))
            .unwrap_err();
        assert!(matches!(err, ParamError::Bracket { .. }));
    }

    #[test]
    fn rejects_rate_above_one() {
        let mut store = ParameterStore::default();
        let err = store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("\"2000\"", "1.5", "10"))
            .unwrap_err();
        assert!(matches!(err, ParamError::Rate { value, .. } if value == dec!(1.5)));
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut store = ParameterStore::default();
        let err = store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, &sample_json("\"2000\"", "0.5", "-1"))
            .unwrap_err();
        assert!(matches!(err, ParamError::Threshold { .. }));
    }

    #[test]
    fn rejects_discontinuous_two_tier() {
        let check = Check::new(ProgramId::HealthServicesFund, TaxYear(2024));
        let tier = TwoTier {
            first_threshold: dec!(17630),
            first_rate: dec!(0.01),
            base: dec!(150),
            second_threshold: dec!(20000),
            second_rate: dec!(0.01),
            max: dec!(1000),
        };
        assert!(matches!(
            check.two_tier("contribution", &tier),
            Err(ParamError::Threshold { .. })
        ));
    }

    #[test]
    fn unparseable_file_is_reported() {
        let mut store = ParameterStore::default();
        let err = store
            .register_json::<Sample>(ProgramId::FederalIncomeTax, r#"{"2024": {"rate": "x"}}"#)
            .unwrap_err();
        assert!(matches!(err, ParamError::Parse { .. }));
    }

    #[test]
    fn embedded_tables_load() {
        let store = test_store();
        for program in ProgramId::ALL {
            assert!(!store.years(program).is_empty(), "{program} has no years");
        }
        assert!(store.describe("pension_plan", TaxYear(2024)).is_ok());
    }

    #[test]
    fn directory_source_reads_program_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("params");
        let store = ParameterStore::load(&ParamSource::Dir(dir)).unwrap();
        assert_eq!(
            store.years(ProgramId::QuebecIncomeTax),
            test_store().years(ProgramId::QuebecIncomeTax)
        );
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = ParameterStore::load(&ParamSource::Dir(PathBuf::from("/nonexistent/params")))
            .unwrap_err();
        assert!(matches!(err, ParamError::Io { .. }));
    }
}
