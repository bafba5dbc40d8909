//! The contract shared by every fiscal program and the values they exchange.

use super::household::{Household, ValidationError};
use super::money::{round_cents, Split};
use super::params::ParameterStore;
use super::year::TaxYear;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum CalcError {
    #[error("invalid household: {0}")]
    Validation(#[from] ValidationError),
    #[error("{program} has no parameters for tax year {year}")]
    UnsupportedYear { program: ProgramId, year: TaxYear },
    #[error("unknown program '{0}'")]
    UnknownProgram(String),
    #[error("{program} requires the {needs} result, which is undeclared or has not been computed")]
    MissingUpstreamResult { program: ProgramId, needs: ProgramId },
    #[error("{program}: {detail}")]
    ArithmeticDomain { program: ProgramId, detail: String },
    #[error("{program} needs {needs}, which does not run in an earlier stage")]
    StageOrder { program: ProgramId, needs: ProgramId },
}

/// Identifier of every program in the catalog. Declaration order is catalog
/// order, which is also the order of itemized output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProgramId {
    EmploymentInsurance,
    ParentalInsurance,
    PensionPlan,
    HealthServicesFund,
    PrescriptionDrugInsurance,
    QuebecIncomeTax,
    FederalIncomeTax,
    SocialAssistance,
    FamilyAllowance,
    WorkPremium,
    SolidarityCredit,
    ChildcareCredit,
    ShelterAllowance,
    MedicalExpenseCredit,
    SeniorAssistance,
    SchoolSupplies,
    ChildBenefit,
    GstCredit,
    WorkersBenefit,
    OldAgeSecurity,
    MedicalExpenseSupplement,
}

impl ProgramId {
    pub const ALL: [ProgramId; 21] = [
        ProgramId::EmploymentInsurance,
        ProgramId::ParentalInsurance,
        ProgramId::PensionPlan,
        ProgramId::HealthServicesFund,
        ProgramId::PrescriptionDrugInsurance,
        ProgramId::QuebecIncomeTax,
        ProgramId::FederalIncomeTax,
        ProgramId::SocialAssistance,
        ProgramId::FamilyAllowance,
        ProgramId::WorkPremium,
        ProgramId::SolidarityCredit,
        ProgramId::ChildcareCredit,
        ProgramId::ShelterAllowance,
        ProgramId::MedicalExpenseCredit,
        ProgramId::SeniorAssistance,
        ProgramId::SchoolSupplies,
        ProgramId::ChildBenefit,
        ProgramId::GstCredit,
        ProgramId::WorkersBenefit,
        ProgramId::OldAgeSecurity,
        ProgramId::MedicalExpenseSupplement,
    ];

    /// Machine identifier, also the parameter file stem.
    pub fn as_str(self) -> &'static str {
        match self {
            ProgramId::EmploymentInsurance => "employment_insurance",
            ProgramId::ParentalInsurance => "parental_insurance",
            ProgramId::PensionPlan => "pension_plan",
            ProgramId::HealthServicesFund => "health_services_fund",
            ProgramId::PrescriptionDrugInsurance => "prescription_drug_insurance",
            ProgramId::QuebecIncomeTax => "quebec_income_tax",
            ProgramId::FederalIncomeTax => "federal_income_tax",
            ProgramId::SocialAssistance => "social_assistance",
            ProgramId::FamilyAllowance => "family_allowance",
            ProgramId::WorkPremium => "work_premium",
            ProgramId::SolidarityCredit => "solidarity_credit",
            ProgramId::ChildcareCredit => "childcare_credit",
            ProgramId::ShelterAllowance => "shelter_allowance",
            ProgramId::MedicalExpenseCredit => "medical_expense_credit",
            ProgramId::SeniorAssistance => "senior_assistance",
            ProgramId::SchoolSupplies => "school_supplies",
            ProgramId::ChildBenefit => "child_benefit",
            ProgramId::GstCredit => "gst_credit",
            ProgramId::WorkersBenefit => "workers_benefit",
            ProgramId::OldAgeSecurity => "old_age_security",
            ProgramId::MedicalExpenseSupplement => "medical_expense_supplement",
        }
    }

    /// Human readable program name
    pub fn name(self) -> &'static str {
        match self {
            ProgramId::EmploymentInsurance => "Employment Insurance",
            ProgramId::ParentalInsurance => "Quebec Parental Insurance Plan",
            ProgramId::PensionPlan => "Quebec Pension Plan",
            ProgramId::HealthServicesFund => "Health Services Fund",
            ProgramId::PrescriptionDrugInsurance => "Prescription Drug Insurance",
            ProgramId::QuebecIncomeTax => "Quebec Income Tax",
            ProgramId::FederalIncomeTax => "Federal Income Tax",
            ProgramId::SocialAssistance => "Social Assistance",
            ProgramId::FamilyAllowance => "Family Allowance",
            ProgramId::WorkPremium => "Work Premium",
            ProgramId::SolidarityCredit => "Solidarity Tax Credit",
            ProgramId::ChildcareCredit => "Childcare Expense Credit",
            ProgramId::ShelterAllowance => "Shelter Allowance",
            ProgramId::MedicalExpenseCredit => "Medical Expense Credit",
            ProgramId::SeniorAssistance => "Senior Assistance Amount",
            ProgramId::SchoolSupplies => "School Supplies Supplement",
            ProgramId::ChildBenefit => "Canada Child Benefit",
            ProgramId::GstCredit => "GST/HST Credit",
            ProgramId::WorkersBenefit => "Canada Workers Benefit",
            ProgramId::OldAgeSecurity => "Old Age Security",
            ProgramId::MedicalExpenseSupplement => "Medical Expense Supplement",
        }
    }
}

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramId {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ProgramId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| CalcError::UnknownProgram(needle.to_string()))
    }
}

/// Pipeline stage a program runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Contributions = 1,
    IncomeTax = 2,
    Benefits = 3,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Contributions => f.write_str("contributions"),
            Stage::IncomeTax => f.write_str("income tax"),
            Stage::Benefits => f.write_str("benefits"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Computed,
    /// Program exists in the catalog but its rules are not modelled yet
    NotImplemented,
}

/// Net income as computed by an income-tax program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetIncome {
    pub adult1: Decimal,
    pub adult2: Decimal,
    pub family: Decimal,
}

impl NetIncome {
    pub fn new(adult1: Decimal, adult2: Decimal) -> Self {
        let adult1 = round_cents(adult1);
        let adult2 = round_cents(adult2);
        NetIncome {
            adult1,
            adult2,
            family: adult1 + adult2,
        }
    }
}

/// Supporting value in a result breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Detail {
    Amount(Decimal),
    Count(u32),
    Flag(bool),
    Label(&'static str),
}

impl From<Decimal> for Detail {
    fn from(amount: Decimal) -> Self {
        Detail::Amount(round_cents(amount))
    }
}

impl From<u32> for Detail {
    fn from(count: u32) -> Self {
        Detail::Count(count)
    }
}

impl From<usize> for Detail {
    fn from(count: usize) -> Self {
        Detail::Count(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

impl From<bool> for Detail {
    fn from(flag: bool) -> Self {
        Detail::Flag(flag)
    }
}

impl From<&'static str> for Detail {
    fn from(label: &'static str) -> Self {
        Detail::Label(label)
    }
}

impl std::fmt::Display for Detail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Detail::Amount(amount) => write!(f, "{amount}"),
            Detail::Count(count) => write!(f, "{count}"),
            Detail::Flag(flag) => write!(f, "{flag}"),
            Detail::Label(label) => f.write_str(label),
        }
    }
}

/// Outcome of one program for one household. Deductions are negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramResult {
    pub program: ProgramId,
    pub name: &'static str,
    pub tax_year: TaxYear,
    pub adult1: Decimal,
    pub adult2: Decimal,
    pub total: Decimal,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_income: Option<NetIncome>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<&'static str, Detail>,
}

impl ProgramResult {
    /// Total is derived from the split so the two can never disagree.
    pub fn computed(program: ProgramId, tax_year: TaxYear, split: Split) -> Self {
        ProgramResult {
            program,
            name: program.name(),
            tax_year,
            adult1: split.adult1,
            adult2: split.adult2,
            total: split.total(),
            status: ResultStatus::Computed,
            net_income: None,
            detail: BTreeMap::new(),
        }
    }

    pub fn zero(program: ProgramId, tax_year: TaxYear) -> Self {
        Self::computed(program, tax_year, Split::primary(Decimal::ZERO))
    }

    pub fn not_implemented(program: ProgramId, tax_year: TaxYear) -> Self {
        ProgramResult {
            status: ResultStatus::NotImplemented,
            ..Self::zero(program, tax_year)
        }
    }

    pub fn with_detail(mut self, key: &'static str, value: impl Into<Detail>) -> Self {
        self.detail.insert(key, value.into());
        self
    }

    pub fn with_net_income(mut self, net_income: NetIncome) -> Self {
        self.net_income = Some(net_income);
        self
    }

    pub fn detail_amount(&self, key: &str) -> Option<Decimal> {
        match self.detail.get(key) {
            Some(Detail::Amount(amount)) => Some(*amount),
            _ => None,
        }
    }
}

/// Read-only view of earlier results, restricted to what a program declared.
pub struct Upstream<'a> {
    program: ProgramId,
    needs: &'static [ProgramId],
    results: &'a BTreeMap<ProgramId, ProgramResult>,
}

impl<'a> Upstream<'a> {
    pub fn new(
        program: ProgramId,
        needs: &'static [ProgramId],
        results: &'a BTreeMap<ProgramId, ProgramResult>,
    ) -> Self {
        Upstream {
            program,
            needs,
            results,
        }
    }

    pub fn for_program(program: &dyn FiscalProgram, results: &'a BTreeMap<ProgramId, ProgramResult>) -> Self {
        Self::new(program.id(), program.needs(), results)
    }

    pub fn get(&self, id: ProgramId) -> Result<&'a ProgramResult, CalcError> {
        let missing = CalcError::MissingUpstreamResult {
            program: self.program,
            needs: id,
        };
        if !self.needs.contains(&id) {
            return Err(missing);
        }
        self.results.get(&id).ok_or(missing)
    }

    pub fn net_income(&self, id: ProgramId) -> Result<NetIncome, CalcError> {
        self.get(id)?
            .net_income
            .ok_or(CalcError::MissingUpstreamResult {
                program: self.program,
                needs: id,
            })
    }
}

/// One tax, contribution or benefit program.
///
/// Implementations are stateless: parameters come from the store, earlier
/// results from `upstream`.
pub trait FiscalProgram: Send + Sync {
    fn id(&self) -> ProgramId;

    fn stage(&self) -> Stage;

    /// Programs whose results this one reads
    fn needs(&self) -> &'static [ProgramId] {
        &[]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError>;
}

/// Rejects negative monetary inputs that validation lets through.
pub fn non_negative(program: ProgramId, field: &str, amount: Decimal) -> Result<Decimal, CalcError> {
    if amount < Decimal::ZERO {
        return Err(CalcError::ArithmeticDomain {
            program,
            detail: format!("{field} cannot be negative (got {amount})"),
        });
    }
    Ok(amount)
}
