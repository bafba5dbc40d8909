//! Stage 1: payroll and health contributions. Each depends only on the household.

use super::{check_incomes, per_adult};
use crate::core::household::{Household, Person};
use crate::core::money::{Split, SplitRule};
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::primitives::TwoTier;
use crate::core::program::{CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EmploymentInsuranceParams {
    pub max_insurable_earnings: Decimal,
    pub employee_rate: Decimal,
    pub max_employee_contribution: Decimal,
    pub min_insurable_earnings: Decimal,
    /// Employer premium as a multiple of the employee premium
    pub employer_multiplier: Decimal,
}

impl ProgramParams for EmploymentInsuranceParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rate("employee_rate", self.employee_rate)?;
        check.thresholds(&[
            ("max_insurable_earnings", self.max_insurable_earnings),
            ("max_employee_contribution", self.max_employee_contribution),
            ("min_insurable_earnings", self.min_insurable_earnings),
            ("employer_multiplier", self.employer_multiplier),
        ])
    }
}

/// Federal employment insurance premiums.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmploymentInsurance;

impl EmploymentInsurance {
    /// (employee, employer) premiums for one adult
    fn premiums(params: &EmploymentInsuranceParams, person: &Person) -> (Decimal, Decimal) {
        let purely_self_employed =
            person.self_employed_income > Decimal::ZERO && person.work_income.is_zero();
        if person.is_retired_senior()
            || purely_self_employed
            || person.work_income <= params.min_insurable_earnings
        {
            return (Decimal::ZERO, Decimal::ZERO);
        }
        let insurable = person.work_income.min(params.max_insurable_earnings);
        let employee = (insurable * params.employee_rate).min(params.max_employee_contribution);
        let employer = (insurable * params.employee_rate * params.employer_multiplier)
            .min(params.max_employee_contribution * params.employer_multiplier);
        (employee, employer)
    }
}

impl FiscalProgram for EmploymentInsurance {
    fn id(&self) -> ProgramId {
        ProgramId::EmploymentInsurance
    }

    fn stage(&self) -> Stage {
        Stage::Contributions
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<EmploymentInsuranceParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let mut employer = Decimal::ZERO;
        let (adult1, adult2) = per_adult(household, |person| {
            let (employee, employer_share) = Self::premiums(&params, person);
            employer += employer_share;
            Ok(employee)
        })?;

        Ok(
            ProgramResult::computed(self.id(), params.year(), Split::per_adult(adult1, adult2).negate())
                .with_detail("employer_premium", employer),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentalInsuranceParams {
    pub max_insurable_earnings: Decimal,
    pub employee_rate: Decimal,
    pub employer_rate: Decimal,
    pub self_employed_rate: Decimal,
    /// Below this combined income, employee and self-employed premiums are refunded
    pub min_earnings: Decimal,
}

impl ProgramParams for ParentalInsuranceParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[
            ("employee_rate", self.employee_rate),
            ("employer_rate", self.employer_rate),
            ("self_employed_rate", self.self_employed_rate),
        ])?;
        check.thresholds(&[
            ("max_insurable_earnings", self.max_insurable_earnings),
            ("min_earnings", self.min_earnings),
        ])
    }
}

/// Quebec parental insurance plan (QPIP) premiums.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentalInsurance;

#[derive(Debug, Default)]
struct QpipPremiums {
    employee: Decimal,
    employer: Decimal,
    self_employed: Decimal,
}

impl ParentalInsurance {
    fn premiums(params: &ParentalInsuranceParams, person: &Person) -> QpipPremiums {
        if person.is_retired_senior() {
            return QpipPremiums::default();
        }
        let insurable_work = person.work_income.min(params.max_insurable_earnings);
        let insurable_self = person.self_employed_income.min(params.max_insurable_earnings);
        let employer = insurable_work * params.employer_rate;

        if person.work_income + person.self_employed_income < params.min_earnings {
            return QpipPremiums {
                employer,
                ..QpipPremiums::default()
            };
        }
        QpipPremiums {
            employee: insurable_work * params.employee_rate,
            employer,
            self_employed: insurable_self * params.self_employed_rate,
        }
    }
}

impl FiscalProgram for ParentalInsurance {
    fn id(&self) -> ProgramId {
        ProgramId::ParentalInsurance
    }

    fn stage(&self) -> Stage {
        Stage::Contributions
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<ParentalInsuranceParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let mut employer = Decimal::ZERO;
        let mut self_employed = Decimal::ZERO;
        let (adult1, adult2) = per_adult(household, |person| {
            let premiums = Self::premiums(&params, person);
            employer += premiums.employer;
            self_employed += premiums.self_employed;
            Ok(premiums.employee + premiums.self_employed)
        })?;

        Ok(
            ProgramResult::computed(self.id(), params.year(), Split::per_adult(adult1, adult2).negate())
                .with_detail("employer_premium", employer)
                .with_detail("self_employed_premium", self_employed),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PensionPlanParams {
    pub max_pensionable_earnings: Decimal,
    pub basic_exemption: Decimal,
    pub base_rate: Decimal,
    pub enhancement_rate: Decimal,
    /// Upper earnings limit of the additional tier. Zero disables the tier.
    pub additional_max_earnings: Decimal,
    pub additional_rate: Decimal,
    pub max_contribution: Decimal,
    pub self_employed_multiplier: Decimal,
}

impl ProgramParams for PensionPlanParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[
            ("base_rate", self.base_rate),
            ("enhancement_rate", self.enhancement_rate),
            ("additional_rate", self.additional_rate),
        ])?;
        check.thresholds(&[
            ("max_pensionable_earnings", self.max_pensionable_earnings),
            ("basic_exemption", self.basic_exemption),
            ("additional_max_earnings", self.additional_max_earnings),
            ("max_contribution", self.max_contribution),
            ("self_employed_multiplier", self.self_employed_multiplier),
        ])
    }
}

/// Quebec pension plan (QPP) contributions on employment and self-employment income.
#[derive(Debug, Clone, Copy, Default)]
pub struct PensionPlan;

impl PensionPlan {
    /// Contribution on one income source; `multiplier` is 1 for employees.
    fn contribution(params: &PensionPlanParams, income: Decimal, multiplier: Decimal) -> Decimal {
        if income <= params.basic_exemption {
            return Decimal::ZERO;
        }
        let first_tier = (income.min(params.max_pensionable_earnings) - params.basic_exemption)
            * (params.base_rate + params.enhancement_rate);
        let second_tier = (income.min(params.additional_max_earnings)
            - params.max_pensionable_earnings)
            .max(Decimal::ZERO)
            * params.additional_rate;
        ((first_tier + second_tier) * multiplier).min(params.max_contribution * multiplier)
    }
}

impl FiscalProgram for PensionPlan {
    fn id(&self) -> ProgramId {
        ProgramId::PensionPlan
    }

    fn stage(&self) -> Stage {
        Stage::Contributions
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<PensionPlanParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let mut self_employed = Decimal::ZERO;
        let (adult1, adult2) = per_adult(household, |person| {
            if person.is_retired_senior() {
                return Ok(Decimal::ZERO);
            }
            let employment = Self::contribution(&params, person.work_income, Decimal::ONE);
            let own_account = Self::contribution(
                &params,
                person.self_employed_income,
                params.self_employed_multiplier,
            );
            self_employed += own_account;
            Ok(employment + own_account)
        })?;

        Ok(
            ProgramResult::computed(self.id(), params.year(), Split::per_adult(adult1, adult2).negate())
                .with_detail("self_employed_contribution", self_employed),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthServicesFundParams {
    pub minimum_age: u32,
    pub contribution: TwoTier,
}

impl ProgramParams for HealthServicesFundParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.two_tier("contribution", &self.contribution)
    }
}

/// Health services fund contribution, owed by retirees on retirement and
/// self-employment income.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthServicesFund;

impl FiscalProgram for HealthServicesFund {
    fn id(&self) -> ProgramId {
        ProgramId::HealthServicesFund
    }

    fn stage(&self) -> Stage {
        Stage::Contributions
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<HealthServicesFundParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let (adult1, adult2) = per_adult(household, |person| {
            if !person.is_retired() || person.age < params.minimum_age {
                return Ok(Decimal::ZERO);
            }
            let income = person.retirement_income + person.self_employed_income;
            Ok(params.contribution.amount(income))
        })?;

        Ok(ProgramResult::computed(
            self.id(),
            params.year(),
            Split::per_adult(adult1, adult2).negate(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Exemptions {
    pub no_children: Decimal,
    pub one_child: Decimal,
    pub multiple_children: Decimal,
}

impl Exemptions {
    fn for_children(&self, count: usize) -> Decimal {
        match count {
            0 => self.no_children,
            1 => self.one_child,
            _ => self.multiple_children,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrugInsuranceExemptions {
    pub single: Exemptions,
    pub couple: Exemptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrugInsuranceRates {
    pub base_rate: Decimal,
    pub additional_rate: Decimal,
    pub base_max: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionDrugInsuranceParams {
    pub exemption: DrugInsuranceExemptions,
    /// Excess income taxed at the base rate before the additional rate applies
    pub first_threshold: Decimal,
    pub single: DrugInsuranceRates,
    pub couple: DrugInsuranceRates,
    pub monthly_adjustment: Decimal,
    pub max_contribution: Decimal,
}

impl ProgramParams for PrescriptionDrugInsuranceParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        for (name, rates) in [("single", &self.single), ("couple", &self.couple)] {
            check.rates(&[
                (format!("{name}.base_rate").as_str(), rates.base_rate),
                (format!("{name}.additional_rate").as_str(), rates.additional_rate),
            ])?;
            check.threshold(&format!("{name}.base_max"), rates.base_max)?;
        }
        for (name, exemptions) in [("single", &self.exemption.single), ("couple", &self.exemption.couple)] {
            check.thresholds(&[
                (format!("exemption.{name}.no_children").as_str(), exemptions.no_children),
                (format!("exemption.{name}.one_child").as_str(), exemptions.one_child),
                (format!("exemption.{name}.multiple_children").as_str(), exemptions.multiple_children),
            ])?;
        }
        check.thresholds(&[
            ("first_threshold", self.first_threshold),
            ("monthly_adjustment", self.monthly_adjustment),
            ("max_contribution", self.max_contribution),
        ])
    }
}

/// Public prescription drug insurance premium, assessed on household income.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrescriptionDrugInsurance;

impl FiscalProgram for PrescriptionDrugInsurance {
    fn id(&self) -> ProgramId {
        ProgramId::PrescriptionDrugInsurance
    }

    fn stage(&self) -> Stage {
        Stage::Contributions
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params =
            params.lookup::<PrescriptionDrugInsuranceParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let (exemptions, rates) = if household.has_spouse() {
            (&params.exemption.couple, &params.couple)
        } else {
            (&params.exemption.single, &params.single)
        };
        let exemption = exemptions.for_children(household.child_count());
        let income = household.gross_income();
        let excess = income - exemption;

        let premium = if excess <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            let base = excess.min(params.first_threshold) * rates.base_rate;
            let additional = (excess - params.first_threshold).max(Decimal::ZERO) * rates.additional_rate;
            ((base + additional).min(rates.base_max) + params.monthly_adjustment)
                .min(params.max_contribution)
        };

        let split = Split::household(premium, household.has_spouse(), SplitRule::Even).negate();
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("exemption", exemption)
            .with_detail("assessed_income", income))
    }
}
