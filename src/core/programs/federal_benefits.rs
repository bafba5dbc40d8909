//! Federal benefits read after the federal income tax.

use super::{check_incomes, ByFamilyType, EarningsSupplement, FamilyType};
use crate::core::household::{Household, Person};
use crate::core::money::{Split, SplitRule};
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::primitives::{phase_in, phase_out, reduction};
use crate::core::program::{
    non_negative, CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

const MONTHS: Decimal = dec!(12);
const QUARTERS: Decimal = dec!(4);

/// Programs that stop for a lone adult under the minimum age.
fn minor_alone(household: &Household, minimum_age: u32) -> bool {
    household.adult1.age < minimum_age && !household.has_spouse() && !household.has_children()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleSupplement {
    pub max: Decimal,
    /// Net income from which the supplement phases in
    pub base_income: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseOut {
    pub threshold: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GstCreditParams {
    pub minimum_age: u32,
    pub basic_amount: Decimal,
    pub spouse_or_dependent_amount: Decimal,
    pub child_amount: Decimal,
    pub single_supplement: SingleSupplement,
    pub phase_out: PhaseOut,
    /// Below this quarterly amount the credit is paid in a single instalment
    pub payment_threshold: Decimal,
}

impl ProgramParams for GstCreditParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[
            ("single_supplement.rate", self.single_supplement.rate),
            ("phase_out.rate", self.phase_out.rate),
        ])?;
        check.thresholds(&[
            ("basic_amount", self.basic_amount),
            ("spouse_or_dependent_amount", self.spouse_or_dependent_amount),
            ("child_amount", self.child_amount),
            ("single_supplement.max", self.single_supplement.max),
            ("single_supplement.base_income", self.single_supplement.base_income),
            ("phase_out.threshold", self.phase_out.threshold),
            ("payment_threshold", self.payment_threshold),
        ])
    }
}

impl GstCreditParams {
    fn base_amount(&self, household: &Household) -> Decimal {
        let children = Decimal::from(household.child_count());
        let mut amount = self.basic_amount;
        if household.has_spouse() {
            amount += self.spouse_or_dependent_amount + children * self.child_amount;
        } else if household.has_children() {
            // the first child of a single parent counts as an eligible dependant
            amount += self.spouse_or_dependent_amount + (children - Decimal::ONE) * self.child_amount;
        }
        amount
    }

    fn single_supplement(&self, household: &Household, family_net: Decimal) -> Decimal {
        let supplement = &self.single_supplement;
        if household.has_spouse() {
            Decimal::ZERO
        } else if household.has_children() {
            supplement.max
        } else {
            phase_in(family_net, supplement.base_income, supplement.rate, supplement.max)
        }
    }
}

/// GST/HST credit, phased out on federal family net income.
#[derive(Debug, Clone, Copy, Default)]
pub struct GstCredit;

impl FiscalProgram for GstCredit {
    fn id(&self) -> ProgramId {
        ProgramId::GstCredit
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[ProgramId::FederalIncomeTax]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<GstCreditParams>(self.id(), household.tax_year)?;
        if minor_alone(household, params.minimum_age) {
            return Ok(ProgramResult::zero(self.id(), params.year()));
        }
        let family_net = upstream.net_income(ProgramId::FederalIncomeTax)?.family;

        let base = params.base_amount(household);
        let supplement = params.single_supplement(household, family_net);
        let credit = phase_out(
            base + supplement,
            family_net,
            params.phase_out.threshold,
            params.phase_out.rate,
        );
        let quarterly = credit / QUARTERS;

        let split = Split::household(credit, household.has_spouse(), SplitRule::Even);
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("base_amount", base)
            .with_detail("single_supplement", supplement)
            .with_detail("quarterly_payment", quarterly)
            .with_detail("single_payment", quarterly < params.payment_threshold))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JointDisability {
    pub threshold: Decimal,
    pub reduction_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisabilitySupplement {
    pub excluded_income: Decimal,
    pub rate: Decimal,
    pub max: Decimal,
    pub reduction_threshold: Decimal,
    pub reduction_rate: Decimal,
    /// Phase-out when both spouses are disabled; couples only
    #[serde(default)]
    pub joint_disability: Option<JointDisability>,
}

impl DisabilitySupplement {
    fn amount(&self, work_income: Decimal, family_net: Decimal, both_disabled: bool) -> Decimal {
        let earned = phase_in(work_income, self.excluded_income, self.rate, self.max);
        match &self.joint_disability {
            Some(joint) if both_disabled => {
                phase_out(earned, family_net, joint.threshold, joint.reduction_rate)
            }
            _ => phase_out(earned, family_net, self.reduction_threshold, self.reduction_rate),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersBenefitParams {
    pub minimum_age: u32,
    pub basic: ByFamilyType<EarningsSupplement>,
    /// Work income of the lower-earning spouse ignored by the phase-out
    pub second_earner_exemption: Decimal,
    pub disability: ByFamilyType<DisabilitySupplement>,
}

impl ProgramParams for WorkersBenefitParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        for (family, schedule) in self.basic.iter() {
            schedule.validate(check, &format!("basic.{}", family.label()))?;
        }
        for (family, supplement) in self.disability.iter() {
            let field = format!("disability.{}", family.label());
            check.rates(&[
                (format!("{field}.rate").as_str(), supplement.rate),
                (format!("{field}.reduction_rate").as_str(), supplement.reduction_rate),
            ])?;
            check.thresholds(&[
                (format!("{field}.excluded_income").as_str(), supplement.excluded_income),
                (format!("{field}.max").as_str(), supplement.max),
                (format!("{field}.reduction_threshold").as_str(), supplement.reduction_threshold),
            ])?;
            if let Some(joint) = &supplement.joint_disability {
                check.rate(&format!("{field}.joint_disability.reduction_rate"), joint.reduction_rate)?;
                check.threshold(&format!("{field}.joint_disability.threshold"), joint.threshold)?;
            }
        }
        check.threshold("second_earner_exemption", self.second_earner_exemption)
    }
}

/// Canada workers benefit with its disability supplement.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkersBenefit;

impl FiscalProgram for WorkersBenefit {
    fn id(&self) -> ProgramId {
        ProgramId::WorkersBenefit
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[ProgramId::FederalIncomeTax]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<WorkersBenefitParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;
        if minor_alone(household, params.minimum_age) {
            return Ok(ProgramResult::zero(self.id(), params.year()));
        }
        let family_net = upstream.net_income(ProgramId::FederalIncomeTax)?.family;

        let work1 = household.adult1.work_income;
        let work2 = household.adult2.as_ref().map_or(Decimal::ZERO, |p| p.work_income);
        let exempt = match &household.adult2 {
            Some(_) => work1.min(work2).min(params.second_earner_exemption),
            None => Decimal::ZERO,
        };
        let adjusted_net = (family_net - exempt).max(Decimal::ZERO);

        let family = FamilyType::of(household);
        let work = work1 + work2;
        let basic = params.basic.get(family).amount(work, adjusted_net);

        let disabled = household.adults().filter(|(_, p)| p.has_disability).count();
        let disability = if disabled > 0 {
            params
                .disability
                .get(family)
                .amount(work, adjusted_net, disabled == 2)
        } else {
            Decimal::ZERO
        };

        let split = Split::household(
            basic + disability,
            household.has_spouse(),
            SplitRule::Proportional(work1, work2),
        );
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("basic", basic)
            .with_detail("disability_supplement", disability)
            .with_detail("adjusted_family_net_income", adjusted_net))
    }
}

/// Monthly maxima and annual income thresholds for one quarter.
#[derive(Debug, Clone, Deserialize)]
pub struct QuarterRates {
    pub oas_under_75: Decimal,
    pub oas_over_75: Decimal,
    pub gis_single_max: Decimal,
    pub gis_couple_max: Decimal,
    pub allowance_max: Decimal,
    pub gis_single_threshold: Decimal,
    pub gis_couple_threshold: Decimal,
    pub allowance_threshold: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OldAgeSecurityParams {
    pub pension_age: u32,
    pub higher_pension_age: u32,
    pub allowance_age: u32,
    /// January to December
    pub quarters: [QuarterRates; 4],
    pub recovery_threshold: Decimal,
    pub recovery_rate: Decimal,
    pub gis_work_exemption: Decimal,
    pub gis_partial_work_exemption: Decimal,
    pub gis_partial_work_rate: Decimal,
}

impl ProgramParams for OldAgeSecurityParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[
            ("recovery_rate", self.recovery_rate),
            ("gis_partial_work_rate", self.gis_partial_work_rate),
        ])?;
        check.thresholds(&[
            ("recovery_threshold", self.recovery_threshold),
            ("gis_work_exemption", self.gis_work_exemption),
            ("gis_partial_work_exemption", self.gis_partial_work_exemption),
        ])?;
        for (i, q) in self.quarters.iter().enumerate() {
            check.thresholds(&[
                (format!("quarters[{i}].oas_under_75").as_str(), q.oas_under_75),
                (format!("quarters[{i}].oas_over_75").as_str(), q.oas_over_75),
                (format!("quarters[{i}].gis_single_max").as_str(), q.gis_single_max),
                (format!("quarters[{i}].gis_couple_max").as_str(), q.gis_couple_max),
                (format!("quarters[{i}].allowance_max").as_str(), q.allowance_max),
                (format!("quarters[{i}].gis_single_threshold").as_str(), q.gis_single_threshold),
                (format!("quarters[{i}].gis_couple_threshold").as_str(), q.gis_couple_threshold),
                (format!("quarters[{i}].allowance_threshold").as_str(), q.allowance_threshold),
            ])?;
        }
        Ok(())
    }
}

impl OldAgeSecurityParams {
    /// Annual amount from monthly rates averaged over the four quarters.
    fn annual(&self, rate: impl Fn(&QuarterRates) -> Decimal) -> Decimal {
        let sum: Decimal = self.quarters.iter().map(rate).sum();
        sum / QUARTERS * MONTHS
    }

    /// Income thresholds of the last quarter apply to the whole year.
    fn thresholds(&self) -> &QuarterRates {
        &self.quarters[3]
    }

    fn pension(&self, person: &Person, own_net: Decimal) -> Decimal {
        if person.age < self.pension_age {
            return Decimal::ZERO;
        }
        let full = if person.age >= self.higher_pension_age {
            self.annual(|q| q.oas_over_75)
        } else {
            self.annual(|q| q.oas_under_75)
        };
        phase_out(full, own_net, self.recovery_threshold, self.recovery_rate)
    }

    fn work_exemption(&self, work_income: Decimal) -> Decimal {
        let full = work_income.min(self.gis_work_exemption);
        let partial = (work_income - self.gis_work_exemption)
            .max(Decimal::ZERO)
            .min(self.gis_partial_work_exemption)
            * self.gis_partial_work_rate;
        full + partial
    }
}

/// Income-tested amounts of the household, by adult.
#[derive(Debug, Default)]
struct Supplements {
    gis: Split,
    allowance: Split,
}

/// Old age security pension, guaranteed income supplement and allowance.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldAgeSecurity;

impl OldAgeSecurity {
    /// GIS is a household amount: a pensioner couple shares one couple-rate
    /// supplement. A pensioner whose spouse is of allowance age gets no GIS;
    /// the spouse receives the allowance instead.
    fn supplements(
        params: &OldAgeSecurityParams,
        household: &Household,
        income: Decimal,
    ) -> Supplements {
        let t = params.thresholds();
        let pensioner = |p: &Person| p.age >= params.pension_age;
        let allowance_age = |p: &Person| p.age >= params.allowance_age && !pensioner(p);
        let adult1 = &household.adult1;
        match household.adult2.as_ref() {
            None if pensioner(adult1) && income <= t.gis_single_threshold => Supplements {
                gis: Split::primary(params.annual(|q| q.gis_single_max)),
                ..Supplements::default()
            },
            Some(adult2)
                if pensioner(adult1) && pensioner(adult2) && income <= t.gis_couple_threshold =>
            {
                Supplements {
                    gis: Split::even(params.annual(|q| q.gis_couple_max)),
                    ..Supplements::default()
                }
            }
            Some(adult2)
                if pensioner(adult1) && allowance_age(adult2) && income <= t.allowance_threshold =>
            {
                Supplements {
                    allowance: Split::per_adult(Decimal::ZERO, params.annual(|q| q.allowance_max)),
                    ..Supplements::default()
                }
            }
            Some(adult2)
                if pensioner(adult2) && allowance_age(adult1) && income <= t.allowance_threshold =>
            {
                Supplements {
                    allowance: Split::primary(params.annual(|q| q.allowance_max)),
                    ..Supplements::default()
                }
            }
            _ => Supplements::default(),
        }
    }
}

impl FiscalProgram for OldAgeSecurity {
    fn id(&self) -> ProgramId {
        ProgramId::OldAgeSecurity
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[ProgramId::FederalIncomeTax]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<OldAgeSecurityParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;
        let net = upstream.net_income(ProgramId::FederalIncomeTax)?;

        let tested_income =
            (net.family - params.work_exemption(household.work_income())).max(Decimal::ZERO);

        let oas1 = params.pension(&household.adult1, net.adult1);
        let oas2 = household
            .adult2
            .as_ref()
            .map_or(Decimal::ZERO, |p| params.pension(p, net.adult2));

        let Supplements { gis, allowance } = Self::supplements(&params, household, tested_income);

        Ok(ProgramResult::computed(
            self.id(),
            params.year(),
            Split::per_adult(
                oas1 + gis.adult1 + allowance.adult1,
                oas2 + gis.adult2 + allowance.adult2,
            ),
        )
        .with_detail("oas", oas1 + oas2)
        .with_detail("gis", gis.total())
        .with_detail("allowance", allowance.total())
        .with_detail("income_tested", tested_income))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalExpenseSupplementParams {
    pub max: Decimal,
    pub rate: Decimal,
    /// Minimum household work income
    pub admissibility_threshold: Decimal,
    pub income_threshold: Decimal,
    pub reduction_rate: Decimal,
}

impl ProgramParams for MedicalExpenseSupplementParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[("rate", self.rate), ("reduction_rate", self.reduction_rate)])?;
        check.thresholds(&[
            ("max", self.max),
            ("admissibility_threshold", self.admissibility_threshold),
            ("income_threshold", self.income_threshold),
        ])
    }
}

/// Refundable medical expense supplement for working households.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedicalExpenseSupplement;

impl FiscalProgram for MedicalExpenseSupplement {
    fn id(&self) -> ProgramId {
        ProgramId::MedicalExpenseSupplement
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[ProgramId::FederalIncomeTax]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<MedicalExpenseSupplementParams>(self.id(), household.tax_year)?;
        let expenses = non_negative(self.id(), "medical_expenses", household.medical_expenses)?;
        let year = params.year();
        if expenses.is_zero() || household.work_income() < params.admissibility_threshold {
            return Ok(ProgramResult::zero(self.id(), year));
        }
        let family_net = upstream.net_income(ProgramId::FederalIncomeTax)?.family;

        let base = (expenses * params.rate).min(params.max);
        let clawback = reduction(family_net, params.income_threshold, params.reduction_rate);
        let supplement = (base - clawback).max(Decimal::ZERO);

        let split = Split::household(supplement, household.has_spouse(), SplitRule::Even);
        Ok(ProgramResult::computed(self.id(), year, split)
            .with_detail("base_supplement", base)
            .with_detail("reduction", clawback.min(base)))
    }
}
