//! Last-resort assistance and housing support.

use super::check_incomes;
use crate::core::household::{EmploymentConstraint, Household};
use crate::core::money::{Split, SplitRule};
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::program::{
    non_negative, CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

const MONTHS: Decimal = dec!(12);

#[derive(Debug, Clone, Deserialize)]
pub struct RegularRate {
    pub base: Decimal,
    pub adjustment: Decimal,
    pub temporary_constraint: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolidarityRate {
    pub base: Decimal,
    pub adjustment: Decimal,
}

/// Monthly rates by household type.
#[derive(Debug, Clone, Deserialize)]
pub struct ByAssistanceUnit<T> {
    pub single: T,
    pub couple: T,
    pub student_spouse: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssistanceUnit {
    Single,
    Couple,
    StudentSpouse,
}

impl AssistanceUnit {
    fn of(household: &Household) -> Self {
        match &household.adult2 {
            Some(spouse) if spouse.is_student => AssistanceUnit::StudentSpouse,
            Some(_) => AssistanceUnit::Couple,
            None => AssistanceUnit::Single,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AssistanceUnit::Single => "single",
            AssistanceUnit::Couple => "couple",
            AssistanceUnit::StudentSpouse => "student_spouse",
        }
    }
}

impl<T> ByAssistanceUnit<T> {
    fn get(&self, unit: AssistanceUnit) -> &T {
        match unit {
            AssistanceUnit::Single => &self.single,
            AssistanceUnit::Couple => &self.couple,
            AssistanceUnit::StudentSpouse => &self.student_spouse,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkIncomeExemption {
    pub single: Decimal,
    pub couple: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialAssistanceParams {
    pub regular: ByAssistanceUnit<RegularRate>,
    /// Rates for households where an adult has a severe employment constraint
    pub solidarity: ByAssistanceUnit<SolidarityRate>,
    /// Monthly work income that does not reduce the benefit
    pub work_income_exemption: WorkIncomeExemption,
}

impl ProgramParams for SocialAssistanceParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        for unit in [
            AssistanceUnit::Single,
            AssistanceUnit::Couple,
            AssistanceUnit::StudentSpouse,
        ] {
            let regular = self.regular.get(unit);
            let solidarity = self.solidarity.get(unit);
            let name = unit.label();
            check.thresholds(&[
                (format!("regular.{name}.base").as_str(), regular.base),
                (format!("regular.{name}.adjustment").as_str(), regular.adjustment),
                (format!("regular.{name}.temporary_constraint").as_str(), regular.temporary_constraint),
                (format!("solidarity.{name}.base").as_str(), solidarity.base),
                (format!("solidarity.{name}.adjustment").as_str(), solidarity.adjustment),
            ])?;
        }
        check.thresholds(&[
            ("work_income_exemption.single", self.work_income_exemption.single),
            ("work_income_exemption.couple", self.work_income_exemption.couple),
        ])
    }
}

/// Last-resort financial assistance: the regular program, or the solidarity
/// program when an adult has a severe employment constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialAssistance;

impl FiscalProgram for SocialAssistance {
    fn id(&self) -> ProgramId {
        ProgramId::SocialAssistance
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        _upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<SocialAssistanceParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let unit = AssistanceUnit::of(household);
        let severe = household.any_adult(|p| p.constraint == EmploymentConstraint::Severe);
        let temporary = household.any_adult(|p| p.constraint == EmploymentConstraint::Temporary);

        let monthly_base = if severe {
            let rate = params.solidarity.get(unit);
            rate.base + rate.adjustment
        } else {
            let rate = params.regular.get(unit);
            let mut amount = rate.base + rate.adjustment;
            if temporary {
                amount += rate.temporary_constraint;
            }
            amount
        };

        let exemption = if household.has_spouse() {
            params.work_income_exemption.couple
        } else {
            params.work_income_exemption.single
        };
        let monthly_work = household.work_income() / MONTHS;
        let monthly_reduction = (monthly_work - exemption).max(Decimal::ZERO);
        let monthly = (monthly_base - monthly_reduction).max(Decimal::ZERO);
        let annual = monthly * MONTHS;

        let split = Split::household(annual, household.has_spouse(), SplitRule::Even);
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("program", if severe { "solidarity" } else { "regular" })
            .with_detail("unit", unit.label())
            .with_detail("monthly_base", monthly_base)
            .with_detail("work_income_reduction", monthly_reduction.min(monthly_base) * MONTHS))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShelterThresholds {
    pub single_50_plus: Decimal,
    pub couple_50_plus: Decimal,
    pub couple_one_child: Decimal,
    pub single_parent_one_or_two_children: Decimal,
    pub couple_multiple_children: Decimal,
    pub single_parent_three_or_more_children: Decimal,
}

/// Housing burden from which a monthly amount is paid.
#[derive(Debug, Clone, Deserialize)]
pub struct BurdenTier {
    pub from: Decimal,
    pub monthly_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShelterAllowanceParams {
    pub minimum_age: u32,
    pub income_thresholds: ShelterThresholds,
    /// Sorted by `from`, ascending
    pub burden_tiers: Vec<BurdenTier>,
}

impl ProgramParams for ShelterAllowanceParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        let t = &self.income_thresholds;
        check.thresholds(&[
            ("income_thresholds.single_50_plus", t.single_50_plus),
            ("income_thresholds.couple_50_plus", t.couple_50_plus),
            ("income_thresholds.couple_one_child", t.couple_one_child),
            ("income_thresholds.single_parent_one_or_two_children", t.single_parent_one_or_two_children),
            ("income_thresholds.couple_multiple_children", t.couple_multiple_children),
            ("income_thresholds.single_parent_three_or_more_children", t.single_parent_three_or_more_children),
        ])?;
        let mut previous = None;
        for (i, tier) in self.burden_tiers.iter().enumerate() {
            check.rate(&format!("burden_tiers[{i}].from"), tier.from)?;
            check.threshold(&format!("burden_tiers[{i}].monthly_amount"), tier.monthly_amount)?;
            if previous.is_some_and(|p| tier.from <= p) {
                return Err(ParamError::Bracket {
                    program: check.program(),
                    year: check.year(),
                    field: "burden_tiers".to_string(),
                });
            }
            previous = Some(tier.from);
        }
        Ok(())
    }
}

impl ShelterAllowanceParams {
    /// Threshold category of the household, `None` when it cannot qualify.
    fn category(&self, household: &Household) -> Option<(&'static str, Decimal)> {
        let t = &self.income_thresholds;
        let any_50_plus = household.any_adult(|p| p.age >= self.minimum_age);
        match (household.has_spouse(), household.child_count()) {
            (false, 0) if any_50_plus => Some(("single_50_plus", t.single_50_plus)),
            (false, 0) => None,
            (false, 1 | 2) => Some((
                "single_parent_one_or_two_children",
                t.single_parent_one_or_two_children,
            )),
            (false, _) => Some((
                "single_parent_three_or_more_children",
                t.single_parent_three_or_more_children,
            )),
            (true, 0) if any_50_plus => Some(("couple_50_plus", t.couple_50_plus)),
            (true, 0) => None,
            (true, 1) => Some(("couple_one_child", t.couple_one_child)),
            (true, _) => Some(("couple_multiple_children", t.couple_multiple_children)),
        }
    }

    fn monthly_amount(&self, burden: Decimal) -> Decimal {
        self.burden_tiers
            .iter()
            .rev()
            .find(|tier| burden >= tier.from)
            .map_or(Decimal::ZERO, |tier| tier.monthly_amount)
    }
}

/// Shelter allowance for low-income households with a high housing burden.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelterAllowance;

impl FiscalProgram for ShelterAllowance {
    fn id(&self) -> ProgramId {
        ProgramId::ShelterAllowance
    }

    fn stage(&self) -> Stage {
        Stage::Benefits
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[ProgramId::QuebecIncomeTax]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<ShelterAllowanceParams>(self.id(), household.tax_year)?;
        let housing_cost = non_negative(self.id(), "housing_cost", household.housing_cost)?;
        let family_net = upstream.net_income(ProgramId::QuebecIncomeTax)?.family;
        let year = params.year();

        if housing_cost.is_zero() {
            return Ok(ProgramResult::zero(self.id(), year));
        }
        let Some((category, threshold)) = params.category(household) else {
            return Ok(ProgramResult::zero(self.id(), year).with_detail("category", "ineligible"));
        };
        // a burden ratio needs a positive income
        if family_net > threshold || family_net <= Decimal::ZERO {
            return Ok(ProgramResult::zero(self.id(), year).with_detail("category", category));
        }

        let burden = housing_cost / family_net;
        let annual = params.monthly_amount(burden) * MONTHS;
        let split = Split::household(annual, household.has_spouse(), SplitRule::Even);
        Ok(ProgramResult::computed(self.id(), year, split)
            .with_detail("category", category)
            .with_detail("income_threshold", threshold)
            .with_detail("housing_burden", burden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::household::tests::{family, household, retiree, worker};
    use crate::core::household::{AdultInput, Child, FamilyStatus};
    use crate::core::programs::testing::evaluate;
    use crate::core::year::TaxYear;

    #[test]
    fn single_parent_without_work_income_is_not_reduced() {
        let mut f = family(FamilyStatus::SingleParent, worker(30, dec!(0)), None);
        f.children.push(Child::new(4));
        let h = f.for_year(TaxYear(2023));
        let result = evaluate(ProgramId::SocialAssistance, &h).unwrap();
        assert_eq!(result.total, dec!(9840.00));
        assert_eq!(result.detail_amount("work_income_reduction"), Some(dec!(0)));
    }

    #[test]
    fn work_income_above_exemption_reduces_benefit() {
        let h = household(FamilyStatus::Single, worker(30, dec!(6000)), None, 2024);
        let result = evaluate(ProgramId::SocialAssistance, &h).unwrap();
        // (762 + 45 - (500 - 200)) * 12
        assert_eq!(result.total, dec!(6084.00));
        assert_eq!(result.detail_amount("work_income_reduction"), Some(dec!(3600)));
    }

    #[test]
    fn high_work_income_eliminates_benefit() {
        let h = household(FamilyStatus::Single, worker(30, dec!(45000)), None, 2024);
        assert_eq!(evaluate(ProgramId::SocialAssistance, &h).unwrap().total, dec!(0));
    }

    #[test]
    fn temporary_constraint_adds_amount() {
        let adult = AdultInput {
            age: 40,
            constraint: EmploymentConstraint::Temporary,
            ..Default::default()
        };
        let h = household(FamilyStatus::Single, adult, None, 2024);
        let result = evaluate(ProgramId::SocialAssistance, &h).unwrap();
        assert_eq!(result.total, dec!(11676.00));
    }

    #[test]
    fn severe_constraint_uses_solidarity_rates() {
        let spouse = AdultInput {
            age: 40,
            constraint: EmploymentConstraint::Severe,
            ..Default::default()
        };
        let h = household(FamilyStatus::Couple, worker(40, dec!(0)), Some(spouse), 2024);
        let result = evaluate(ProgramId::SocialAssistance, &h).unwrap();
        // (1731 + 118) * 12, split evenly
        assert_eq!(result.total, dec!(22188.00));
        assert_eq!(result.adult1, dec!(11094.00));
        assert_eq!(result.adult2, dec!(11094.00));
    }

    #[test]
    fn student_spouse_rate() {
        let spouse = AdultInput {
            age: 22,
            is_student: true,
            ..Default::default()
        };
        let h = household(FamilyStatus::Couple, worker(25, dec!(0)), Some(spouse), 2024);
        let result = evaluate(ProgramId::SocialAssistance, &h).unwrap();
        assert_eq!(result.total, dec!(3060.00));
    }

    fn renter(status: FamilyStatus, adult: AdultInput, children: usize, rent: Decimal) -> Household {
        let mut f = family(status, adult, None);
        f.children = (0..children).map(|_| Child::new(5)).collect();
        f.housing_cost = rent;
        f.for_year(TaxYear(2024))
    }

    #[test]
    fn shelter_for_older_single_with_high_burden() {
        let h = renter(FamilyStatus::RetiredSingle, retiree(70, dec!(20000)), 0, dec!(9000));
        let result = evaluate(ProgramId::ShelterAllowance, &h).unwrap();
        // 9000 / 20000 = 45% of income
        assert_eq!(result.total, dec!(1200.00));
        assert_eq!(result.detail.get("category").map(ToString::to_string), Some("single_50_plus".into()));
    }

    #[test]
    fn shelter_highest_tier() {
        let h = renter(FamilyStatus::RetiredSingle, retiree(70, dec!(10000)), 0, dec!(9000));
        assert_eq!(evaluate(ProgramId::ShelterAllowance, &h).unwrap().total, dec!(2040.00));
    }

    #[test]
    fn young_single_without_children_is_ineligible() {
        let h = renter(FamilyStatus::Single, worker(30, dec!(15000)), 0, dec!(9000));
        assert_eq!(evaluate(ProgramId::ShelterAllowance, &h).unwrap().total, dec!(0));
    }

    #[test]
    fn shelter_income_above_threshold() {
        let h = renter(FamilyStatus::SingleParent, worker(35, dec!(60000)), 1, dec!(20000));
        assert_eq!(evaluate(ProgramId::ShelterAllowance, &h).unwrap().total, dec!(0));
    }

    #[test]
    fn no_housing_cost_no_allowance() {
        let h = renter(FamilyStatus::RetiredSingle, retiree(70, dec!(10000)), 0, dec!(0));
        assert_eq!(evaluate(ProgramId::ShelterAllowance, &h).unwrap().total, dec!(0));
    }

    #[test]
    fn negative_housing_cost_is_rejected() {
        let h = renter(FamilyStatus::RetiredSingle, retiree(70, dec!(10000)), 0, dec!(-5));
        assert!(matches!(
            evaluate(ProgramId::ShelterAllowance, &h),
            Err(CalcError::ArithmeticDomain { .. })
        ));
    }
}
