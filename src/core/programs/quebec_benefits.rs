//! Provincial credits read after the Quebec income tax.

use super::{check_incomes, ByFamilyType, EarningsSupplement, FamilyType};
use crate::core::household::{Child, Household};
use crate::core::money::{Split, SplitRule};
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::primitives::{reduction, schedule_rate, Bracket};
use crate::core::program::{
    non_negative, CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkPremiumParams {
    pub minimum_age: u32,
    pub general: ByFamilyType<EarningsSupplement>,
    /// Schedule for households with a disabled adult
    pub adapted: ByFamilyType<EarningsSupplement>,
}

impl ProgramParams for WorkPremiumParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        for (family, schedule) in self.general.iter() {
            schedule.validate(check, &format!("general.{}", family.label()))?;
        }
        for (family, schedule) in self.adapted.iter() {
            schedule.validate(check, &format!("adapted.{}", family.label()))?;
        }
        Ok(())
    }
}

/// Work premium on combined household work income; the adapted schedule
/// applies when it pays more.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkPremium;

impl FiscalProgram for WorkPremium {
    fn id(&self) -> ProgramId {
        ProgramId::WorkPremium
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
        let params = params.lookup::<WorkPremiumParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;
        let year = params.year();

        let minor_alone = household.adult1.age < params.minimum_age
            && !household.has_spouse()
            && !household.has_children();
        if minor_alone {
            return Ok(ProgramResult::zero(self.id(), year));
        }

        let family_net = upstream.net_income(ProgramId::QuebecIncomeTax)?.family;
        let family = FamilyType::of(household);
        let work = household.work_income();

        let general = params.general.get(family).amount(work, family_net);
        let adapted = if household.any_adult(|p| p.has_disability) {
            params.adapted.get(family).amount(work, family_net)
        } else {
            Decimal::ZERO
        };
        let (premium, schedule) = if adapted > general {
            (adapted, "adapted")
        } else {
            (general, "general")
        };

        let split = Split::household(
            premium,
            household.has_spouse(),
            SplitRule::Proportional(
                household.adult1.work_income,
                household.adult2.as_ref().map_or(Decimal::ZERO, |p| p.work_income),
            ),
        );
        Ok(ProgramResult::computed(self.id(), year, split)
            .with_detail("family_type", family.label())
            .with_detail("schedule", schedule))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GstComponent {
    pub base: Decimal,
    pub spouse: Decimal,
    pub single_supplement: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HousingComponent {
    pub couple: Decimal,
    pub single: Decimal,
    pub child: Decimal,
    pub shared_custody_child: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NorthernVillageComponent {
    pub base: Decimal,
    pub spouse: Decimal,
    pub child: Decimal,
    pub shared_custody_child: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolidarityReduction {
    pub threshold: Decimal,
    pub single_component_rate: Decimal,
    pub multiple_component_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolidarityCreditParams {
    pub gst: GstComponent,
    pub housing: HousingComponent,
    pub northern_village: NorthernVillageComponent,
    pub reduction: SolidarityReduction,
}

impl ProgramParams for SolidarityCreditParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rates(&[
            ("reduction.single_component_rate", self.reduction.single_component_rate),
            ("reduction.multiple_component_rate", self.reduction.multiple_component_rate),
        ])?;
        check.thresholds(&[
            ("gst.base", self.gst.base),
            ("gst.spouse", self.gst.spouse),
            ("gst.single_supplement", self.gst.single_supplement),
            ("housing.couple", self.housing.couple),
            ("housing.single", self.housing.single),
            ("housing.child", self.housing.child),
            ("housing.shared_custody_child", self.housing.shared_custody_child),
            ("northern_village.base", self.northern_village.base),
            ("northern_village.spouse", self.northern_village.spouse),
            ("northern_village.child", self.northern_village.child),
            ("northern_village.shared_custody_child", self.northern_village.shared_custody_child),
            ("reduction.threshold", self.reduction.threshold),
        ])
    }
}

/// Per-child amount, halved in effect for children in shared custody.
fn per_child(children: &[Child], full: Decimal, shared: Decimal) -> Decimal {
    children
        .iter()
        .map(|c| if c.shared_custody { shared } else { full })
        .sum()
}

impl SolidarityCreditParams {
    fn gst_component(&self, household: &Household) -> Decimal {
        let extra = if household.has_spouse() {
            self.gst.spouse
        } else {
            self.gst.single_supplement
        };
        self.gst.base + extra
    }

    fn housing_component(&self, household: &Household) -> Decimal {
        let adults = if household.has_spouse() {
            self.housing.couple
        } else {
            self.housing.single
        };
        adults + per_child(&household.children, self.housing.child, self.housing.shared_custody_child)
    }

    fn northern_component(&self, household: &Household) -> Decimal {
        if !household.northern_village {
            return Decimal::ZERO;
        }
        let village = &self.northern_village;
        let spouse = if household.has_spouse() {
            village.spouse
        } else {
            Decimal::ZERO
        };
        village.base + spouse + per_child(&household.children, village.child, village.shared_custody_child)
    }
}

/// Solidarity tax credit: GST, housing and northern-village components
/// reduced on Quebec family net income. Never less than the GST component.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidarityCredit;

impl FiscalProgram for SolidarityCredit {
    fn id(&self) -> ProgramId {
        ProgramId::SolidarityCredit
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
        let params = params.lookup::<SolidarityCreditParams>(self.id(), household.tax_year)?;
        let family_net = upstream.net_income(ProgramId::QuebecIncomeTax)?.family;

        let gst = params.gst_component(household);
        let housing = params.housing_component(household);
        let northern = params.northern_component(household);
        let components = [gst, housing, northern];
        let claimed = components.iter().filter(|c| **c > Decimal::ZERO).count();
        let before_reduction: Decimal = components.iter().sum();

        let rate = if claimed > 1 {
            params.reduction.multiple_component_rate
        } else {
            params.reduction.single_component_rate
        };
        let clawback = reduction(family_net, params.reduction.threshold, rate).min(before_reduction);
        let credit = (before_reduction - clawback).max(gst);

        let split = Split::household(credit, household.has_spouse(), SplitRule::Even);
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("gst_component", gst)
            .with_detail("housing_component", housing)
            .with_detail("northern_village_component", northern)
            .with_detail("reduction", clawback))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseLimits {
    pub under_7: Decimal,
    pub disability: Decimal,
    pub other: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildcareCreditParams {
    pub expense_limits: ExpenseLimits,
    /// Credit rate by family net income band
    pub rate_schedule: Vec<Bracket>,
}

impl ProgramParams for ChildcareCreditParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.brackets("rate_schedule", &self.rate_schedule)?;
        check.thresholds(&[
            ("expense_limits.under_7", self.expense_limits.under_7),
            ("expense_limits.disability", self.expense_limits.disability),
            ("expense_limits.other", self.expense_limits.other),
        ])
    }
}

impl ChildcareCreditParams {
    fn limit(&self, child: &Child) -> Decimal {
        if child.has_disability {
            self.expense_limits.disability
        } else if child.age < 7 {
            self.expense_limits.under_7
        } else {
            self.expense_limits.other
        }
    }
}

/// Refundable credit for childcare expenses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildcareCredit;

impl FiscalProgram for ChildcareCredit {
    fn id(&self) -> ProgramId {
        ProgramId::ChildcareCredit
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
        let params = params.lookup::<ChildcareCreditParams>(self.id(), household.tax_year)?;
        let family_net = upstream.net_income(ProgramId::QuebecIncomeTax)?.family;

        let mut eligible = Decimal::ZERO;
        for child in &household.children {
            let cost = non_negative(self.id(), "daycare_cost", child.daycare_cost)?;
            eligible += cost.min(params.limit(child));
        }
        if eligible.is_zero() {
            return Ok(ProgramResult::zero(self.id(), params.year()));
        }

        let rate = schedule_rate(&params.rate_schedule, family_net);
        let split = Split::household(
            eligible * rate,
            household.has_spouse(),
            SplitRule::Proportional(
                household.adult1.total_income(),
                household.adult2.as_ref().map_or(Decimal::ZERO, |p| p.total_income()),
            ),
        );
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("eligible_expenses", eligible)
            .with_detail("credit_rate", rate))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchoolSuppliesParams {
    pub amount_per_child: Decimal,
    pub minimum_age: u32,
    pub maximum_age: u32,
}

impl ProgramParams for SchoolSuppliesParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.threshold("amount_per_child", self.amount_per_child)?;
        check.ordered(("minimum_age", self.minimum_age), ("maximum_age", self.maximum_age))
    }
}

/// School supplies supplement, a fixed amount per school-age child.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchoolSupplies;

impl FiscalProgram for SchoolSupplies {
    fn id(&self) -> ProgramId {
        ProgramId::SchoolSupplies
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
        let params = params.lookup::<SchoolSuppliesParams>(self.id(), household.tax_year)?;
        let ages = params.minimum_age..=params.maximum_age;
        let eligible = household
            .children
            .iter()
            .filter(|c| ages.contains(&c.age))
            .count();
        let total = Decimal::from(eligible) * params.amount_per_child;

        let shared = household.has_spouse() && household.children.iter().any(|c| c.shared_custody);
        let split = if shared {
            Split::even(total)
        } else {
            Split::primary(total)
        };
        Ok(ProgramResult::computed(self.id(), params.year(), split)
            .with_detail("eligible_children", eligible)
            .with_detail("amount_per_child", params.amount_per_child))
    }
}
