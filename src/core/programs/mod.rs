//! Catalog members, grouped the way the pipeline stages them.

pub mod contributions;
pub mod federal_benefits;
pub mod federal_tax;
pub mod quebec_benefits;
pub mod quebec_tax;
pub mod social;
pub mod stubs;

use super::household::{Household, Person};
use super::params::{Check, ParamError};
use super::primitives::{phase_in, phase_out};
use super::program::{non_negative, CalcError, ProgramId, Upstream};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Applies `f` to each adult; a missing spouse contributes zero.
pub(crate) fn per_adult(
    household: &Household,
    mut f: impl FnMut(&Person) -> Result<Decimal, CalcError>,
) -> Result<(Decimal, Decimal), CalcError> {
    let adult1 = f(&household.adult1)?;
    let adult2 = match &household.adult2 {
        Some(spouse) => f(spouse)?,
        None => Decimal::ZERO,
    };
    Ok((adult1, adult2))
}

/// Every income field of every adult must be non-negative.
pub(crate) fn check_incomes(program: ProgramId, household: &Household) -> Result<(), CalcError> {
    for (_, person) in household.adults() {
        non_negative(program, "work_income", person.work_income)?;
        non_negative(program, "self_employed_income", person.self_employed_income)?;
        non_negative(program, "retirement_income", person.retirement_income)?;
    }
    Ok(())
}

/// Contributions paid by each adult, as positive amounts.
pub(crate) fn paid_contributions(
    upstream: &Upstream<'_>,
    programs: &[ProgramId],
) -> Result<(Decimal, Decimal), CalcError> {
    programs
        .iter()
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(adult1, adult2), id| {
            let result = upstream.get(*id)?;
            Ok((adult1 + result.adult1.abs(), adult2 + result.adult2.abs()))
        })
}

/// Age credit shared by both income taxes, phased out above an income threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct AgeAmount {
    pub minimum_age: u32,
    pub max: Decimal,
    pub income_threshold: Decimal,
    pub reduction_rate: Decimal,
}

impl AgeAmount {
    pub fn amount(&self, person: &Person, income: Decimal) -> Decimal {
        if person.age < self.minimum_age {
            return Decimal::ZERO;
        }
        phase_out(self.max, income, self.income_threshold, self.reduction_rate)
    }

    pub fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.rate("age_amount.reduction_rate", self.reduction_rate)?;
        check.thresholds(&[
            ("age_amount.max", self.max),
            ("age_amount.income_threshold", self.income_threshold),
        ])
    }
}

/// Earnings supplement phased in on work income and out on family net income.
#[derive(Debug, Clone, Deserialize)]
pub struct EarningsSupplement {
    pub excluded_income: Decimal,
    pub rate: Decimal,
    pub max: Decimal,
    pub reduction_threshold: Decimal,
    pub reduction_rate: Decimal,
}

impl EarningsSupplement {
    pub fn amount(&self, work_income: Decimal, family_net_income: Decimal) -> Decimal {
        let earned = phase_in(work_income, self.excluded_income, self.rate, self.max);
        phase_out(earned, family_net_income, self.reduction_threshold, self.reduction_rate)
    }

    pub fn validate(&self, check: &Check, field: &str) -> Result<(), ParamError> {
        check.rates(&[
            (format!("{field}.rate").as_str(), self.rate),
            (format!("{field}.reduction_rate").as_str(), self.reduction_rate),
        ])?;
        check.thresholds(&[
            (format!("{field}.excluded_income").as_str(), self.excluded_income),
            (format!("{field}.max").as_str(), self.max),
            (format!("{field}.reduction_threshold").as_str(), self.reduction_threshold),
        ])
    }
}

/// Family composition used by several benefit tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyType {
    PersonAlone,
    CoupleNoChildren,
    SingleParent,
    CoupleWithChildren,
}

impl FamilyType {
    pub fn of(household: &Household) -> Self {
        match (household.has_spouse(), household.has_children()) {
            (false, false) => FamilyType::PersonAlone,
            (true, false) => FamilyType::CoupleNoChildren,
            (false, true) => FamilyType::SingleParent,
            (true, true) => FamilyType::CoupleWithChildren,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FamilyType::PersonAlone => "person_alone",
            FamilyType::CoupleNoChildren => "couple_no_children",
            FamilyType::SingleParent => "single_parent",
            FamilyType::CoupleWithChildren => "couple_with_children",
        }
    }
}

/// One parameter block per family type.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ByFamilyType<T> {
    pub person_alone: T,
    pub couple_no_children: T,
    pub single_parent: T,
    pub couple_with_children: T,
}

impl<T> ByFamilyType<T> {
    pub fn get(&self, family: FamilyType) -> &T {
        match family {
            FamilyType::PersonAlone => &self.person_alone,
            FamilyType::CoupleNoChildren => &self.couple_no_children,
            FamilyType::SingleParent => &self.single_parent,
            FamilyType::CoupleWithChildren => &self.couple_with_children,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FamilyType, &T)> {
        [
            FamilyType::PersonAlone,
            FamilyType::CoupleNoChildren,
            FamilyType::SingleParent,
            FamilyType::CoupleWithChildren,
        ]
        .into_iter()
        .map(move |family| (family, self.get(family)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::catalog;
    use crate::core::household::Household;
    use crate::core::params::test_store;
    use crate::core::program::{CalcError, ProgramId, ProgramResult, Upstream};
    use std::collections::BTreeMap;

    /// Runs `id` after recursively running whatever it needs.
    pub(crate) fn evaluate(id: ProgramId, household: &Household) -> Result<ProgramResult, CalcError> {
        let mut results = BTreeMap::new();
        evaluate_into(id, household, &mut results)
    }

    fn evaluate_into(
        id: ProgramId,
        household: &Household,
        results: &mut BTreeMap<ProgramId, ProgramResult>,
    ) -> Result<ProgramResult, CalcError> {
        let program = catalog::program(id);
        for need in program.needs() {
            if !results.contains_key(need) {
                let result = evaluate_into(*need, household, results)?;
                results.insert(*need, result);
            }
        }
        program.calculate(household, test_store(), &Upstream::for_program(program, results))
    }
}
