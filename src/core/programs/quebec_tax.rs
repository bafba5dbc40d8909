use super::{check_incomes, paid_contributions, AgeAmount};
use crate::core::household::{Household, Person};
use crate::core::money::Split;
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::primitives::{bracket_tax, phase_out, Bracket};
use crate::core::program::{
    CalcError, FiscalProgram, NetIncome, ProgramId, ProgramResult, Stage, Upstream,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerDeduction {
    pub rate: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetirementAmount {
    pub max: Decimal,
    pub income_threshold: Decimal,
    pub reduction_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivingAlone {
    pub base: Decimal,
    pub single_parent_supplement: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dependents {
    pub first_child: Decimal,
    pub subsequent_child: Decimal,
    pub single_parent_supplement: Decimal,
    pub disability: Decimal,
    pub student: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuebecIncomeTaxParams {
    pub brackets: Vec<Bracket>,
    pub basic_personal_amount: Decimal,
    pub worker_deduction: WorkerDeduction,
    pub age_amount: AgeAmount,
    pub retirement_amount: RetirementAmount,
    pub living_alone: LivingAlone,
    pub dependents: Dependents,
    /// Converts credit amounts into tax reductions
    pub transformation_rate: Decimal,
}

impl ProgramParams for QuebecIncomeTaxParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.brackets("brackets", &self.brackets)?;
        self.age_amount.validate(check)?;
        check.rates(&[
            ("worker_deduction.rate", self.worker_deduction.rate),
            ("retirement_amount.reduction_rate", self.retirement_amount.reduction_rate),
            ("transformation_rate", self.transformation_rate),
        ])?;
        check.thresholds(&[
            ("basic_personal_amount", self.basic_personal_amount),
            ("worker_deduction.max", self.worker_deduction.max),
            ("retirement_amount.max", self.retirement_amount.max),
            ("retirement_amount.income_threshold", self.retirement_amount.income_threshold),
            ("living_alone.base", self.living_alone.base),
            ("living_alone.single_parent_supplement", self.living_alone.single_parent_supplement),
            ("dependents.first_child", self.dependents.first_child),
            ("dependents.subsequent_child", self.dependents.subsequent_child),
            ("dependents.single_parent_supplement", self.dependents.single_parent_supplement),
            ("dependents.disability", self.dependents.disability),
            ("dependents.student", self.dependents.student),
        ])
    }
}

impl QuebecIncomeTaxParams {
    fn deduction_for_work(&self, person: &Person) -> Decimal {
        (person.work_income * self.worker_deduction.rate).min(self.worker_deduction.max)
    }

    /// Non-refundable credit amounts of one adult, before the transformation rate.
    /// Only the primary adult claims dependents.
    fn credit_amounts(
        &self,
        household: &Household,
        person: &Person,
        family_net_income: Decimal,
        claims_dependents: bool,
    ) -> Decimal {
        let mut amounts = self.basic_personal_amount;
        amounts += self.age_amount.amount(person, family_net_income);

        if person.retirement_income > Decimal::ZERO {
            let retirement = &self.retirement_amount;
            amounts += phase_out(
                retirement.max.min(person.retirement_income),
                family_net_income,
                retirement.income_threshold,
                retirement.reduction_rate,
            );
        }

        let lives_alone = !household.has_spouse();
        if lives_alone {
            amounts += self.living_alone.base;
            if household.has_children() {
                amounts += self.living_alone.single_parent_supplement;
            }
        }

        if claims_dependents && household.has_children() {
            amounts += self.dependent_amounts(household);
        }
        amounts
    }

    fn dependent_amounts(&self, household: &Household) -> Decimal {
        let dependents = &self.dependents;
        let children = Decimal::from(household.child_count());
        let disabled = household.children.iter().filter(|c| c.has_disability).count();
        let students = household.children.iter().filter(|c| c.is_student).count();

        let mut amount = dependents.first_child
            + (children - Decimal::ONE) * dependents.subsequent_child
            + Decimal::from(disabled) * dependents.disability
            + Decimal::from(students) * dependents.student;
        if !household.has_spouse() {
            amount += dependents.single_parent_supplement;
        }
        amount
    }
}

/// Quebec personal income tax. Produces the Quebec family net income read by
/// the provincial credits.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuebecIncomeTax;

impl FiscalProgram for QuebecIncomeTax {
    fn id(&self) -> ProgramId {
        ProgramId::QuebecIncomeTax
    }

    fn stage(&self) -> Stage {
        Stage::IncomeTax
    }

    fn needs(&self) -> &'static [ProgramId] {
        &[
            ProgramId::EmploymentInsurance,
            ProgramId::ParentalInsurance,
            ProgramId::PensionPlan,
        ]
    }

    fn calculate(
        &self,
        household: &Household,
        params: &ParameterStore,
        upstream: &Upstream<'_>,
    ) -> Result<ProgramResult, CalcError> {
        let params = params.lookup::<QuebecIncomeTaxParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;

        let (paid1, paid2) = paid_contributions(
            upstream,
            &[
                ProgramId::PensionPlan,
                ProgramId::ParentalInsurance,
                ProgramId::EmploymentInsurance,
            ],
        )?;

        let net_of = |person: &Person, paid: Decimal| {
            person.total_income() - params.deduction_for_work(person) - paid
        };
        let net1 = net_of(&household.adult1, paid1);
        let net2 = household
            .adult2
            .as_ref()
            .map_or(Decimal::ZERO, |spouse| net_of(spouse, paid2));
        let net_income = NetIncome::new(net1, net2);

        let tax_of = |person: &Person, net: Decimal, claims_dependents: bool| {
            let credits = params.credit_amounts(household, person, net1 + net2, claims_dependents)
                * params.transformation_rate;
            (bracket_tax(&params.brackets, net) - credits).max(Decimal::ZERO)
        };
        let tax1 = tax_of(&household.adult1, net1, true);
        let tax2 = household
            .adult2
            .as_ref()
            .map_or(Decimal::ZERO, |spouse| tax_of(spouse, net2, false));

        log::debug!("{}: net income {} + {}", self.id(), net_income.adult1, net_income.adult2);
        Ok(
            ProgramResult::computed(self.id(), params.year(), Split::per_adult(tax1, tax2).negate())
                .with_net_income(net_income)
                .with_detail("family_net_income", net_income.family),
        )
    }
}
