use super::{check_incomes, paid_contributions, AgeAmount};
use crate::core::household::{Household, Person};
use crate::core::money::Split;
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::primitives::{bracket_tax, reduction, Bracket};
use crate::core::program::{
    non_negative, CalcError, FiscalProgram, NetIncome, ProgramId, ProgramResult, Stage, Upstream,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BasicPersonalAmount {
    pub max: Decimal,
    /// Floor reached by high incomes
    pub min: Decimal,
    pub reduction_threshold: Decimal,
    pub reduction_rate: Decimal,
}

impl BasicPersonalAmount {
    fn amount(&self, net_income: Decimal) -> Decimal {
        let reduced = self.max - reduction(net_income, self.reduction_threshold, self.reduction_rate);
        reduced.max(self.min)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalExpenses {
    /// Share of net income that expenses must exceed
    pub income_rate: Decimal,
    /// Cap on that share
    pub max_threshold: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FederalIncomeTaxParams {
    pub brackets: Vec<Bracket>,
    pub basic_personal_amount: BasicPersonalAmount,
    pub age_amount: AgeAmount,
    pub medical_expenses: MedicalExpenses,
    /// Refundable Quebec abatement, as a share of basic federal tax
    pub quebec_abatement: Decimal,
}

impl ProgramParams for FederalIncomeTaxParams {
    fn validate(&self, check: &Check) -> Result<(), ParamError> {
        check.brackets("brackets", &self.brackets)?;
        self.age_amount.validate(check)?;
        check.rates(&[
            ("basic_personal_amount.reduction_rate", self.basic_personal_amount.reduction_rate),
            ("medical_expenses.income_rate", self.medical_expenses.income_rate),
            ("quebec_abatement", self.quebec_abatement),
        ])?;
        check.thresholds(&[
            ("basic_personal_amount.min", self.basic_personal_amount.min),
            ("basic_personal_amount.max", self.basic_personal_amount.max),
            ("basic_personal_amount.reduction_threshold", self.basic_personal_amount.reduction_threshold),
            ("medical_expenses.max_threshold", self.medical_expenses.max_threshold),
        ])
    }
}

impl FederalIncomeTaxParams {
    fn lowest_rate(&self) -> Decimal {
        self.brackets.first().map_or(Decimal::ZERO, |b| b.rate)
    }

    fn medical_amount(&self, expenses: Decimal, net_income: Decimal) -> Decimal {
        let floor = (net_income * self.medical_expenses.income_rate).min(self.medical_expenses.max_threshold);
        (expenses - floor).max(Decimal::ZERO)
    }
}

/// Federal personal income tax, net of the Quebec abatement. Produces the
/// federal family net income read by the federal benefits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FederalIncomeTax;

impl FiscalProgram for FederalIncomeTax {
    fn id(&self) -> ProgramId {
        ProgramId::FederalIncomeTax
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
        let params = params.lookup::<FederalIncomeTaxParams>(self.id(), household.tax_year)?;
        check_incomes(self.id(), household)?;
        let medical_expenses = non_negative(self.id(), "medical_expenses", household.medical_expenses)?;

        let (paid1, paid2) = paid_contributions(upstream, self.needs())?;
        let net1 = household.adult1.total_income() - paid1;
        let net2 = household
            .adult2
            .as_ref()
            .map_or(Decimal::ZERO, |spouse| spouse.total_income() - paid2);

        let lowest_rate = params.lowest_rate();
        let keep = Decimal::ONE - params.quebec_abatement;
        let tax_of = |person: &Person, net: Decimal, medical: Decimal| {
            let amounts = params.basic_personal_amount.amount(net)
                + params.age_amount.amount(person, net)
                + medical;
            (bracket_tax(&params.brackets, net) - amounts * lowest_rate).max(Decimal::ZERO) * keep
        };

        // household medical expenses are claimed by the primary adult
        let medical = params.medical_amount(medical_expenses, net1);
        let tax1 = tax_of(&household.adult1, net1, medical);
        let tax2 = household
            .adult2
            .as_ref()
            .map_or(Decimal::ZERO, |spouse| tax_of(spouse, net2, Decimal::ZERO));

        let net_income = NetIncome::new(net1, net2);
        let mut result =
            ProgramResult::computed(self.id(), params.year(), Split::per_adult(tax1, tax2).negate())
                .with_net_income(net_income)
                .with_detail("family_net_income", net_income.family);
        if medical > Decimal::ZERO {
            result = result.with_detail("medical_expense_amount", medical);
        }
        Ok(result)
    }
}
