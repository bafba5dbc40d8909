//! Catalog entries whose rules are not modelled. They still require a
//! configured year so an unsupported year fails the same way everywhere.

use crate::core::household::Household;
use crate::core::params::{Check, ParamError, ParameterStore, ProgramParams};
use crate::core::program::{CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream};
use serde::Deserialize;

/// Empty table; only the configured years matter.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

impl ProgramParams for NoParams {
    fn validate(&self, _check: &Check) -> Result<(), ParamError> {
        Ok(())
    }
}

macro_rules! not_implemented {
    ($($(#[$doc:meta])* $name:ident => $id:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl FiscalProgram for $name {
                fn id(&self) -> ProgramId {
                    ProgramId::$id
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
                    let params = params.lookup::<NoParams>(self.id(), household.tax_year)?;
                    log::debug!("{}: not implemented, reporting zero", self.id());
                    Ok(ProgramResult::not_implemented(self.id(), params.year()))
                }
            }
        )+
    };
}

not_implemented! {
    /// Quebec family allowance
    FamilyAllowance => FamilyAllowance,
    /// Quebec refundable medical expense credit
    MedicalExpenseCredit => MedicalExpenseCredit,
    /// Quebec amount for senior assistance
    SeniorAssistance => SeniorAssistance,
    /// Canada child benefit
    ChildBenefit => ChildBenefit,
}
