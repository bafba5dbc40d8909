//! Staged evaluation of the catalog for one household.

use super::catalog;
use super::household::Household;
use super::money::round_cents;
use super::params::ParameterStore;
use super::program::{CalcError, FiscalProgram, ProgramId, ProgramResult, Stage, Upstream};
use super::year::TaxYear;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Full result of one household: every program plus the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    pub tax_year: TaxYear,
    pub gross_income: Decimal,
    pub results: BTreeMap<ProgramId, ProgramResult>,
    pub disposable_income: Decimal,
}

impl Calculation {
    pub fn get(&self, id: ProgramId) -> Option<&ProgramResult> {
        self.results.get(&id)
    }

    pub fn total(&self, id: ProgramId) -> Decimal {
        self.get(id).map_or(Decimal::ZERO, |r| r.total)
    }
}

/// Programs grouped by stage, stages in execution order, programs in
/// catalog order within a stage.
#[derive(Clone)]
pub struct Pipeline<'a> {
    params: &'a ParameterStore,
    stages: Vec<(Stage, Vec<&'static dyn FiscalProgram>)>,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stages: Vec<_> = self
            .stages
            .iter()
            .map(|(stage, programs)| (stage, programs.iter().map(|p| p.id()).collect::<Vec<_>>()))
            .collect();
        f.debug_struct("Pipeline").field("stages", &stages).finish()
    }
}

impl<'a> Pipeline<'a> {
    /// Pipeline over the whole catalog.
    pub fn new(params: &'a ParameterStore) -> Result<Self, CalcError> {
        Self::with_programs(params, catalog::programs())
    }

    /// Every need must name a member of `programs` running in a strictly
    /// earlier stage.
    pub fn with_programs(
        params: &'a ParameterStore,
        programs: &[&'static dyn FiscalProgram],
    ) -> Result<Self, CalcError> {
        for program in programs {
            for need in program.needs() {
                let earlier = programs
                    .iter()
                    .find(|p| p.id() == *need)
                    .is_some_and(|p| p.stage() < program.stage());
                if !earlier {
                    return Err(CalcError::StageOrder {
                        program: program.id(),
                        needs: *need,
                    });
                }
            }
        }

        let mut stages: Vec<(Stage, Vec<&'static dyn FiscalProgram>)> = Vec::new();
        for stage in [Stage::Contributions, Stage::IncomeTax, Stage::Benefits] {
            let mut members: Vec<_> = programs.iter().copied().filter(|p| p.stage() == stage).collect();
            members.sort_by_key(|p| p.id());
            if !members.is_empty() {
                stages.push((stage, members));
            }
        }
        Ok(Pipeline { params, stages })
    }

    /// Validates the household, runs every stage and aggregates. Any failure
    /// aborts the whole calculation.
    pub fn calculate(&self, household: &Household) -> Result<Calculation, CalcError> {
        household.validate()?;

        let mut results: BTreeMap<ProgramId, ProgramResult> = BTreeMap::new();
        for (stage, programs) in &self.stages {
            log::debug!("{}: starting {} stage ({} programs)", household.tax_year, stage, programs.len());
            let outcomes: Vec<Result<ProgramResult, CalcError>> = programs
                .par_iter()
                .map(|program| {
                    let upstream = Upstream::for_program(*program, &results);
                    program.calculate(household, self.params, &upstream)
                })
                .collect();

            // outcomes are in catalog order, so the first error is deterministic
            let completed = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
            for result in completed {
                log::debug!("{}: {} ({:?})", result.program, result.total, result.status);
                results.insert(result.program, result);
            }
            log::debug!("{}: finished {} stage", household.tax_year, stage);
        }

        let gross_income = round_cents(household.gross_income());
        let disposable_income =
            round_cents(gross_income + results.values().map(|r| r.total).sum::<Decimal>());
        Ok(Calculation {
            tax_year: household.tax_year,
            gross_income,
            results,
            disposable_income,
        })
    }
}
