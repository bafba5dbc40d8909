//! Every program the pipeline knows, in catalog order.

use super::params::{ParamError, ParamSource, ParameterStore};
use super::program::{FiscalProgram, ProgramId};
use super::programs::contributions::*;
use super::programs::federal_benefits::*;
use super::programs::federal_tax::*;
use super::programs::quebec_benefits::*;
use super::programs::quebec_tax::*;
use super::programs::social::*;
use super::programs::stubs::*;

static CATALOG: [&dyn FiscalProgram; 21] = [
    &EmploymentInsurance,
    &ParentalInsurance,
    &PensionPlan,
    &HealthServicesFund,
    &PrescriptionDrugInsurance,
    &QuebecIncomeTax,
    &FederalIncomeTax,
    &SocialAssistance,
    &FamilyAllowance,
    &WorkPremium,
    &SolidarityCredit,
    &ChildcareCredit,
    &ShelterAllowance,
    &MedicalExpenseCredit,
    &SeniorAssistance,
    &SchoolSupplies,
    &ChildBenefit,
    &GstCredit,
    &WorkersBenefit,
    &OldAgeSecurity,
    &MedicalExpenseSupplement,
];

pub fn programs() -> &'static [&'static dyn FiscalProgram] {
    &CATALOG
}

pub fn program(id: ProgramId) -> &'static dyn FiscalProgram {
    // CATALOG is laid out in ProgramId declaration order
    CATALOG[id as usize]
}

/// Registers the parameter type of each program with the store.
pub fn register_parameters(store: &mut ParameterStore, source: &ParamSource) -> Result<(), ParamError> {
    store.register::<EmploymentInsuranceParams>(ProgramId::EmploymentInsurance, source)?;
    store.register::<ParentalInsuranceParams>(ProgramId::ParentalInsurance, source)?;
    store.register::<PensionPlanParams>(ProgramId::PensionPlan, source)?;
    store.register::<HealthServicesFundParams>(ProgramId::HealthServicesFund, source)?;
    store.register::<PrescriptionDrugInsuranceParams>(ProgramId::PrescriptionDrugInsurance, source)?;
    store.register::<QuebecIncomeTaxParams>(ProgramId::QuebecIncomeTax, source)?;
    store.register::<FederalIncomeTaxParams>(ProgramId::FederalIncomeTax, source)?;
    store.register::<SocialAssistanceParams>(ProgramId::SocialAssistance, source)?;
    store.register::<NoParams>(ProgramId::FamilyAllowance, source)?;
    store.register::<WorkPremiumParams>(ProgramId::WorkPremium, source)?;
    store.register::<SolidarityCreditParams>(ProgramId::SolidarityCredit, source)?;
    store.register::<ChildcareCreditParams>(ProgramId::ChildcareCredit, source)?;
    store.register::<ShelterAllowanceParams>(ProgramId::ShelterAllowance, source)?;
    store.register::<NoParams>(ProgramId::MedicalExpenseCredit, source)?;
    store.register::<NoParams>(ProgramId::SeniorAssistance, source)?;
    store.register::<SchoolSuppliesParams>(ProgramId::SchoolSupplies, source)?;
    store.register::<NoParams>(ProgramId::ChildBenefit, source)?;
    store.register::<GstCreditParams>(ProgramId::GstCredit, source)?;
    store.register::<WorkersBenefitParams>(ProgramId::WorkersBenefit, source)?;
    store.register::<OldAgeSecurityParams>(ProgramId::OldAgeSecurity, source)?;
    store.register::<MedicalExpenseSupplementParams>(ProgramId::MedicalExpenseSupplement, source)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_program_ids() {
        let ids: Vec<ProgramId> = programs().iter().map(|p| p.id()).collect();
        assert_eq!(ids, ProgramId::ALL);
        for id in ProgramId::ALL {
            assert_eq!(program(id).id(), id);
        }
    }

    #[test]
    fn every_need_runs_in_an_earlier_stage() {
        for p in programs() {
            for need in p.needs() {
                assert!(program(*need).stage() < p.stage(), "{} needs {}", p.id(), need);
            }
        }
    }
}
