pub mod catalog;
pub mod golden;
pub mod household;
pub mod money;
pub mod params;
pub mod pipeline;
pub mod primitives;
pub mod program;
pub mod programs;
pub mod year;

// Flat public surface for domain types and functions.
pub use golden::{compare_record, read_records, KeyComparison};
pub use household::{AdultInput, Child, FamilyInput, FamilyStatus, Household, HouseholdInput};
pub use money::display_amount;
pub use params::{ParamSource, ParameterStore};
pub use pipeline::{Calculation, Pipeline};
pub use program::{ProgramId, ResultStatus};
pub use year::TaxYear;
#[allow(unused_imports)]
pub use golden::{GoldenError, GoldenRecord};
#[allow(unused_imports)]
pub use household::{DaycareType, EmploymentConstraint, ExceptionalCareTier, Person, ValidationError};
#[allow(unused_imports)]
pub use program::{CalcError, Detail, FiscalProgram, ProgramResult, Stage};
