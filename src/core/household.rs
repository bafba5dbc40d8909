use super::year::TaxYear;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Age from which retirement-linked rules apply.
pub const RETIREMENT_AGE: u32 = 65;

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("{status} household requires a spouse")]
    MissingSpouse { status: FamilyStatus },
    #[error("{status} household cannot have a spouse")]
    UnexpectedSpouse { status: FamilyStatus },
    #[error("{adult} is {age}, retired households require every adult to be at least {RETIREMENT_AGE}")]
    AdultBelowRetirementAge { adult: AdultRole, age: u32 },
    #[error("{status} household cannot have children")]
    ChildrenNotAllowed { status: FamilyStatus },
}

/// Family situation of the household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FamilyStatus {
    /// Person living alone, no children
    Single,
    SingleParent,
    Couple,
    RetiredSingle,
    RetiredCouple,
}

impl FamilyStatus {
    pub fn is_couple(self) -> bool {
        matches!(self, FamilyStatus::Couple | FamilyStatus::RetiredCouple)
    }

    pub fn is_retired(self) -> bool {
        matches!(self, FamilyStatus::RetiredSingle | FamilyStatus::RetiredCouple)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FamilyStatus::Single => "single",
            FamilyStatus::SingleParent => "single_parent",
            FamilyStatus::Couple => "couple",
            FamilyStatus::RetiredSingle => "retired_single",
            FamilyStatus::RetiredCouple => "retired_couple",
        }
    }
}

impl std::fmt::Display for FamilyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdultRole {
    Primary,
    Spouse,
}

impl std::fmt::Display for AdultRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdultRole::Primary => f.write_str("primary adult"),
            AdultRole::Spouse => f.write_str("spouse"),
        }
    }
}

/// Employability constraint recognised by last-resort assistance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentConstraint {
    #[default]
    None,
    Temporary,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DaycareType {
    Subsidized,
    NonSubsidized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionalCareTier {
    Tier1,
    Tier2,
}

/// Adult as supplied by the caller. The retired flag is not an input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AdultInput {
    pub age: u32,
    /// Gross employment income
    #[serde(default)]
    #[schemars(with = "String")]
    pub work_income: Decimal,
    #[serde(default)]
    #[schemars(with = "String")]
    pub self_employed_income: Decimal,
    /// Gross retirement income (pensions, annuities)
    #[serde(default)]
    #[schemars(with = "String")]
    pub retirement_income: Decimal,
    #[serde(default)]
    pub has_disability: bool,
    #[serde(default)]
    pub constraint: EmploymentConstraint,
    #[serde(default)]
    pub is_student: bool,
}

/// An adult of the household
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub age: u32,
    pub work_income: Decimal,
    pub self_employed_income: Decimal,
    pub retirement_income: Decimal,
    pub has_disability: bool,
    pub constraint: EmploymentConstraint,
    pub is_student: bool,
    is_retired: bool,
}

impl Person {
    fn from_input(input: AdultInput, is_retired: bool) -> Self {
        Person {
            age: input.age,
            work_income: input.work_income,
            self_employed_income: input.self_employed_income,
            retirement_income: input.retirement_income,
            has_disability: input.has_disability,
            constraint: input.constraint,
            is_student: input.is_student,
            is_retired,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.is_retired
    }

    /// Retired and old enough to be exempt from employment-linked contributions
    pub fn is_retired_senior(&self) -> bool {
        self.is_retired && self.age >= RETIREMENT_AGE
    }

    pub fn total_income(&self) -> Decimal {
        self.work_income + self.self_employed_income + self.retirement_income
    }
}

/// A dependent child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Child {
    pub age: u32,
    /// Annual daycare fees paid
    #[serde(default)]
    #[schemars(with = "String")]
    pub daycare_cost: Decimal,
    #[serde(default)]
    pub daycare_type: Option<DaycareType>,
    #[serde(default)]
    pub has_disability: bool,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub shared_custody: bool,
    #[serde(default)]
    pub exceptional_care: Option<ExceptionalCareTier>,
}

impl Child {
    pub fn new(age: u32) -> Self {
        Child {
            age,
            daycare_cost: Decimal::ZERO,
            daycare_type: None,
            has_disability: false,
            is_student: false,
            shared_custody: false,
            exceptional_care: None,
        }
    }
}

/// Household description without the year, shared by single calculations and
/// golden records (which evaluate the same family for several years).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FamilyInput {
    pub status: FamilyStatus,
    pub adult1: AdultInput,
    #[serde(default)]
    pub adult2: Option<AdultInput>,
    #[serde(default)]
    pub children: Vec<Child>,
    /// Annual rent or housing cost
    #[serde(default)]
    #[schemars(with = "String")]
    pub housing_cost: Decimal,
    /// Annual out-of-pocket medical expenses for the household
    #[serde(default)]
    #[schemars(with = "String")]
    pub medical_expenses: Decimal,
    /// Household lives in a northern village
    #[serde(default)]
    pub northern_village: bool,
}

impl FamilyInput {
    pub fn for_year(self, tax_year: TaxYear) -> Household {
        let retired = self.status.is_retired();
        Household {
            status: self.status,
            tax_year,
            adult1: Person::from_input(self.adult1, retired),
            adult2: self.adult2.map(|a| Person::from_input(a, retired)),
            children: self.children,
            housing_cost: self.housing_cost,
            medical_expenses: self.medical_expenses,
            northern_village: self.northern_village,
        }
    }
}

/// Household calculation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HouseholdInput {
    pub tax_year: TaxYear,
    #[serde(flatten)]
    pub family: FamilyInput,
}

impl From<HouseholdInput> for Household {
    fn from(input: HouseholdInput) -> Self {
        input.family.for_year(input.tax_year)
    }
}

/// Immutable household as seen by every program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Household {
    pub status: FamilyStatus,
    pub tax_year: TaxYear,
    pub adult1: Person,
    pub adult2: Option<Person>,
    pub children: Vec<Child>,
    pub housing_cost: Decimal,
    pub medical_expenses: Decimal,
    pub northern_village: bool,
}

impl Household {
    /// First violation wins; the order of checks is fixed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let status = self.status;
        if status.is_couple() && self.adult2.is_none() {
            return Err(ValidationError::MissingSpouse { status });
        }
        if !status.is_couple() && self.adult2.is_some() {
            return Err(ValidationError::UnexpectedSpouse { status });
        }
        if status.is_retired() {
            for (adult, person) in self.adults() {
                if person.age < RETIREMENT_AGE {
                    return Err(ValidationError::AdultBelowRetirementAge {
                        adult,
                        age: person.age,
                    });
                }
            }
        }
        if !self.children.is_empty() && (status.is_retired() || status == FamilyStatus::Single) {
            return Err(ValidationError::ChildrenNotAllowed { status });
        }
        Ok(())
    }

    pub fn adults(&self) -> impl Iterator<Item = (AdultRole, &Person)> {
        std::iter::once((AdultRole::Primary, &self.adult1))
            .chain(self.adult2.iter().map(|p| (AdultRole::Spouse, p)))
    }

    pub fn has_spouse(&self) -> bool {
        self.adult2.is_some()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Sum over adults of `f`, zero for a missing spouse
    pub fn sum_adults(&self, f: impl Fn(&Person) -> Decimal) -> Decimal {
        self.adults().map(|(_, p)| f(p)).sum()
    }

    pub fn gross_income(&self) -> Decimal {
        self.sum_adults(Person::total_income)
    }

    pub fn work_income(&self) -> Decimal {
        self.sum_adults(|p| p.work_income)
    }

    pub fn any_adult(&self, f: impl Fn(&Person) -> bool) -> bool {
        self.adults().any(|(_, p)| f(p))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn worker(age: u32, work_income: Decimal) -> AdultInput {
        AdultInput {
            age,
            work_income,
            ..Default::default()
        }
    }

    pub(crate) fn retiree(age: u32, retirement_income: Decimal) -> AdultInput {
        AdultInput {
            age,
            retirement_income,
            ..Default::default()
        }
    }

    pub(crate) fn family(status: FamilyStatus, adult1: AdultInput, adult2: Option<AdultInput>) -> FamilyInput {
        FamilyInput {
            status,
            adult1,
            adult2,
            children: vec![],
            housing_cost: Decimal::ZERO,
            medical_expenses: Decimal::ZERO,
            northern_village: false,
        }
    }

    pub(crate) fn household(
        status: FamilyStatus,
        adult1: AdultInput,
        adult2: Option<AdultInput>,
        year: i32,
    ) -> Household {
        family(status, adult1, adult2).for_year(TaxYear(year))
    }

    #[test]
    fn status_sets_retired_flag() {
        let h = household(
            FamilyStatus::RetiredCouple,
            retiree(68, dec!(45000)),
            Some(retiree(66, dec!(40000))),
            2024,
        );
        assert!(h.adult1.is_retired());
        assert!(h.adult2.as_ref().unwrap().is_retired());

        let h = household(FamilyStatus::Single, worker(70, dec!(1)), None, 2024);
        assert!(!h.adult1.is_retired());
    }

    #[test]
    fn total_income_is_derived() {
        let mut input = worker(40, dec!(30000));
        input.self_employed_income = dec!(5000);
        input.retirement_income = dec!(1000);
        let h = household(FamilyStatus::Single, input, None, 2024);
        assert_eq!(h.adult1.total_income(), dec!(36000));
        assert_eq!(h.gross_income(), dec!(36000));
    }

    #[test]
    fn valid_households_pass() {
        let h = household(FamilyStatus::Couple, worker(40, dec!(1)), Some(worker(38, dec!(1))), 2024);
        assert_eq!(h.validate(), Ok(()));

        let mut f = family(FamilyStatus::SingleParent, worker(30, dec!(0)), None);
        f.children.push(Child::new(4));
        assert_eq!(f.for_year(TaxYear(2023)).validate(), Ok(()));
    }

    #[test]
    fn couple_without_spouse() {
        let h = household(FamilyStatus::Couple, worker(40, dec!(1)), None, 2024);
        assert_eq!(
            h.validate(),
            Err(ValidationError::MissingSpouse {
                status: FamilyStatus::Couple
            })
        );
    }

    #[test]
    fn single_with_spouse() {
        let h = household(FamilyStatus::SingleParent, worker(40, dec!(1)), Some(worker(40, dec!(1))), 2024);
        assert_eq!(
            h.validate(),
            Err(ValidationError::UnexpectedSpouse {
                status: FamilyStatus::SingleParent
            })
        );
    }

    #[test]
    fn retired_spouse_under_65() {
        let h = household(
            FamilyStatus::RetiredCouple,
            retiree(70, dec!(1)),
            Some(retiree(60, dec!(1))),
            2024,
        );
        assert_eq!(
            h.validate(),
            Err(ValidationError::AdultBelowRetirementAge {
                adult: AdultRole::Spouse,
                age: 60
            })
        );
    }

    #[test]
    fn children_not_allowed() {
        let mut f = family(FamilyStatus::Single, worker(30, dec!(1)), None);
        f.children.push(Child::new(3));
        assert_eq!(
            f.for_year(TaxYear(2024)).validate(),
            Err(ValidationError::ChildrenNotAllowed {
                status: FamilyStatus::Single
            })
        );

        let mut f = family(FamilyStatus::RetiredSingle, retiree(70, dec!(1)), None);
        f.children.push(Child::new(3));
        assert!(matches!(
            f.for_year(TaxYear(2024)).validate(),
            Err(ValidationError::ChildrenNotAllowed { .. })
        ));
    }

    /// Spouse check precedes the age check
    #[test]
    fn first_violation_wins() {
        let h = household(FamilyStatus::RetiredCouple, retiree(50, dec!(1)), None, 2024);
        assert!(matches!(h.validate(), Err(ValidationError::MissingSpouse { .. })));
    }

    #[test]
    fn household_json_defaults() {
        let json = r#"{
            "tax_year": 2024,
            "status": "single_parent",
            "adult1": {"age": 30, "work_income": "0"},
            "children": [{"age": 4, "daycare_cost": 8000, "daycare_type": "subsidized"}]
        }"#;
        let input: HouseholdInput = serde_json::from_str(json).unwrap();
        let h: Household = input.into();
        assert_eq!(h.tax_year, TaxYear(2024));
        assert_eq!(h.children[0].daycare_cost, dec!(8000));
        assert_eq!(h.children[0].daycare_type, Some(DaycareType::Subsidized));
        assert!(!h.children[0].shared_custody);
        assert_eq!(h.adult1.constraint, EmploymentConstraint::None);
        assert_eq!(h.housing_cost, dec!(0));
    }
}
