use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Round to the cent, half away from zero. The result always carries two
/// decimal places and never a negative zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// Display helper used by tables.
pub fn display_amount(amount: Decimal) -> String {
    round_cents(amount).to_string()
}

/// Amount attributed to each adult of the household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Split {
    pub adult1: Decimal,
    pub adult2: Decimal,
}

impl Split {
    /// Per-adult amounts computed independently; each is rounded on its own.
    pub fn per_adult(adult1: Decimal, adult2: Decimal) -> Self {
        Split {
            adult1: round_cents(adult1),
            adult2: round_cents(adult2),
        }
    }

    /// Everything attributed to the primary adult.
    pub fn primary(total: Decimal) -> Self {
        Split {
            adult1: round_cents(total),
            adult2: round_cents(Decimal::ZERO),
        }
    }

    /// Strict 50/50 split of a household amount.
    pub fn even(total: Decimal) -> Self {
        let total = round_cents(total);
        let half = round_cents(total / Decimal::TWO);
        absorb_remainder(total, half, half)
    }

    /// Split in proportion to each adult's qualifying income, 50/50 when both
    /// incomes are zero.
    pub fn proportional(total: Decimal, income1: Decimal, income2: Decimal) -> Self {
        let combined = income1 + income2;
        if combined <= Decimal::ZERO {
            return Split::even(total);
        }
        let total = round_cents(total);
        let share1 = round_cents(total * income1 / combined);
        let share2 = round_cents(total * income2 / combined);
        absorb_remainder(total, share1, share2)
    }

    /// Household split: proportional/even when there is a spouse, otherwise
    /// everything to the primary adult.
    pub fn household(total: Decimal, has_spouse: bool, rule: SplitRule) -> Self {
        if !has_spouse {
            return Split::primary(total);
        }
        match rule {
            SplitRule::Even => Split::even(total),
            SplitRule::Proportional(income1, income2) => {
                Split::proportional(total, income1, income2)
            }
        }
    }

    pub fn total(&self) -> Decimal {
        self.adult1 + self.adult2
    }

    pub fn negate(self) -> Self {
        Split {
            adult1: round_cents(-self.adult1),
            adult2: round_cents(-self.adult2),
        }
    }
}

/// How a household-level amount is attributed between spouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    Even,
    Proportional(Decimal, Decimal),
}

/// Shares must sum to `total`; any cent of drift goes to the larger share.
fn absorb_remainder(total: Decimal, share1: Decimal, share2: Decimal) -> Split {
    let remainder = total - share1 - share2;
    if remainder.is_zero() {
        return Split {
            adult1: share1,
            adult2: share2,
        };
    }
    if share1.abs() >= share2.abs() {
        Split {
            adult1: share1 + remainder,
            adult2: share2,
        }
    } else {
        Split {
            adult1: share1,
            adult2: share2 + remainder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_cents(dec!(1.005)), dec!(1.01));
        assert_eq!(round_cents(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_cents(dec!(2.004)), dec!(2.00));
    }

    #[test]
    fn negative_zero_prints_without_sign() {
        assert_eq!(display_amount(dec!(-0.001)), "0.00");
        assert_eq!(Split::primary(dec!(0)).negate().adult1.to_string(), "0.00");
    }

    #[test]
    fn even_split_of_odd_cents() {
        let split = Split::even(dec!(100.01));
        assert_eq!(split.total(), dec!(100.01));
        assert_eq!(split.adult1, dec!(100.01) - split.adult2);
    }

    #[test]
    fn proportional_split_zero_income_is_even() {
        let split = Split::proportional(dec!(300), dec!(0), dec!(0));
        assert_eq!(split.adult1, dec!(150));
        assert_eq!(split.adult2, dec!(150));
    }

    #[test]
    fn proportional_split_thirds() {
        // 100 / 3 drifts by a cent; the larger share absorbs it
        let split = Split::proportional(dec!(100), dec!(2), dec!(1));
        assert_eq!(split.adult1, dec!(66.67));
        assert_eq!(split.adult2, dec!(33.33));

        let split = Split::proportional(dec!(0.05), dec!(1), dec!(1));
        assert_eq!(split.total(), dec!(0.05));
    }

    #[test]
    fn single_household_gets_everything() {
        let split = Split::household(dec!(42.424), false, SplitRule::Even);
        assert_eq!(split.adult1, dec!(42.42));
        assert_eq!(split.adult2, dec!(0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_proportional_split_conserves_total(
            cents in 0i64..10_000_000,
            income1 in 0i64..500_000,
            income2 in 0i64..500_000,
        ) {
            let total = Decimal::new(cents, 2);
            let split = Split::proportional(total, Decimal::from(income1), Decimal::from(income2));
            prop_assert_eq!(split.adult1 + split.adult2, total);
            prop_assert!(split.adult1 >= Decimal::ZERO);
            prop_assert!(split.adult2 >= Decimal::ZERO);
        }

        #[test]
        fn prop_even_split_conserves_total(cents in -10_000_000i64..10_000_000) {
            let total = Decimal::new(cents, 2);
            let split = Split::even(total);
            prop_assert_eq!(split.adult1 + split.adult2, total);
            prop_assert!((split.adult1 - split.adult2).abs() <= dec!(0.01));
        }
    }
}
