//! Arithmetic shared by every program: brackets, phase-outs and rate schedules.

use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One band of a progressive schedule. `upto: None` is the unbounded top band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bracket {
    #[schemars(with = "Option<String>")]
    pub upto: Option<Decimal>,
    #[schemars(with = "String")]
    pub rate: Decimal,
}

/// Progressive tax: each band's rate applies only to the income inside it.
pub fn bracket_tax(brackets: &[Bracket], income: Decimal) -> Decimal {
    if income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for bracket in brackets {
        let in_band = match bracket.upto {
            Some(upper) => (income.min(upper) - lower).max(Decimal::ZERO),
            None => income - lower,
        };
        tax += in_band * bracket.rate;
        match bracket.upto {
            Some(upper) if income > upper => lower = upper,
            _ => break,
        }
    }
    tax
}

/// Rate of the first band whose upper bound is at or above `income`.
pub fn schedule_rate(schedule: &[Bracket], income: Decimal) -> Decimal {
    schedule
        .iter()
        .find(|b| b.upto.is_none_or(|upper| income <= upper))
        .map(|b| b.rate)
        .unwrap_or(Decimal::ZERO)
}

/// Linear reduction above a threshold, never negative.
pub fn reduction(income: Decimal, threshold: Decimal, rate: Decimal) -> Decimal {
    ((income - threshold) * rate).max(Decimal::ZERO)
}

/// Benefit after a linear phase-out, floored at zero.
pub fn phase_out(base: Decimal, income: Decimal, threshold: Decimal, rate: Decimal) -> Decimal {
    (base - reduction(income, threshold, rate)).max(Decimal::ZERO)
}

/// Phase-in on earnings: `(earnings - excluded) * rate`, capped at `max`.
pub fn phase_in(earnings: Decimal, excluded: Decimal, rate: Decimal, max: Decimal) -> Decimal {
    ((earnings - excluded).max(Decimal::ZERO) * rate).min(max)
}

/// Two-tier schedule: the first rate applies between the two thresholds and
/// is capped at `base`; beyond the second threshold `base` is carried forward
/// and the second rate applies, capped at `max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoTier {
    pub first_threshold: Decimal,
    pub first_rate: Decimal,
    pub base: Decimal,
    pub second_threshold: Decimal,
    pub second_rate: Decimal,
    pub max: Decimal,
}

impl TwoTier {
    pub fn amount(&self, income: Decimal) -> Decimal {
        if income <= self.first_threshold {
            Decimal::ZERO
        } else if income <= self.second_threshold {
            ((income - self.first_threshold) * self.first_rate).min(self.base)
        } else {
            (self.base + (income - self.second_threshold) * self.second_rate).min(self.max)
        }
    }

    /// Continuous at the second threshold only if the first tier reaches `base`.
    pub fn is_continuous(&self) -> bool {
        (self.second_threshold - self.first_threshold) * self.first_rate >= self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn band(upto: Option<Decimal>, rate: Decimal) -> Bracket {
        Bracket { upto, rate }
    }

    fn qc_2024() -> Vec<Bracket> {
        vec![
            band(Some(dec!(51780)), dec!(0.14)),
            band(Some(dec!(103545)), dec!(0.19)),
            band(Some(dec!(126000)), dec!(0.24)),
            band(None, dec!(0.2575)),
        ]
    }

    #[test]
    fn tax_inside_first_band() {
        assert_eq!(bracket_tax(&qc_2024(), dec!(10000)), dec!(1400));
    }

    #[test]
    fn tax_exactly_on_boundary() {
        assert_eq!(bracket_tax(&qc_2024(), dec!(51780)), dec!(7249.20));
        // one dollar above is taxed only at the next rate
        assert_eq!(bracket_tax(&qc_2024(), dec!(51781)), dec!(7249.39));
    }

    #[test]
    fn tax_in_top_band() {
        // 7249.20 + 51765 * .19 + 22455 * .24 + 24000 * .2575
        let expected = dec!(7249.20) + dec!(9835.35) + dec!(5389.20) + dec!(6180);
        assert_eq!(bracket_tax(&qc_2024(), dec!(150000)), expected);
    }

    #[test]
    fn no_tax_on_zero_or_negative_income() {
        assert_eq!(bracket_tax(&qc_2024(), dec!(0)), dec!(0));
        assert_eq!(bracket_tax(&qc_2024(), dec!(-5)), dec!(0));
    }

    #[test]
    fn schedule_rate_picks_band() {
        let schedule = vec![
            band(Some(dec!(24110)), dec!(0.78)),
            band(Some(dec!(42515)), dec!(0.75)),
            band(None, dec!(0.67)),
        ];
        assert_eq!(schedule_rate(&schedule, dec!(0)), dec!(0.78));
        assert_eq!(schedule_rate(&schedule, dec!(24110)), dec!(0.78));
        assert_eq!(schedule_rate(&schedule, dec!(24110.01)), dec!(0.75));
        assert_eq!(schedule_rate(&schedule, dec!(1000000)), dec!(0.67));
    }

    #[test]
    fn phase_out_below_threshold_is_untouched() {
        assert_eq!(phase_out(dec!(500), dec!(10000), dec!(20000), dec!(0.05)), dec!(500));
    }

    #[test]
    fn phase_out_floors_at_zero() {
        assert_eq!(phase_out(dec!(500), dec!(100000), dec!(20000), dec!(0.05)), dec!(0));
    }

    #[test]
    fn phase_in_caps_at_max() {
        assert_eq!(phase_in(dec!(1000), dec!(2400), dec!(0.116), dec!(1152.34)), dec!(0));
        assert_eq!(phase_in(dec!(3400), dec!(2400), dec!(0.116), dec!(1152.34)), dec!(116));
        assert_eq!(phase_in(dec!(50000), dec!(2400), dec!(0.116), dec!(1152.34)), dec!(1152.34));
    }

    fn hsf_2024() -> TwoTier {
        TwoTier {
            first_threshold: dec!(17630),
            first_rate: dec!(0.01),
            base: dec!(150),
            second_threshold: dec!(61315),
            second_rate: dec!(0.01),
            max: dec!(1000),
        }
    }

    #[test]
    fn two_tier_tiers() {
        let hsf = hsf_2024();
        assert!(hsf.is_continuous());
        assert_eq!(hsf.amount(dec!(17630)), dec!(0));
        assert_eq!(hsf.amount(dec!(27630)), dec!(100));
        assert_eq!(hsf.amount(dec!(40000)), dec!(150));
        assert_eq!(hsf.amount(dec!(61315)), dec!(150));
        assert_eq!(hsf.amount(dec!(71315)), dec!(250));
        assert_eq!(hsf.amount(dec!(500000)), dec!(1000));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn prop_bracket_tax_non_decreasing(a in 0i64..40_000_000, b in 0i64..40_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let brackets = qc_2024();
            let lo_tax = bracket_tax(&brackets, Decimal::new(lo, 2));
            let hi_tax = bracket_tax(&brackets, Decimal::new(hi, 2));
            prop_assert!(lo_tax <= hi_tax);
        }

        #[test]
        fn prop_bracket_tax_continuous_at_boundaries(idx in 0usize..3) {
            let brackets = qc_2024();
            let boundary = brackets[idx].upto.unwrap();
            let epsilon = dec!(0.01);
            let below = bracket_tax(&brackets, boundary);
            let above = bracket_tax(&brackets, boundary + epsilon);
            let next_rate = brackets[idx + 1].rate;
            prop_assert_eq!(above - below, next_rate * epsilon);
        }

        #[test]
        fn prop_phase_out_within_bounds(
            base in 0i64..1_000_000,
            income in 0i64..50_000_000,
            threshold in 0i64..10_000_000,
            rate_bp in 0i64..10_000,
        ) {
            let base = Decimal::new(base, 2);
            let result = phase_out(
                base,
                Decimal::new(income, 2),
                Decimal::new(threshold, 2),
                Decimal::new(rate_bp, 4),
            );
            prop_assert!(result >= Decimal::ZERO);
            prop_assert!(result <= base);
        }

        #[test]
        fn prop_two_tier_continuous_and_bounded(income in 0i64..20_000_000) {
            let hsf = hsf_2024();
            let x = Decimal::new(income, 2);
            let amount = hsf.amount(x);
            prop_assert!(amount >= Decimal::ZERO && amount <= hsf.max);
            let at = hsf.amount(hsf.second_threshold);
            let after = hsf.amount(hsf.second_threshold + dec!(0.01));
            prop_assert!(after - at <= hsf.second_rate * dec!(0.01));
        }
    }
}
