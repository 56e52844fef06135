//! Exact money arithmetic
//!
//! Money is always an integer number of cents. Percentages are basis points
//! (1 bp = 0.01%), so applying a royalty rate or a revenue share is integer
//! math with one explicit rounding step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

const BPS_PER_UNIT: i128 = 10_000;

/// An amount of money in cents
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

/// A rate in basis points; `BasisPoints(10_000)` is 100%
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BasisPoints(pub u32);

impl BasisPoints {
    pub const ZERO: BasisPoints = BasisPoints(0);
    pub const FULL: BasisPoints = BasisPoints(10_000);

    /// Whole-percent constructor, `percent(8)` is 8%
    pub const fn percent(p: u32) -> Self {
        BasisPoints(p * 100)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// At most 100%
    pub fn is_fraction(self) -> bool {
        self.0 <= 10_000
    }

    /// `numerator / denominator` as basis points, rounded half up; 0 when the
    /// denominator is not positive
    pub fn ratio(numerator: i64, denominator: i64) -> Self {
        if denominator <= 0 || numerator <= 0 {
            return BasisPoints(0);
        }
        let scaled = numerator as i128 * BPS_PER_UNIT;
        let d = denominator as i128;
        let rounded = (scaled + d / 2) / d;
        BasisPoints(u32::try_from(rounded).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn from_dollars(dollars: i64) -> Self {
        Cents(dollars * 100)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    pub fn checked_sub(self, other: Cents) -> Option<Cents> {
        self.0.checked_sub(other.0).map(Cents)
    }

    /// Subtraction that stops at zero
    pub fn saturating_sub(self, other: Cents) -> Cents {
        Cents((self.0 - other.0).max(0))
    }

    pub fn checked_mul(self, factor: i64) -> Option<Cents> {
        self.0.checked_mul(factor).map(Cents)
    }

    /// Apply a rate, rounding half away from zero
    pub fn apply_rate(self, rate: BasisPoints) -> Cents {
        let product = self.0 as i128 * rate.0 as i128;
        let quotient = product / BPS_PER_UNIT;
        let remainder = product % BPS_PER_UNIT;
        let rounded = if remainder.abs() * 2 >= BPS_PER_UNIT {
            quotient + product.signum()
        } else {
            quotient
        };
        Cents(clamp_i64(rounded))
    }

    /// Split `self` across `weights` so the parts sum exactly to `self`
    ///
    /// Uses the largest-remainder method; equal remainders favour the lower
    /// index. Negative weights count as zero; if every weight is zero the
    /// amount is split evenly.
    pub fn allocate(self, weights: &[i64]) -> Vec<Cents> {
        if weights.is_empty() {
            return Vec::new();
        }
        if self.0 < 0 {
            return (-self).allocate(weights).into_iter().map(|c| -c).collect();
        }

        let clean: Vec<i128> = weights.iter().map(|w| (*w).max(0) as i128).collect();
        let mut total_weight: i128 = clean.iter().sum();
        let clean = if total_weight == 0 {
            total_weight = clean.len() as i128;
            vec![1i128; clean.len()]
        } else {
            clean
        };

        let amount = self.0 as i128;
        let mut parts: Vec<i128> = Vec::with_capacity(clean.len());
        let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(clean.len());
        for (index, weight) in clean.iter().enumerate() {
            let exact = amount * weight;
            parts.push(exact / total_weight);
            remainders.push((index, exact % total_weight));
        }

        let assigned: i128 = parts.iter().sum();
        let mut leftover = amount - assigned;
        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (index, _) in remainders {
            if leftover == 0 {
                break;
            }
            parts[index] += 1;
            leftover -= 1;
        }

        parts.into_iter().map(|p| Cents(clamp_i64(p))).collect()
    }
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + *c)
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Cents(value)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = abs / 100;
        let cents = abs % 100;

        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}.{:02}", sign, grouped, cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rate_rounds_half_away_from_zero() {
        // 8% of $123.45 = 987.6 cents
        assert_eq!(Cents(12_345).apply_rate(BasisPoints(800)), Cents(988));
        // 7.5% of 10 cents = 0.75
        assert_eq!(Cents(10).apply_rate(BasisPoints(750)), Cents(1));
        // exactly half a cent rounds up
        assert_eq!(Cents(50).apply_rate(BasisPoints(100)), Cents(1));
        // and down for negatives
        assert_eq!(Cents(-50).apply_rate(BasisPoints(100)), Cents(-1));
        assert_eq!(Cents(-12_345).apply_rate(BasisPoints(800)), Cents(-988));
        assert_eq!(Cents(12_345).apply_rate(BasisPoints::ZERO), Cents::ZERO);
        assert_eq!(Cents(12_345).apply_rate(BasisPoints::FULL), Cents(12_345));
    }

    #[test]
    fn test_allocate_sums_exactly() {
        let parts = Cents(1_000).allocate(&[1, 1, 1]);
        assert_eq!(parts, vec![Cents(334), Cents(333), Cents(333)]);
        assert_eq!(parts.iter().sum::<Cents>(), Cents(1_000));

        let weighted = Cents(2_500).allocate(&[29_900, 19_900, 9_900]);
        assert_eq!(weighted.iter().sum::<Cents>(), Cents(2_500));
        assert!(weighted[0] > weighted[1] && weighted[1] > weighted[2]);
    }

    #[test]
    fn test_allocate_edge_cases() {
        assert!(Cents(100).allocate(&[]).is_empty());
        assert_eq!(Cents(5).allocate(&[0, 0]), vec![Cents(3), Cents(2)]);
        assert_eq!(Cents(-5).allocate(&[1, 1]), vec![Cents(-3), Cents(-2)]);
        assert_eq!(Cents(7).allocate(&[-4, 2]), vec![Cents(0), Cents(7)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Cents(0).to_string(), "$0.00");
        assert_eq!(Cents(5).to_string(), "$0.05");
        assert_eq!(Cents(-5).to_string(), "-$0.05");
        assert_eq!(Cents(123_456).to_string(), "$1,234.56");
        assert_eq!(Cents(100_000_000).to_string(), "$1,000,000.00");
        assert_eq!(BasisPoints(800).to_string(), "8%");
        assert_eq!(BasisPoints(725).to_string(), "7.25%");
    }

    #[test]
    fn test_ratio_and_saturating_sub() {
        assert_eq!(BasisPoints::ratio(20, 25), BasisPoints(8_000));
        assert_eq!(BasisPoints::ratio(1, 3), BasisPoints(3_333));
        assert_eq!(BasisPoints::ratio(5, 0), BasisPoints(0));
        assert_eq!(Cents(100).saturating_sub(Cents(250)), Cents::ZERO);
        assert_eq!(Cents::from_dollars(299), Cents(29_900));
    }
}
