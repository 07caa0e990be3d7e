//! Exact rational quantities for doses and supply counts.
//!
//! Half a tablet three times a day, subtracted from a supply of 28, must
//! come out exact no matter how often it happens, so this is a rational,
//! not a float. Floats appear only at the display/estimate boundary via
//! [`Quantity::to_f64`].

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use num_rational::Rational64;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An exact rational amount of a drug (doses, supply counts).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(Rational64);

impl Quantity {
    pub fn zero() -> Self {
        Self(Rational64::zero())
    }

    pub fn whole(n: i64) -> Self {
        Self(Rational64::from_integer(n))
    }

    /// A fraction. The only invalid input is a zero denominator.
    pub fn new(numer: i64, denom: i64) -> Result<Self, ValidationError> {
        if denom == 0 {
            return Err(ValidationError::ZeroDenominator);
        }
        Ok(Self(Rational64::new(numer, denom)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Floating approximation for display and ratio math only.
    pub fn to_f64(&self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(-self.0)
    }
}

impl PartialEq<i64> for Quantity {
    fn eq(&self, other: &i64) -> bool {
        self.0 == Rational64::from_integer(*other)
    }
}

impl PartialOrd<i64> for Quantity {
    fn partial_cmp(&self, other: &i64) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(&Rational64::from_integer(*other))
    }
}

impl fmt::Display for Quantity {
    /// Mixed-fraction form: `2`, `3/4`, `1 3/4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = *self.0.numer();
        let d = *self.0.denom();
        if d == 1 {
            write!(f, "{n}")
        } else if n.abs() > d {
            write!(f, "{} {}/{}", n / d, (n % d).abs(), d)
        } else {
            write!(f, "{n}/{d}")
        }
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    /// Accepts whole numbers (`"2"`), fractions (`"3/4"`) and mixed
    /// fractions (`"1 3/4"`, `"-1 1/2"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValidationError::UnparsableQuantity(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once(' ') {
            Some((w, f)) => (Some(w.trim()), f.trim()),
            None => (None, trimmed),
        };

        let Some((numer, denom)) = frac.split_once('/') else {
            if whole.is_some() {
                return Err(bad());
            }
            let n: i64 = frac.parse().map_err(|_| bad())?;
            return Ok(Self::whole(n));
        };

        let numer: i64 = numer.trim().parse().map_err(|_| bad())?;
        let denom: i64 = denom.trim().parse().map_err(|_| bad())?;
        if denom == 0 {
            return Err(ValidationError::ZeroDenominator);
        }
        let frac_part = Rational64::new(numer, denom);

        match whole {
            None => Ok(Self(frac_part)),
            Some(w_str) => {
                // In mixed form the fractional part carries no sign of its own.
                if numer < 0 {
                    return Err(bad());
                }
                let w: i64 = w_str.parse().map_err(|_| bad())?;
                let sum = Rational64::from_integer(w.abs()) + frac_part;
                Ok(Self(if w_str.starts_with('-') { -sum } else { sum }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_repeated_subtraction() {
        let mut supply = Quantity::whole(10);
        let dose = Quantity::new(1, 3).unwrap();
        for _ in 0..30 {
            supply = supply - dose;
        }
        assert_eq!(supply, Quantity::zero());
    }

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(Quantity::new(1, 0), Err(ValidationError::ZeroDenominator));
        assert_eq!(
            "1/0".parse::<Quantity>(),
            Err(ValidationError::ZeroDenominator)
        );
    }

    #[test]
    fn parse_and_display_round_trip() {
        for (input, shown) in [
            ("2", "2"),
            ("3/4", "3/4"),
            ("1 3/4", "1 3/4"),
            ("-1 1/2", "-1 1/2"),
            ("6/4", "1 1/2"),
        ] {
            let q: Quantity = input.parse().unwrap();
            assert_eq!(q.to_string(), shown, "input {input:?}");
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", "x", "1 2", "1/2/3", "1 -1/2"] {
            assert!(input.parse::<Quantity>().is_err(), "input {input:?}");
        }
    }

    #[test]
    fn integer_comparisons() {
        let q = Quantity::new(3, 2).unwrap();
        assert!(q > 1);
        assert!(q < 2);
        assert_eq!(Quantity::whole(2), 2);
        assert!(Quantity::new(-1, 2).unwrap().is_negative());
    }
}
