//! Percentage value object (0-100 scale, two decimal places).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A value between 0 and 100 inclusive, rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percentage(f64);

impl Percentage {
    /// Zero percent.
    pub const ZERO: Self = Self(0.0);

    /// One hundred percent.
    pub const HUNDRED: Self = Self(100.0);

    /// Creates a Percentage, returning error if out of range or not finite.
    pub fn try_new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ValidationError::invalid_format(
                "percentage",
                format!("must be between 0 and 100, got {}", value),
            ));
        }
        Ok(Self(round_to_two_decimals(value)))
    }

    /// Computes `part / whole * 100`, rounded to two decimals.
    ///
    /// A zero `whole` yields zero percent.
    pub fn of(part: u32, whole: u32) -> Result<Self, ValidationError> {
        if whole == 0 {
            return Ok(Self::ZERO);
        }
        if part > whole {
            return Err(ValidationError::out_of_range(
                "percentage_part",
                0,
                i64::from(whole),
                i64::from(part),
            ));
        }
        Self::try_new(f64::from(part) / f64::from(whole) * 100.0)
    }

    /// Returns the value as f64.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns the value as a fraction (0.0 to 1.0).
    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Default for Percentage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<f64> for Percentage {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Percentage> for f64 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}
