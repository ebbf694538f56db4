// Copyright (c) 2024 Botho Foundation

//! Rational scale factors applied to requirement costs.

use crate::error::{ThrottleError, ThrottleResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A positive rational multiplier written as `numerator:denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScaleFactor {
    numerator: u32,
    denominator: u32,
}

impl ScaleFactor {
    /// The identity scale.
    pub const ONE_TO_ONE: ScaleFactor = ScaleFactor {
        numerator: 1,
        denominator: 1,
    };

    /// Create a scale factor; both parts must be positive.
    pub fn new(numerator: u32, denominator: u32) -> ThrottleResult<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(ThrottleError::InvalidScaleFactor(format!(
                "{numerator}:{denominator}"
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// The numerator.
    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    /// The denominator.
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Scale `nominal`, rounding down but never below one.
    pub fn scaling(&self, nominal: u64) -> u64 {
        let scaled = nominal as u128 * self.numerator as u128 / self.denominator as u128;
        u64::try_from(scaled).unwrap_or(u64::MAX).max(1)
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::ONE_TO_ONE
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}

impl FromStr for ScaleFactor {
    type Err = ThrottleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ThrottleError::InvalidScaleFactor(s.to_string());
        let (numerator, denominator) = s.split_once(':').ok_or_else(invalid)?;
        let numerator = numerator.trim().parse().map_err(|_| invalid())?;
        let denominator = denominator.trim().parse().map_err(|_| invalid())?;
        Self::new(numerator, denominator).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ScaleFactor {
    type Error = ThrottleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScaleFactor> for String {
    fn from(value: ScaleFactor) -> Self {
        value.to_string()
    }
}
