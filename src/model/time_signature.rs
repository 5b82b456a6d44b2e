//! Time signatures and the changes that place them inside a pattern.

use crate::command::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A time signature such as 4/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per bar. Must be greater than zero.
    pub numerator: u32,
    /// Beat unit. Must be a power of two.
    pub denominator: u32,
}

impl TimeSignature {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Checks the numerator and denominator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the numerator is zero or the denominator is
    /// not a positive power of two.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.numerator == 0 {
            return Err(CommandError::invalid(
                "time signature numerator must be greater than zero",
            ));
        }
        if !self.denominator.is_power_of_two() {
            return Err(CommandError::invalid(format!(
                "time signature denominator {} is not a power of two",
                self.denominator
            )));
        }
        Ok(())
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A time signature that takes effect at `offset` ticks into a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignatureChange {
    pub offset: u64,
    pub time_signature: TimeSignature,
}

impl TimeSignatureChange {
    pub const fn new(offset: u64, time_signature: TimeSignature) -> Self {
        Self {
            offset,
            time_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(TimeSignature::new(4, 4).validate().is_ok());
        assert!(TimeSignature::new(7, 8).validate().is_ok());
        assert!(TimeSignature::new(0, 4).validate().is_err());
        assert!(TimeSignature::new(3, 6).validate().is_err());
        assert!(TimeSignature::new(3, 0).validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeSignature::new(6, 8).to_string(), "6/8");
    }
}
