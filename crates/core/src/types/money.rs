//! Integer money amounts in minor currency units.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An amount in the currency's minor unit (e.g. cents for USD).
///
/// Campaign prices are stored and charged in minor units. Pages show whole
/// major units only, truncating any remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Create an amount from minor units.
    #[must_use]
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// The amount in minor units, as sent to the payment processor.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// The amount in whole major units (integer division by 100).
    #[must_use]
    pub const fn major_units(self) -> i64 {
        self.0 / 100
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Cents {
    fn from(minor_units: i64) -> Self {
        Self(minor_units)
    }
}
