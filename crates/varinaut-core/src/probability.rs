//! Probability-like scores: likelihoods, credibility, relevance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A finite `f64` in the closed interval `[0, 1]`.
///
/// The only way to obtain one is through [`Probability::new`] (or serde, which
/// goes through the same check), so a stored value is always in range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
  pub const ZERO: Self = Self(0.0);
  pub const ONE: Self = Self(1.0);

  pub fn new(value: f64) -> Result<Self> { Self::checked("probability", value) }

  /// Like [`Probability::new`], but names `field` in the error message.
  pub fn checked(field: &str, value: f64) -> Result<Self> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
      Ok(Self(value))
    } else {
      Err(Error::Validation(format!(
        "{field} must be between 0 and 1, got {value}"
      )))
    }
  }

  pub fn get(self) -> f64 { self.0 }
}

impl TryFrom<f64> for Probability {
  type Error = Error;

  fn try_from(value: f64) -> Result<Self> { Self::new(value) }
}

impl From<Probability> for f64 {
  fn from(p: Probability) -> Self { p.0 }
}

impl fmt::Display for Probability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
