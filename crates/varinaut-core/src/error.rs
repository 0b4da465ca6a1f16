//! Error types for `varinaut-core`.

use thiserror::Error;

use crate::prediction::PredictionStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(String),

  #[error("cannot move prediction from {from} to {to}")]
  InvalidTransition {
    from: PredictionStatus,
    to:   PredictionStatus,
  },

  #[error("resolving a prediction requires an outcome")]
  OutcomeRequired,

  #[error("unknown prediction status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown review decision: {0:?}")]
  UnknownDecision(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
