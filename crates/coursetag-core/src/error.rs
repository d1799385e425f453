//! Error types for `coursetag-core`.

use thiserror::Error;

use crate::settings::IndicatorType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid academic period: {0}")]
  InvalidPeriod(String),

  #[error("indicator value {value:?} is not valid for a {kind} indicator")]
  InvalidIndicator { value: String, kind: IndicatorType },

  #[error("scale maximum must be between 1 and {max}, got {got}", max = crate::settings::MAX_SCALE)]
  InvalidScaleMax { got: u8 },

  #[error("week number {0} is outside 1..={max}", max = crate::entry::MAX_WEEK)]
  InvalidWeekNumber(u8),

  #[error("week numbers are required for this theme in this period")]
  WeekNumbersRequired,

  #[error("this theme does not allow a most relevant sub-theme in this period")]
  MostRelevantNotEnabled,

  #[error("{field} must not be empty")]
  EmptyField { field: &'static str },
}

/// Coarse classification of a storage error, used by outer layers to pick a
/// response without depending on a concrete backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Invalid,
  Internal,
}

/// Implemented by backend error types so callers can classify them.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
