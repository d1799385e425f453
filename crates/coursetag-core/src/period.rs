//! Academic periods: one teaching term, identified by year and term.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An `(academic_year, academic_term)` pair. The year is a positive integer
/// and the term is either 1 or 2; both are checked at construction.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "PeriodParts")]
pub struct AcademicPeriod {
  academic_year: u32,
  academic_term: u8,
}

impl AcademicPeriod {
  pub fn new(academic_year: u32, academic_term: u8) -> Result<Self> {
    if academic_year == 0 {
      return Err(Error::InvalidPeriod(format!(
        "academic year must be positive, got {academic_year}"
      )));
    }
    if !matches!(academic_term, 1 | 2) {
      return Err(Error::InvalidPeriod(format!(
        "academic term must be 1 or 2, got {academic_term}"
      )));
    }
    Ok(Self { academic_year, academic_term })
  }

  pub fn year(&self) -> u32 { self.academic_year }

  pub fn term(&self) -> u8 { self.academic_term }
}

impl fmt::Display for AcademicPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.academic_year, self.academic_term)
  }
}

/// Accepts `"113-1"` or the compact `"1131"` form (last digit is the term).
impl FromStr for AcademicPeriod {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidPeriod(format!("cannot parse {s:?}"));
    let s = s.trim();

    let (year, term) = match s.split_once('-') {
      Some(parts) => parts,
      None if s.len() >= 2 && s.is_ascii() => s.split_at(s.len() - 1),
      None => return Err(invalid()),
    };

    let year = year.parse::<u32>().map_err(|_| invalid())?;
    let term = term.parse::<u8>().map_err(|_| invalid())?;
    Self::new(year, term)
  }
}

/// Wire shape used for deserialisation so that range checks always run.
#[derive(Deserialize)]
struct PeriodParts {
  academic_year: i64,
  academic_term: i64,
}

impl TryFrom<PeriodParts> for AcademicPeriod {
  type Error = Error;

  fn try_from(parts: PeriodParts) -> Result<Self> {
    let year = u32::try_from(parts.academic_year).map_err(|_| {
      Error::InvalidPeriod(format!(
        "academic year must be positive, got {}",
        parts.academic_year
      ))
    })?;
    let term = u8::try_from(parts.academic_term).map_err(|_| {
      Error::InvalidPeriod(format!(
        "academic term must be 1 or 2, got {}",
        parts.academic_term
      ))
    })?;
    Self::new(year, term)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_out_of_range_terms_and_years() {
    assert!(AcademicPeriod::new(113, 1).is_ok());
    assert!(AcademicPeriod::new(113, 2).is_ok());
    assert!(matches!(AcademicPeriod::new(113, 3), Err(Error::InvalidPeriod(_))));
    assert!(matches!(AcademicPeriod::new(113, 0), Err(Error::InvalidPeriod(_))));
    assert!(matches!(AcademicPeriod::new(0, 1), Err(Error::InvalidPeriod(_))));
  }

  #[test]
  fn parses_dashed_and_compact_forms() {
    let dashed: AcademicPeriod = "113-2".parse().unwrap();
    let compact: AcademicPeriod = "1132".parse().unwrap();
    assert_eq!(dashed, compact);
    assert_eq!(dashed.year(), 113);
    assert_eq!(dashed.term(), 2);
    assert_eq!(dashed.to_string(), "113-2");

    assert!("1133".parse::<AcademicPeriod>().is_err());
    assert!("abc".parse::<AcademicPeriod>().is_err());
    assert!("1".parse::<AcademicPeriod>().is_err());
  }

  #[test]
  fn deserialisation_validates() {
    let ok: AcademicPeriod =
      serde_json::from_str(r#"{"academic_year":114,"academic_term":1}"#).unwrap();
    assert_eq!(ok, AcademicPeriod::new(114, 1).unwrap());

    assert!(
      serde_json::from_str::<AcademicPeriod>(r#"{"academic_year":-1,"academic_term":1}"#)
        .is_err()
    );
    assert!(
      serde_json::from_str::<AcademicPeriod>(r#"{"academic_year":114,"academic_term":5}"#)
        .is_err()
    );
  }
}
