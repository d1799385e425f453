//! Course entries: one indicator value per course, period and sub-theme.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::AuditStamps,
  period::AcademicPeriod,
  settings::PeriodThemeSetting,
};

/// Highest teaching week a week number may refer to.
pub const MAX_WEEK: u8 = 18;

/// A course offering, identified by subject code and class number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseRef {
  pub subject_code: String,
  pub class_number: String,
}

impl CourseRef {
  pub fn new(subject_code: impl Into<String>, class_number: impl Into<String>) -> Self {
    Self { subject_code: subject_code.into(), class_number: class_number.into() }
  }
}

impl fmt::Display for CourseRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.subject_code, self.class_number)
  }
}

/// The identity tuple of a [`CourseEntry`]; unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
  pub course:       CourseRef,
  pub period:       AcademicPeriod,
  pub sub_theme_id: Uuid,
}

impl fmt::Display for EntryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} in {} on sub-theme {}", self.course, self.period, self.sub_theme_id)
  }
}

/// A stored indicator for one course in one period against one sub-theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntry {
  pub entry_id:         Uuid,
  #[serde(flatten)]
  pub course:           CourseRef,
  #[serde(flatten)]
  pub period:           AcademicPeriod,
  pub sub_theme_id:     Uuid,
  /// Tri-level token, numeric string or boolean token, depending on the
  /// owning theme's indicator type in this period.
  pub indicator_value:  String,
  pub week_numbers:     Option<Vec<u8>>,
  pub is_most_relevant: bool,
  #[serde(flatten)]
  pub audit:            AuditStamps,
}

impl CourseEntry {
  pub fn key(&self) -> EntryKey {
    EntryKey {
      course:       self.course.clone(),
      period:       self.period,
      sub_theme_id: self.sub_theme_id,
    }
  }
}

/// Input to [`crate::store::CourseTagStore::upsert_course_entry`].
#[derive(Debug, Clone)]
pub struct NewCourseEntry {
  pub course:           CourseRef,
  pub period:           AcademicPeriod,
  pub sub_theme_id:     Uuid,
  pub indicator_value:  String,
  pub week_numbers:     Option<Vec<u8>>,
  pub is_most_relevant: bool,
}

impl NewCourseEntry {
  /// Check the entry against the owning theme's setting for its period.
  pub fn validate_against(&self, setting: &PeriodThemeSetting) -> Result<()> {
    setting
      .indicator_type
      .validate(&self.indicator_value, setting.scale_max)?;

    let weeks = self.week_numbers.as_deref().unwrap_or_default();
    if setting.week_numbers_required && weeks.is_empty() {
      return Err(Error::WeekNumbersRequired);
    }
    if let Some(&bad) = weeks.iter().find(|w| !(1..=MAX_WEEK).contains(*w)) {
      return Err(Error::InvalidWeekNumber(bad));
    }
    if self.is_most_relevant && !setting.most_relevant_enabled {
      return Err(Error::MostRelevantNotEnabled);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{audit::ActingIdentity, settings::IndicatorType};

  fn setting(kind: IndicatorType, weeks_required: bool) -> PeriodThemeSetting {
    PeriodThemeSetting {
      setting_id:             Uuid::new_v4(),
      period:                 AcademicPeriod::new(113, 1).unwrap(),
      theme_id:               Uuid::new_v4(),
      week_numbers_required:  weeks_required,
      indicator_type:         kind,
      scale_max:              4,
      most_relevant_enabled:  false,
      audit:                  AuditStamps::created(&ActingIdentity::new("admin"), Utc::now()),
    }
  }

  fn entry(value: &str, weeks: Option<Vec<u8>>) -> NewCourseEntry {
    NewCourseEntry {
      course:           CourseRef::new("CS101", "1001"),
      period:           AcademicPeriod::new(113, 1).unwrap(),
      sub_theme_id:     Uuid::new_v4(),
      indicator_value:  value.into(),
      week_numbers:     weeks,
      is_most_relevant: false,
    }
  }

  #[test]
  fn indicator_is_checked_against_theme_setting() {
    let s = setting(IndicatorType::NumericScale, false);
    assert!(entry("4", None).validate_against(&s).is_ok());
    assert!(matches!(
      entry("5", None).validate_against(&s),
      Err(Error::InvalidIndicator { .. })
    ));
  }

  #[test]
  fn week_numbers_required_and_bounded() {
    let s = setting(IndicatorType::TriLevel, true);
    assert!(matches!(
      entry("H", None).validate_against(&s),
      Err(Error::WeekNumbersRequired)
    ));
    assert!(matches!(
      entry("H", Some(vec![])).validate_against(&s),
      Err(Error::WeekNumbersRequired)
    ));
    assert!(matches!(
      entry("H", Some(vec![3, 19])).validate_against(&s),
      Err(Error::InvalidWeekNumber(19))
    ));
    assert!(entry("H", Some(vec![1, 18])).validate_against(&s).is_ok());
  }

  #[test]
  fn most_relevant_mark_needs_theme_opt_in() {
    let mut s = setting(IndicatorType::TriLevel, false);
    let marked = NewCourseEntry { is_most_relevant: true, ..entry("H", None) };
    assert!(matches!(
      marked.validate_against(&s),
      Err(Error::MostRelevantNotEnabled)
    ));

    s.most_relevant_enabled = true;
    assert!(marked.validate_against(&s).is_ok());
  }

  #[test]
  fn entry_serialises_flat() {
    let e = CourseEntry {
      entry_id:         Uuid::nil(),
      course:           CourseRef::new("CS101", "1001"),
      period:           AcademicPeriod::new(113, 1).unwrap(),
      sub_theme_id:     Uuid::nil(),
      indicator_value:  "M".into(),
      week_numbers:     Some(vec![2, 3]),
      is_most_relevant: true,
      audit:            AuditStamps::created(&ActingIdentity::new("alice"), Utc::now()),
    };
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["subject_code"], "CS101");
    assert_eq!(json["academic_term"], 1);
    assert_eq!(json["created_by"], "alice");
  }
}
