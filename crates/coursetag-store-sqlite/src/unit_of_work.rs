//! [`SqliteUnitOfWork`]: the replication collaborators over one borrowed
//! connection, normally an open transaction.

use std::collections::BTreeSet;

use coursetag_core::{
  entry::{CourseEntry, CourseRef},
  period::AcademicPeriod,
  replication::{EntryStore, InsertError, PeriodConfigReader},
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{ENTRY_COLUMNS, RawEntry, decode_uuid},
  error::Constraint,
};

/// Borrows a connection for the duration of one unit of work.
///
/// Never commits or rolls back; whoever opened the transaction does.
pub(crate) struct SqliteUnitOfWork<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteUnitOfWork<'c> {
  pub(crate) fn new(conn: &'c Connection) -> Self { Self { conn } }
}

impl PeriodConfigReader for SqliteUnitOfWork<'_> {
  type Error = Error;

  fn enabled_sub_themes(&self, period: AcademicPeriod) -> Result<BTreeSet<Uuid>> {
    let mut stmt = self.conn.prepare_cached(
      "SELECT sub_theme_id FROM period_sub_theme_settings
       WHERE academic_year = ?1 AND academic_term = ?2 AND enabled = 1",
    )?;
    let ids = stmt
      .query_map(rusqlite::params![period.year(), period.term()], |row| {
        row.get::<_, String>(0)
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}

impl EntryStore for SqliteUnitOfWork<'_> {
  type Error = Error;

  fn entries_for(&self, course: &CourseRef, period: AcademicPeriod) -> Result<Vec<CourseEntry>> {
    let mut stmt = self.conn.prepare_cached(&format!(
      "SELECT {ENTRY_COLUMNS} FROM course_entries
       WHERE subject_code = ?1 AND class_number = ?2
         AND academic_year = ?3 AND academic_term = ?4
       ORDER BY sub_theme_id"
    ))?;
    let raws = stmt
      .query_map(
        rusqlite::params![
          course.subject_code,
          course.class_number,
          period.year(),
          period.term(),
        ],
        RawEntry::from_row,
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  fn delete_all(&self, course: &CourseRef, period: AcademicPeriod) -> Result<usize> {
    let deleted = self.conn.execute(
      "DELETE FROM course_entries
       WHERE subject_code = ?1 AND class_number = ?2
         AND academic_year = ?3 AND academic_term = ?4",
      rusqlite::params![
        course.subject_code,
        course.class_number,
        period.year(),
        period.term(),
      ],
    )?;
    Ok(deleted)
  }

  fn insert_all(&self, entries: &[CourseEntry]) -> Result<(), InsertError<Error>> {
    for entry in entries {
      let raw = RawEntry::encode(entry).map_err(InsertError::Backend)?;
      raw.insert(self.conn).map_err(|e| match Constraint::of(&e) {
        Some(Constraint::Unique) => InsertError::ConstraintViolation(entry.key()),
        _ => InsertError::Backend(Error::Sqlite(e)),
      })?;
    }
    Ok(())
  }
}
