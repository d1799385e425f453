//! Cross-period replication of a course's entries.
//!
//! [`copy`] reproduces a course's entries from a source period into a target
//! period, keeping only entries whose sub-theme is enabled in the target
//! period and replacing whatever the target held before.
//!
//! The engine is synchronous and runs against a single unit of work that
//! implements both [`PeriodConfigReader`] and [`EntryStore`]. The caller owns
//! the enclosing transaction: it commits only when [`copy`] returns `Ok` and
//! rolls back otherwise, so a failed copy has no net effect.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  audit::{ActingIdentity, AuditStamps},
  entry::{CourseEntry, CourseRef, EntryKey},
  period::AcademicPeriod,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Collaborators ───────────────────────────────────────────────────────────

/// Reads which sub-themes are enabled in a period.
pub trait PeriodConfigReader {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ids of the sub-themes with an enabled setting for `period`. An empty set
  /// is a valid answer and means nothing can be copied into the period.
  fn enabled_sub_themes(
    &self,
    period: AcademicPeriod,
  ) -> Result<BTreeSet<Uuid>, Self::Error>;
}

/// The course-entry operations replication needs.
pub trait EntryStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All entries for `course` in `period`, ordered by sub-theme id. Empty when
  /// there are none.
  fn entries_for(
    &self,
    course: &CourseRef,
    period: AcademicPeriod,
  ) -> Result<Vec<CourseEntry>, Self::Error>;

  /// Delete every entry for `course` in `period`; returns the number removed.
  fn delete_all(
    &self,
    course: &CourseRef,
    period: AcademicPeriod,
  ) -> Result<usize, Self::Error>;

  /// Insert `entries` as one batch.
  fn insert_all(&self, entries: &[CourseEntry]) -> Result<(), InsertError<Self::Error>>;
}

/// Failure of [`EntryStore::insert_all`].
#[derive(Debug, Error)]
pub enum InsertError<E> {
  /// An entry with the same identity already exists.
  #[error("course entry already exists: {0}")]
  ConstraintViolation(EntryKey),

  #[error(transparent)]
  Backend(E),
}

// ─── Request / result ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CopyRequest {
  pub source: AcademicPeriod,
  pub target: AcademicPeriod,
  pub course: CourseRef,
  /// Stamped as both creator and updater of every copied entry.
  pub acting: ActingIdentity,
}

/// Accounting of a successful copy.
///
/// `copied_count + skipped_count` always equals the number of source entries
/// read at the start of the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationResult {
  pub copied_count:  usize,
  /// Source entries whose sub-theme is not enabled in the target period.
  pub skipped_count: usize,
  /// Entries the target period held for the course before the copy.
  pub deleted_count: usize,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReplicationCause {
  #[error("period configuration unavailable: {0}")]
  ConfigurationUnavailable(#[source] BoxError),

  #[error("uniqueness conflict while inserting {0}")]
  ConstraintViolation(EntryKey),

  #[error("entry store error: {0}")]
  Store(#[source] BoxError),

  #[error("transaction error: {0}")]
  Transaction(#[source] BoxError),
}

/// The only error [`copy`] signals. The three counts of
/// [`ReplicationResult`] are meaningful only when no error occurred.
#[derive(Debug, Error)]
#[error("replication failed: {0}")]
pub struct ReplicationFailed(#[source] pub ReplicationCause);

impl From<ReplicationCause> for ReplicationFailed {
  fn from(cause: ReplicationCause) -> Self { Self(cause) }
}

impl ReplicationFailed {
  pub fn cause(&self) -> &ReplicationCause { &self.0 }

  /// Wrap a failure of the enclosing transaction itself (begin or commit).
  pub fn transaction(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self(ReplicationCause::Transaction(Box::new(e)))
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Replace `request.target`'s entries for `request.course` with a copy of
/// `request.source`'s entries, filtered by the target's enabled sub-themes.
///
/// Copying a period onto itself is allowed and refreshes the period against
/// its current configuration. An empty source is not an error: the target
/// ends up empty for the course.
pub fn copy<U>(uow: &U, request: &CopyRequest) -> Result<ReplicationResult, ReplicationFailed>
where
  U: PeriodConfigReader + EntryStore,
{
  let CopyRequest { source, target, course, acting } = request;

  let source_entries = uow
    .entries_for(course, *source)
    .map_err(|e| ReplicationCause::Store(Box::new(e)))?;

  let target_enabled = uow
    .enabled_sub_themes(*target)
    .map_err(|e| ReplicationCause::ConfigurationUnavailable(Box::new(e)))?;

  let (candidates, skipped): (Vec<_>, Vec<_>) = source_entries
    .into_iter()
    .partition(|entry| target_enabled.contains(&entry.sub_theme_id));

  // Unconditional: the target is replaced, never merged.
  let deleted_count = uow
    .delete_all(course, *target)
    .map_err(|e| ReplicationCause::Store(Box::new(e)))?;

  let now = Utc::now();
  let copies: Vec<CourseEntry> = candidates
    .into_iter()
    .map(|entry| CourseEntry {
      entry_id:         Uuid::new_v4(),
      course:           course.clone(),
      period:           *target,
      sub_theme_id:     entry.sub_theme_id,
      indicator_value:  entry.indicator_value,
      week_numbers:     entry.week_numbers,
      is_most_relevant: entry.is_most_relevant,
      audit:            AuditStamps::created(acting, now),
    })
    .collect();

  uow.insert_all(&copies).map_err(|e| match e {
    InsertError::ConstraintViolation(key) => ReplicationCause::ConstraintViolation(key),
    InsertError::Backend(e) => ReplicationCause::Store(Box::new(e)),
  })?;

  Ok(ReplicationResult {
    copied_count: copies.len(),
    skipped_count: skipped.len(),
    deleted_count,
  })
}

#[cfg(test)]
mod tests {
  use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
  };

  use super::*;

  #[derive(Debug, Error)]
  #[error("injected failure")]
  struct Injected;

  /// An in-memory unit of work with failure injection. It has no rollback of
  /// its own; atomicity belongs to the backend's transaction.
  #[derive(Default)]
  struct Memory {
    entries:      RefCell<Vec<CourseEntry>>,
    enabled:      BTreeMap<AcademicPeriod, BTreeSet<Uuid>>,
    fail_config:  bool,
    fail_insert:  bool,
    delete_calls: Cell<usize>,
  }

  impl PeriodConfigReader for Memory {
    type Error = Injected;

    fn enabled_sub_themes(&self, period: AcademicPeriod) -> Result<BTreeSet<Uuid>, Injected> {
      if self.fail_config {
        return Err(Injected);
      }
      Ok(self.enabled.get(&period).cloned().unwrap_or_default())
    }
  }

  impl EntryStore for Memory {
    type Error = Injected;

    fn entries_for(
      &self,
      course: &CourseRef,
      period: AcademicPeriod,
    ) -> Result<Vec<CourseEntry>, Injected> {
      let mut found: Vec<_> = self
        .entries
        .borrow()
        .iter()
        .filter(|e| &e.course == course && e.period == period)
        .cloned()
        .collect();
      found.sort_by_key(|e| e.sub_theme_id);
      Ok(found)
    }

    fn delete_all(&self, course: &CourseRef, period: AcademicPeriod) -> Result<usize, Injected> {
      self.delete_calls.set(self.delete_calls.get() + 1);
      let mut entries = self.entries.borrow_mut();
      let before = entries.len();
      entries.retain(|e| !(&e.course == course && e.period == period));
      Ok(before - entries.len())
    }

    fn insert_all(&self, new: &[CourseEntry]) -> Result<(), InsertError<Injected>> {
      if self.fail_insert {
        return Err(InsertError::Backend(Injected));
      }
      let mut entries = self.entries.borrow_mut();
      for entry in new {
        if entries.iter().any(|e| e.key() == entry.key()) {
          return Err(InsertError::ConstraintViolation(entry.key()));
        }
        entries.push(entry.clone());
      }
      Ok(())
    }
  }

  fn period(s: &str) -> AcademicPeriod { s.parse().unwrap() }

  fn course() -> CourseRef { CourseRef::new("CS101", "1001") }

  fn entry(period: AcademicPeriod, sub_theme_id: Uuid, value: &str) -> CourseEntry {
    CourseEntry {
      entry_id: Uuid::new_v4(),
      course: course(),
      period,
      sub_theme_id,
      indicator_value: value.into(),
      week_numbers: Some(vec![1, 2]),
      is_most_relevant: false,
      audit: AuditStamps::created(&ActingIdentity::new("lecturer"), Utc::now()),
    }
  }

  fn request(source: &str, target: &str) -> CopyRequest {
    CopyRequest {
      source: period(source),
      target: period(target),
      course: course(),
      acting: ActingIdentity::new("alice"),
    }
  }

  /// Source 1131 holds {x1, x2, x3}; 1132 enables {x1, x3} and holds a stale
  /// entry on x4.
  fn scenario() -> (Memory, [Uuid; 4]) {
    let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let [x1, x2, x3, x4] = ids;
    let mut store = Memory::default();
    store.entries.get_mut().extend([
      entry(period("1131"), x1, "H"),
      entry(period("1131"), x2, "M"),
      entry(period("1131"), x3, "L"),
      entry(period("1132"), x4, "H"),
    ]);
    store.enabled.insert(period("1131"), BTreeSet::from([x1, x2, x3]));
    store.enabled.insert(period("1132"), BTreeSet::from([x1, x3]));
    (store, ids)
  }

  #[test]
  fn copies_enabled_skips_disabled_and_replaces_target() {
    let (store, [x1, _x2, x3, _x4]) = scenario();

    let result = copy(&store, &request("1131", "1132")).unwrap();
    assert_eq!(result, ReplicationResult {
      copied_count:  2,
      skipped_count: 1,
      deleted_count: 1,
    });

    let target = EntryStore::entries_for(&store, &course(), period("1132")).unwrap();
    let subs: BTreeSet<_> = target.iter().map(|e| e.sub_theme_id).collect();
    assert_eq!(subs, BTreeSet::from([x1, x3]));
    for e in &target {
      assert_eq!(e.audit.created_by, "alice");
      assert_eq!(e.audit.updated_by, "alice");
      assert_eq!(e.week_numbers.as_deref(), Some(&[1, 2][..]));
    }
  }

  #[test]
  fn source_is_left_untouched() {
    let (store, _) = scenario();
    let before = EntryStore::entries_for(&store, &course(), period("1131")).unwrap();
    copy(&store, &request("1131", "1132")).unwrap();
    let after = EntryStore::entries_for(&store, &course(), period("1131")).unwrap();
    assert_eq!(before, after);
  }

  #[test]
  fn second_copy_deletes_what_the_first_copied() {
    let (store, _) = scenario();
    let first = copy(&store, &request("1131", "1132")).unwrap();
    let after_first: BTreeSet<_> = EntryStore::entries_for(&store, &course(), period("1132"))
      .unwrap()
      .into_iter()
      .map(|e| (e.sub_theme_id, e.indicator_value))
      .collect();

    let second = copy(&store, &request("1131", "1132")).unwrap();
    let after_second: BTreeSet<_> = EntryStore::entries_for(&store, &course(), period("1132"))
      .unwrap()
      .into_iter()
      .map(|e| (e.sub_theme_id, e.indicator_value))
      .collect();

    assert_eq!(second.deleted_count, first.copied_count);
    assert_eq!(after_first, after_second);
  }

  #[test]
  fn same_period_refresh_drops_disabled_sub_themes() {
    let (mut store, [x1, x2, _x3, _x4]) = scenario();
    store.enabled.insert(period("1131"), BTreeSet::from([x1]));

    let result = copy(&store, &request("1131", "1131")).unwrap();
    assert_eq!(result.copied_count, 1);
    assert_eq!(result.skipped_count, 2);
    assert_eq!(result.deleted_count, 3);

    let left = EntryStore::entries_for(&store, &course(), period("1131")).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].sub_theme_id, x1);
    assert!(left.iter().all(|e| e.sub_theme_id != x2));
  }

  #[test]
  fn empty_source_clears_target() {
    let (store, _) = scenario();
    let result = copy(&store, &request("1121", "1132")).unwrap();
    assert_eq!(result, ReplicationResult {
      copied_count:  0,
      skipped_count: 0,
      deleted_count: 1,
    });
    assert!(
      EntryStore::entries_for(&store, &course(), period("1132"))
        .unwrap()
        .is_empty()
    );
  }

  #[test]
  fn nothing_enabled_in_target_skips_everything() {
    let (store, _) = scenario();
    let result = copy(&store, &request("1131", "1141")).unwrap();
    assert_eq!(result.copied_count, 0);
    assert_eq!(result.skipped_count, 3);
  }

  #[test]
  fn configuration_failure_happens_before_any_delete() {
    let (mut store, _) = scenario();
    store.fail_config = true;

    let err = copy(&store, &request("1131", "1132")).unwrap_err();
    assert!(matches!(err.cause(), ReplicationCause::ConfigurationUnavailable(_)));
    assert_eq!(store.delete_calls.get(), 0);
    assert_eq!(
      EntryStore::entries_for(&store, &course(), period("1132")).unwrap().len(),
      1
    );
  }

  #[test]
  fn insert_failure_is_wrapped_as_store_cause() {
    let (mut store, _) = scenario();
    store.fail_insert = true;

    let err = copy(&store, &request("1131", "1132")).unwrap_err();
    assert!(matches!(err.cause(), ReplicationCause::Store(_)));
    assert!(err.to_string().starts_with("replication failed"));
  }
}
