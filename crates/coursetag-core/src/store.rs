//! The `CourseTagStore` trait.
//!
//! Implemented by storage backends (e.g. `coursetag-store-sqlite`). The API
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  audit::ActingIdentity,
  catalog::{NewSubTheme, NewTheme, SubTheme, SubThemePatch, Theme, ThemePatch},
  entry::{CourseEntry, CourseRef, NewCourseEntry},
  error::StoreError,
  period::AcademicPeriod,
  replication::{CopyRequest, ReplicationResult},
  settings::{
    PeriodOverview, PeriodSubThemeSetting, PeriodThemeSetting, SettingsCopySummary,
    ThemeSettingInput,
  },
};

/// Abstraction over a course-tagging store backend.
///
/// Every write takes the [`ActingIdentity`] it is attributed to; the store
/// never reads identity from ambient state.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CourseTagStore: Send + Sync {
  type Error: StoreError;

  // ── Themes ────────────────────────────────────────────────────────────

  /// Fails if another theme already uses `input.code`.
  fn create_theme(
    &self,
    input: NewTheme,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<Theme, Self::Error>> + Send + '_;

  fn get_theme(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Theme>, Self::Error>> + Send + '_;

  /// All themes ordered by code.
  fn list_themes(
    &self,
  ) -> impl Future<Output = Result<Vec<Theme>, Self::Error>> + Send + '_;

  /// Apply `patch`; returns `None` if the theme does not exist.
  fn update_theme(
    &self,
    id: Uuid,
    patch: ThemePatch,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<Option<Theme>, Self::Error>> + Send + '_;

  /// Delete a theme that owns no sub-themes. Returns the deleted theme, or
  /// `None` if it did not exist; fails if sub-themes still reference it.
  fn delete_theme(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Theme>, Self::Error>> + Send + '_;

  // ── Sub-themes ────────────────────────────────────────────────────────

  /// Fails if the owning theme does not exist or the code is already used
  /// within it.
  fn create_sub_theme(
    &self,
    input: NewSubTheme,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<SubTheme, Self::Error>> + Send + '_;

  fn get_sub_theme(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SubTheme>, Self::Error>> + Send + '_;

  /// Sub-themes ordered by code, optionally restricted to one theme.
  fn list_sub_themes(
    &self,
    theme_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<SubTheme>, Self::Error>> + Send + '_;

  fn update_sub_theme(
    &self,
    id: Uuid,
    patch: SubThemePatch,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<Option<SubTheme>, Self::Error>> + Send + '_;

  /// Delete a sub-theme no course entry references. Its per-period settings
  /// go with it.
  fn delete_sub_theme(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SubTheme>, Self::Error>> + Send + '_;

  // ── Period settings ───────────────────────────────────────────────────

  /// Create or replace the setting for `theme_id` in `period`.
  fn put_theme_setting(
    &self,
    period: AcademicPeriod,
    theme_id: Uuid,
    input: ThemeSettingInput,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<PeriodThemeSetting, Self::Error>> + Send + '_;

  fn get_theme_setting(
    &self,
    period: AcademicPeriod,
    theme_id: Uuid,
  ) -> impl Future<Output = Result<Option<PeriodThemeSetting>, Self::Error>> + Send + '_;

  fn list_theme_settings(
    &self,
    period: AcademicPeriod,
  ) -> impl Future<Output = Result<Vec<PeriodThemeSetting>, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_theme_setting(
    &self,
    period: AcademicPeriod,
    theme_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Create or update the enablement of `sub_theme_id` in `period`.
  fn set_sub_theme_enabled(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
    enabled: bool,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<PeriodSubThemeSetting, Self::Error>> + Send + '_;

  fn list_sub_theme_settings(
    &self,
    period: AcademicPeriod,
  ) -> impl Future<Output = Result<Vec<PeriodSubThemeSetting>, Self::Error>> + Send + '_;

  fn delete_sub_theme_setting(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace `target`'s settings with a copy of `source`'s, in one
  /// transaction.
  ///
  /// Every sub-theme of a copied theme gets a target setting: enabled as in
  /// the source, or disabled when the source has no setting for it. Fails if
  /// `source` has no theme settings at all.
  fn copy_period_settings(
    &self,
    source: AcademicPeriod,
    target: AcademicPeriod,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<SettingsCopySummary, Self::Error>> + Send + '_;

  /// The period's configured themes, each with its setting and sub-theme
  /// enablement.
  fn period_overview(
    &self,
    period: AcademicPeriod,
  ) -> impl Future<Output = Result<PeriodOverview, Self::Error>> + Send + '_;

  // ── Course entries ────────────────────────────────────────────────────

  /// Create the entry, or update value, weeks and most-relevant flag of the
  /// existing one with the same identity.
  ///
  /// The sub-theme must be enabled in the entry's period and its theme must
  /// have a setting there; the value is validated against that setting. A
  /// course may mark at most one sub-theme per theme and period as most
  /// relevant.
  fn upsert_course_entry(
    &self,
    input: NewCourseEntry,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<CourseEntry, Self::Error>> + Send + '_;

  /// Upsert every input in order, in one transaction: either all are
  /// stored or none are.
  fn upsert_course_entries(
    &self,
    inputs: Vec<NewCourseEntry>,
    actor: ActingIdentity,
  ) -> impl Future<Output = Result<Vec<CourseEntry>, Self::Error>> + Send + '_;

  /// Entries for `course` in `period`, ordered by sub-theme id.
  fn list_course_entries(
    &self,
    course: CourseRef,
    period: AcademicPeriod,
  ) -> impl Future<Output = Result<Vec<CourseEntry>, Self::Error>> + Send + '_;

  /// Courses holding an entry for `sub_theme_id` in `period`, ordered by
  /// subject code then class number.
  fn list_courses_with_sub_theme(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CourseRef>, Self::Error>> + Send + '_;

  fn has_course_entries(
    &self,
    course: CourseRef,
    period: AcademicPeriod,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clear one indicator. Returns `false` if it did not exist.
  fn delete_course_entry(
    &self,
    course: CourseRef,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Replication ───────────────────────────────────────────────────────

  /// Run [`crate::replication::copy`] inside one transaction, committing only
  /// on success.
  ///
  /// Two concurrent copies into the same target course are serialised by
  /// the backend's transactions; the last to commit wins and the race is
  /// neither detected nor rejected.
  fn copy_course_entries(
    &self,
    request: CopyRequest,
  ) -> impl Future<Output = Result<ReplicationResult, Self::Error>> + Send + '_;
}
