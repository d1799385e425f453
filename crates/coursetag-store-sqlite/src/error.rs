//! Error type for `coursetag-store-sqlite`.

use coursetag_core::{
  ErrorKind, StoreError, entry::CourseRef, period::AcademicPeriod,
  replication::ReplicationFailed,
};
use rusqlite::ffi;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] coursetag_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  #[error(transparent)]
  Replication(#[from] ReplicationFailed),

  #[error("theme not found: {0}")]
  ThemeNotFound(Uuid),

  #[error("sub-theme not found: {0}")]
  SubThemeNotFound(Uuid),

  #[error("code {0:?} is already in use")]
  DuplicateCode(String),

  #[error("theme {0} still owns sub-themes")]
  ThemeInUse(Uuid),

  #[error("sub-theme {0} is referenced by course entries")]
  SubThemeInUse(Uuid),

  #[error("sub-theme {sub_theme_id} is not enabled in {period}")]
  SubThemeNotEnabled { sub_theme_id: Uuid, period: AcademicPeriod },

  #[error("theme {theme_id} has no setting in {period}")]
  ThemeNotConfigured { theme_id: Uuid, period: AcademicPeriod },

  #[error("{course} already marks another sub-theme of theme {theme_id} as most relevant in {period}")]
  MostRelevantTaken { course: CourseRef, theme_id: Uuid, period: AcademicPeriod },

  #[error("period {0} has no theme settings to copy")]
  SourcePeriodEmpty(AcademicPeriod),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(_) | Self::SubThemeNotEnabled { .. } | Self::ThemeNotConfigured { .. } => {
        ErrorKind::Invalid
      }
      Self::ThemeNotFound(_) | Self::SubThemeNotFound(_) | Self::SourcePeriodEmpty(_) => {
        ErrorKind::NotFound
      }
      Self::DuplicateCode(_)
      | Self::ThemeInUse(_)
      | Self::SubThemeInUse(_)
      | Self::MostRelevantTaken { .. } => ErrorKind::Conflict,
      Self::Database(_)
      | Self::Sqlite(_)
      | Self::Json(_)
      | Self::Uuid(_)
      | Self::Decode(_)
      | Self::Replication(_) => ErrorKind::Internal,
    }
  }
}

// ─── Constraint failures ─────────────────────────────────────────────────────

/// The SQLite constraints the store turns into domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
  Unique,
  ForeignKey,
}

impl Constraint {
  pub(crate) fn of(e: &rusqlite::Error) -> Option<Self> {
    let rusqlite::Error::SqliteFailure(failure, _) = e else {
      return None;
    };
    match failure.extended_code {
      ffi::SQLITE_CONSTRAINT_UNIQUE => Some(Self::Unique),
      ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Self::ForeignKey),
      _ => None,
    }
  }

  /// Like [`Constraint::of`], for errors that crossed the connection thread.
  pub(crate) fn of_call(e: &tokio_rusqlite::Error) -> Option<Self> {
    match e {
      tokio_rusqlite::Error::Rusqlite(inner) => Self::of(inner),
      _ => None,
    }
  }
}
