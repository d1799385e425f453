//! Handlers for course entries and their cross-period replication.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/courses/{subject_code}/{class_number}/periods/{period}/entries` | |
//! | `PUT`    | `/courses/{subject_code}/{class_number}/periods/{period}/entries/{sub_theme_id}` | Upsert |
//! | `DELETE` | `/courses/{subject_code}/{class_number}/periods/{period}/entries/{sub_theme_id}` | Clear |
//! | `GET`    | `/courses/{subject_code}/{class_number}/periods/{period}/exists` | `{"exists":bool}` |
//! | `POST`   | `/course-entries` | Batch upsert, all or nothing |
//! | `POST`   | `/course-entries/copy` | Replace target entries with the source's |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use coursetag_core::{
  entry::{CourseEntry, CourseRef, NewCourseEntry},
  period::AcademicPeriod,
  replication::{CopyRequest, ReplicationResult},
  store::CourseTagStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::Credentials,
  error::ApiError,
  extract::{self, ApiJson},
};

// ─── Per-course entries ───────────────────────────────────────────────────────

/// `GET /courses/{subject_code}/{class_number}/periods/{period}/entries`
pub async fn list<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((subject_code, class_number, period)): Path<(String, String, String)>,
) -> Result<Json<Vec<CourseEntry>>, ApiError> {
  let period = extract::period(&period)?;
  let entries = state
    .store
    .list_course_entries(CourseRef::new(subject_code, class_number), period)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  #[serde(flatten)]
  pub credentials:      Credentials,
  pub indicator_value:  String,
  #[serde(default)]
  pub week_numbers:     Option<Vec<u8>>,
  #[serde(default)]
  pub is_most_relevant: bool,
}

/// `PUT /courses/{subject_code}/{class_number}/periods/{period}/entries/{sub_theme_id}`
pub async fn upsert<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((subject_code, class_number, period, sub_theme_id)): Path<(
    String,
    String,
    String,
    Uuid,
  )>,
  ApiJson(body): ApiJson<UpsertBody>,
) -> Result<Json<CourseEntry>, ApiError> {
  let period = extract::period(&period)?;
  let actor = state.auth.verify(&body.credentials)?;
  let input = NewCourseEntry {
    course: CourseRef::new(subject_code, class_number),
    period,
    sub_theme_id,
    indicator_value: body.indicator_value,
    week_numbers: body.week_numbers,
    is_most_relevant: body.is_most_relevant,
  };
  let entry = state
    .store
    .upsert_course_entry(input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entry))
}

/// `DELETE /courses/{subject_code}/{class_number}/periods/{period}/entries/{sub_theme_id}`
pub async fn remove<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((subject_code, class_number, period, sub_theme_id)): Path<(
    String,
    String,
    String,
    Uuid,
  )>,
  ApiJson(credentials): ApiJson<Credentials>,
) -> Result<StatusCode, ApiError> {
  let period = extract::period(&period)?;
  state.auth.verify(&credentials)?;
  let course = CourseRef::new(subject_code, class_number);
  let deleted = state
    .store
    .delete_course_entry(course.clone(), period, sub_theme_id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!(
      "no entry for sub-theme {sub_theme_id} on {course} in {period}"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /courses/{subject_code}/{class_number}/periods/{period}/exists`
pub async fn exists<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((subject_code, class_number, period)): Path<(String, String, String)>,
) -> Result<Json<ExistsResponse>, ApiError> {
  let period = extract::period(&period)?;
  let exists = state
    .store
    .has_course_entries(CourseRef::new(subject_code, class_number), period)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ExistsResponse { exists }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
  pub exists: bool,
}

// ─── Batch ────────────────────────────────────────────────────────────────────

/// One entry of a batch body; the course and period travel with each entry.
#[derive(Debug, Deserialize)]
pub struct BatchEntry {
  #[serde(flatten)]
  pub course:           CourseRef,
  #[serde(flatten)]
  pub period:           AcademicPeriod,
  pub sub_theme_id:     Uuid,
  pub indicator_value:  String,
  #[serde(default)]
  pub week_numbers:     Option<Vec<u8>>,
  #[serde(default)]
  pub is_most_relevant: bool,
}

impl From<BatchEntry> for NewCourseEntry {
  fn from(e: BatchEntry) -> Self {
    Self {
      course:           e.course,
      period:           e.period,
      sub_theme_id:     e.sub_theme_id,
      indicator_value:  e.indicator_value,
      week_numbers:     e.week_numbers,
      is_most_relevant: e.is_most_relevant,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  pub entries:     Vec<BatchEntry>,
}

/// `POST /course-entries`
///
/// Either every entry is stored or none is; the first failing entry decides
/// the status.
pub async fn create_many<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<BatchBody>,
) -> Result<(StatusCode, Json<Vec<CourseEntry>>), ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  if body.entries.is_empty() {
    return Err(ApiError::BadRequest("entries must not be empty".into()));
  }

  let inputs = body.entries.into_iter().map(NewCourseEntry::from).collect();
  let stored = state
    .store
    .upsert_course_entries(inputs, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(stored)))
}

// ─── Replication ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CopyBody {
  #[serde(flatten)]
  pub credentials:   Credentials,
  pub source_period: AcademicPeriod,
  pub target_period: AcademicPeriod,
  pub course:        CourseRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CopyResponse {
  pub message: String,
  #[serde(flatten)]
  pub result:  ReplicationResult,
}

/// `POST /course-entries/copy`
///
/// `404` when the course has nothing to copy in the source period; the
/// target is left untouched in that case.
pub async fn copy<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<CopyBody>,
) -> Result<Json<CopyResponse>, ApiError> {
  let acting = state.auth.verify(&body.credentials)?;

  let has_source = state
    .store
    .has_course_entries(body.course.clone(), body.source_period)
    .await
    .map_err(ApiError::store)?;
  if !has_source {
    return Err(ApiError::NotFound(format!(
      "{} has no entries in {}",
      body.course, body.source_period
    )));
  }

  let request = CopyRequest {
    source: body.source_period,
    target: body.target_period,
    course: body.course,
    acting,
  };
  let result = state
    .store
    .copy_course_entries(request)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(CopyResponse {
    message: format!(
      "copied {} entries from {} to {}",
      result.copied_count, body.source_period, body.target_period
    ),
    result,
  }))
}
