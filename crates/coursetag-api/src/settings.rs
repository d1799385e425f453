//! Handlers for per-period theme settings and sub-theme enablement.
//!
//! `{period}` is `"113-1"` or `"1131"`; anything else is a `400`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/periods/{period}` | Themes with settings and sub-theme enablement |
//! | `GET`    | `/periods/{period}/themes` | |
//! | `GET`    | `/periods/{period}/themes/{theme_id}` | 404 if unset |
//! | `PUT`    | `/periods/{period}/themes/{theme_id}` | Create or replace |
//! | `DELETE` | `/periods/{period}/themes/{theme_id}` | |
//! | `GET`    | `/periods/{period}/sub-themes` | |
//! | `PUT`    | `/periods/{period}/sub-themes/{sub_theme_id}` | Body: `{"enabled":true,..}` |
//! | `DELETE` | `/periods/{period}/sub-themes/{sub_theme_id}` | |
//! | `GET`    | `/periods/{period}/sub-themes/{sub_theme_id}/courses` | Courses with an entry |
//! | `POST`   | `/periods/copy-settings` | Replaces the target period's settings |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use coursetag_core::{
  entry::CourseRef,
  period::AcademicPeriod,
  settings::{
    PeriodOverview, PeriodSubThemeSetting, PeriodThemeSetting, SettingsCopySummary,
    ThemeSettingInput,
  },
  store::CourseTagStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Credentials,
  error::ApiError,
  extract::{self, ApiJson},
};

/// `GET /periods/{period}`
pub async fn overview<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(period): Path<String>,
) -> Result<Json<PeriodOverview>, ApiError> {
  let period = extract::period(&period)?;
  let overview = state
    .store
    .period_overview(period)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(overview))
}

// ─── Theme settings ───────────────────────────────────────────────────────────

/// `GET /periods/{period}/themes`
pub async fn list_themes<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(period): Path<String>,
) -> Result<Json<Vec<PeriodThemeSetting>>, ApiError> {
  let period = extract::period(&period)?;
  let settings = state
    .store
    .list_theme_settings(period)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(settings))
}

/// `GET /periods/{period}/themes/{theme_id}`
pub async fn get_theme<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, theme_id)): Path<(String, Uuid)>,
) -> Result<Json<PeriodThemeSetting>, ApiError> {
  let period = extract::period(&period)?;
  let setting = state
    .store
    .get_theme_setting(period, theme_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("theme {theme_id} has no setting in {period}"))
    })?;
  Ok(Json(setting))
}

#[derive(Debug, Deserialize)]
pub struct PutThemeBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  #[serde(flatten)]
  pub setting:     ThemeSettingInput,
}

/// `PUT /periods/{period}/themes/{theme_id}`
pub async fn put_theme<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, theme_id)): Path<(String, Uuid)>,
  ApiJson(body): ApiJson<PutThemeBody>,
) -> Result<Json<PeriodThemeSetting>, ApiError> {
  let period = extract::period(&period)?;
  let actor = state.auth.verify(&body.credentials)?;
  body.setting.validate()?;
  let setting = state
    .store
    .put_theme_setting(period, theme_id, body.setting, actor)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(setting))
}

/// `DELETE /periods/{period}/themes/{theme_id}`
pub async fn delete_theme<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, theme_id)): Path<(String, Uuid)>,
  ApiJson(credentials): ApiJson<Credentials>,
) -> Result<StatusCode, ApiError> {
  let period = extract::period(&period)?;
  state.auth.verify(&credentials)?;
  let deleted = state
    .store
    .delete_theme_setting(period, theme_id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!(
      "theme {theme_id} has no setting in {period}"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sub-theme enablement ─────────────────────────────────────────────────────

/// `GET /periods/{period}/sub-themes`
pub async fn list_sub_themes<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(period): Path<String>,
) -> Result<Json<Vec<PeriodSubThemeSetting>>, ApiError> {
  let period = extract::period(&period)?;
  let settings = state
    .store
    .list_sub_theme_settings(period)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct PutSubThemeBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  pub enabled:     bool,
}

/// `PUT /periods/{period}/sub-themes/{sub_theme_id}`
pub async fn put_sub_theme<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, sub_theme_id)): Path<(String, Uuid)>,
  ApiJson(body): ApiJson<PutSubThemeBody>,
) -> Result<Json<PeriodSubThemeSetting>, ApiError> {
  let period = extract::period(&period)?;
  let actor = state.auth.verify(&body.credentials)?;
  let setting = state
    .store
    .set_sub_theme_enabled(period, sub_theme_id, body.enabled, actor)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(setting))
}

/// `DELETE /periods/{period}/sub-themes/{sub_theme_id}`
pub async fn delete_sub_theme<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, sub_theme_id)): Path<(String, Uuid)>,
  ApiJson(credentials): ApiJson<Credentials>,
) -> Result<StatusCode, ApiError> {
  let period = extract::period(&period)?;
  state.auth.verify(&credentials)?;
  let deleted = state
    .store
    .delete_sub_theme_setting(period, sub_theme_id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!(
      "sub-theme {sub_theme_id} has no setting in {period}"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /periods/{period}/sub-themes/{sub_theme_id}/courses`
///
/// `404` for an unknown sub-theme; an empty list when no course filled it in.
pub async fn courses<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path((period, sub_theme_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<CourseRef>>, ApiError> {
  let period = extract::period(&period)?;
  state
    .store
    .get_sub_theme(sub_theme_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("sub-theme {sub_theme_id}")))?;
  let courses = state
    .store
    .list_courses_with_sub_theme(period, sub_theme_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(courses))
}

// ─── Settings copy ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CopyBody {
  #[serde(flatten)]
  pub credentials:   Credentials,
  pub source_period: AcademicPeriod,
  pub target_period: AcademicPeriod,
}

/// `POST /periods/copy-settings`
pub async fn copy<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<CopyBody>,
) -> Result<Json<SettingsCopySummary>, ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  let summary = state
    .store
    .copy_period_settings(body.source_period, body.target_period, actor)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    source = %body.source_period,
    target = %body.target_period,
    themes = summary.themes_copied,
    sub_themes = summary.sub_themes_copied,
    "copied period settings"
  );
  Ok(Json(summary))
}
