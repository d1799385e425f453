//! Handlers for `/sub-themes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/sub-themes` | Optional `?theme_id=<uuid>` |
//! | `POST`   | `/sub-themes` | 201; 404 unknown theme; 409 duplicate code |
//! | `GET`    | `/sub-themes/{id}` | 404 if not found |
//! | `PATCH`  | `/sub-themes/{id}` | Owning theme cannot change |
//! | `DELETE` | `/sub-themes/{id}` | 409 while course entries reference it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use coursetag_core::{
  catalog::{NewSubTheme, SubTheme, SubThemePatch},
  store::CourseTagStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Credentials, error::ApiError, extract::ApiJson};

fn not_found(id: Uuid) -> ApiError {
  ApiError::NotFound(format!("sub-theme {id} not found"))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub theme_id: Option<Uuid>,
}

/// `GET /sub-themes[?theme_id=<uuid>]`
pub async fn list<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SubTheme>>, ApiError> {
  let sub_themes = state
    .store
    .list_sub_themes(params.theme_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sub_themes))
}

/// `GET /sub-themes/{id}`
pub async fn get_one<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SubTheme>, ApiError> {
  let sub_theme = state
    .store
    .get_sub_theme(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(sub_theme))
}

// ─── Write ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  #[serde(flatten)]
  pub sub_theme:   NewSubTheme,
}

/// `POST /sub-themes`
pub async fn create<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  body.sub_theme.validate()?;
  let sub_theme = state
    .store
    .create_sub_theme(body.sub_theme, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(sub_theme)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  #[serde(flatten)]
  pub patch:       SubThemePatch,
}

/// `PATCH /sub-themes/{id}`
pub async fn update<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<SubTheme>, ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  body.patch.validate()?;
  let sub_theme = state
    .store
    .update_sub_theme(id, body.patch, actor)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(sub_theme))
}

/// `DELETE /sub-themes/{id}`
pub async fn remove<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<SubTheme>, ApiError> {
  state.auth.verify(&credentials)?;
  let sub_theme = state
    .store
    .delete_sub_theme(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  tracing::info!(sub_theme_id = %id, user_id = %credentials.user_id, "deleted sub-theme");
  Ok(Json(sub_theme))
}
