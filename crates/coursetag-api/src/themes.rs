//! Handlers for `/themes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/themes` | Ordered by code |
//! | `POST`   | `/themes` | 201; 409 on duplicate code |
//! | `GET`    | `/themes/{id}` | 404 if not found |
//! | `PATCH`  | `/themes/{id}` | Partial update |
//! | `DELETE` | `/themes/{id}` | 409 while sub-themes remain |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use coursetag_core::{
  catalog::{NewTheme, Theme, ThemePatch},
  store::CourseTagStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Credentials, error::ApiError, extract::ApiJson};

fn not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("theme {id} not found")) }

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /themes`
pub async fn list<S: CourseTagStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Theme>>, ApiError> {
  let themes = state.store.list_themes().await.map_err(ApiError::store)?;
  Ok(Json(themes))
}

/// `GET /themes/{id}`
pub async fn get_one<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Theme>, ApiError> {
  let theme = state
    .store
    .get_theme(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(theme))
}

// ─── Write ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  #[serde(flatten)]
  pub theme:       NewTheme,
}

/// `POST /themes`
pub async fn create<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  body.theme.validate()?;
  let theme = state
    .store
    .create_theme(body.theme, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(theme)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub credentials: Credentials,
  #[serde(flatten)]
  pub patch:       ThemePatch,
}

/// `PATCH /themes/{id}`
pub async fn update<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<Theme>, ApiError> {
  let actor = state.auth.verify(&body.credentials)?;
  body.patch.validate()?;
  let theme = state
    .store
    .update_theme(id, body.patch, actor)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(theme))
}

/// `DELETE /themes/{id}`; body carries only credentials.
pub async fn remove<S: CourseTagStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<Theme>, ApiError> {
  state.auth.verify(&credentials)?;
  let theme = state
    .store
    .delete_theme(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  tracing::info!(theme_id = %id, user_id = %credentials.user_id, "deleted theme");
  Ok(Json(theme))
}
