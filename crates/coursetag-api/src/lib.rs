//! JSON REST API for coursetag.
//!
//! Exposes an axum [`Router`] backed by any
//! [`coursetag_core::store::CourseTagStore`]. Writes are authenticated with
//! the daily tokens of [`auth::TokenAuth`]; TLS and transport are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", coursetag_api::api_router(AppState::new(store, auth)))
//! ```

pub mod auth;
pub mod entries;
pub mod error;
pub mod extract;
pub mod settings;
pub mod sub_themes;
pub mod themes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use coursetag_core::store::CourseTagStore;
use tower_http::trace::TraceLayer;

pub use auth::TokenAuth;
pub use error::ApiError;

/// Shared state for all API handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<TokenAuth>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, auth: TokenAuth) -> Self {
    Self { store, auth: Arc::new(auth) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), auth: Arc::clone(&self.auth) }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CourseTagStore + 'static,
{
  Router::new()
    // Catalog
    .route("/themes", get(themes::list::<S>).post(themes::create::<S>))
    .route(
      "/themes/{id}",
      get(themes::get_one::<S>)
        .patch(themes::update::<S>)
        .delete(themes::remove::<S>),
    )
    .route(
      "/sub-themes",
      get(sub_themes::list::<S>).post(sub_themes::create::<S>),
    )
    .route(
      "/sub-themes/{id}",
      get(sub_themes::get_one::<S>)
        .patch(sub_themes::update::<S>)
        .delete(sub_themes::remove::<S>),
    )
    // Period settings
    .route("/periods/copy-settings", post(settings::copy::<S>))
    .route("/periods/{period}", get(settings::overview::<S>))
    .route("/periods/{period}/themes", get(settings::list_themes::<S>))
    .route(
      "/periods/{period}/themes/{theme_id}",
      get(settings::get_theme::<S>)
        .put(settings::put_theme::<S>)
        .delete(settings::delete_theme::<S>),
    )
    .route(
      "/periods/{period}/sub-themes",
      get(settings::list_sub_themes::<S>),
    )
    .route(
      "/periods/{period}/sub-themes/{sub_theme_id}",
      put(settings::put_sub_theme::<S>).delete(settings::delete_sub_theme::<S>),
    )
    .route(
      "/periods/{period}/sub-themes/{sub_theme_id}/courses",
      get(settings::courses::<S>),
    )
    // Course entries
    .route(
      "/courses/{subject_code}/{class_number}/periods/{period}/entries",
      get(entries::list::<S>),
    )
    .route(
      "/courses/{subject_code}/{class_number}/periods/{period}/entries/{sub_theme_id}",
      put(entries::upsert::<S>).delete(entries::remove::<S>),
    )
    .route(
      "/courses/{subject_code}/{class_number}/periods/{period}/exists",
      get(entries::exists::<S>),
    )
    .route("/course-entries", post(entries::create_many::<S>))
    .route("/course-entries/copy", post(entries::copy::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
