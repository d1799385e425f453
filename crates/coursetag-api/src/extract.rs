//! Request extraction helpers shared by the handlers.

use axum::{
  Json,
  extract::{FromRequest, Request},
};
use coursetag_core::period::AcademicPeriod;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// [`Json`] with malformed bodies reported as `400` [`ApiError`]s, so that an
/// out-of-range period in a body answers like one in a path.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state).await?;
    Ok(Self(value))
  }
}

/// Parse a `{period}` path segment (`"113-1"` or `"1131"`).
pub fn period(segment: &str) -> Result<AcademicPeriod, ApiError> {
  Ok(segment.parse::<AcademicPeriod>()?)
}
