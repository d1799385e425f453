//! Daily shared-secret tokens.
//!
//! A token is the lowercase hex SHA-256 of `user_id ‖ secret ‖ YYYYMMDD`, with
//! the date taken in the server's local time zone. Tokens therefore expire at
//! local midnight. Write requests carry the caller's `user_id` and `token` in
//! their JSON body; a verified pair becomes the [`ActingIdentity`] handed to
//! the store.

use chrono::{Local, NaiveDate};
use coursetag_core::audit::ActingIdentity;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq as _;

use crate::error::ApiError;

/// The credential fields every write body carries.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
  pub user_id: String,
  pub token:   String,
}

/// Issues and verifies daily tokens for one server secret.
#[derive(Clone)]
pub struct TokenAuth {
  secret: String,
}

impl TokenAuth {
  pub fn new(secret: impl Into<String>) -> Self { Self { secret: secret.into() } }

  /// The token `user_id` must present on `date`.
  pub fn issue(&self, user_id: &str, date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(self.secret.as_bytes());
    hasher.update(date.format("%Y%m%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn issue_today(&self, user_id: &str) -> String {
    self.issue(user_id, Local::now().date_naive())
  }

  /// Check `credentials` against today's token.
  pub fn verify(&self, credentials: &Credentials) -> Result<ActingIdentity, ApiError> {
    if credentials.user_id.trim().is_empty() {
      return Err(ApiError::Unauthorized);
    }

    let expected = self.issue_today(&credentials.user_id);
    let presented = credentials.token.to_ascii_lowercase();
    if !bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
      tracing::warn!(user_id = %credentials.user_id, "rejected token");
      return Err(ApiError::Unauthorized);
    }

    Ok(ActingIdentity::new(credentials.user_id.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn auth() -> TokenAuth { TokenAuth::new("s3cret") }

  fn creds(user_id: &str, token: String) -> Credentials {
    Credentials { user_id: user_id.into(), token }
  }

  #[test]
  fn token_is_hex_sha256_of_user_secret_and_date() {
    let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let token = auth().issue("alice", date);

    let mut hasher = Sha256::new();
    hasher.update(b"alices3cret20240902");
    assert_eq!(token, hex::encode(hasher.finalize()));
    assert_eq!(token.len(), 64);
  }

  #[test]
  fn tokens_differ_by_user_date_and_secret() {
    let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let next = NaiveDate::from_ymd_opt(2024, 9, 3).unwrap();
    let a = auth();
    assert_ne!(a.issue("alice", date), a.issue("bob", date));
    assert_ne!(a.issue("alice", date), a.issue("alice", next));
    assert_ne!(a.issue("alice", date), TokenAuth::new("other").issue("alice", date));
  }

  #[test]
  fn verify_accepts_todays_token() {
    let a = auth();
    let token = a.issue_today("alice").to_ascii_uppercase();
    let actor = a.verify(&creds("alice", token)).unwrap();
    assert_eq!(actor.as_str(), "alice");
  }

  #[test]
  fn verify_rejects_wrong_user_stale_token_and_blank_user() {
    let a = auth();
    let alice_today = a.issue_today("alice");
    assert!(matches!(
      a.verify(&creds("bob", alice_today.clone())),
      Err(ApiError::Unauthorized)
    ));

    let long_ago = a.issue("alice", NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
    assert!(matches!(a.verify(&creds("alice", long_ago)), Err(ApiError::Unauthorized)));

    assert!(matches!(a.verify(&creds("  ", alice_today)), Err(ApiError::Unauthorized)));
    assert!(matches!(
      a.verify(&creds("alice", "short".into())),
      Err(ApiError::Unauthorized)
    ));
  }
}
