//! Attribution: who wrote a record and when.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An already-authenticated identity, threaded explicitly into every write.
///
/// Nothing in this crate verifies it; the transport layer constructs one only
/// after checking the caller's credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActingIdentity(String);

impl ActingIdentity {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ActingIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Creation and last-update stamps carried by every persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamps {
  pub created_by: String,
  pub updated_by: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl AuditStamps {
  /// Stamps for a record created now by `actor`; both sides point at `actor`.
  pub fn created(actor: &ActingIdentity, at: DateTime<Utc>) -> Self {
    Self {
      created_by: actor.as_str().to_owned(),
      updated_by: actor.as_str().to_owned(),
      created_at: at,
      updated_at: at,
    }
  }

  /// Record an update by `actor` at `at`; the creation stamps are kept.
  pub fn touch(&mut self, actor: &ActingIdentity, at: DateTime<Utc>) {
    self.updated_by = actor.as_str().to_owned();
    self.updated_at = at;
  }
}
