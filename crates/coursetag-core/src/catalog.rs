//! The theme catalog: a two-level taxonomy of indicators courses are tagged
//! against.
//!
//! Themes own sub-themes. A theme cannot be removed while it still owns
//! sub-themes, and a sub-theme cannot be removed while any course entry
//! references it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, audit::AuditStamps};

// ─── Theme ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
  pub theme_id:     Uuid,
  /// Display label, unique across themes. May be changed after creation.
  pub code:         String,
  pub name:         String,
  pub short_name:   String,
  pub english_name: String,
  pub chinese_link: Option<String>,
  pub english_link: Option<String>,
  #[serde(flatten)]
  pub audit:        AuditStamps,
}

/// Input to [`crate::store::CourseTagStore::create_theme`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTheme {
  pub code:         String,
  pub name:         String,
  pub short_name:   String,
  pub english_name: String,
  pub chinese_link: Option<String>,
  pub english_link: Option<String>,
}

impl NewTheme {
  pub fn validate(&self) -> Result<()> {
    non_empty("code", &self.code)?;
    non_empty("name", &self.name)?;
    non_empty("short_name", &self.short_name)?;
    non_empty("english_name", &self.english_name)
  }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemePatch {
  pub code:         Option<String>,
  pub name:         Option<String>,
  pub short_name:   Option<String>,
  pub english_name: Option<String>,
  pub chinese_link: Option<String>,
  pub english_link: Option<String>,
}

impl ThemePatch {
  /// Fields that are required on creation may not be blanked.
  pub fn validate(&self) -> Result<()> {
    non_empty_if_set("code", self.code.as_deref())?;
    non_empty_if_set("name", self.name.as_deref())?;
    non_empty_if_set("short_name", self.short_name.as_deref())?;
    non_empty_if_set("english_name", self.english_name.as_deref())
  }

  pub fn apply(self, theme: &mut Theme) {
    if let Some(v) = self.code {
      theme.code = v;
    }
    if let Some(v) = self.name {
      theme.name = v;
    }
    if let Some(v) = self.short_name {
      theme.short_name = v;
    }
    if let Some(v) = self.english_name {
      theme.english_name = v;
    }
    if let Some(v) = self.chinese_link {
      theme.chinese_link = Some(v);
    }
    if let Some(v) = self.english_link {
      theme.english_link = Some(v);
    }
  }
}

// ─── SubTheme ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTheme {
  pub sub_theme_id:    Uuid,
  /// The owning theme. Never changes after creation.
  pub theme_id:        Uuid,
  /// Unique within the owning theme.
  pub code:            String,
  pub name:            String,
  pub english_name:    String,
  pub content:         Option<String>,
  pub english_content: Option<String>,
  #[serde(flatten)]
  pub audit:           AuditStamps,
}

/// Input to [`crate::store::CourseTagStore::create_sub_theme`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubTheme {
  pub theme_id:        Uuid,
  pub code:            String,
  pub name:            String,
  pub english_name:    String,
  pub content:         Option<String>,
  pub english_content: Option<String>,
}

impl NewSubTheme {
  pub fn validate(&self) -> Result<()> {
    non_empty("code", &self.code)?;
    non_empty("name", &self.name)?;
    non_empty("english_name", &self.english_name)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubThemePatch {
  pub code:            Option<String>,
  pub name:            Option<String>,
  pub english_name:    Option<String>,
  pub content:         Option<String>,
  pub english_content: Option<String>,
}

impl SubThemePatch {
  pub fn validate(&self) -> Result<()> {
    non_empty_if_set("code", self.code.as_deref())?;
    non_empty_if_set("name", self.name.as_deref())?;
    non_empty_if_set("english_name", self.english_name.as_deref())
  }

  pub fn apply(self, sub_theme: &mut SubTheme) {
    if let Some(v) = self.code {
      sub_theme.code = v;
    }
    if let Some(v) = self.name {
      sub_theme.name = v;
    }
    if let Some(v) = self.english_name {
      sub_theme.english_name = v;
    }
    if let Some(v) = self.content {
      sub_theme.content = Some(v);
    }
    if let Some(v) = self.english_content {
      sub_theme.english_content = Some(v);
    }
  }
}

fn non_empty(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::EmptyField { field });
  }
  Ok(())
}

fn non_empty_if_set(field: &'static str, value: Option<&str>) -> Result<()> {
  value.map_or(Ok(()), |v| non_empty(field, v))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::audit::ActingIdentity;

  fn theme() -> Theme {
    Theme {
      theme_id:     Uuid::new_v4(),
      code:         "A101".into(),
      name:         "Sustainable Development Goals".into(),
      short_name:   "SDGs".into(),
      english_name: "SDGs".into(),
      chinese_link: None,
      english_link: None,
      audit:        AuditStamps::created(&ActingIdentity::new("admin"), Utc::now()),
    }
  }

  #[test]
  fn patch_only_touches_present_fields() {
    let mut t = theme();
    ThemePatch {
      code: Some("A102".into()),
      english_link: Some("https://sdgs.un.org/".into()),
      ..Default::default()
    }
    .apply(&mut t);

    assert_eq!(t.code, "A102");
    assert_eq!(t.name, "Sustainable Development Goals");
    assert_eq!(t.english_link.as_deref(), Some("https://sdgs.un.org/"));
    assert!(t.chinese_link.is_none());
  }

  #[test]
  fn blank_fields_are_rejected() {
    let input = NewTheme {
      code:         "  ".into(),
      name:         "x".into(),
      short_name:   "x".into(),
      english_name: "x".into(),
      chinese_link: None,
      english_link: None,
    };
    assert!(matches!(
      input.validate(),
      Err(Error::EmptyField { field: "code" })
    ));

    let patch = SubThemePatch { name: Some(String::new()), ..Default::default() };
    assert!(matches!(
      patch.validate(),
      Err(Error::EmptyField { field: "name" })
    ));
  }

  #[test]
  fn patches_cannot_blank_required_names() {
    let patch = ThemePatch { short_name: Some(" ".into()), ..Default::default() };
    assert!(matches!(
      patch.validate(),
      Err(Error::EmptyField { field: "short_name" })
    ));

    let patch = ThemePatch { english_name: Some(String::new()), ..Default::default() };
    assert!(matches!(
      patch.validate(),
      Err(Error::EmptyField { field: "english_name" })
    ));

    let patch = SubThemePatch { english_name: Some("\t".into()), ..Default::default() };
    assert!(matches!(
      patch.validate(),
      Err(Error::EmptyField { field: "english_name" })
    ));

    // Optional fields may still be cleared to an empty string.
    let patch = ThemePatch { chinese_link: Some(String::new()), ..Default::default() };
    assert!(patch.validate().is_ok());
  }
}
