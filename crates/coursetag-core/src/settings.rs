//! Per-period configuration: how each theme is filled in during a period and
//! which sub-themes are enabled in it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::AuditStamps,
  catalog::{SubTheme, Theme},
  period::AcademicPeriod,
};

/// Upper bound for [`ThemeSettingInput::scale_max`].
pub const MAX_SCALE: u8 = 10;

pub const DEFAULT_SCALE: u8 = 3;

// ─── Indicator types ─────────────────────────────────────────────────────────

/// How indicator values are expressed for every sub-theme of a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
  /// `L`, `M` or `H`.
  #[default]
  TriLevel,
  /// An integer string in `1..=scale_max`.
  NumericScale,
  /// `Y` or `N`.
  Boolean,
}

impl IndicatorType {
  /// Check `value` against this indicator type.
  pub fn validate(self, value: &str, scale_max: u8) -> Result<()> {
    let ok = match self {
      Self::TriLevel => matches!(value, "L" | "M" | "H"),
      Self::Boolean => matches!(value, "Y" | "N"),
      Self::NumericScale => value
        .parse::<u8>()
        .is_ok_and(|n| (1..=scale_max).contains(&n)),
    };
    if ok {
      Ok(())
    } else {
      Err(Error::InvalidIndicator { value: value.to_owned(), kind: self })
    }
  }
}

impl fmt::Display for IndicatorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::TriLevel => "tri-level",
      Self::NumericScale => "numeric-scale",
      Self::Boolean => "boolean",
    })
  }
}

// ─── Theme settings ──────────────────────────────────────────────────────────

/// Configuration for one theme in one period; unique per `(period, theme)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodThemeSetting {
  pub setting_id:             Uuid,
  #[serde(flatten)]
  pub period:                 AcademicPeriod,
  pub theme_id:               Uuid,
  pub week_numbers_required:  bool,
  pub indicator_type:         IndicatorType,
  pub scale_max:              u8,
  /// Whether a course may mark one of the theme's sub-themes as most
  /// relevant. At most one entry per course, period and theme carries the
  /// mark.
  pub most_relevant_enabled:  bool,
  #[serde(flatten)]
  pub audit:                  AuditStamps,
}

/// Input to [`crate::store::CourseTagStore::put_theme_setting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ThemeSettingInput {
  #[serde(default = "default_true")]
  pub week_numbers_required:  bool,
  #[serde(default)]
  pub indicator_type:         IndicatorType,
  #[serde(default = "default_scale")]
  pub scale_max:              u8,
  #[serde(default)]
  pub most_relevant_enabled:  bool,
}

impl Default for ThemeSettingInput {
  fn default() -> Self {
    Self {
      week_numbers_required:  true,
      indicator_type:         IndicatorType::default(),
      scale_max:              DEFAULT_SCALE,
      most_relevant_enabled:  false,
    }
  }
}

impl ThemeSettingInput {
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_SCALE).contains(&self.scale_max) {
      return Err(Error::InvalidScaleMax { got: self.scale_max });
    }
    Ok(())
  }
}

fn default_true() -> bool { true }

fn default_scale() -> u8 { DEFAULT_SCALE }

// ─── Sub-theme settings ──────────────────────────────────────────────────────

/// Enablement of one sub-theme in one period; unique per
/// `(period, sub_theme)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSubThemeSetting {
  pub setting_id:   Uuid,
  #[serde(flatten)]
  pub period:       AcademicPeriod,
  pub sub_theme_id: Uuid,
  /// The sub-theme's owning theme, denormalised for display.
  pub theme_id:     Uuid,
  pub enabled:      bool,
  #[serde(flatten)]
  pub audit:        AuditStamps,
}

// ─── Settings copy ───────────────────────────────────────────────────────────

/// Outcome of copying one period's settings onto another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsCopySummary {
  pub themes_copied:      usize,
  pub sub_themes_copied:  usize,
  pub themes_deleted:     usize,
  pub sub_themes_deleted: usize,
}

// ─── Period overview ─────────────────────────────────────────────────────────

/// Everything needed to fill in a period: each configured theme with its
/// setting and the enablement of every one of its sub-themes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOverview {
  #[serde(flatten)]
  pub period: AcademicPeriod,
  /// Themes with a setting in the period, ordered by code.
  pub themes: Vec<ThemeOverview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeOverview {
  pub theme:      Theme,
  pub setting:    PeriodThemeSetting,
  /// All sub-themes of the theme, ordered by code.
  pub sub_themes: Vec<SubThemeOverview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubThemeOverview {
  pub sub_theme: SubTheme,
  /// `false` when the period has no setting for the sub-theme.
  pub enabled:   bool,
}

impl PeriodOverview {
  /// Number of enabled sub-themes across all themes.
  pub fn enabled_count(&self) -> usize {
    self
      .themes
      .iter()
      .flat_map(|t| &t.sub_themes)
      .filter(|s| s.enabled)
      .count()
  }
}
