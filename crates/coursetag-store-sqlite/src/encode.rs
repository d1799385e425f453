//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, week
//! number lists compact JSON arrays. Periods are stored as two integer columns
//! and re-validated on the way out.

use chrono::{DateTime, Utc};
use coursetag_core::{
  audit::AuditStamps,
  catalog::{SubTheme, Theme},
  entry::{CourseEntry, CourseRef},
  period::AcademicPeriod,
  settings::{IndicatorType, PeriodSubThemeSetting, PeriodThemeSetting},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_indicator_type(t: IndicatorType) -> &'static str {
  match t {
    IndicatorType::TriLevel => "tri_level",
    IndicatorType::NumericScale => "numeric_scale",
    IndicatorType::Boolean => "boolean",
  }
}

pub fn decode_indicator_type(s: &str) -> Result<IndicatorType> {
  match s {
    "tri_level" => Ok(IndicatorType::TriLevel),
    "numeric_scale" => Ok(IndicatorType::NumericScale),
    "boolean" => Ok(IndicatorType::Boolean),
    other => Err(Error::Decode(format!("unknown indicator type: {other:?}"))),
  }
}

pub fn encode_weeks(weeks: Option<&[u8]>) -> Result<Option<String>> {
  Ok(weeks.map(serde_json::to_string).transpose()?)
}

pub fn decode_weeks(s: Option<&str>) -> Result<Option<Vec<u8>>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

// ─── Audit columns ───────────────────────────────────────────────────────────

/// The four audit columns, always selected last, in declaration order.
pub struct RawAudit {
  pub created_by: String,
  pub updated_by: String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawAudit {
  /// Read the audit columns starting at column `start`.
  pub fn read(row: &Row<'_>, start: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      created_by: row.get(start)?,
      updated_by: row.get(start + 1)?,
      created_at: row.get(start + 2)?,
      updated_at: row.get(start + 3)?,
    })
  }

  pub fn encode(audit: &AuditStamps) -> Self {
    Self {
      created_by: audit.created_by.clone(),
      updated_by: audit.updated_by.clone(),
      created_at: encode_dt(audit.created_at),
      updated_at: encode_dt(audit.updated_at),
    }
  }

  pub fn into_stamps(self) -> Result<AuditStamps> {
    Ok(AuditStamps {
      created_by: self.created_by,
      updated_by: self.updated_by,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const THEME_COLUMNS: &str = "theme_id, code, name, short_name, english_name, \
                                 chinese_link, english_link, created_by, updated_by, \
                                 created_at, updated_at";

/// Raw values read directly from a `themes` row.
pub struct RawTheme {
  pub theme_id:     String,
  pub code:         String,
  pub name:         String,
  pub short_name:   String,
  pub english_name: String,
  pub chinese_link: Option<String>,
  pub english_link: Option<String>,
  pub audit:        RawAudit,
}

impl RawTheme {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      theme_id:     row.get(0)?,
      code:         row.get(1)?,
      name:         row.get(2)?,
      short_name:   row.get(3)?,
      english_name: row.get(4)?,
      chinese_link: row.get(5)?,
      english_link: row.get(6)?,
      audit:        RawAudit::read(row, 7)?,
    })
  }

  pub fn encode(theme: &Theme) -> Self {
    Self {
      theme_id:     encode_uuid(theme.theme_id),
      code:         theme.code.clone(),
      name:         theme.name.clone(),
      short_name:   theme.short_name.clone(),
      english_name: theme.english_name.clone(),
      chinese_link: theme.chinese_link.clone(),
      english_link: theme.english_link.clone(),
      audit:        RawAudit::encode(&theme.audit),
    }
  }

  pub fn into_theme(self) -> Result<Theme> {
    Ok(Theme {
      theme_id:     decode_uuid(&self.theme_id)?,
      code:         self.code,
      name:         self.name,
      short_name:   self.short_name,
      english_name: self.english_name,
      chinese_link: self.chinese_link,
      english_link: self.english_link,
      audit:        self.audit.into_stamps()?,
    })
  }
}

pub const SUB_THEME_COLUMNS: &str = "sub_theme_id, theme_id, code, name, english_name, \
                                     content, english_content, created_by, updated_by, \
                                     created_at, updated_at";

/// Raw values read directly from a `sub_themes` row.
pub struct RawSubTheme {
  pub sub_theme_id:    String,
  pub theme_id:        String,
  pub code:            String,
  pub name:            String,
  pub english_name:    String,
  pub content:         Option<String>,
  pub english_content: Option<String>,
  pub audit:           RawAudit,
}

impl RawSubTheme {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sub_theme_id:    row.get(0)?,
      theme_id:        row.get(1)?,
      code:            row.get(2)?,
      name:            row.get(3)?,
      english_name:    row.get(4)?,
      content:         row.get(5)?,
      english_content: row.get(6)?,
      audit:           RawAudit::read(row, 7)?,
    })
  }

  pub fn encode(sub_theme: &SubTheme) -> Self {
    Self {
      sub_theme_id:    encode_uuid(sub_theme.sub_theme_id),
      theme_id:        encode_uuid(sub_theme.theme_id),
      code:            sub_theme.code.clone(),
      name:            sub_theme.name.clone(),
      english_name:    sub_theme.english_name.clone(),
      content:         sub_theme.content.clone(),
      english_content: sub_theme.english_content.clone(),
      audit:           RawAudit::encode(&sub_theme.audit),
    }
  }

  pub fn into_sub_theme(self) -> Result<SubTheme> {
    Ok(SubTheme {
      sub_theme_id:    decode_uuid(&self.sub_theme_id)?,
      theme_id:        decode_uuid(&self.theme_id)?,
      code:            self.code,
      name:            self.name,
      english_name:    self.english_name,
      content:         self.content,
      english_content: self.english_content,
      audit:           self.audit.into_stamps()?,
    })
  }
}

pub const THEME_SETTING_COLUMNS: &str = "setting_id, academic_year, academic_term, theme_id, \
                                         week_numbers_required, indicator_type, scale_max, \
                                         most_relevant_enabled, created_by, updated_by, \
                                         created_at, updated_at";

/// Raw values read directly from a `period_theme_settings` row.
pub struct RawThemeSetting {
  pub setting_id:             String,
  pub academic_year:          u32,
  pub academic_term:          u8,
  pub theme_id:               String,
  pub week_numbers_required:  bool,
  pub indicator_type:         String,
  pub scale_max:              u8,
  pub most_relevant_enabled:  bool,
  pub audit:                  RawAudit,
}

impl RawThemeSetting {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      setting_id:             row.get(0)?,
      academic_year:          row.get(1)?,
      academic_term:          row.get(2)?,
      theme_id:               row.get(3)?,
      week_numbers_required:  row.get(4)?,
      indicator_type:         row.get(5)?,
      scale_max:              row.get(6)?,
      most_relevant_enabled:  row.get(7)?,
      audit:                  RawAudit::read(row, 8)?,
    })
  }

  pub fn into_setting(self) -> Result<PeriodThemeSetting> {
    Ok(PeriodThemeSetting {
      setting_id:             decode_uuid(&self.setting_id)?,
      period:                 AcademicPeriod::new(self.academic_year, self.academic_term)?,
      theme_id:               decode_uuid(&self.theme_id)?,
      week_numbers_required:  self.week_numbers_required,
      indicator_type:         decode_indicator_type(&self.indicator_type)?,
      scale_max:              self.scale_max,
      most_relevant_enabled:  self.most_relevant_enabled,
      audit:                  self.audit.into_stamps()?,
    })
  }
}

/// Selected from `period_sub_theme_settings s JOIN sub_themes t`; the owning
/// theme comes from the join.
pub const SUB_THEME_SETTING_COLUMNS: &str = "s.setting_id, s.academic_year, s.academic_term, \
                                             s.sub_theme_id, t.theme_id, s.enabled, \
                                             s.created_by, s.updated_by, s.created_at, \
                                             s.updated_at";

/// Raw values read from a `period_sub_theme_settings` row joined with its
/// sub-theme.
pub struct RawSubThemeSetting {
  pub setting_id:    String,
  pub academic_year: u32,
  pub academic_term: u8,
  pub sub_theme_id:  String,
  pub theme_id:      String,
  pub enabled:       bool,
  pub audit:         RawAudit,
}

impl RawSubThemeSetting {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      setting_id:    row.get(0)?,
      academic_year: row.get(1)?,
      academic_term: row.get(2)?,
      sub_theme_id:  row.get(3)?,
      theme_id:      row.get(4)?,
      enabled:       row.get(5)?,
      audit:         RawAudit::read(row, 6)?,
    })
  }

  pub fn into_setting(self) -> Result<PeriodSubThemeSetting> {
    Ok(PeriodSubThemeSetting {
      setting_id:   decode_uuid(&self.setting_id)?,
      period:       AcademicPeriod::new(self.academic_year, self.academic_term)?,
      sub_theme_id: decode_uuid(&self.sub_theme_id)?,
      theme_id:     decode_uuid(&self.theme_id)?,
      enabled:      self.enabled,
      audit:        self.audit.into_stamps()?,
    })
  }
}

pub const ENTRY_COLUMNS: &str = "entry_id, subject_code, class_number, academic_year, \
                                 academic_term, sub_theme_id, indicator_value, week_numbers, \
                                 is_most_relevant, created_by, updated_by, created_at, \
                                 updated_at";

/// Raw values read directly from a `course_entries` row.
pub struct RawEntry {
  pub entry_id:         String,
  pub subject_code:     String,
  pub class_number:     String,
  pub academic_year:    u32,
  pub academic_term:    u8,
  pub sub_theme_id:     String,
  pub indicator_value:  String,
  pub week_numbers:     Option<String>,
  pub is_most_relevant: bool,
  pub audit:            RawAudit,
}

impl RawEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:         row.get(0)?,
      subject_code:     row.get(1)?,
      class_number:     row.get(2)?,
      academic_year:    row.get(3)?,
      academic_term:    row.get(4)?,
      sub_theme_id:     row.get(5)?,
      indicator_value:  row.get(6)?,
      week_numbers:     row.get(7)?,
      is_most_relevant: row.get(8)?,
      audit:            RawAudit::read(row, 9)?,
    })
  }

  pub fn encode(entry: &CourseEntry) -> Result<Self> {
    Ok(Self {
      entry_id:         encode_uuid(entry.entry_id),
      subject_code:     entry.course.subject_code.clone(),
      class_number:     entry.course.class_number.clone(),
      academic_year:    entry.period.year(),
      academic_term:    entry.period.term(),
      sub_theme_id:     encode_uuid(entry.sub_theme_id),
      indicator_value:  entry.indicator_value.clone(),
      week_numbers:     encode_weeks(entry.week_numbers.as_deref())?,
      is_most_relevant: entry.is_most_relevant,
      audit:            RawAudit::encode(&entry.audit),
    })
  }

  pub fn into_entry(self) -> Result<CourseEntry> {
    Ok(CourseEntry {
      entry_id:         decode_uuid(&self.entry_id)?,
      course:           CourseRef::new(self.subject_code, self.class_number),
      period:           AcademicPeriod::new(self.academic_year, self.academic_term)?,
      sub_theme_id:     decode_uuid(&self.sub_theme_id)?,
      indicator_value:  self.indicator_value,
      week_numbers:     decode_weeks(self.week_numbers.as_deref())?,
      is_most_relevant: self.is_most_relevant,
      audit:            self.audit.into_stamps()?,
    })
  }

  /// Insert this row; fails on an existing identity.
  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    self.execute(conn, INSERT_ENTRY)
  }

  /// Insert this row, or overwrite the value, weeks, most-relevant flag and
  /// update stamps of the row with the same identity.
  pub fn upsert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    self.execute(
      conn,
      &format!(
        "{INSERT_ENTRY}
         ON CONFLICT (subject_code, class_number, academic_year, academic_term, sub_theme_id)
         DO UPDATE SET
           indicator_value  = excluded.indicator_value,
           week_numbers     = excluded.week_numbers,
           is_most_relevant = excluded.is_most_relevant,
           updated_by       = excluded.updated_by,
           updated_at       = excluded.updated_at"
      ),
    )
  }

  fn execute(&self, conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(sql)?;
    stmt.execute(rusqlite::params![
      self.entry_id,
      self.subject_code,
      self.class_number,
      self.academic_year,
      self.academic_term,
      self.sub_theme_id,
      self.indicator_value,
      self.week_numbers,
      self.is_most_relevant,
      self.audit.created_by,
      self.audit.updated_by,
      self.audit.created_at,
      self.audit.updated_at,
    ])?;
    Ok(())
  }
}

const INSERT_ENTRY: &str = "INSERT INTO course_entries (
    entry_id, subject_code, class_number, academic_year, academic_term,
    sub_theme_id, indicator_value, week_numbers, is_most_relevant,
    created_by, updated_by, created_at, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";
