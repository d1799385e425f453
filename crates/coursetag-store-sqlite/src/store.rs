//! [`SqliteStore`]: the SQLite implementation of [`CourseTagStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tracing::{info, warn};
use uuid::Uuid;

use coursetag_core::{
  audit::{ActingIdentity, AuditStamps},
  catalog::{NewSubTheme, NewTheme, SubTheme, SubThemePatch, Theme, ThemePatch},
  entry::{CourseEntry, CourseRef, NewCourseEntry},
  period::AcademicPeriod,
  replication::{
    self, CopyRequest, EntryStore as _, PeriodConfigReader as _, ReplicationFailed,
    ReplicationResult,
  },
  settings::{
    PeriodOverview, PeriodSubThemeSetting, PeriodThemeSetting, SettingsCopySummary,
    SubThemeOverview, ThemeOverview, ThemeSettingInput,
  },
  store::CourseTagStore,
};

use crate::{
  Error, Result,
  encode::{
    ENTRY_COLUMNS, RawEntry, RawSubTheme, RawSubThemeSetting, RawTheme, RawThemeSetting,
    SUB_THEME_COLUMNS, SUB_THEME_SETTING_COLUMNS, THEME_COLUMNS, THEME_SETTING_COLUMNS,
    decode_uuid, encode_dt, encode_indicator_type, encode_uuid,
  },
  error::Constraint,
  schema::SCHEMA,
  unit_of_work::SqliteUnitOfWork,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A course-tagging store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Sub-theme settings of one period joined with their sub-theme, which
/// supplies the owning theme id. `filter` extends the WHERE clause.
fn sub_theme_setting_query(filter: &str) -> String {
  format!(
    "SELECT {SUB_THEME_SETTING_COLUMNS}
     FROM period_sub_theme_settings s
     JOIN sub_themes t ON t.sub_theme_id = s.sub_theme_id
     WHERE s.academic_year = ?1 AND s.academic_term = ?2 {filter}
     ORDER BY t.theme_id, s.sub_theme_id"
  )
}

/// Validate `input` against its period's configuration and upsert it on
/// `conn`, returning the stored row.
fn upsert_entry(
  conn: &Connection,
  input: NewCourseEntry,
  actor: &ActingIdentity,
) -> Result<CourseEntry> {
  let period = input.period;
  let sub_theme_id = input.sub_theme_id;
  let sub_str = encode_uuid(sub_theme_id);

  // The owning theme, and whether the sub-theme is enabled in the period.
  let found = conn
    .query_row(
      "SELECT t.theme_id, s.enabled
       FROM sub_themes t
       LEFT JOIN period_sub_theme_settings s
         ON s.sub_theme_id = t.sub_theme_id
        AND s.academic_year = ?2 AND s.academic_term = ?3
       WHERE t.sub_theme_id = ?1",
      rusqlite::params![sub_str, period.year(), period.term()],
      |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<bool>>(1)?)),
    )
    .optional()?;

  let Some((theme_str, enabled)) = found else {
    return Err(Error::SubThemeNotFound(sub_theme_id));
  };
  if enabled != Some(true) {
    return Err(Error::SubThemeNotEnabled { sub_theme_id, period });
  }

  let theme_id = decode_uuid(&theme_str)?;
  let setting = conn
    .query_row(
      &format!(
        "SELECT {THEME_SETTING_COLUMNS} FROM period_theme_settings
         WHERE academic_year = ?1 AND academic_term = ?2 AND theme_id = ?3"
      ),
      rusqlite::params![period.year(), period.term(), theme_str],
      RawThemeSetting::from_row,
    )
    .optional()?
    .ok_or(Error::ThemeNotConfigured { theme_id, period })?
    .into_setting()?;
  input.validate_against(&setting)?;

  if input.is_most_relevant {
    // Re-marking the same sub-theme is an update, not a second mark.
    let taken = conn.query_row(
      "SELECT EXISTS (
         SELECT 1 FROM course_entries e
         JOIN sub_themes t ON t.sub_theme_id = e.sub_theme_id
         WHERE e.subject_code = ?1 AND e.class_number = ?2
           AND e.academic_year = ?3 AND e.academic_term = ?4
           AND t.theme_id = ?5 AND e.sub_theme_id != ?6
           AND e.is_most_relevant = 1
       )",
      rusqlite::params![
        input.course.subject_code,
        input.course.class_number,
        period.year(),
        period.term(),
        theme_str,
        sub_str,
      ],
      |row| row.get::<_, bool>(0),
    )?;
    if taken {
      return Err(Error::MostRelevantTaken { course: input.course, theme_id, period });
    }
  }

  let candidate = CourseEntry {
    entry_id: Uuid::new_v4(),
    course: input.course,
    period,
    sub_theme_id,
    indicator_value: input.indicator_value,
    week_numbers: input.week_numbers,
    is_most_relevant: input.is_most_relevant,
    audit: AuditStamps::created(actor, Utc::now()),
  };
  let raw = RawEntry::encode(&candidate)?;
  raw.upsert(conn)?;

  conn
    .query_row(
      &format!(
        "SELECT {ENTRY_COLUMNS} FROM course_entries
         WHERE subject_code = ?1 AND class_number = ?2
           AND academic_year = ?3 AND academic_term = ?4 AND sub_theme_id = ?5"
      ),
      rusqlite::params![
        raw.subject_code,
        raw.class_number,
        raw.academic_year,
        raw.academic_term,
        raw.sub_theme_id,
      ],
      RawEntry::from_row,
    )?
    .into_entry()
}

/// Every theme configured in `period`, ordered by theme code, with each of
/// its sub-themes and whether that sub-theme is enabled there.
fn load_overview(conn: &Connection, period: AcademicPeriod) -> Result<PeriodOverview> {
  let enabled = SqliteUnitOfWork::new(conn).enabled_sub_themes(period)?;

  let settings = {
    let mut stmt = conn.prepare(&format!(
      "SELECT {THEME_SETTING_COLUMNS} FROM period_theme_settings
       WHERE academic_year = ?1 AND academic_term = ?2"
    ))?;
    stmt
      .query_map(
        rusqlite::params![period.year(), period.term()],
        RawThemeSetting::from_row,
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut theme_of =
    conn.prepare(&format!("SELECT {THEME_COLUMNS} FROM themes WHERE theme_id = ?1"))?;
  let mut sub_themes_of = conn.prepare(&format!(
    "SELECT {SUB_THEME_COLUMNS} FROM sub_themes WHERE theme_id = ?1 ORDER BY code"
  ))?;

  let mut themes = Vec::with_capacity(settings.len());
  for raw_setting in settings {
    let theme = theme_of
      .query_row(rusqlite::params![raw_setting.theme_id], RawTheme::from_row)?
      .into_theme()?;
    let sub_themes = sub_themes_of
      .query_map(rusqlite::params![raw_setting.theme_id], RawSubTheme::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
      .into_iter()
      .map(|raw| {
        let sub_theme = raw.into_sub_theme()?;
        Ok(SubThemeOverview {
          enabled: enabled.contains(&sub_theme.sub_theme_id),
          sub_theme,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    themes.push(ThemeOverview {
      theme,
      setting: raw_setting.into_setting()?,
      sub_themes,
    });
  }
  themes.sort_by(|a, b| a.theme.code.cmp(&b.theme.code));

  Ok(PeriodOverview { period, themes })
}

// ─── CourseTagStore impl ─────────────────────────────────────────────────────

impl CourseTagStore for SqliteStore {
  type Error = Error;

  // ── Themes ────────────────────────────────────────────────────────────────

  async fn create_theme(&self, input: NewTheme, actor: ActingIdentity) -> Result<Theme> {
    input.validate()?;

    let theme = Theme {
      theme_id:     Uuid::new_v4(),
      code:         input.code,
      name:         input.name,
      short_name:   input.short_name,
      english_name: input.english_name,
      chinese_link: input.chinese_link,
      english_link: input.english_link,
      audit:        AuditStamps::created(&actor, Utc::now()),
    };
    let raw = RawTheme::encode(&theme);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO themes ({THEME_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            raw.theme_id,
            raw.code,
            raw.name,
            raw.short_name,
            raw.english_name,
            raw.chinese_link,
            raw.english_link,
            raw.audit.created_by,
            raw.audit.updated_by,
            raw.audit.created_at,
            raw.audit.updated_at,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::Unique) => Error::DuplicateCode(theme.code.clone()),
        _ => Error::Database(e),
      })?;

    Ok(theme)
  }

  async fn get_theme(&self, id: Uuid) -> Result<Option<Theme>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTheme> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {THEME_COLUMNS} FROM themes WHERE theme_id = ?1"),
            rusqlite::params![id_str],
            RawTheme::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTheme::into_theme).transpose()
  }

  async fn list_themes(&self) -> Result<Vec<Theme>> {
    let raws: Vec<RawTheme> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {THEME_COLUMNS} FROM themes ORDER BY code"))?;
        let rows = stmt
          .query_map([], RawTheme::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTheme::into_theme).collect()
  }

  async fn update_theme(
    &self,
    id: Uuid,
    patch: ThemePatch,
    actor: ActingIdentity,
  ) -> Result<Option<Theme>> {
    patch.validate()?;
    let Some(mut theme) = self.get_theme(id).await? else {
      return Ok(None);
    };

    patch.apply(&mut theme);
    theme.audit.touch(&actor, Utc::now());
    let raw = RawTheme::encode(&theme);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE themes SET
             code = ?2, name = ?3, short_name = ?4, english_name = ?5,
             chinese_link = ?6, english_link = ?7, updated_by = ?8, updated_at = ?9
           WHERE theme_id = ?1",
          rusqlite::params![
            raw.theme_id,
            raw.code,
            raw.name,
            raw.short_name,
            raw.english_name,
            raw.chinese_link,
            raw.english_link,
            raw.audit.updated_by,
            raw.audit.updated_at,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::Unique) => Error::DuplicateCode(theme.code.clone()),
        _ => Error::Database(e),
      })?;

    Ok(Some(theme))
  }

  async fn delete_theme(&self, id: Uuid) -> Result<Option<Theme>> {
    let Some(theme) = self.get_theme(id).await? else {
      return Ok(None);
    };
    let id_str = encode_uuid(id);

    // Period settings cascade; owned sub-themes make the delete fail.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM themes WHERE theme_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::ForeignKey) => Error::ThemeInUse(id),
        _ => Error::Database(e),
      })?;

    info!(theme_id = %id, code = %theme.code, "theme deleted");
    Ok(Some(theme))
  }

  // ── Sub-themes ────────────────────────────────────────────────────────────

  async fn create_sub_theme(
    &self,
    input: NewSubTheme,
    actor: ActingIdentity,
  ) -> Result<SubTheme> {
    input.validate()?;

    let sub_theme = SubTheme {
      sub_theme_id:    Uuid::new_v4(),
      theme_id:        input.theme_id,
      code:            input.code,
      name:            input.name,
      english_name:    input.english_name,
      content:         input.content,
      english_content: input.english_content,
      audit:           AuditStamps::created(&actor, Utc::now()),
    };
    let raw = RawSubTheme::encode(&sub_theme);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO sub_themes ({SUB_THEME_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            raw.sub_theme_id,
            raw.theme_id,
            raw.code,
            raw.name,
            raw.english_name,
            raw.content,
            raw.english_content,
            raw.audit.created_by,
            raw.audit.updated_by,
            raw.audit.created_at,
            raw.audit.updated_at,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::Unique) => Error::DuplicateCode(sub_theme.code.clone()),
        Some(Constraint::ForeignKey) => Error::ThemeNotFound(sub_theme.theme_id),
        None => Error::Database(e),
      })?;

    Ok(sub_theme)
  }

  async fn get_sub_theme(&self, id: Uuid) -> Result<Option<SubTheme>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubTheme> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SUB_THEME_COLUMNS} FROM sub_themes WHERE sub_theme_id = ?1"),
            rusqlite::params![id_str],
            RawSubTheme::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubTheme::into_sub_theme).transpose()
  }

  async fn list_sub_themes(&self, theme_id: Option<Uuid>) -> Result<Vec<SubTheme>> {
    let theme_str = theme_id.map(encode_uuid);

    let raws: Vec<RawSubTheme> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUB_THEME_COLUMNS} FROM sub_themes
           WHERE ?1 IS NULL OR theme_id = ?1
           ORDER BY code"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![theme_str], RawSubTheme::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubTheme::into_sub_theme).collect()
  }

  async fn update_sub_theme(
    &self,
    id: Uuid,
    patch: SubThemePatch,
    actor: ActingIdentity,
  ) -> Result<Option<SubTheme>> {
    patch.validate()?;
    let Some(mut sub_theme) = self.get_sub_theme(id).await? else {
      return Ok(None);
    };

    patch.apply(&mut sub_theme);
    sub_theme.audit.touch(&actor, Utc::now());
    let raw = RawSubTheme::encode(&sub_theme);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE sub_themes SET
             code = ?2, name = ?3, english_name = ?4, content = ?5,
             english_content = ?6, updated_by = ?7, updated_at = ?8
           WHERE sub_theme_id = ?1",
          rusqlite::params![
            raw.sub_theme_id,
            raw.code,
            raw.name,
            raw.english_name,
            raw.content,
            raw.english_content,
            raw.audit.updated_by,
            raw.audit.updated_at,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::Unique) => Error::DuplicateCode(sub_theme.code.clone()),
        _ => Error::Database(e),
      })?;

    Ok(Some(sub_theme))
  }

  async fn delete_sub_theme(&self, id: Uuid) -> Result<Option<SubTheme>> {
    let Some(sub_theme) = self.get_sub_theme(id).await? else {
      return Ok(None);
    };
    let id_str = encode_uuid(id);

    // Period settings cascade; referencing course entries make the delete fail.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sub_themes WHERE sub_theme_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::ForeignKey) => Error::SubThemeInUse(id),
        _ => Error::Database(e),
      })?;

    info!(sub_theme_id = %id, code = %sub_theme.code, "sub-theme deleted");
    Ok(Some(sub_theme))
  }

  // ── Period settings ───────────────────────────────────────────────────────

  async fn put_theme_setting(
    &self,
    period: AcademicPeriod,
    theme_id: Uuid,
    input: ThemeSettingInput,
    actor: ActingIdentity,
  ) -> Result<PeriodThemeSetting> {
    input.validate()?;

    let setting_id = encode_uuid(Uuid::new_v4());
    let theme_str  = encode_uuid(theme_id);
    let kind       = encode_indicator_type(input.indicator_type);
    let actor_str  = actor.as_str().to_owned();
    let now        = encode_dt(Utc::now());

    let raw: RawThemeSetting = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO period_theme_settings (
             setting_id, academic_year, academic_term, theme_id,
             week_numbers_required, indicator_type, scale_max, most_relevant_enabled,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?10)
           ON CONFLICT (academic_year, academic_term, theme_id) DO UPDATE SET
             week_numbers_required  = excluded.week_numbers_required,
             indicator_type         = excluded.indicator_type,
             scale_max              = excluded.scale_max,
             most_relevant_enabled  = excluded.most_relevant_enabled,
             updated_by             = excluded.updated_by,
             updated_at             = excluded.updated_at",
          rusqlite::params![
            setting_id,
            period.year(),
            period.term(),
            theme_str,
            input.week_numbers_required,
            kind,
            input.scale_max,
            input.most_relevant_enabled,
            actor_str,
            now,
          ],
        )?;

        Ok(conn.query_row(
          &format!(
            "SELECT {THEME_SETTING_COLUMNS} FROM period_theme_settings
             WHERE academic_year = ?1 AND academic_term = ?2 AND theme_id = ?3"
          ),
          rusqlite::params![period.year(), period.term(), theme_str],
          RawThemeSetting::from_row,
        )?)
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::ForeignKey) => Error::ThemeNotFound(theme_id),
        _ => Error::Database(e),
      })?;

    raw.into_setting()
  }

  async fn get_theme_setting(
    &self,
    period: AcademicPeriod,
    theme_id: Uuid,
  ) -> Result<Option<PeriodThemeSetting>> {
    let theme_str = encode_uuid(theme_id);

    let raw: Option<RawThemeSetting> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {THEME_SETTING_COLUMNS} FROM period_theme_settings
               WHERE academic_year = ?1 AND academic_term = ?2 AND theme_id = ?3"
            ),
            rusqlite::params![period.year(), period.term(), theme_str],
            RawThemeSetting::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawThemeSetting::into_setting).transpose()
  }

  async fn list_theme_settings(&self, period: AcademicPeriod) -> Result<Vec<PeriodThemeSetting>> {
    let raws: Vec<RawThemeSetting> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {THEME_SETTING_COLUMNS} FROM period_theme_settings
           WHERE academic_year = ?1 AND academic_term = ?2
           ORDER BY theme_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![period.year(), period.term()],
            RawThemeSetting::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawThemeSetting::into_setting).collect()
  }

  async fn delete_theme_setting(&self, period: AcademicPeriod, theme_id: Uuid) -> Result<bool> {
    let theme_str = encode_uuid(theme_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM period_theme_settings
           WHERE academic_year = ?1 AND academic_term = ?2 AND theme_id = ?3",
          rusqlite::params![period.year(), period.term(), theme_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn set_sub_theme_enabled(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
    enabled: bool,
    actor: ActingIdentity,
  ) -> Result<PeriodSubThemeSetting> {
    let setting_id = encode_uuid(Uuid::new_v4());
    let sub_str    = encode_uuid(sub_theme_id);
    let actor_str  = actor.as_str().to_owned();
    let now        = encode_dt(Utc::now());

    let raw: RawSubThemeSetting = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO period_sub_theme_settings (
             setting_id, academic_year, academic_term, sub_theme_id, enabled,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)
           ON CONFLICT (academic_year, academic_term, sub_theme_id) DO UPDATE SET
             enabled    = excluded.enabled,
             updated_by = excluded.updated_by,
             updated_at = excluded.updated_at",
          rusqlite::params![
            setting_id,
            period.year(),
            period.term(),
            sub_str,
            enabled,
            actor_str,
            now,
          ],
        )?;

        Ok(conn.query_row(
          &sub_theme_setting_query("AND s.sub_theme_id = ?3"),
          rusqlite::params![period.year(), period.term(), sub_str],
          RawSubThemeSetting::from_row,
        )?)
      })
      .await
      .map_err(|e| match Constraint::of_call(&e) {
        Some(Constraint::ForeignKey) => Error::SubThemeNotFound(sub_theme_id),
        _ => Error::Database(e),
      })?;

    raw.into_setting()
  }

  async fn list_sub_theme_settings(
    &self,
    period: AcademicPeriod,
  ) -> Result<Vec<PeriodSubThemeSetting>> {
    let raws: Vec<RawSubThemeSetting> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sub_theme_setting_query(""))?;
        let rows = stmt
          .query_map(
            rusqlite::params![period.year(), period.term()],
            RawSubThemeSetting::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubThemeSetting::into_setting).collect()
  }

  async fn delete_sub_theme_setting(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> Result<bool> {
    let sub_str = encode_uuid(sub_theme_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM period_sub_theme_settings
           WHERE academic_year = ?1 AND academic_term = ?2 AND sub_theme_id = ?3",
          rusqlite::params![period.year(), period.term(), sub_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn copy_period_settings(
    &self,
    source: AcademicPeriod,
    target: AcademicPeriod,
    actor: ActingIdentity,
  ) -> Result<SettingsCopySummary> {
    let actor_str = actor.as_str().to_owned();
    let now       = encode_dt(Utc::now());

    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Read everything from the source first so a period can be copied
        // onto itself.
        let theme_settings = {
          let mut stmt = tx.prepare(
            "SELECT theme_id, week_numbers_required, indicator_type, scale_max,
                    most_relevant_enabled
             FROM period_theme_settings
             WHERE academic_year = ?1 AND academic_term = ?2",
          )?;
          stmt
            .query_map(rusqlite::params![source.year(), source.term()], |row| {
              Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, bool>(4)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        if theme_settings.is_empty() {
          return Ok(Err(Error::SourcePeriodEmpty(source)));
        }

        let source_enabled: HashMap<String, bool> = {
          let mut stmt = tx.prepare(
            "SELECT sub_theme_id, enabled FROM period_sub_theme_settings
             WHERE academic_year = ?1 AND academic_term = ?2",
          )?;
          stmt
            .query_map(rusqlite::params![source.year(), source.term()], |row| {
              Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut summary = SettingsCopySummary {
          sub_themes_deleted: tx.execute(
            "DELETE FROM period_sub_theme_settings
             WHERE academic_year = ?1 AND academic_term = ?2",
            rusqlite::params![target.year(), target.term()],
          )?,
          themes_deleted: tx.execute(
            "DELETE FROM period_theme_settings
             WHERE academic_year = ?1 AND academic_term = ?2",
            rusqlite::params![target.year(), target.term()],
          )?,
          ..Default::default()
        };

        {
          let mut insert_theme = tx.prepare(
            "INSERT INTO period_theme_settings (
               setting_id, academic_year, academic_term, theme_id,
               week_numbers_required, indicator_type, scale_max, most_relevant_enabled,
               created_by, updated_by, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?10)",
          )?;
          let mut insert_sub = tx.prepare(
            "INSERT INTO period_sub_theme_settings (
               setting_id, academic_year, academic_term, sub_theme_id, enabled,
               created_by, updated_by, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)",
          )?;
          let mut sub_themes_of =
            tx.prepare("SELECT sub_theme_id FROM sub_themes WHERE theme_id = ?1")?;

          for (theme_id, weeks_required, kind, scale_max, most_relevant) in &theme_settings {
            insert_theme.execute(rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              target.year(),
              target.term(),
              theme_id,
              weeks_required,
              kind,
              scale_max,
              most_relevant,
              actor_str,
              now,
            ])?;
            summary.themes_copied += 1;

            let sub_themes = sub_themes_of
              .query_map(rusqlite::params![theme_id], |row| row.get::<_, String>(0))?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            for sub_theme_id in sub_themes {
              let enabled = source_enabled.get(&sub_theme_id).copied().unwrap_or(false);
              insert_sub.execute(rusqlite::params![
                encode_uuid(Uuid::new_v4()),
                target.year(),
                target.term(),
                sub_theme_id,
                enabled,
                actor_str,
                now,
              ])?;
              summary.sub_themes_copied += 1;
            }
          }
        }

        tx.commit()?;
        Ok(Ok(summary))
      })
      .await??;

    info!(
      %source,
      %target,
      themes_copied = summary.themes_copied,
      sub_themes_copied = summary.sub_themes_copied,
      "period settings copied"
    );
    Ok(summary)
  }

  async fn period_overview(&self, period: AcademicPeriod) -> Result<PeriodOverview> {
    self
      .conn
      .call(move |conn| Ok(load_overview(conn, period)))
      .await?
  }

  // ── Course entries ────────────────────────────────────────────────────────

  async fn upsert_course_entry(
    &self,
    input: NewCourseEntry,
    actor: ActingIdentity,
  ) -> Result<CourseEntry> {
    self
      .conn
      .call(move |conn| Ok(upsert_entry(conn, input, &actor)))
      .await?
  }

  async fn upsert_course_entries(
    &self,
    inputs: Vec<NewCourseEntry>,
    actor: ActingIdentity,
  ) -> Result<Vec<CourseEntry>> {
    let stored = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let stored = inputs
          .into_iter()
          .map(|input| upsert_entry(&tx, input, &actor))
          .collect::<Result<Vec<_>>>();
        // Any failure drops `tx` uncommitted.
        if stored.is_ok() {
          tx.commit()?;
        }
        Ok(stored)
      })
      .await??;

    info!(count = stored.len(), "course entries stored");
    Ok(stored)
  }

  async fn list_course_entries(
    &self,
    course: CourseRef,
    period: AcademicPeriod,
  ) -> Result<Vec<CourseEntry>> {
    self
      .conn
      .call(move |conn| Ok(SqliteUnitOfWork::new(conn).entries_for(&course, period)))
      .await?
  }

  async fn list_courses_with_sub_theme(
    &self,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> Result<Vec<CourseRef>> {
    let sub_str = encode_uuid(sub_theme_id);

    let courses = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT subject_code, class_number FROM course_entries
           WHERE academic_year = ?1 AND academic_term = ?2 AND sub_theme_id = ?3
           ORDER BY subject_code, class_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![period.year(), period.term(), sub_str], |row| {
            Ok(CourseRef {
              subject_code: row.get(0)?,
              class_number: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(courses)
  }

  async fn has_course_entries(&self, course: CourseRef, period: AcademicPeriod) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM course_entries
             WHERE subject_code = ?1 AND class_number = ?2
               AND academic_year = ?3 AND academic_term = ?4
           )",
          rusqlite::params![
            course.subject_code,
            course.class_number,
            period.year(),
            period.term(),
          ],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(exists)
  }

  async fn delete_course_entry(
    &self,
    course: CourseRef,
    period: AcademicPeriod,
    sub_theme_id: Uuid,
  ) -> Result<bool> {
    let sub_str = encode_uuid(sub_theme_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM course_entries
           WHERE subject_code = ?1 AND class_number = ?2
             AND academic_year = ?3 AND academic_term = ?4 AND sub_theme_id = ?5",
          rusqlite::params![
            course.subject_code,
            course.class_number,
            period.year(),
            period.term(),
            sub_str,
          ],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Replication ───────────────────────────────────────────────────────────

  async fn copy_course_entries(&self, request: CopyRequest) -> Result<ReplicationResult> {
    let course = request.course.clone();
    let (source, target) = (request.source, request.target);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = match conn.transaction() {
          Ok(tx) => tx,
          Err(e) => return Ok(Err(ReplicationFailed::transaction(e))),
        };

        // Dropping `tx` without committing rolls everything back.
        let copied = replication::copy(&SqliteUnitOfWork::new(&tx), &request);
        Ok(match copied {
          Ok(result) => tx
            .commit()
            .map(|()| result)
            .map_err(ReplicationFailed::transaction),
          Err(e) => Err(e),
        })
      })
      .await
      .unwrap_or_else(|e| Err(ReplicationFailed::transaction(e)));

    match outcome {
      Ok(result) => {
        info!(
          %course,
          %source,
          %target,
          copied = result.copied_count,
          skipped = result.skipped_count,
          deleted = result.deleted_count,
          "course entries copied"
        );
        Ok(result)
      }
      Err(e) => {
        warn!(%course, %source, %target, error = %e, "course entry copy rolled back");
        Err(Error::Replication(e))
      }
    }
  }
}
