//! SQL schema for the coursetag SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS themes (
    theme_id     TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    short_name   TEXT NOT NULL,
    english_name TEXT NOT NULL,
    chinese_link TEXT,
    english_link TEXT,
    created_by   TEXT NOT NULL,
    updated_by   TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- No ON DELETE action: a theme that still owns sub-themes cannot be deleted.
CREATE TABLE IF NOT EXISTS sub_themes (
    sub_theme_id    TEXT PRIMARY KEY,
    theme_id        TEXT NOT NULL REFERENCES themes(theme_id),
    code            TEXT NOT NULL,
    name            TEXT NOT NULL,
    english_name    TEXT NOT NULL,
    content         TEXT,
    english_content TEXT,
    created_by      TEXT NOT NULL,
    updated_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (theme_id, code)
);

CREATE TABLE IF NOT EXISTS period_theme_settings (
    setting_id             TEXT PRIMARY KEY,
    academic_year          INTEGER NOT NULL,
    academic_term          INTEGER NOT NULL,
    theme_id               TEXT NOT NULL REFERENCES themes(theme_id) ON DELETE CASCADE,
    week_numbers_required  INTEGER NOT NULL,
    indicator_type         TEXT NOT NULL,   -- 'tri_level' | 'numeric_scale' | 'boolean'
    scale_max              INTEGER NOT NULL,
    most_relevant_enabled INTEGER NOT NULL,
    created_by             TEXT NOT NULL,
    updated_by             TEXT NOT NULL,
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL,
    UNIQUE (academic_year, academic_term, theme_id)
);

CREATE TABLE IF NOT EXISTS period_sub_theme_settings (
    setting_id    TEXT PRIMARY KEY,
    academic_year INTEGER NOT NULL,
    academic_term INTEGER NOT NULL,
    sub_theme_id  TEXT NOT NULL REFERENCES sub_themes(sub_theme_id) ON DELETE CASCADE,
    enabled       INTEGER NOT NULL,
    created_by    TEXT NOT NULL,
    updated_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (academic_year, academic_term, sub_theme_id)
);

-- No ON DELETE action: a referenced sub-theme cannot be deleted.
CREATE TABLE IF NOT EXISTS course_entries (
    entry_id         TEXT PRIMARY KEY,
    subject_code     TEXT NOT NULL,
    class_number     TEXT NOT NULL,
    academic_year    INTEGER NOT NULL,
    academic_term    INTEGER NOT NULL,
    sub_theme_id     TEXT NOT NULL REFERENCES sub_themes(sub_theme_id),
    indicator_value  TEXT NOT NULL,
    week_numbers     TEXT,            -- JSON array of week numbers or NULL
    is_most_relevant INTEGER NOT NULL DEFAULT 0,
    created_by       TEXT NOT NULL,
    updated_by       TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (subject_code, class_number, academic_year, academic_term, sub_theme_id)
);

CREATE INDEX IF NOT EXISTS sub_themes_theme_idx     ON sub_themes(theme_id);
CREATE INDEX IF NOT EXISTS course_entries_sub_idx   ON course_entries(sub_theme_id);
CREATE INDEX IF NOT EXISTS sub_settings_sub_idx     ON period_sub_theme_settings(sub_theme_id);

PRAGMA user_version = 1;
";
