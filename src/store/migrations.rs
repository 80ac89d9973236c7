//! Versioned schema migrations tracked in `PRAGMA user_version`.
//!
//! Version 1 creates the base tables with `IF NOT EXISTS`, so databases
//! created by earlier deployments (which never set `user_version`) pass
//! through it untouched. Version 2 adds columns one by one, skipping any
//! that already exist, so it is safe to re-run on a half-upgraded file.

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

pub const SCHEMA_VERSION: i64 = 2;

const V1_BASE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE,
    password TEXT
);

CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT UNIQUE,
    definition_ja TEXT
);

CREATE TABLE IF NOT EXISTS student_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    word_id INTEGER,
    score INTEGER,
    feedback TEXT,
    example TEXT,
    attempt_date TEXT,
    is_wrong INTEGER DEFAULT 0,
    wrong_count INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS writing_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_text TEXT
);

CREATE TABLE IF NOT EXISTS writing_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    prompt_id INTEGER,
    answer TEXT,
    score INTEGER,
    feedback TEXT,
    correct_example TEXT,
    attempt_date TEXT,
    is_wrong INTEGER DEFAULT 0,
    wrong_count INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS reading_texts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT,
    level TEXT,
    topic TEXT,
    source_url TEXT
);

CREATE TABLE IF NOT EXISTS reading_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    passage_id INTEGER,
    answer TEXT,
    score INTEGER,
    feedback TEXT,
    attempt_date TEXT,
    is_wrong INTEGER DEFAULT 0,
    wrong_count INTEGER DEFAULT 0
);
";

/// (table, column, declaration) added by version 2.
const V2_COLUMNS: &[(&str, &str, &str)] = &[
  ("words", "part_of_speech", "TEXT"),
  ("student_answers", "answer", "TEXT"),
  ("student_answers", "example_translation", "TEXT"),
  ("student_answers", "pos_label", "TEXT"),
  ("student_answers", "simplified_meaning", "TEXT"),
  ("writing_prompts", "reference_example", "TEXT"),
  ("writing_prompts", "reference_meaning", "TEXT"),
  ("reading_texts", "title", "TEXT NOT NULL DEFAULT ''"),
  ("reading_texts", "question", "TEXT NOT NULL DEFAULT ''"),
  ("reading_texts", "reference_answer", "TEXT NOT NULL DEFAULT ''"),
  ("reading_answers", "reference_translation", "TEXT"),
];

const V2_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_student_answers_user ON student_answers(user_id);
CREATE INDEX IF NOT EXISTS idx_student_answers_pair ON student_answers(user_id, word_id, id);
CREATE INDEX IF NOT EXISTS idx_writing_answers_pair ON writing_answers(user_id, prompt_id, id);
CREATE INDEX IF NOT EXISTS idx_reading_answers_pair ON reading_answers(user_id, passage_id, id);
";

pub fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
  Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

pub fn migrate(conn: &Connection) -> Result<(), StoreError> {
  let mut current = schema_version(conn)?;
  if current > SCHEMA_VERSION {
    return Err(StoreError::UnsupportedSchemaVersion { found: current, supported: SCHEMA_VERSION });
  }
  let start = current;

  if current < 1 {
    conn.execute_batch(V1_BASE_TABLES)?;
    conn.execute("PRAGMA user_version = 1", [])?;
    current = 1;
  }

  if current < 2 {
    for (table, column, decl) in V2_COLUMNS {
      add_column_if_missing(conn, table, column, decl)?;
    }
    conn.execute_batch(V2_INDEXES)?;
    conn.execute("PRAGMA user_version = 2", [])?;
    current = 2;
  }

  if current != start {
    info!(target: "store", from = start, to = current, "Schema migrated");
  }
  Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, StoreError> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
  for name in names {
    if name? == column {
      return Ok(true);
    }
  }
  Ok(false)
}

/// `ALTER TABLE ... ADD COLUMN` unless the column is already there.
pub fn add_column_if_missing(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<bool, StoreError> {
  if has_column(conn, table, column)? {
    return Ok(false);
  }
  conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"), [])?;
  Ok(true)
}
