//! Quiz content and learner accounts.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{info, warn};

use super::{Store, StoreError};
use crate::domain::{Learner, LexicalItem, ReadingPassage, WritingPrompt};
use crate::seeds::{seed_passages, seed_prompts, seed_words};

const WORD_COLUMNS: &str = "id, word, definition_ja, part_of_speech";
const PROMPT_COLUMNS: &str = "id, prompt_text, reference_example, reference_meaning";
const PASSAGE_COLUMNS: &str = "id, title, text, question, reference_answer, level, source_url";

fn word_from_row(row: &Row<'_>) -> rusqlite::Result<LexicalItem> {
  Ok(LexicalItem {
    id: row.get(0)?,
    surface_form: row.get(1)?,
    reference_meaning: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    part_of_speech: row.get(3)?,
  })
}

fn prompt_from_row(row: &Row<'_>) -> rusqlite::Result<WritingPrompt> {
  Ok(WritingPrompt {
    id: row.get(0)?,
    prompt_text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
    reference_example: row.get(2)?,
    reference_meaning: row.get(3)?,
  })
}

fn passage_from_row(row: &Row<'_>) -> rusqlite::Result<ReadingPassage> {
  Ok(ReadingPassage {
    id: row.get(0)?,
    title: row.get(1)?,
    passage_text: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    question_text: row.get(3)?,
    reference_answer: row.get(4)?,
    level: row.get(5)?,
    source_url: row.get(6)?,
  })
}

fn count(conn: &Connection, table: &str) -> Result<i64, StoreError> {
  Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
}

impl Store {
  pub fn random_word(&self) -> Result<Option<LexicalItem>, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {WORD_COLUMNS} FROM words ORDER BY RANDOM() LIMIT 1");
    Ok(conn.query_row(&sql, [], word_from_row).optional()?)
  }

  pub fn word(&self, id: i64) -> Result<LexicalItem, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1");
    conn.query_row(&sql, [id], word_from_row).optional()?.ok_or(StoreError::NotFound("word"))
  }

  /// Insert a word, or return the existing id when the word is already stored.
  pub fn insert_word(&self, word: &str, meaning: &str, part_of_speech: Option<&str>) -> Result<i64, StoreError> {
    let conn = self.connect()?;
    conn.execute(
      "INSERT OR IGNORE INTO words (word, definition_ja, part_of_speech) VALUES (?1, ?2, ?3)",
      params![word, meaning, part_of_speech],
    )?;
    Ok(conn.query_row("SELECT id FROM words WHERE word = ?1", [word], |r| r.get(0))?)
  }

  pub fn random_prompt(&self) -> Result<Option<WritingPrompt>, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {PROMPT_COLUMNS} FROM writing_prompts ORDER BY RANDOM() LIMIT 1");
    Ok(conn.query_row(&sql, [], prompt_from_row).optional()?)
  }

  pub fn prompt(&self, id: i64) -> Result<WritingPrompt, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {PROMPT_COLUMNS} FROM writing_prompts WHERE id = ?1");
    conn.query_row(&sql, [id], prompt_from_row).optional()?.ok_or(StoreError::NotFound("writing prompt"))
  }

  pub fn insert_prompt(&self, prompt_text: &str, reference_example: Option<&str>) -> Result<i64, StoreError> {
    let conn = self.connect()?;
    conn.execute(
      "INSERT INTO writing_prompts (prompt_text, reference_example) VALUES (?1, ?2)",
      params![prompt_text, reference_example],
    )?;
    Ok(conn.last_insert_rowid())
  }

  /// Passages without a question or reference answer cannot be quizzed and are skipped.
  pub fn random_passage(&self) -> Result<Option<ReadingPassage>, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {PASSAGE_COLUMNS} FROM reading_texts WHERE question <> '' AND reference_answer <> '' ORDER BY RANDOM() LIMIT 1");
    Ok(conn.query_row(&sql, [], passage_from_row).optional()?)
  }

  pub fn passage(&self, id: i64) -> Result<ReadingPassage, StoreError> {
    let conn = self.connect()?;
    let sql = format!("SELECT {PASSAGE_COLUMNS} FROM reading_texts WHERE id = ?1");
    conn.query_row(&sql, [id], passage_from_row).optional()?.ok_or(StoreError::NotFound("reading passage"))
  }

  pub fn insert_passage(
    &self,
    title: &str,
    passage_text: &str,
    question_text: &str,
    reference_answer: &str,
    level: Option<&str>,
  ) -> Result<i64, StoreError> {
    let conn = self.connect()?;
    conn.execute(
      "INSERT INTO reading_texts (title, text, question, reference_answer, level) VALUES (?1, ?2, ?3, ?4, ?5)",
      params![title, passage_text, question_text, reference_answer, level],
    )?;
    Ok(conn.last_insert_rowid())
  }

  /// Insert the built-in content into every empty content table.
  pub fn seed_if_empty(&self) -> Result<(), StoreError> {
    let conn = self.connect()?;
    if count(&conn, "words")? == 0 {
      for (word, meaning, pos) in seed_words() {
        self.insert_word(word, meaning, Some(*pos))?;
      }
      info!(target: "store", count = seed_words().len(), "Seeded words");
    }
    if count(&conn, "writing_prompts")? == 0 {
      let prompts = seed_prompts();
      for p in &prompts {
        self.insert_prompt(p.prompt_text, Some(p.reference_example))?;
      }
      info!(target: "store", count = prompts.len(), "Seeded writing prompts");
    }
    if count(&conn, "reading_texts")? == 0 {
      let passages = seed_passages();
      for p in &passages {
        self.insert_passage(p.title, p.passage_text, p.question_text, p.reference_answer, Some(p.level))?;
      }
      info!(target: "store", count = passages.len(), "Seeded reading passages");
    }
    Ok(())
  }

  /// Row counts of (words, prompts, passages), for the startup log.
  pub fn inventory(&self) -> Result<(i64, i64, i64), StoreError> {
    let conn = self.connect()?;
    Ok((count(&conn, "words")?, count(&conn, "writing_prompts")?, count(&conn, "reading_texts")?))
  }

  pub fn create_learner(&self, username: &str, password: &str) -> Result<Learner, StoreError> {
    let hash = bcrypt::hash(password, self.bcrypt_cost)?;
    let conn = self.connect()?;
    match conn.execute("INSERT INTO users (username, password) VALUES (?1, ?2)", params![username, hash]) {
      Ok(_) => Ok(Learner { id: conn.last_insert_rowid(), display_name: username.to_string(), is_guest: false }),
      Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Err(StoreError::UsernameTaken),
      Err(e) => Err(e.into()),
    }
  }

  /// The learner, if `username` exists and `password` matches its hash.
  /// Hashes bcrypt cannot read are treated as a mismatch.
  pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<Learner>, StoreError> {
    let conn = self.connect()?;
    let row: Option<(i64, Option<String>)> = conn
      .query_row("SELECT id, password FROM users WHERE username = ?1", [username], |r| Ok((r.get(0)?, r.get(1)?)))
      .optional()?;

    let Some((id, Some(hash))) = row else { return Ok(None) };
    match bcrypt::verify(password, &hash) {
      Ok(true) => Ok(Some(Learner { id, display_name: username.to_string(), is_guest: false })),
      Ok(false) => Ok(None),
      Err(e) => {
        warn!(target: "store", learner_id = id, error = %e, "Stored password hash is not bcrypt");
        Ok(None)
      }
    }
  }

  pub fn learner(&self, id: i64) -> Result<Learner, StoreError> {
    let conn = self.connect()?;
    conn
      .query_row("SELECT id, username FROM users WHERE id = ?1", [id], |r| {
        Ok(Learner { id: r.get(0)?, display_name: r.get::<_, Option<String>>(1)?.unwrap_or_default(), is_guest: false })
      })
      .optional()?
      .ok_or(StoreError::NotFound("learner"))
  }
}
