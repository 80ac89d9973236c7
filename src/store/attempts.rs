//! Append-only attempt logs and the per-(learner, item) failure streak.

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use serde::Deserialize;
use tracing::debug;

use super::{Store, StoreError};
use crate::domain::{
  AttemptKind, AttemptOutcome, ReadingEvaluation, WordEvaluation, WritingEvaluation, PASS_THRESHOLD,
};

/// What a passing attempt does to the failure streak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
  /// Keep the previous count.
  #[default]
  CarryOver,
  /// Start over at zero.
  ResetOnPass,
}

impl FromStr for StreakPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "carry_over" | "carry-over" => Ok(StreakPolicy::CarryOver),
      "reset_on_pass" | "reset-on-pass" => Ok(StreakPolicy::ResetOnPass),
      other => Err(format!("unknown streak policy: {other}")),
    }
  }
}

impl StreakPolicy {
  fn next(self, previous: i64, below_threshold: bool) -> i64 {
    match (below_threshold, self) {
      (true, _) => previous + 1,
      (false, StreakPolicy::CarryOver) => previous,
      (false, StreakPolicy::ResetOnPass) => 0,
    }
  }
}

pub struct WordAttempt<'a> {
  pub learner_id: i64,
  pub word_id: i64,
  pub answer: &'a str,
  pub evaluation: &'a WordEvaluation,
}

pub struct WritingAttempt<'a> {
  pub learner_id: i64,
  pub prompt_id: i64,
  pub answer: &'a str,
  pub evaluation: &'a WritingEvaluation,
}

pub struct ReadingAttempt<'a> {
  pub learner_id: i64,
  pub passage_id: i64,
  pub answer: &'a str,
  pub evaluation: &'a ReadingEvaluation,
  pub reference_translation: Option<&'a str>,
}

fn now_rfc3339() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn previous_streak(tx: &Transaction<'_>, kind: AttemptKind, learner_id: i64, item_id: i64) -> rusqlite::Result<i64> {
  let sql = format!(
    "SELECT wrong_count FROM {} WHERE user_id = ?1 AND {} = ?2 ORDER BY id DESC LIMIT 1",
    kind.table(),
    kind.item_column()
  );
  let last: Option<Option<i64>> = tx.query_row(&sql, params![learner_id, item_id], |r| r.get(0)).optional()?;
  Ok(last.flatten().unwrap_or(0))
}

impl Store {
  /// Run `insert` inside one immediate transaction, after computing the
  /// streak from the newest earlier attempt for the same pair.
  fn append_attempt<F>(
    &self,
    kind: AttemptKind,
    learner_id: i64,
    item_id: i64,
    score: u8,
    policy: StreakPolicy,
    insert: F,
  ) -> Result<AttemptOutcome, StoreError>
  where
    F: FnOnce(&Transaction<'_>, bool, i64, &str) -> rusqlite::Result<()>,
  {
    let mut conn = self.connect()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let below = score < PASS_THRESHOLD;
    let streak = policy.next(previous_streak(&tx, kind, learner_id, item_id)?, below);
    insert(&tx, below, streak, &now_rfc3339())?;
    let attempt_id = tx.last_insert_rowid();
    tx.commit()?;

    debug!(target: "store", table = kind.table(), learner_id, item_id, score, streak, "Attempt recorded");
    Ok(AttemptOutcome { attempt_id, is_below_threshold: below, consecutive_failure_count: streak })
  }

  pub fn record_word_attempt(&self, attempt: &WordAttempt<'_>, policy: StreakPolicy) -> Result<AttemptOutcome, StoreError> {
    let ev = attempt.evaluation;
    self.append_attempt(AttemptKind::Word, attempt.learner_id, attempt.word_id, ev.score, policy, |tx, below, streak, at| {
      tx.execute(
        "INSERT INTO student_answers
           (user_id, word_id, answer, score, feedback, example, example_translation, pos_label,
            simplified_meaning, attempt_date, is_wrong, wrong_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
          attempt.learner_id,
          attempt.word_id,
          attempt.answer,
          ev.score,
          ev.feedback,
          ev.example.source,
          ev.example.target,
          ev.pos_label,
          ev.simplified_meaning,
          at,
          below,
          streak,
        ],
      )?;
      Ok(())
    })
  }

  pub fn record_writing_attempt(&self, attempt: &WritingAttempt<'_>, policy: StreakPolicy) -> Result<AttemptOutcome, StoreError> {
    let ev = attempt.evaluation;
    self.append_attempt(AttemptKind::Writing, attempt.learner_id, attempt.prompt_id, ev.score, policy, |tx, below, streak, at| {
      tx.execute(
        "INSERT INTO writing_answers
           (user_id, prompt_id, answer, score, feedback, correct_example, attempt_date, is_wrong, wrong_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![attempt.learner_id, attempt.prompt_id, attempt.answer, ev.score, ev.feedback, ev.correct_example, at, below, streak],
      )?;
      Ok(())
    })
  }

  pub fn record_reading_attempt(&self, attempt: &ReadingAttempt<'_>, policy: StreakPolicy) -> Result<AttemptOutcome, StoreError> {
    let ev = attempt.evaluation;
    self.append_attempt(AttemptKind::Reading, attempt.learner_id, attempt.passage_id, ev.score, policy, |tx, below, streak, at| {
      tx.execute(
        "INSERT INTO reading_answers
           (user_id, passage_id, answer, score, feedback, reference_translation, attempt_date, is_wrong, wrong_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
          attempt.learner_id,
          attempt.passage_id,
          attempt.answer,
          ev.score,
          ev.feedback,
          attempt.reference_translation,
          at,
          below,
          streak,
        ],
      )?;
      Ok(())
    })
  }
}
