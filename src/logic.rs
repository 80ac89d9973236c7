//! Request flows behind the HTTP handlers: resolve the quiz item, evaluate,
//! persist the attempt, recompute the average.
//!
//! Store calls are synchronous SQLite work and run on the blocking pool.
//! Evaluator calls are async and never fail.

use tracing::{info, instrument};

use crate::domain::{AttemptKind, Learner, ReadingEvaluation};
use crate::protocol::*;
use crate::routes::error::ApiError;
use crate::state::AppState;
use crate::store::{ReadingAttempt, Store, StoreError, WordAttempt, WritingAttempt, DEFAULT_LEADERBOARD_LIMIT};

/// Run `f` against the store on the blocking pool.
pub async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
  T: Send + 'static,
  F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
{
  let store = state.store.clone();
  Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
}

fn require_credentials(body: &CredentialsIn) -> Result<(String, String), ApiError> {
  let username = body.username.trim();
  if username.is_empty() || body.password.is_empty() {
    return Err(ApiError::bad_request("ユーザー名とパスワードは必須です"));
  }
  Ok((username.to_string(), body.password.clone()))
}

#[instrument(level = "info", skip_all)]
pub async fn register(state: &AppState, body: &CredentialsIn) -> Result<Learner, ApiError> {
  let (username, password) = require_credentials(body)?;
  let learner = with_store(state, move |s| s.create_learner(&username, &password)).await?;
  info!(target: "session", learner_id = learner.id, "Learner registered");
  Ok(learner)
}

#[instrument(level = "info", skip_all)]
pub async fn login(state: &AppState, body: &CredentialsIn) -> Result<Learner, ApiError> {
  let (username, password) = require_credentials(body)?;
  with_store(state, move |s| s.verify_credentials(&username, &password))
    .await?
    .ok_or_else(|| ApiError::unauthorized("ユーザー名かパスワードが違います"))
}

pub async fn me(state: &AppState, learner: Learner) -> Result<MeOut, ApiError> {
  let id = learner.id;
  let average_score = with_store(state, move |s| s.average_score(id)).await?;
  Ok(MeOut { learner, average_score })
}

pub async fn next_word(state: &AppState) -> Result<WordOut, ApiError> {
  let word = with_store(state, |s| s.random_word()).await?;
  word.map(WordOut::from).ok_or_else(|| ApiError::not_found("単語が見つかりません"))
}

pub async fn next_prompt(state: &AppState) -> Result<PromptOut, ApiError> {
  let prompt = with_store(state, |s| s.random_prompt()).await?;
  prompt.map(PromptOut::from).ok_or_else(|| ApiError::not_found("お題が見つかりませんでした"))
}

pub async fn next_passage(state: &AppState) -> Result<PassageOut, ApiError> {
  let passage = with_store(state, |s| s.random_passage()).await?;
  passage.map(PassageOut::from).ok_or_else(|| ApiError::not_found("長文が見つかりませんでした"))
}

#[instrument(level = "info", skip(state, learner, answer), fields(learner_id = learner.id, answer_len = answer.len()))]
pub async fn submit_word_answer(state: &AppState, learner: &Learner, word_id: i64, answer: String) -> Result<WordAnswerOut, ApiError> {
  let word = with_store(state, move |s| s.word(word_id)).await?;

  let evaluation = state
    .evaluator
    .evaluate_word_answer(&word.surface_form, &word.reference_meaning, &answer, word.part_of_speech.as_deref())
    .await;

  let learner_id = learner.id;
  let policy = state.config.streak;
  let ev = evaluation.clone();
  let (attempt, average_score) = with_store(state, move |s| {
    let outcome = s.record_word_attempt(&WordAttempt { learner_id, word_id, answer: &answer, evaluation: &ev }, policy)?;
    Ok((outcome, s.average_score(learner_id)?))
  })
  .await?;

  info!(target: "evaluator", word_id, score = evaluation.score, streak = attempt.consecutive_failure_count, "Word answer evaluated");
  Ok(WordAnswerOut { evaluation, attempt, average_score })
}

#[instrument(level = "info", skip(state, learner, answer), fields(learner_id = learner.id, answer_len = answer.len()))]
pub async fn submit_writing_answer(state: &AppState, learner: &Learner, prompt_id: i64, answer: String) -> Result<WritingAnswerOut, ApiError> {
  let prompt = with_store(state, move |s| s.prompt(prompt_id)).await?;

  let evaluation = state.evaluator.evaluate_writing(&prompt.prompt_text, &answer).await;

  let learner_id = learner.id;
  let policy = state.config.streak;
  let ev = evaluation.clone();
  let (attempt, average_score) = with_store(state, move |s| {
    let outcome = s.record_writing_attempt(&WritingAttempt { learner_id, prompt_id, answer: &answer, evaluation: &ev }, policy)?;
    Ok((outcome, s.average_score_for(AttemptKind::Writing, learner_id)?))
  })
  .await?;

  info!(target: "evaluator", prompt_id, score = evaluation.score, streak = attempt.consecutive_failure_count, "Writing answer evaluated");
  Ok(WritingAnswerOut { evaluation, attempt, average_score })
}

#[instrument(level = "info", skip(state, learner, answer), fields(learner_id = learner.id, answer_len = answer.len()))]
pub async fn submit_reading_answer(state: &AppState, learner: &Learner, passage_id: i64, answer: String) -> Result<ReadingAnswerOut, ApiError> {
  let passage = with_store(state, move |s| s.passage(passage_id)).await?;

  let evaluation = state
    .evaluator
    .evaluate_reading(&passage.passage_text, &passage.question_text, &passage.reference_answer, &answer)
    .await;

  let learner_id = learner.id;
  let policy = state.config.streak;
  let ev = evaluation.clone();
  let (attempt, average_score) = with_store(state, move |s| {
    let record = ReadingAttempt { learner_id, passage_id, answer: &answer, evaluation: &ev, reference_translation: None };
    let outcome = s.record_reading_attempt(&record, policy)?;
    Ok((outcome, s.average_score_for(AttemptKind::Reading, learner_id)?))
  })
  .await?;

  info!(target: "evaluator", passage_id, score = evaluation.score, "Reading answer evaluated");
  Ok(ReadingAnswerOut { evaluation, attempt, average_score })
}

#[instrument(level = "info", skip(state, learner, answer), fields(learner_id = learner.id, answer_len = answer.len()))]
pub async fn translate_reading(state: &AppState, learner: &Learner, passage_id: i64, answer: String) -> Result<ReadingTranslateOut, ApiError> {
  let passage = with_store(state, move |s| s.passage(passage_id)).await?;

  let translation = state
    .evaluator
    .evaluate_and_translate_reading(&passage.passage_text, &answer, &passage.question_text)
    .await;

  let learner_id = learner.id;
  let policy = state.config.streak;
  let tr = translation.clone();
  let (attempt, average_score) = with_store(state, move |s| {
    let ev = ReadingEvaluation { score: tr.score, feedback: tr.feedback.clone() };
    let record = ReadingAttempt {
      learner_id,
      passage_id,
      answer: &answer,
      evaluation: &ev,
      reference_translation: Some(tr.reference_translation.as_str()),
    };
    let outcome = s.record_reading_attempt(&record, policy)?;
    Ok((outcome, s.average_score_for(AttemptKind::Reading, learner_id)?))
  })
  .await?;

  info!(target: "evaluator", passage_id, score = translation.score, "Reading translation evaluated");
  Ok(ReadingTranslateOut { translation, attempt, average_score })
}

pub async fn ranking(state: &AppState) -> Result<RankingOut, ApiError> {
  let ranking = with_store(state, |s| s.leaderboard(DEFAULT_LEADERBOARD_LIMIT)).await?;
  Ok(RankingOut { ranking })
}
