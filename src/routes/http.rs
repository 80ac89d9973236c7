//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; logs carry ids and lengths, never answer text.

use std::sync::Arc;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{info, instrument};

use crate::domain::Learner;
use crate::logic;
use crate::protocol::*;
use crate::routes::error::ApiError;
use crate::session::{end_session, start_session, CurrentLearner};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn fresh_jar(state: &AppState) -> SignedCookieJar {
  SignedCookieJar::new(state.cookie_key.clone())
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip_all)]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CredentialsIn>,
) -> Result<(SignedCookieJar, Json<SessionOut>), ApiError> {
  let learner = logic::register(&state, &body).await?;
  let jar = start_session(fresh_jar(&state), &learner);
  Ok((jar, Json(SessionOut { learner })))
}

#[instrument(level = "info", skip_all)]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CredentialsIn>,
) -> Result<(SignedCookieJar, Json<SessionOut>), ApiError> {
  let learner = logic::login(&state, &body).await?;
  info!(target: "session", learner_id = learner.id, "Learner logged in");
  let jar = start_session(fresh_jar(&state), &learner);
  Ok((jar, Json(SessionOut { learner })))
}

#[instrument(level = "info", skip_all)]
pub async fn http_guest(State(state): State<Arc<AppState>>) -> (SignedCookieJar, Json<SessionOut>) {
  let learner = Learner::guest();
  let jar = start_session(fresh_jar(&state), &learner);
  (jar, Json(SessionOut { learner }))
}

#[instrument(level = "info", skip_all)]
pub async fn http_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> (SignedCookieJar, Json<HealthOut>) {
  let jar = SignedCookieJar::from_headers(&headers, state.cookie_key.clone());
  (end_session(jar), Json(HealthOut { ok: true }))
}

#[instrument(level = "info", skip_all, fields(learner_id = learner.id))]
pub async fn http_me(State(state): State<Arc<AppState>>, CurrentLearner(learner): CurrentLearner) -> ApiResult<MeOut> {
  Ok(Json(logic::me(&state, learner).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_next_word(State(state): State<Arc<AppState>>, _learner: CurrentLearner) -> ApiResult<WordOut> {
  Ok(Json(logic::next_word(&state).await?))
}

#[instrument(level = "info", skip_all, fields(word_id = body.word_id))]
pub async fn http_word_answer(
  State(state): State<Arc<AppState>>,
  CurrentLearner(learner): CurrentLearner,
  Json(body): Json<WordAnswerIn>,
) -> ApiResult<WordAnswerOut> {
  Ok(Json(logic::submit_word_answer(&state, &learner, body.word_id, body.answer).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_next_prompt(State(state): State<Arc<AppState>>, _learner: CurrentLearner) -> ApiResult<PromptOut> {
  Ok(Json(logic::next_prompt(&state).await?))
}

#[instrument(level = "info", skip_all, fields(prompt_id = body.prompt_id))]
pub async fn http_writing_answer(
  State(state): State<Arc<AppState>>,
  CurrentLearner(learner): CurrentLearner,
  Json(body): Json<WritingAnswerIn>,
) -> ApiResult<WritingAnswerOut> {
  Ok(Json(logic::submit_writing_answer(&state, &learner, body.prompt_id, body.answer).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_next_passage(State(state): State<Arc<AppState>>, _learner: CurrentLearner) -> ApiResult<PassageOut> {
  Ok(Json(logic::next_passage(&state).await?))
}

#[instrument(level = "info", skip_all, fields(passage_id = body.passage_id))]
pub async fn http_reading_answer(
  State(state): State<Arc<AppState>>,
  CurrentLearner(learner): CurrentLearner,
  Json(body): Json<ReadingAnswerIn>,
) -> ApiResult<ReadingAnswerOut> {
  Ok(Json(logic::submit_reading_answer(&state, &learner, body.passage_id, body.answer).await?))
}

#[instrument(level = "info", skip_all, fields(passage_id = body.passage_id))]
pub async fn http_reading_translate(
  State(state): State<Arc<AppState>>,
  CurrentLearner(learner): CurrentLearner,
  Json(body): Json<ReadingAnswerIn>,
) -> ApiResult<ReadingTranslateOut> {
  Ok(Json(logic::translate_reading(&state, &learner, body.passage_id, body.answer).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_ranking(State(state): State<Arc<AppState>>) -> ApiResult<RankingOut> {
  Ok(Json(logic::ranking(&state).await?))
}
