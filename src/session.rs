//! Cookie sessions. The signed cookie holds only the learner id; guests
//! carry id 0.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use tracing::debug;

use crate::domain::{Learner, GUEST_ID};
use crate::routes::error::ApiError;
use crate::state::AppState;
use crate::store::StoreError;

pub const SESSION_COOKIE: &str = "studyst_session";

/// The learner behind the request's session cookie. Rejects with 401 when
/// the cookie is missing, tampered with, or names a deleted learner.
pub struct CurrentLearner(pub Learner);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentLearner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let id = jar
            .get(SESSION_COOKIE)
            .and_then(|c| c.value().parse::<i64>().ok())
            .ok_or_else(|| ApiError::unauthorized("ログインしてください"))?;

        if id == GUEST_ID {
            return Ok(CurrentLearner(Learner::guest()));
        }

        let store = state.store.clone();
        match tokio::task::spawn_blocking(move || store.learner(id)).await? {
            Ok(learner) => Ok(CurrentLearner(learner)),
            Err(StoreError::NotFound(_)) => {
                debug!(target: "session", learner_id = id, "Session names a missing learner");
                Err(ApiError::unauthorized("ログインしてください"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Jar carrying a fresh session cookie for `learner`.
pub fn start_session(jar: SignedCookieJar, learner: &Learner) -> SignedCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, learner.id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
}
