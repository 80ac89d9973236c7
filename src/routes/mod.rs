//! Router assembly: JSON API, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod error;
pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...` (quiz routes need a session cookie)
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Sessions
        .route("/api/v1/auth/register", post(http::http_register))
        .route("/api/v1/auth/login", post(http::http_login))
        .route("/api/v1/auth/guest", post(http::http_guest))
        .route("/api/v1/auth/logout", post(http::http_logout))
        .route("/api/v1/me", get(http::http_me))
        // Quizzes
        .route("/api/v1/words/next", get(http::http_next_word))
        .route("/api/v1/words/answer", post(http::http_word_answer))
        .route("/api/v1/writing/next", get(http::http_next_prompt))
        .route("/api/v1/writing/answer", post(http::http_writing_answer))
        .route("/api/v1/reading/next", get(http::http_next_passage))
        .route("/api/v1/reading/answer", post(http::http_reading_answer))
        .route("/api/v1/reading/translate", post(http::http_reading_translate))
        .route("/api/v1/ranking", get(http::http_ranking))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::evaluator::Evaluator;
    use crate::session::SESSION_COOKIE;
    use crate::store::Store;

    fn test_app() -> (TempDir, Arc<AppState>, Router) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::from_lookup(|_| None);
        config.database_path = dir.path().join("app.db");
        config.bcrypt_cost = 4;
        let store = Store::open(&config.database_path, config.bcrypt_cost).unwrap();
        store.seed_if_empty().unwrap();
        let state = Arc::new(AppState::from_parts(config, store, Evaluator::unassisted()));
        let app = build_router(state.clone());
        (dir, state, app)
    }

    async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` of the session cookie set by `res`.
    fn session_cookie(res: &Response) -> String {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE))
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn health_is_open() {
        let (_dir, _state, app) = test_app();
        let res = send(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn quiz_routes_require_a_session() {
        let (_dir, _state, app) = test_app();
        let res = send(&app, "GET", "/api/v1/words/next", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&app, "GET", "/api/v1/me", Some("studyst_session=1"), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guest_can_answer_a_word() {
        let (_dir, state, app) = test_app();
        let res = send(&app, "POST", "/api/v1/auth/guest", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);
        assert_eq!(json_body(res).await["learner"]["isGuest"], json!(true));

        let res = send(&app, "GET", "/api/v1/words/next", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let word = json_body(res).await;
        assert!(word["word"].is_string());
        assert!(word.get("referenceMeaning").is_none());

        let id = state.store.insert_word("assurance", "保証", Some("noun")).unwrap();
        let res = send(
            &app,
            "POST",
            "/api/v1/words/answer",
            Some(&cookie),
            Some(json!({"wordId": id, "answer": "保証すること"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let out = json_body(res).await;
        assert_eq!(out["score"], json!(100));
        assert_eq!(out["posLabel"], json!("名詞"));
        assert_eq!(out["simplifiedMeaning"], json!("保証"));
        assert_eq!(out["attempt"]["consecutiveFailureCount"], json!(0));
        assert_eq!(out["averageScore"], json!(0.0));
    }

    #[tokio::test]
    async fn unknown_items_are_not_found() {
        let (_dir, _state, app) = test_app();
        let cookie = session_cookie(&send(&app, "POST", "/api/v1/auth/guest", None, None).await);

        let res = send(&app, "POST", "/api/v1/words/answer", Some(&cookie), Some(json!({"wordId": 9999, "answer": "x"}))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(json_body(res).await["error"].is_string());

        let res = send(&app, "POST", "/api/v1/writing/answer", Some(&cookie), Some(json!({"promptId": 9999, "answer": "x"}))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_login_and_rank() {
        let (_dir, _state, app) = test_app();
        let creds = json!({"username": "hanako", "password": "pw"});

        let res = send(&app, "POST", "/api/v1/auth/register", None, Some(creds.clone())).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = send(&app, "POST", "/api/v1/auth/register", None, Some(creds.clone())).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = send(&app, "POST", "/api/v1/auth/register", None, Some(json!({"username": " ", "password": "pw"}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, "POST", "/api/v1/auth/login", None, Some(json!({"username": "hanako", "password": "nope"}))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = send(&app, "POST", "/api/v1/auth/login", None, Some(creds)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);

        let res = send(&app, "GET", "/api/v1/writing/next", Some(&cookie), None).await;
        let prompt_id = json_body(res).await["id"].as_i64().unwrap();
        let res = send(
            &app,
            "POST",
            "/api/v1/writing/answer",
            Some(&cookie),
            Some(json!({"promptId": prompt_id, "answer": "I watched a movie yesterday."})),
        )
        .await;
        let out = json_body(res).await;
        assert_eq!(out["score"], json!(80));
        assert_eq!(out["averageScore"], json!(80.0));

        let res = send(&app, "GET", "/api/v1/me", Some(&cookie), None).await;
        assert_eq!(json_body(res).await["learner"]["displayName"], json!("hanako"));

        let res = send(&app, "GET", "/api/v1/ranking", None, None).await;
        assert_eq!(json_body(res).await, json!({"ranking": []}));
    }

    #[tokio::test]
    async fn reading_routes_score_and_translate() {
        let (_dir, _state, app) = test_app();
        let cookie = session_cookie(&send(&app, "POST", "/api/v1/auth/guest", None, None).await);

        let res = send(&app, "GET", "/api/v1/reading/next", Some(&cookie), None).await;
        let passage = json_body(res).await;
        assert!(passage["question"].is_string());
        let id = passage["id"].as_i64().unwrap();

        let res = send(&app, "POST", "/api/v1/reading/answer", Some(&cookie), Some(json!({"passageId": id, "answer": ""}))).await;
        let out = json_body(res).await;
        assert_eq!(out["score"], json!(0));
        assert_eq!(out["attempt"]["isBelowThreshold"], json!(true));

        let res = send(&app, "POST", "/api/v1/reading/translate", Some(&cookie), Some(json!({"passageId": id, "answer": "訳"}))).await;
        let out = json_body(res).await;
        assert_eq!(out["score"], json!(50));
        assert_eq!(out["referenceTranslation"], json!(""));
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let (_dir, _state, app) = test_app();
        let cookie = session_cookie(&send(&app, "POST", "/api/v1/auth/guest", None, None).await);
        let res = send(&app, "POST", "/api/v1/auth/logout", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cleared = session_cookie(&res);
        assert_eq!(cleared, format!("{SESSION_COOKIE}="));
    }
}
