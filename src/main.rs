//! Studyst · English practice backend
//!
//! - Axum HTTP JSON API with signed-cookie sessions
//! - Word, writing and reading quizzes scored locally or by a generative backend
//! - SQLite persistence (attempt logs, averages, leaderboard)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables (see `config.rs` for the full list):
//!   PORT               : u16 (default 8080)
//!   DATABASE_PATH      : SQLite file (default <tmp>/english_learning.db)
//!   SESSION_SECRET     : cookie signing secret
//!   GEMINI_API_KEY     : enables the Gemini backend if present
//!   OPENAI_API_KEY     : enables the OpenAI-compatible backend otherwise
//!   PROMPTS_CONFIG_PATH: TOML overriding the scoring prompts
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod extract;
mod pos;
mod backend;
mod evaluator;
mod store;
mod seeds;
mod state;
mod session;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  // Store, seed content, evaluator and cookie key.
  let state = Arc::new(AppState::new(config)?);

  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "studyst_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "studyst_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "studyst_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "studyst_backend", "Shutdown signal received");
}
