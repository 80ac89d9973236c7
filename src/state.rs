//! Application state: config, store, evaluator and the cookie signing key.
//!
//! Everything here is built once in `AppState::new` and read-only afterwards.
//! Startup order:
//!   1. copy the seed database into place (if configured and missing)
//!   2. open the store and run migrations
//!   3. insert built-in content into empty tables
//!   4. build the optional generative backend and the evaluator

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tracing::{info, instrument};

use crate::backend;
use crate::config::AppConfig;
use crate::evaluator::Evaluator;
use crate::store::{bootstrap_from_seed, Store, StoreError};

pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub evaluator: Evaluator,
    pub cookie_key: Key,
}

impl AppState {
    #[instrument(level = "info", skip_all)]
    pub fn new(config: AppConfig) -> Result<Self, StoreError> {
        bootstrap_from_seed(&config.database_path, config.database_seed_path.as_deref())?;

        let store = Store::open(&config.database_path, config.bcrypt_cost)?;
        store.seed_if_empty()?;

        let (words, prompts, passages) = store.inventory()?;
        info!(
            target: "studyst_backend",
            path = %config.database_path.display(),
            schema = store.schema_version()?,
            words, prompts, passages,
            "Startup content inventory"
        );

        let backend = backend::from_settings(config.backend.as_ref(), config.backend_timeout, &config.prompts.system);
        let evaluator = Evaluator::new(backend, config.prompts.clone(), config.fallback);
        info!(
            target: "studyst_backend",
            assisted = evaluator.is_assisted(),
            provider = evaluator.backend_name().unwrap_or("none"),
            fallback = ?config.fallback,
            streak = ?config.streak,
            "Evaluator ready"
        );

        Ok(Self::from_parts(config, store, evaluator))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(config: AppConfig, store: Store, evaluator: Evaluator) -> Self {
        let cookie_key = session_key(&config.session_secret);
        Self { config, store, evaluator, cookie_key }
    }
}

/// Signing key derived from the configured secret. SHA-512 always yields the
/// 64 bytes `Key::from` requires, whatever the secret's length.
pub fn session_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}
