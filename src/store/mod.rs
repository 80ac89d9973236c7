//! SQLite persistence.
//!
//! `Store` only holds the database path. Each unit of work opens its own
//! connection, so the store is cheap to clone into handlers and never holds
//! a connection across an `.await`. Callers on the async side wrap store calls
//! in `tokio::task::spawn_blocking`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

mod aggregate;
mod attempts;
mod content;
mod migrations;

pub use aggregate::DEFAULT_LEADERBOARD_LIMIT;
pub use attempts::{ReadingAttempt, StreakPolicy, WordAttempt, WritingAttempt};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("username already taken")]
  UsernameTaken,

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("password hashing failed: {0}")]
  Hash(#[from] bcrypt::BcryptError),

  #[error("unsupported schema version {found}, max supported {supported}")]
  UnsupportedSchemaVersion { found: i64, supported: i64 },
}

#[derive(Clone, Debug)]
pub struct Store {
  path: PathBuf,
  bcrypt_cost: u32,
}

impl Store {
  /// Open the database at `path`, creating it if needed, and bring the schema
  /// up to date.
  pub fn open(path: impl AsRef<Path>, bcrypt_cost: u32) -> Result<Self, StoreError> {
    let store = Self { path: path.as_ref().to_path_buf(), bcrypt_cost };
    let conn = store.connect()?;
    migrations::migrate(&conn)?;
    Ok(store)
  }

  pub(crate) fn connect(&self) -> Result<Connection, StoreError> {
    let conn = Connection::open(&self.path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
  }

  pub fn schema_version(&self) -> Result<i64, StoreError> {
    migrations::schema_version(&self.connect()?)
  }
}

/// Copy a pre-built database into place when the target file does not exist
/// yet. Returns whether a copy happened. A missing seed file is not an error.
pub fn bootstrap_from_seed(target: &Path, seed: Option<&Path>) -> Result<bool, StoreError> {
  let Some(seed) = seed else { return Ok(false) };
  if target.exists() {
    return Ok(false);
  }
  if !seed.exists() {
    warn!(target: "store", seed = %seed.display(), "Seed database not found; starting with an empty database.");
    return Ok(false);
  }
  if let Some(parent) = target.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::copy(seed, target)?;
  info!(target: "store", seed = %seed.display(), target = %target.display(), "Copied seed database.");
  Ok(true)
}
