//! Error type for `varinaut-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] varinaut_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("prediction not found: {0}")]
  PredictionNotFound(i64),

  #[error("prediction update not found: {0}")]
  UpdateNotFound(i64),

  #[error("unknown migration revision: {0:?}")]
  UnknownRevision(String),

  #[error("migration failed: {0}")]
  Migration(String),

  #[error("unsupported database url: {0:?}")]
  UnsupportedUrl(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
