//! [`SqliteStore`], the SQLite implementation of [`PredictionStore`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use varinaut_core::{
  Error as CoreError,
  prediction::{NewPrediction, Prediction, PredictionStatus},
  research::{
    HumanReview, NewReview, NewSource, NewUpdate, PredictionUpdate, Source,
  },
  store::{Page, PredictionStore},
};

use crate::{
  Error, Result,
  migrations::{self, MigrationStatus, Target},
  session::Session,
};

// ─── Location ────────────────────────────────────────────────────────────────

/// Where the database lives, parsed from a connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
  Memory,
  File(PathBuf),
}

impl StoreLocation {
  /// Accepts `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare
  /// path. SQLAlchemy-style `sqlite+aiosqlite:///<path>` URLs are read the
  /// way SQLAlchemy reads them. Any other scheme is rejected.
  pub fn from_url(url: &str) -> Result<Self> {
    let url = url.trim();
    if matches!(url, "sqlite::memory:" | ":memory:") {
      return Ok(Self::Memory);
    }
    if let Some(rest) = url.strip_prefix("sqlite+aiosqlite://") {
      // Empty host, so `///rel` is relative and `////abs` absolute.
      return match rest {
        "" | "/:memory:" => Ok(Self::Memory),
        _ => match rest.strip_prefix('/') {
          Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
          _ => Err(Error::UnsupportedUrl(url.to_owned())),
        },
      };
    }
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
      rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
      rest
    } else if url.contains("://") {
      return Err(Error::UnsupportedUrl(url.to_owned()));
    } else {
      url
    };
    if path.is_empty() {
      return Err(Error::UnsupportedUrl(url.to_owned()));
    }
    Ok(Self::File(PathBuf::from(path)))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A prediction store backed by a single SQLite file.
///
/// Cloning is cheap. The inner connection is reference-counted, and every
/// clone shares the one background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. The schema is not touched; call
  /// [`SqliteStore::init_schema`] or run the migrations explicitly.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.configure(true).await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.configure(false).await?;
    Ok(store)
  }

  pub async fn connect(location: &StoreLocation) -> Result<Self> {
    match location {
      StoreLocation::Memory => Self::open_in_memory().await,
      StoreLocation::File(path) => Self::open(path).await,
    }
  }

  async fn configure(&self, file_backed: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if file_backed {
          conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Schema ────────────────────────────────────────────────────────────────

  /// Bring the schema up to the newest revision. Idempotent; returns the
  /// revisions that were applied.
  pub async fn init_schema(&self) -> Result<Vec<&'static str>> {
    self.upgrade(Target::Head).await
  }

  pub async fn upgrade(&self, target: Target) -> Result<Vec<&'static str>> {
    let outcome = self
      .conn
      .call(move |conn| Ok(migrations::upgrade(conn, &target)))
      .await?;
    outcome
  }

  pub async fn downgrade(&self, target: Target) -> Result<Vec<&'static str>> {
    let outcome = self
      .conn
      .call(move |conn| Ok(migrations::downgrade(conn, &target)))
      .await?;
    outcome
  }

  pub async fn migration_status(&self) -> Result<MigrationStatus> {
    let outcome = self
      .conn
      .call(|conn| Ok(migrations::status(conn)))
      .await?;
    outcome
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  /// Run `f` as one unit of work.
  ///
  /// `f` executes on the connection thread inside a transaction that commits
  /// when `f` returns `Ok` and rolls back otherwise. Sessions are serialised
  /// on the connection and never shared between callers.
  pub async fn session<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&Session<'_>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let session = Session::begin(conn)?;
        Ok(session.run(f))
      })
      .await?;
    outcome
  }
}

// ─── PredictionStore impl ────────────────────────────────────────────────────

impl PredictionStore for SqliteStore {
  type Error = Error;

  // ── Predictions ───────────────────────────────────────────────────────────

  async fn create_prediction(&self, input: NewPrediction) -> Result<Prediction> {
    let prediction = self
      .session(move |s| s.insert_prediction(&input, Utc::now()))
      .await?;
    debug!(id = prediction.id, "created prediction");
    Ok(prediction)
  }

  async fn get_prediction(&self, id: i64) -> Result<Option<Prediction>> {
    self.session(move |s| s.fetch_prediction(id)).await
  }

  async fn list_predictions(&self, page: Page) -> Result<Vec<Prediction>> {
    debug!(skip = page.skip, limit = page.limit, "listing predictions");
    self.session(move |s| s.list_predictions(page)).await
  }

  async fn transition_status(
    &self,
    id:   i64,
    next: PredictionStatus,
  ) -> Result<Prediction> {
    if next.is_resolved() {
      return Err(CoreError::OutcomeRequired.into());
    }
    let prediction = self
      .session(move |s| {
        let current = s.require_prediction(id)?;
        let next = current.status.transition_to(next)?;
        s.write_status(id, next, None, Utc::now())
      })
      .await?;
    debug!(id, status = %prediction.status, "prediction status changed");
    Ok(prediction)
  }

  async fn resolve_prediction(&self, id: i64, outcome: bool) -> Result<Prediction> {
    let prediction = self
      .session(move |s| {
        let current = s.require_prediction(id)?;
        let next = current.status.transition_to(PredictionStatus::Resolved)?;
        s.write_status(id, next, Some(outcome), Utc::now())
      })
      .await?;
    debug!(id, outcome, "prediction resolved");
    Ok(prediction)
  }

  async fn delete_prediction(&self, id: i64) -> Result<bool> {
    self.session(move |s| s.delete_prediction(id)).await
  }

  // ── Updates ───────────────────────────────────────────────────────────────

  async fn record_update(&self, input: NewUpdate) -> Result<PredictionUpdate> {
    self
      .session(move |s| s.insert_update(&input, Utc::now()))
      .await
  }

  async fn get_update(&self, id: i64) -> Result<Option<PredictionUpdate>> {
    self.session(move |s| s.fetch_update(id)).await
  }

  async fn list_updates(&self, prediction_id: i64) -> Result<Vec<PredictionUpdate>> {
    self.session(move |s| s.list_updates(prediction_id)).await
  }

  async fn delete_update(&self, id: i64) -> Result<bool> {
    self.session(move |s| s.delete_update(id)).await
  }

  // ── Sources & reviews ─────────────────────────────────────────────────────

  async fn add_source(&self, input: NewSource) -> Result<Source> {
    self
      .session(move |s| s.insert_source(&input, Utc::now()))
      .await
  }

  async fn list_sources(&self, update_id: i64) -> Result<Vec<Source>> {
    self.session(move |s| s.list_sources(update_id)).await
  }

  async fn record_review(&self, input: NewReview) -> Result<HumanReview> {
    self
      .session(move |s| s.insert_review(&input, Utc::now()))
      .await
  }

  async fn list_reviews(&self, update_id: i64) -> Result<Vec<HumanReview>> {
    self.session(move |s| s.list_reviews(update_id)).await
  }
}
