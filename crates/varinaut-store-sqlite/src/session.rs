//! [`Session`]: one unit of work against the store.
//!
//! A session wraps a single SQLite transaction. It is created on the
//! connection thread by [`crate::SqliteStore::session`], handed to the caller's
//! closure, and committed only if that closure succeeds. On any error the
//! transaction guard is dropped and SQLite rolls the work back.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Transaction, params};
use varinaut_core::{
  prediction::{NewPrediction, Prediction, PredictionStatus},
  research::{
    HumanReview, NewReview, NewSource, NewUpdate, PredictionUpdate, Source,
  },
  store::Page,
};

use crate::{
  Error, Result,
  encode::{
    PREDICTION_COLUMNS, RawPrediction, RawReview, RawSource, RawUpdate,
    REVIEW_COLUMNS, SOURCE_COLUMNS, UPDATE_COLUMNS, encode_date, encode_dt,
  },
};

/// Callers outside this crate get read access only. Writes go through
/// [`varinaut_core::store::PredictionStore`], which enforces the workflow:
///
/// ```compile_fail
/// # async fn demo(store: varinaut_store_sqlite::SqliteStore) {
/// use varinaut_core::prediction::PredictionStatus;
/// let _ = store
///   .session(|s| {
///     s.write_status(1, PredictionStatus::Resolved, Some(true), chrono::Utc::now())
///   })
///   .await;
/// # }
/// ```
pub struct Session<'c> {
  tx: Transaction<'c>,
}

impl<'c> Session<'c> {
  pub(crate) fn begin(conn: &'c mut rusqlite::Connection) -> rusqlite::Result<Self> {
    Ok(Self { tx: conn.transaction()? })
  }

  /// Run `f` and commit if it succeeds. The transaction rolls back when
  /// `self` is dropped without committing.
  pub(crate) fn run<R>(self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
    let out = f(&self)?;
    self.tx.commit()?;
    Ok(out)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &rusqlite::Connection { &self.tx }

  // ── Predictions ─────────────────────────────────────────────────────────

  pub(crate) fn insert_prediction(
    &self,
    input: &NewPrediction,
    now: DateTime<Utc>,
  ) -> Result<Prediction> {
    input.validate()?;
    let now_str = encode_dt(now);
    self.tx.execute(
      "INSERT INTO prediction (
         question, description, status, resolution_date, require_review,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
      params![
        input.question,
        input.description,
        PredictionStatus::Draft.to_string(),
        input.resolution_date.map(encode_date),
        input.require_review,
        now_str,
      ],
    )?;
    let id = self.tx.last_insert_rowid();
    self.fetch_prediction(id)?.ok_or(Error::PredictionNotFound(id))
  }

  pub fn fetch_prediction(&self, id: i64) -> Result<Option<Prediction>> {
    let raw = self
      .tx
      .query_row(
        &format!("SELECT {PREDICTION_COLUMNS} FROM prediction WHERE id = ?1"),
        params![id],
        RawPrediction::from_row,
      )
      .optional()?;
    raw.map(RawPrediction::into_prediction).transpose()
  }

  /// Like [`Session::fetch_prediction`], but absence is an error.
  pub fn require_prediction(&self, id: i64) -> Result<Prediction> {
    self.fetch_prediction(id)?.ok_or(Error::PredictionNotFound(id))
  }

  pub fn list_predictions(&self, page: Page) -> Result<Vec<Prediction>> {
    let mut stmt = self.tx.prepare(&format!(
      "SELECT {PREDICTION_COLUMNS} FROM prediction
       ORDER BY id
       LIMIT ?1 OFFSET ?2"
    ))?;
    let raws = stmt
      .query_map(
        params![to_sql_count(page.limit), to_sql_count(page.skip)],
        RawPrediction::from_row,
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawPrediction::into_prediction).collect()
  }

  /// Write a new status (and outcome) without checking the workflow; callers
  /// check the edge first.
  pub(crate) fn write_status(
    &self,
    id: i64,
    status: PredictionStatus,
    outcome: Option<bool>,
    now: DateTime<Utc>,
  ) -> Result<Prediction> {
    let resolved_at = status.is_resolved().then(|| encode_dt(now));
    let changed = self.tx.execute(
      "UPDATE prediction
       SET status = ?2, outcome = ?3, resolved_at = ?4, updated_at = ?5
       WHERE id = ?1",
      params![id, status.to_string(), outcome, resolved_at, encode_dt(now)],
    )?;
    if changed == 0 {
      return Err(Error::PredictionNotFound(id));
    }
    self.require_prediction(id)
  }

  pub(crate) fn delete_prediction(&self, id: i64) -> Result<bool> {
    let n = self
      .tx
      .execute("DELETE FROM prediction WHERE id = ?1", params![id])?;
    Ok(n > 0)
  }

  // ── Updates ─────────────────────────────────────────────────────────────

  pub(crate) fn insert_update(
    &self,
    input: &NewUpdate,
    now: DateTime<Utc>,
  ) -> Result<PredictionUpdate> {
    self.require_prediction(input.prediction_id)?;
    let now_str = encode_dt(now);
    self.tx.execute(
      "INSERT INTO predictionupdate (
         prediction_id, likelihood, reasoning, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?4)",
      params![
        input.prediction_id,
        input.likelihood.map(f64::from),
        input.reasoning,
        now_str,
      ],
    )?;
    let id = self.tx.last_insert_rowid();
    self.fetch_update(id)?.ok_or(Error::UpdateNotFound(id))
  }

  /// Fetch an update together with its sources.
  pub fn fetch_update(&self, id: i64) -> Result<Option<PredictionUpdate>> {
    let raw = self
      .tx
      .query_row(
        &format!("SELECT {UPDATE_COLUMNS} FROM predictionupdate WHERE id = ?1"),
        params![id],
        RawUpdate::from_row,
      )
      .optional()?;
    match raw {
      Some(raw) => {
        let sources = self.list_sources(raw.id)?;
        Ok(Some(raw.into_update(sources)?))
      }
      None => Ok(None),
    }
  }

  pub fn list_updates(&self, prediction_id: i64) -> Result<Vec<PredictionUpdate>> {
    let mut stmt = self.tx.prepare(&format!(
      "SELECT {UPDATE_COLUMNS} FROM predictionupdate
       WHERE prediction_id = ?1
       ORDER BY id"
    ))?;
    let raws = stmt
      .query_map(params![prediction_id], RawUpdate::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws
      .into_iter()
      .map(|raw| {
        let sources = self.list_sources(raw.id)?;
        raw.into_update(sources)
      })
      .collect()
  }

  pub(crate) fn delete_update(&self, id: i64) -> Result<bool> {
    let n = self
      .tx
      .execute("DELETE FROM predictionupdate WHERE id = ?1", params![id])?;
    Ok(n > 0)
  }

  fn require_update(&self, id: i64) -> Result<()> {
    let exists = self
      .tx
      .query_row(
        "SELECT 1 FROM predictionupdate WHERE id = ?1",
        params![id],
        |_| Ok(()),
      )
      .optional()?;
    exists.ok_or(Error::UpdateNotFound(id))
  }

  // ── Sources ─────────────────────────────────────────────────────────────

  pub(crate) fn insert_source(
    &self,
    input: &NewSource,
    now: DateTime<Utc>,
  ) -> Result<Source> {
    input.validate()?;
    self.require_update(input.update_id)?;
    let now_str = encode_dt(now);
    self.tx.execute(
      "INSERT INTO source (
         update_id, title, url, summary, credibility, relevance, reasoning,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
      params![
        input.update_id,
        input.title,
        input.url,
        input.summary,
        input.credibility.get(),
        input.relevance.get(),
        input.reasoning,
        now_str,
      ],
    )?;
    let id = self.tx.last_insert_rowid();
    let raw = self.tx.query_row(
      &format!("SELECT {SOURCE_COLUMNS} FROM source WHERE id = ?1"),
      params![id],
      RawSource::from_row,
    )?;
    raw.into_source()
  }

  pub fn list_sources(&self, update_id: i64) -> Result<Vec<Source>> {
    let mut stmt = self.tx.prepare_cached(&format!(
      "SELECT {SOURCE_COLUMNS} FROM source WHERE update_id = ?1 ORDER BY id"
    ))?;
    let raws = stmt
      .query_map(params![update_id], RawSource::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawSource::into_source).collect()
  }

  // ── Reviews ─────────────────────────────────────────────────────────────

  pub(crate) fn insert_review(
    &self,
    input: &NewReview,
    now: DateTime<Utc>,
  ) -> Result<HumanReview> {
    input.validate()?;
    self.require_update(input.update_id)?;
    let now_str = encode_dt(now);
    self.tx.execute(
      "INSERT INTO humanreview (
         update_id, name, decision, feedback, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
      params![
        input.update_id,
        input.name,
        input.decision.to_string(),
        input.feedback,
        now_str,
      ],
    )?;
    let id = self.tx.last_insert_rowid();
    let raw = self.tx.query_row(
      &format!("SELECT {REVIEW_COLUMNS} FROM humanreview WHERE id = ?1"),
      params![id],
      RawReview::from_row,
    )?;
    raw.into_review()
  }

  pub fn list_reviews(&self, update_id: i64) -> Result<Vec<HumanReview>> {
    let mut stmt = self.tx.prepare(&format!(
      "SELECT {REVIEW_COLUMNS} FROM humanreview WHERE update_id = ?1 ORDER BY id"
    ))?;
    let raws = stmt
      .query_map(params![update_id], RawReview::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawReview::into_review).collect()
  }
}

/// SQLite integers are signed; anything past `i64::MAX` means "no limit".
fn to_sql_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }
