//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};
use varinaut_core::{
  Error as CoreError,
  prediction::{NewPrediction, PredictionStatus},
  research::{NewReview, NewSource, NewUpdate, ReviewDecision},
  store::{Page, PredictionStore},
};

use crate::{Error, SqliteStore, StoreLocation, Target};

async fn store() -> SqliteStore {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  store.init_schema().await.expect("schema");
  store
}

async fn seed(s: &SqliteStore, n: usize) -> Vec<i64> {
  let mut ids = Vec::with_capacity(n);
  for i in 0..n {
    let p = s
      .create_prediction(NewPrediction::new(format!("Question {i}?")))
      .await
      .unwrap();
    ids.push(p.id);
  }
  ids
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Fixture files, in foreign-key order. Rows are written verbatim, so they
/// use the column names of the revision they are loaded at.
const FIXTURES: [(&str, &str); 4] = [
  ("prediction", include_str!("../fixtures/prediction.json")),
  ("predictionupdate", include_str!("../fixtures/predictionupdate.json")),
  ("source", include_str!("../fixtures/source.json")),
  ("humanreview", include_str!("../fixtures/humanreview.json")),
];

fn to_sql(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    other => SqlValue::Text(other.to_string()),
  }
}

async fn load_fixtures(s: &SqliteStore) {
  s.session(|session| {
    for (table, json) in FIXTURES {
      let rows: Vec<Map<String, Value>> =
        serde_json::from_str(json).expect("fixture json");
      for row in rows {
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders: Vec<String> =
          (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
          "INSERT INTO {table} ({}) VALUES ({})",
          columns.join(", "),
          placeholders.join(", ")
        );
        session
          .connection()
          .execute(&sql, rusqlite::params_from_iter(row.values().map(to_sql)))?;
      }
    }
    Ok(())
  })
  .await
  .expect("load fixtures");
}

#[tokio::test]
async fn fixtures_use_legacy_vocabulary_until_migrated() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.upgrade(Target::Revision("0006_review_standalone".into()))
    .await
    .unwrap();
  load_fixtures(&s).await;

  let rows: Vec<(String, String, Option<bool>)> = s
    .session(|session| {
      let mut stmt = session
        .connection()
        .prepare("SELECT question, status, outcome FROM prediction ORDER BY id")?;
      let rows = stmt
        .query_map([], |r| {
          Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<bool>>(2)?,
          ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();
  assert_eq!(rows.len(), 3);

  let ai: Vec<_> = rows
    .iter()
    .filter(|(q, ..)| q.contains("AI surpass human intelligence"))
    .collect();
  assert_eq!(ai.len(), 1);
  assert_eq!(ai[0].1, "approved");

  let resolved: Vec<_> = rows.iter().filter(|(.., o)| o.is_some()).collect();
  assert_eq!(resolved.len(), 1);
  assert_eq!(resolved[0].2, Some(false));

  // Upgrading rewrites the status and renames the date column.
  let applied = s.init_schema().await.unwrap();
  assert_eq!(applied, ["0007_status_reviewed", "0008_resolution_date"]);

  let all = s.list_predictions(Page::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  let ai = all
    .iter()
    .find(|p| p.question.contains("AI surpass human intelligence"))
    .unwrap();
  assert_eq!(ai.status, PredictionStatus::Reviewed);
  assert_eq!(ai.resolution_date, NaiveDate::from_ymd_opt(2030, 12, 31));
  assert!(ai.require_review);

  let resolved: Vec<_> = all.iter().filter(|p| p.outcome.is_some()).collect();
  assert_eq!(resolved.len(), 1);
  assert_eq!(resolved[0].outcome, Some(false));
  assert!(resolved[0].resolved_at.is_some());

  let updates = s.list_updates(ai.id).await.unwrap();
  assert_eq!(updates.len(), 1);
  assert_eq!(updates[0].sources.len(), 1);
  assert_eq!(updates[0].sources[0].title, "AI Index Report");

  let reviews = s.list_reviews(updates[0].id).await.unwrap();
  assert_eq!(reviews.len(), 1);
  assert_eq!(reviews[0].decision, ReviewDecision::Accept);
}

#[tokio::test]
async fn downgrade_restores_legacy_status() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.upgrade(Target::Revision("0006_review_standalone".into()))
    .await
    .unwrap();
  load_fixtures(&s).await;
  s.init_schema().await.unwrap();

  s.downgrade(Target::Revision("0006_review_standalone".into()))
    .await
    .unwrap();
  let status: String = s
    .session(|session| {
      Ok(session.connection().query_row(
        "SELECT status FROM prediction WHERE id = 1",
        [],
        |r| r.get::<_, String>(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(status, "approved");
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn init_schema_is_idempotent() {
  let s = store().await;
  assert!(s.init_schema().await.unwrap().is_empty());
  assert!(s.migration_status().await.unwrap().is_current());
}

#[tokio::test]
async fn fresh_store_reports_pending_migrations() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  let status = s.migration_status().await.unwrap();
  assert_eq!(status.current, None);
  assert!(!status.is_current());
}

#[test]
fn store_location_from_url() {
  assert_eq!(
    StoreLocation::from_url("sqlite::memory:").unwrap(),
    StoreLocation::Memory
  );
  assert_eq!(
    StoreLocation::from_url("sqlite://./varinaut.db").unwrap(),
    StoreLocation::File("./varinaut.db".into())
  );
  assert_eq!(
    StoreLocation::from_url("sqlite:data/v.db").unwrap(),
    StoreLocation::File("data/v.db".into())
  );
  assert_eq!(
    StoreLocation::from_url("/var/lib/varinaut.db").unwrap(),
    StoreLocation::File("/var/lib/varinaut.db".into())
  );
  assert!(matches!(
    StoreLocation::from_url("postgres://db/varinaut"),
    Err(Error::UnsupportedUrl(_))
  ));
  assert!(matches!(
    StoreLocation::from_url("sqlite://"),
    Err(Error::UnsupportedUrl(_))
  ));
}

#[test]
fn store_location_from_aiosqlite_url() {
  assert_eq!(
    StoreLocation::from_url("sqlite+aiosqlite:///./varinaut.db").unwrap(),
    StoreLocation::File("./varinaut.db".into())
  );
  assert_eq!(
    StoreLocation::from_url("sqlite+aiosqlite:////var/lib/varinaut.db").unwrap(),
    StoreLocation::File("/var/lib/varinaut.db".into())
  );
  assert_eq!(
    StoreLocation::from_url("sqlite+aiosqlite:///:memory:").unwrap(),
    StoreLocation::Memory
  );
  assert_eq!(
    StoreLocation::from_url("sqlite+aiosqlite://").unwrap(),
    StoreLocation::Memory
  );
  assert!(matches!(
    StoreLocation::from_url("sqlite+aiosqlite://host/v.db"),
    Err(Error::UnsupportedUrl(_))
  ));
}

// ─── Predictions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_prediction() {
  let s = store().await;

  let mut input = NewPrediction::new("Will it rain in Lisbon tomorrow?");
  input.description = Some("Any measurable precipitation.".into());
  input.resolution_date = NaiveDate::from_ymd_opt(2026, 11, 1);

  let created = s.create_prediction(input).await.unwrap();
  assert_eq!(created.status, PredictionStatus::Draft);
  assert_eq!(created.outcome, None);
  assert_eq!(created.resolved_at, None);
  assert_eq!(created.created_at, created.updated_at);

  let fetched = s.get_prediction(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_prediction_returns_none() {
  let s = store().await;
  assert!(s.get_prediction(999).await.unwrap().is_none());
}

#[tokio::test]
async fn blank_question_is_rejected_and_not_persisted() {
  let s = store().await;
  let err = s.create_prediction(NewPrediction::new("   ")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
  assert!(s.list_predictions(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_empty_store() {
  let s = store().await;
  assert!(s.list_predictions(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_pagination_matches_window() {
  let s = store().await;
  let ids = seed(&s, 5).await;
  let total = ids.len() as u64;

  for (skip, limit) in [(0, 100), (0, 1), (1, 1), (2, 2), (4, 10), (5, 3), (9, 3)] {
    let page = s.list_predictions(Page::new(skip, limit)).await.unwrap();
    let expected = limit.min(total.saturating_sub(skip)) as usize;
    assert_eq!(page.len(), expected, "skip={skip} limit={limit}");

    let got: Vec<i64> = page.iter().map(|p| p.id).collect();
    let want: Vec<i64> =
      ids.iter().copied().skip(skip as usize).take(limit as usize).collect();
    assert_eq!(got, want, "skip={skip} limit={limit}");
  }
}

#[tokio::test]
async fn list_handles_huge_limit() {
  let s = store().await;
  seed(&s, 3).await;
  let page = s.list_predictions(Page::new(0, u64::MAX)).await.unwrap();
  assert_eq!(page.len(), 3);
}

// ─── Status workflow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn full_workflow_to_resolution() {
  let s = store().await;
  let p = s
    .create_prediction(NewPrediction::new("Will the bill pass?"))
    .await
    .unwrap();

  for next in [
    PredictionStatus::Researching,
    PredictionStatus::PendingReview,
    PredictionStatus::Researching,
    PredictionStatus::PendingReview,
    PredictionStatus::Reviewed,
  ] {
    let moved = s.transition_status(p.id, next).await.unwrap();
    assert_eq!(moved.status, next);
    assert_eq!(moved.outcome, None);
  }

  let resolved = s.resolve_prediction(p.id, true).await.unwrap();
  assert_eq!(resolved.status, PredictionStatus::Resolved);
  assert_eq!(resolved.outcome, Some(true));
  assert!(resolved.resolved_at.is_some());
  assert!(resolved.updated_at >= p.updated_at);
  assert_eq!(resolved.created_at, p.created_at);
}

#[tokio::test]
async fn invalid_transition_leaves_status_unchanged() {
  let s = store().await;
  let p = s
    .create_prediction(NewPrediction::new("Will the bill pass?"))
    .await
    .unwrap();

  let err = s
    .transition_status(p.id, PredictionStatus::Reviewed)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::InvalidTransition {
      from: PredictionStatus::Draft,
      to:   PredictionStatus::Reviewed,
    })
  ));

  let fetched = s.get_prediction(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, PredictionStatus::Draft);
  assert_eq!(fetched.updated_at, p.updated_at);
}

#[tokio::test]
async fn resolving_requires_review_and_outcome() {
  let s = store().await;
  let p = s
    .create_prediction(NewPrediction::new("Will the bill pass?"))
    .await
    .unwrap();

  let err = s
    .transition_status(p.id, PredictionStatus::Resolved)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OutcomeRequired)));

  let err = s.resolve_prediction(p.id, false).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidTransition { .. })));
}

#[tokio::test]
async fn transition_missing_prediction_errors() {
  let s = store().await;
  let err = s
    .transition_status(42, PredictionStatus::Researching)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PredictionNotFound(42)));
}

// ─── Updates, sources, reviews ───────────────────────────────────────────────

#[tokio::test]
async fn likelihood_round_trips_exactly() {
  let s = store().await;
  let id = seed(&s, 1).await[0];

  for value in [0.5, 0.0, 1.0, 0.123_456_789_012_345_6] {
    let update = s
      .record_update(NewUpdate::new(id).with_likelihood(value).unwrap())
      .await
      .unwrap();
    let fetched = s.get_update(update.id).await.unwrap().unwrap();
    assert_eq!(fetched.likelihood.map(f64::from), Some(value));
  }
}

#[tokio::test]
async fn update_for_missing_prediction_errors() {
  let s = store().await;
  let err = s.record_update(NewUpdate::new(7)).await.unwrap_err();
  assert!(matches!(err, Error::PredictionNotFound(7)));
}

#[tokio::test]
async fn sources_are_loaded_with_their_update() {
  let s = store().await;
  let id = seed(&s, 1).await[0];
  let update = s.record_update(NewUpdate::new(id)).await.unwrap();
  assert!(update.sources.is_empty());

  let mut first =
    NewSource::new(update.id, "Poll", "https://example.com/poll", 0.8, 0.6)
      .unwrap();
  first.summary = Some("Latest polling average.".into());
  s.add_source(first).await.unwrap();
  s.add_source(
    NewSource::new(update.id, "Op-ed", "https://example.com/oped", 0.2, 0.1)
      .unwrap(),
  )
  .await
  .unwrap();

  let fetched = s.get_update(update.id).await.unwrap().unwrap();
  let titles: Vec<&str> =
    fetched.sources.iter().map(|src| src.title.as_str()).collect();
  assert_eq!(titles, ["Poll", "Op-ed"]);
  assert_eq!(fetched.sources[0].credibility.get(), 0.8);
  assert_eq!(
    fetched.sources[0].summary.as_deref(),
    Some("Latest polling average.")
  );

  let listed = s.list_updates(id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].sources.len(), 2);
}

#[tokio::test]
async fn source_for_missing_update_errors() {
  let s = store().await;
  let err = s
    .add_source(NewSource::new(11, "t", "https://example.com", 0.5, 0.5).unwrap())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UpdateNotFound(11)));
}

#[tokio::test]
async fn several_reviews_per_update() {
  let s = store().await;
  let id = seed(&s, 1).await[0];
  let update = s.record_update(NewUpdate::new(id)).await.unwrap();

  let first = s
    .record_review(NewReview::new(update.id, "Needs a second source."))
    .await
    .unwrap();
  assert_eq!(first.decision, ReviewDecision::Challenge);
  assert_eq!(first.name, varinaut_core::research::DEFAULT_REVIEWER);

  let mut second = NewReview::new(update.id, "Looks good now.");
  second.decision = ReviewDecision::Accept;
  second.name = "ana".into();
  s.record_review(second).await.unwrap();

  let reviews = s.list_reviews(update.id).await.unwrap();
  assert_eq!(reviews.len(), 2);
  assert_eq!(reviews[1].decision, ReviewDecision::Accept);
  assert_eq!(reviews[1].name, "ana");
}

// ─── Cascades ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_prediction_cascades() {
  let s = store().await;
  let ids = seed(&s, 2).await;
  let (id, other) = (ids[0], ids[1]);
  let update = s.record_update(NewUpdate::new(id)).await.unwrap();
  s.add_source(
    NewSource::new(update.id, "t", "https://example.com", 0.5, 0.5).unwrap(),
  )
  .await
  .unwrap();
  s.record_review(NewReview::new(update.id, "ok")).await.unwrap();
  let kept = s.record_update(NewUpdate::new(other)).await.unwrap();

  assert!(s.delete_prediction(id).await.unwrap());
  assert!(!s.delete_prediction(id).await.unwrap());

  assert!(s.get_prediction(id).await.unwrap().is_none());
  assert!(s.get_update(update.id).await.unwrap().is_none());
  assert!(s.list_sources(update.id).await.unwrap().is_empty());
  assert!(s.list_reviews(update.id).await.unwrap().is_empty());
  assert!(s.get_update(kept.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_update_cascades_to_sources() {
  let s = store().await;
  let id = seed(&s, 1).await[0];
  let update = s.record_update(NewUpdate::new(id)).await.unwrap();
  for i in 0..3 {
    s.add_source(
      NewSource::new(update.id, format!("s{i}"), "https://example.com", 0.5, 0.5)
        .unwrap(),
    )
    .await
    .unwrap();
  }

  assert!(s.delete_update(update.id).await.unwrap());
  assert!(s.list_sources(update.id).await.unwrap().is_empty());
  assert!(s.get_prediction(id).await.unwrap().is_some());
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_session_rolls_back() {
  let s = store().await;

  let err = s
    .session(|session| {
      session.insert_prediction(&NewPrediction::new("doomed"), chrono::Utc::now())?;
      Err::<(), _>(Error::PredictionNotFound(0))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PredictionNotFound(0)));
  assert!(s.list_predictions(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_session_commits_everything() {
  let s = store().await;

  let (prediction, update) = s
    .session(|session| {
      let now = chrono::Utc::now();
      let p = session.insert_prediction(&NewPrediction::new("together"), now)?;
      let u = session.insert_update(&NewUpdate::new(p.id), now)?;
      Ok((p, u))
    })
    .await
    .unwrap();

  assert!(s.get_prediction(prediction.id).await.unwrap().is_some());
  assert_eq!(s.list_updates(prediction.id).await.unwrap()[0].id, update.id);
}
