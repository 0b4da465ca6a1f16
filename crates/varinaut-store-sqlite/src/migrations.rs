//! Versioned schema migrations.
//!
//! The schema is defined entirely by [`MIGRATIONS`], a linear chain in which
//! every step names its predecessor. The number of applied steps is kept in
//! `PRAGMA user_version`; each step runs in its own transaction together with
//! the version bump, so a failed step leaves the database at the previous
//! revision.
//!
//! Never edit a published step. Append a new one instead.

use std::{fmt, str::FromStr};

use rusqlite::Connection;
use tracing::info;

use crate::{Error, Result};

/// One reversible schema or data change.
#[derive(Debug)]
pub struct Migration {
  pub revision:      &'static str,
  /// The revision this one applies on top of; `None` only for the first.
  pub down_revision: Option<&'static str>,
  pub description:   &'static str,
  up:                &'static str,
  down:              &'static str,
}

/// The full chain, oldest first.
pub static MIGRATIONS: &[Migration] = &[
  Migration {
    revision:      "0001_prediction",
    down_revision: None,
    description:   "create prediction",
    up:            "
      CREATE TABLE prediction (
          id          INTEGER PRIMARY KEY AUTOINCREMENT,
          question    TEXT NOT NULL,
          description TEXT,
          status      TEXT NOT NULL DEFAULT 'draft',
          outcome     INTEGER,            -- NULL until resolved
          known_date  TEXT,               -- YYYY-MM-DD
          created_at  TEXT NOT NULL,      -- RFC 3339 UTC
          updated_at  TEXT NOT NULL
      );
      CREATE INDEX ix_prediction_question ON prediction(question);
    ",
    down:          "DROP TABLE prediction;",
  },
  Migration {
    revision:      "0002_predictionupdate",
    down_revision: Some("0001_prediction"),
    description:   "create predictionupdate",
    up:            "
      CREATE TABLE predictionupdate (
          id            INTEGER PRIMARY KEY AUTOINCREMENT,
          prediction_id INTEGER NOT NULL
                        REFERENCES prediction(id) ON DELETE CASCADE,
          likelihood    REAL CHECK (likelihood IS NULL
                                    OR likelihood BETWEEN 0 AND 1),
          reasoning     TEXT,
          created_at    TEXT NOT NULL,
          updated_at    TEXT NOT NULL
      );
      CREATE INDEX ix_predictionupdate_prediction_id
          ON predictionupdate(prediction_id);
    ",
    down:          "DROP TABLE predictionupdate;",
  },
  Migration {
    revision:      "0003_source",
    down_revision: Some("0002_predictionupdate"),
    description:   "create source",
    up:            "
      CREATE TABLE source (
          id          INTEGER PRIMARY KEY AUTOINCREMENT,
          update_id   INTEGER NOT NULL
                      REFERENCES predictionupdate(id) ON DELETE CASCADE,
          title       TEXT NOT NULL,
          url         TEXT NOT NULL,
          summary     TEXT,
          credibility REAL NOT NULL CHECK (credibility BETWEEN 0 AND 1),
          relevance   REAL NOT NULL CHECK (relevance BETWEEN 0 AND 1),
          reasoning   TEXT,
          created_at  TEXT NOT NULL,
          updated_at  TEXT NOT NULL
      );
      CREATE INDEX ix_source_update_id ON source(update_id);
      CREATE INDEX ix_source_title     ON source(title);
      CREATE INDEX ix_source_url       ON source(url);
    ",
    down:          "DROP TABLE source;",
  },
  Migration {
    revision:      "0004_humanreview",
    down_revision: Some("0003_source"),
    description:   "create humanreview (one per update)",
    up:            "
      CREATE TABLE humanreview (
          id         INTEGER PRIMARY KEY AUTOINCREMENT,
          update_id  INTEGER NOT NULL UNIQUE
                     REFERENCES predictionupdate(id) ON DELETE CASCADE,
          name       TEXT NOT NULL DEFAULT 'reviewer',
          decision   TEXT NOT NULL DEFAULT 'challenge',
          feedback   TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
      );
    ",
    down:          "DROP TABLE humanreview;",
  },
  Migration {
    revision:      "0005_review_flags",
    down_revision: Some("0004_humanreview"),
    description:   "add require_review and resolved_at to prediction",
    up:            "
      ALTER TABLE prediction
          ADD COLUMN require_review INTEGER NOT NULL DEFAULT 0;
      ALTER TABLE prediction ADD COLUMN resolved_at TEXT;
    ",
    down:          "
      ALTER TABLE prediction DROP COLUMN resolved_at;
      ALTER TABLE prediction DROP COLUMN require_review;
    ",
  },
  Migration {
    revision:      "0006_review_standalone",
    down_revision: Some("0005_review_flags"),
    description:   "allow several reviews per update",
    up:            "
      CREATE TABLE humanreview_next (
          id         INTEGER PRIMARY KEY AUTOINCREMENT,
          update_id  INTEGER NOT NULL
                     REFERENCES predictionupdate(id) ON DELETE CASCADE,
          name       TEXT NOT NULL DEFAULT 'reviewer',
          decision   TEXT NOT NULL DEFAULT 'challenge',
          feedback   TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
      );
      INSERT INTO humanreview_next
          (id, update_id, name, decision, feedback, created_at, updated_at)
      SELECT id, update_id, name, decision, feedback, created_at, updated_at
      FROM humanreview;
      DROP TABLE humanreview;
      ALTER TABLE humanreview_next RENAME TO humanreview;
      CREATE INDEX ix_humanreview_update_id ON humanreview(update_id);
    ",
    // Fails if an update has collected more than one review in the meantime.
    down:          "
      CREATE TABLE humanreview_prev (
          id         INTEGER PRIMARY KEY AUTOINCREMENT,
          update_id  INTEGER NOT NULL UNIQUE
                     REFERENCES predictionupdate(id) ON DELETE CASCADE,
          name       TEXT NOT NULL DEFAULT 'reviewer',
          decision   TEXT NOT NULL DEFAULT 'challenge',
          feedback   TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
      );
      INSERT INTO humanreview_prev
          (id, update_id, name, decision, feedback, created_at, updated_at)
      SELECT id, update_id, name, decision, feedback, created_at, updated_at
      FROM humanreview;
      DROP TABLE humanreview;
      ALTER TABLE humanreview_prev RENAME TO humanreview;
    ",
  },
  Migration {
    revision:      "0007_status_reviewed",
    down_revision: Some("0006_review_standalone"),
    description:   "rename prediction status approved to reviewed",
    up:            "UPDATE prediction SET status = 'reviewed' WHERE status = 'approved';",
    down:          "UPDATE prediction SET status = 'approved' WHERE status = 'reviewed';",
  },
  Migration {
    revision:      "0008_resolution_date",
    down_revision: Some("0007_status_reviewed"),
    description:   "rename prediction.known_date to resolution_date",
    up:            "ALTER TABLE prediction RENAME COLUMN known_date TO resolution_date;",
    down:          "ALTER TABLE prediction RENAME COLUMN resolution_date TO known_date;",
  },
];

/// The newest revision in the chain.
pub fn head() -> &'static str {
  MIGRATIONS.last().map(|m| m.revision).unwrap_or("base")
}

// ─── Targets ─────────────────────────────────────────────────────────────────

/// Where to move the schema to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  /// Every migration applied.
  Head,
  /// No migration applied (empty database).
  Base,
  /// Exactly the migrations up to and including this revision.
  Revision(String),
}

impl Target {
  /// The number of applied steps this target corresponds to.
  fn position(&self) -> Result<usize> {
    match self {
      Self::Head => Ok(MIGRATIONS.len()),
      Self::Base => Ok(0),
      Self::Revision(rev) => MIGRATIONS
        .iter()
        .position(|m| m.revision == rev)
        .map(|i| i + 1)
        .ok_or_else(|| Error::UnknownRevision(rev.clone())),
    }
  }
}

impl FromStr for Target {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    Ok(match s {
      "head" => Self::Head,
      "base" => Self::Base,
      other => Self::Revision(other.to_owned()),
    })
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Head => f.write_str("head"),
      Self::Base => f.write_str("base"),
      Self::Revision(rev) => f.write_str(rev),
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Snapshot of where a database sits in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
  /// The last applied revision; `None` for an empty database.
  pub current: Option<&'static str>,
  pub head:    &'static str,
  /// Revisions not yet applied, oldest first.
  pub pending: Vec<&'static str>,
}

impl MigrationStatus {
  pub fn is_current(&self) -> bool { self.pending.is_empty() }
}

/// Number of applied steps, read from `PRAGMA user_version`.
pub fn applied_count(conn: &Connection) -> Result<usize> {
  let version: i64 =
    conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
  let count = usize::try_from(version).map_err(|_| {
    Error::Migration(format!("negative schema version {version}"))
  })?;
  if count > MIGRATIONS.len() {
    return Err(Error::Migration(format!(
      "database is at schema version {count}, newer than this build ({})",
      MIGRATIONS.len()
    )));
  }
  Ok(count)
}

pub fn status(conn: &Connection) -> Result<MigrationStatus> {
  let applied = applied_count(conn)?;
  Ok(MigrationStatus {
    current: applied.checked_sub(1).map(|i| MIGRATIONS[i].revision),
    head:    head(),
    pending: MIGRATIONS[applied..].iter().map(|m| m.revision).collect(),
  })
}

// ─── Runner ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Direction {
  Up,
  Down,
}

impl Direction {
  fn as_str(self) -> &'static str {
    match self {
      Self::Up => "upgrade",
      Self::Down => "downgrade",
    }
  }
}

/// Apply pending steps up to `target`. Returns the revisions applied.
///
/// A target below the current revision is an error; use [`downgrade`].
pub fn upgrade(
  conn: &mut Connection,
  target: &Target,
) -> Result<Vec<&'static str>> {
  let from = applied_count(conn)?;
  let to = target.position()?;
  if to < from {
    return Err(Error::Migration(format!(
      "target {target} is behind the current revision; downgrade instead"
    )));
  }

  let mut applied = Vec::with_capacity(to - from);
  for (index, migration) in MIGRATIONS.iter().enumerate().take(to).skip(from) {
    apply(conn, migration, Direction::Up, index + 1)?;
    applied.push(migration.revision);
  }
  Ok(applied)
}

/// Revert applied steps, newest first, until `target` is the current
/// revision. Returns the revisions reverted.
pub fn downgrade(
  conn: &mut Connection,
  target: &Target,
) -> Result<Vec<&'static str>> {
  let from = applied_count(conn)?;
  let to = target.position()?;
  if to > from {
    return Err(Error::Migration(format!(
      "target {target} is ahead of the current revision; upgrade instead"
    )));
  }

  let mut reverted = Vec::with_capacity(from - to);
  for index in (to..from).rev() {
    let migration = &MIGRATIONS[index];
    apply(conn, migration, Direction::Down, index)?;
    reverted.push(migration.revision);
  }
  Ok(reverted)
}

fn apply(
  conn: &mut Connection,
  migration: &Migration,
  direction: Direction,
  resulting_version: usize,
) -> Result<()> {
  let sql = match direction {
    Direction::Up => migration.up,
    Direction::Down => migration.down,
  };
  let fail = |e: rusqlite::Error| {
    Error::Migration(format!(
      "{} of {} ({}) failed: {e}",
      direction.as_str(),
      migration.revision,
      migration.description
    ))
  };

  let tx = conn.transaction().map_err(fail)?;
  tx.execute_batch(sql).map_err(fail)?;
  tx.pragma_update(None, "user_version", resulting_version as i64)
    .map_err(fail)?;
  tx.commit().map_err(fail)?;

  info!(
    revision = migration.revision,
    direction = direction.as_str(),
    version = resulting_version,
    "applied schema migration step"
  );
  Ok(())
}
