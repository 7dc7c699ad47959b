//! SQL schema for the Popular SQLite store.
//!
//! Migrations are applied in order at connection startup and gated on
//! `PRAGMA user_version`: a migration runs only if its version is greater than
//! the stored one, and the stored version is bumped in the same transaction.

use rusqlite::Connection;

/// Per-connection settings; not versioned.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Milliseconds a writer waits on a locked database before giving up.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

pub struct Migration {
  pub version: u32,
  pub name:    &'static str,
  pub sql:     &'static str,
}

/// The schema history, oldest first.
pub const MIGRATIONS: &[Migration] = &[
  Migration {
    version: 1,
    name:    "create_visits",
    sql:     "
CREATE TABLE IF NOT EXISTS visits (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    ip             TEXT    NOT NULL,
    visitable_id   INTEGER NOT NULL,
    visitable_type TEXT    NOT NULL,
    date           TEXT    NOT NULL,   -- YYYY-MM-DD
    created_at     TEXT,
    updated_at     TEXT,
    UNIQUE (ip, visitable_id, visitable_type, date)
);

CREATE INDEX IF NOT EXISTS visits_ip_idx ON visits(ip);
",
  },
  Migration {
    version: 2,
    name:    "index_visits_on_visitable_date",
    sql:     "
CREATE INDEX IF NOT EXISTS visits_visitable_date_idx
    ON visits(visitable_id, visitable_type, date);
",
  },
  Migration {
    version: 3,
    name:    "create_interactions",
    sql:     "
-- One row per (visitor, subject, date, category); repeats only touch updated_at.
CREATE TABLE IF NOT EXISTS interactions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    visitor      TEXT NOT NULL,   -- 'user_<id>' or a network address
    subject_id   TEXT NOT NULL,
    subject_type TEXT NOT NULL,
    category     TEXT NOT NULL DEFAULT 'visit',
    date         TEXT NOT NULL,   -- YYYY-MM-DD
    created_at   TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at   TEXT NOT NULL    -- RFC 3339 UTC
);

CREATE UNIQUE INDEX IF NOT EXISTS interactions_unique
    ON interactions(visitor, subject_id, subject_type, date, category);

CREATE INDEX IF NOT EXISTS interactions_visitor_idx  ON interactions(visitor);
CREATE INDEX IF NOT EXISTS interactions_subject_idx  ON interactions(subject_id, subject_type);
CREATE INDEX IF NOT EXISTS interactions_category_idx ON interactions(category);
CREATE INDEX IF NOT EXISTS interactions_date_idx     ON interactions(date);

-- Legacy visits become interactions in the default category. Their
-- timestamps may be 'YYYY-MM-DD HH:MM:SS'; rewrite them as RFC 3339 UTC.
INSERT OR IGNORE INTO interactions (
    visitor, subject_id, subject_type, category, date, created_at, updated_at
)
SELECT
    ip,
    CAST(visitable_id AS TEXT),
    visitable_type,
    'visit',
    date,
    COALESCE(
        strftime('%Y-%m-%dT%H:%M:%S+00:00', created_at),
        date || 'T00:00:00+00:00'
    ),
    COALESCE(
        strftime('%Y-%m-%dT%H:%M:%S+00:00', updated_at),
        strftime('%Y-%m-%dT%H:%M:%S+00:00', created_at),
        date || 'T00:00:00+00:00'
    )
FROM visits;

DROP TABLE IF EXISTS visits;
",
  },
];

/// The version a fully-migrated database reports.
pub fn latest_version() -> u32 {
  MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply every pending migration. Returns the resulting schema version.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
  let current: u32 =
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

  for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()?;
    tracing::info!(
      version = migration.version,
      name = migration.name,
      "applied schema migration"
    );
  }

  conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
