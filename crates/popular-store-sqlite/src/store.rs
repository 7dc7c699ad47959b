//! [`SqliteStore`]: the SQLite implementation of [`InteractionStore`].

use std::{collections::HashMap, path::Path, sync::LazyLock, time::Duration};

use chrono::Utc;
use popular_core::{
  interaction::{Interaction, NewInteraction},
  ranking::Ranked,
  store::{InteractionQuery, InteractionStore},
  subject::SubjectRef,
};
use rusqlite::named_params;

use crate::{
  Error, Result,
  encode::{RawInteraction, RawUpserted, encode_date, encode_dt, encode_ids},
  schema::{BUSY_TIMEOUT_MS, PRAGMAS, migrate},
};

// ─── SQL ─────────────────────────────────────────────────────────────────────

/// Atomic insert-or-refresh against the `interactions_unique` index.
const UPSERT: &str = "
INSERT INTO interactions (
    visitor, subject_id, subject_type, category, date, created_at, updated_at
) VALUES (
    :visitor, :subject_id, :subject_type, :category, :date, :now, :now
)
ON CONFLICT (visitor, subject_id, subject_type, date, category)
DO UPDATE SET updated_at = excluded.updated_at
RETURNING id, created_at, updated_at";

/// The window and category filter shared by every read. Binds `:from`, `:to`
/// and `:category`; a NULL binding disables that bound.
const FILTER: &str = "(:from IS NULL OR date >= :from)
   AND (:to IS NULL OR date <= :to)
   AND (:category IS NULL OR category = :category)";

static COUNT_ONE: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT COUNT(*) FROM interactions
     WHERE subject_type = :subject_type AND subject_id = :subject_id
       AND {FILTER}"
  )
});

static COUNT_MANY: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT subject_id, COUNT(*) FROM interactions
     WHERE subject_type = :subject_type
       AND subject_id IN (SELECT value FROM json_each(:ids))
       AND {FILTER}
     GROUP BY subject_id"
  )
});

static LIST: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT {columns} FROM interactions
     WHERE subject_type = :subject_type AND subject_id = :subject_id
       AND {FILTER}
     ORDER BY date DESC, id DESC",
    columns = RawInteraction::COLUMNS,
  )
});

static TOP: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT subject_id, COUNT(*) AS n FROM interactions
     WHERE subject_type = :subject_type AND {FILTER}
     GROUP BY subject_id
     ORDER BY n DESC, subject_id ASC
     LIMIT :limit"
  )
});

/// Owned copies of an [`InteractionQuery`]'s bindings, movable into a
/// `call` closure.
struct Bounds {
  from:     Option<String>,
  to:       Option<String>,
  category: Option<String>,
}

impl From<&InteractionQuery> for Bounds {
  fn from(q: &InteractionQuery) -> Self {
    Self {
      from:     q.range.from.map(encode_date),
      to:       q.range.to.map(encode_date),
      category: q.category.as_ref().map(|c| c.as_str().to_owned()),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An interaction ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<u32> {
    let version = self
      .conn
      .call(|conn| {
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.execute_batch(PRAGMAS)?;
        Ok(migrate(conn)?)
      })
      .await?;
    tracing::debug!(version, "interaction store schema ready");
    Ok(version)
  }

  /// The current `PRAGMA user_version`.
  pub async fn schema_version(&self) -> Result<u32> {
    Ok(
      self
        .conn
        .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
        .await?,
    )
  }

  /// Run arbitrary setup against the raw connection. Used by tests to seed
  /// rows dated in the past and to stage legacy schemas.
  #[cfg(test)]
  pub(crate) async fn with_conn<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Open a store over an already-prepared connection.
  #[cfg(test)]
  pub(crate) async fn from_connection(
    conn: tokio_rusqlite::Connection,
  ) -> Result<Self> {
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }
}

// ─── InteractionStore impl ───────────────────────────────────────────────────

impl InteractionStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(&self, input: NewInteraction) -> Result<Interaction> {
    let visitor      = input.visitor.as_str().to_owned();
    let subject_id   = input.subject.subject_id.clone();
    let subject_type = input.subject.subject_type.clone();
    let category     = input.category.as_str().to_owned();
    let date         = encode_date(input.date);
    let now          = encode_dt(Utc::now());

    let raw: RawUpserted = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          UPSERT,
          named_params! {
            ":visitor":      visitor,
            ":subject_id":   subject_id,
            ":subject_type": subject_type,
            ":category":     category,
            ":date":         date,
            ":now":          now,
          },
          RawUpserted::from_row,
        )?)
      })
      .await?;

    raw.into_interaction(input)
  }

  async fn upsert_batch(
    &self,
    inputs: Vec<NewInteraction>,
  ) -> Result<Vec<Result<Interaction>>> {
    if inputs.is_empty() {
      return Ok(Vec::new());
    }

    let now = encode_dt(Utc::now());
    let rows: Vec<[String; 5]> = inputs
      .iter()
      .map(|i| {
        [
          i.visitor.as_str().to_owned(),
          i.subject.subject_id.clone(),
          i.subject.subject_type.clone(),
          i.category.as_str().to_owned(),
          encode_date(i.date),
        ]
      })
      .collect();

    // A failing row only aborts its own statement; the rest still commit.
    let outcomes: Vec<rusqlite::Result<RawUpserted>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcomes = {
          let mut stmt = tx.prepare_cached(UPSERT)?;
          rows
            .iter()
            .map(|[visitor, subject_id, subject_type, category, date]| {
              stmt.query_row(
                named_params! {
                  ":visitor":      visitor,
                  ":subject_id":   subject_id,
                  ":subject_type": subject_type,
                  ":category":     category,
                  ":date":         date,
                  ":now":          now,
                },
                RawUpserted::from_row,
              )
            })
            .collect::<Vec<_>>()
        };
        tx.commit()?;
        Ok(outcomes)
      })
      .await?;

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
      tracing::warn!(failed, total = outcomes.len(), "batch upsert had failing rows");
    }

    Ok(
      inputs
        .into_iter()
        .zip(outcomes)
        .map(|(input, outcome)| outcome.map_err(Error::from)?.into_interaction(input))
        .collect(),
    )
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn count(
    &self,
    subject: &SubjectRef,
    query:   &InteractionQuery,
  ) -> Result<u64> {
    let subject_id   = subject.subject_id.clone();
    let subject_type = subject.subject_type.clone();
    let bounds       = Bounds::from(query);

    let n: i64 = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&COUNT_ONE)?;
        Ok(stmt.query_row(
          named_params! {
            ":subject_type": subject_type,
            ":subject_id":   subject_id,
            ":from":         bounds.from,
            ":to":           bounds.to,
            ":category":     bounds.category,
          },
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(n as u64)
  }

  async fn count_many(
    &self,
    subject_type: &str,
    subject_ids:  &[String],
    query:        &InteractionQuery,
  ) -> Result<HashMap<String, u64>> {
    if subject_ids.is_empty() {
      return Ok(HashMap::new());
    }

    let subject_type = subject_type.to_owned();
    let ids          = encode_ids(subject_ids)?;
    let bounds       = Bounds::from(query);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&COUNT_MANY)?;
        let rows = stmt
          .query_map(
            named_params! {
              ":subject_type": subject_type,
              ":ids":          ids,
              ":from":         bounds.from,
              ":to":           bounds.to,
              ":category":     bounds.category,
            },
            |r| Ok((r.get(0)?, r.get(1)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
  }

  async fn list(
    &self,
    subject: &SubjectRef,
    query:   &InteractionQuery,
  ) -> Result<Vec<Interaction>> {
    let subject_id   = subject.subject_id.clone();
    let subject_type = subject.subject_type.clone();
    let bounds       = Bounds::from(query);

    let raws: Vec<RawInteraction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&LIST)?;
        let rows = stmt
          .query_map(
            named_params! {
              ":subject_type": subject_type,
              ":subject_id":   subject_id,
              ":from":         bounds.from,
              ":to":           bounds.to,
              ":category":     bounds.category,
            },
            RawInteraction::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInteraction::into_interaction).collect()
  }

  async fn top(
    &self,
    subject_type: &str,
    query:        &InteractionQuery,
    limit:        usize,
  ) -> Result<Vec<Ranked<SubjectRef>>> {
    let ty     = subject_type.to_owned();
    let bounds = Bounds::from(query);
    let limit  = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&TOP)?;
        let rows = stmt
          .query_map(
            named_params! {
              ":subject_type": ty,
              ":from":         bounds.from,
              ":to":           bounds.to,
              ":category":     bounds.category,
              ":limit":        limit,
            },
            |r| Ok((r.get(0)?, r.get(1)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(subject_id, n)| {
        Ok(Ranked {
          subject: SubjectRef::new(subject_type, subject_id)?,
          count:   n as u64,
        })
      })
      .collect()
  }
}
