//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` so that lexical comparison in SQL matches
//! calendar order. Timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, NaiveDate, Utc};
use popular_core::{
  interaction::{Category, Interaction, NewInteraction},
  subject::SubjectRef,
  visitor::Visitor,
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Subject id lists ────────────────────────────────────────────────────────

/// Encode ids as a JSON array for `json_each(?)` membership tests.
pub fn encode_ids(ids: &[String]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `interactions` row.
pub struct RawInteraction {
  pub id:           i64,
  pub visitor:      String,
  pub subject_id:   String,
  pub subject_type: String,
  pub category:     String,
  pub date:         String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawInteraction {
  /// Column list matching [`RawInteraction::from_row`].
  pub const COLUMNS: &'static str =
    "id, visitor, subject_id, subject_type, category, date, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      visitor:      row.get(1)?,
      subject_id:   row.get(2)?,
      subject_type: row.get(3)?,
      category:     row.get(4)?,
      date:         row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_interaction(self) -> Result<Interaction> {
    Ok(Interaction {
      id:         self.id,
      visitor:    Visitor::new(self.visitor)?,
      subject:    SubjectRef::new(self.subject_type, self.subject_id)?,
      category:   Category::new(self.category),
      date:       decode_date(&self.date)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// The columns `RETURNING` hands back from an upsert.
pub struct RawUpserted {
  pub id:         i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawUpserted {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      created_at: row.get(1)?,
      updated_at: row.get(2)?,
    })
  }

  /// Combine with the input that produced this row.
  pub fn into_interaction(self, input: NewInteraction) -> Result<Interaction> {
    Ok(Interaction {
      id:         self.id,
      visitor:    input.visitor,
      subject:    input.subject,
      category:   input.category,
      date:       input.date,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
