//! Interaction records: one row per visitor, subject, category and day.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{subject::SubjectRef, visitor::Visitor};

// ─── Category ────────────────────────────────────────────────────────────────

/// A string tag distinguishing kinds of interaction, e.g. `"visit"` or
/// `"like"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
  /// The category recorded by a plain visit.
  pub const VISIT: &'static str = "visit";

  pub fn new(tag: impl Into<String>) -> Self { Self(tag.into()) }

  pub fn visit() -> Self { Self(Self::VISIT.to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for Category {
  fn default() -> Self { Self::visit() }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Category {
  fn from(s: &str) -> Self { Self::new(s) }
}

// ─── Interaction ─────────────────────────────────────────────────────────────

/// A stored interaction.
///
/// `(visitor, subject, category, date)` is unique: repeat observations within
/// the same day refresh `updated_at` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
  /// Store-assigned surrogate key.
  pub id:         i64,
  pub visitor:    Visitor,
  #[serde(flatten)]
  pub subject:    SubjectRef,
  pub category:   Category,
  pub date:       NaiveDate,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── NewInteraction ──────────────────────────────────────────────────────────

/// Input to [`crate::store::InteractionStore::upsert`]. Timestamps are set by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
  pub visitor:  Visitor,
  pub subject:  SubjectRef,
  pub category: Category,
  pub date:     NaiveDate,
}
