//! The `InteractionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `popular-store-sqlite`).
//! It knows nothing about clocks or window policies: callers hand it resolved
//! [`DateRange`]s. Higher layers go through [`crate::tracker::Tracker`].

use std::{collections::HashMap, future::Future};

use crate::{
  interaction::{Category, Interaction, NewInteraction},
  ranking::Ranked,
  subject::SubjectRef,
  window::DateRange,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Filter shared by every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionQuery {
  /// Inclusive bounds on the interaction date.
  pub range:    DateRange,
  /// Restrict to one category; `None` counts every category.
  pub category: Option<Category>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an interaction ledger backend.
///
/// Backends must enforce uniqueness of
/// `(visitor, subject_id, subject_type, date, category)` and perform
/// [`upsert`](Self::upsert) atomically against that key.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait InteractionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert the interaction, or refresh `updated_at` on the existing row with
  /// the same key. Returns the stored row either way.
  fn upsert(
    &self,
    input: NewInteraction,
  ) -> impl Future<Output = Result<Interaction, Self::Error>> + Send + '_;

  /// Upsert many interactions in one round-trip.
  ///
  /// The outer error means nothing was attempted (e.g. the store is
  /// unreachable). Otherwise there is one result per input, in input order,
  /// and a failed row does not prevent the others from being written.
  fn upsert_batch(
    &self,
    inputs: Vec<NewInteraction>,
  ) -> impl Future<
    Output = Result<Vec<Result<Interaction, Self::Error>>, Self::Error>,
  > + Send
  + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Count a single subject's interactions matching `query`.
  fn count<'a>(
    &'a self,
    subject: &'a SubjectRef,
    query: &'a InteractionQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Count interactions for many subjects of one type in a single query.
  ///
  /// Subjects without matching interactions may be absent from the map.
  fn count_many<'a>(
    &'a self,
    subject_type: &'a str,
    subject_ids: &'a [String],
    query: &'a InteractionQuery,
  ) -> impl Future<Output = Result<HashMap<String, u64>, Self::Error>> + Send + 'a;

  /// A subject's interactions matching `query`, newest date first.
  fn list<'a>(
    &'a self,
    subject: &'a SubjectRef,
    query: &'a InteractionQuery,
  ) -> impl Future<Output = Result<Vec<Interaction>, Self::Error>> + Send + 'a;

  /// The `limit` most interacted-with subjects of `subject_type`, by count
  /// descending and then subject id ascending.
  fn top<'a>(
    &'a self,
    subject_type: &'a str,
    query: &'a InteractionQuery,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Ranked<SubjectRef>>, Self::Error>> + Send + 'a;
}
