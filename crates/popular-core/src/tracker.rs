//! [`Tracker`]: the ledger writer and popularity aggregator.
//!
//! A tracker wraps an [`InteractionStore`] with a [`Clock`]. It validates
//! subjects, stamps writes with today's date and resolves [`Window`] policies
//! before anything reaches the store.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
  Error,
  clock::{Clock, SystemClock},
  interaction::{Category, Interaction, NewInteraction},
  ranking::{Ranked, rank},
  store::{InteractionQuery, InteractionStore},
  subject::{SubjectRef, Trackable},
  visitor::Visitor,
  window::Window,
};

/// One row of a [`Tracker::record_batch`] call.
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
  pub subject:  T,
  pub category: Category,
  pub visitor:  Visitor,
}

/// Records interactions and answers popularity questions.
///
/// Cloning is cheap; the store and clock are reference-counted.
pub struct Tracker<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S> Clone for Tracker<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone() }
  }
}

impl<S> Tracker<S>
where
  S: InteractionStore,
  S::Error: From<Error>,
{
  /// A tracker dating interactions by the UTC calendar.
  pub fn new(store: Arc<S>) -> Self {
    Self { store, clock: Arc::new(SystemClock) }
  }

  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  fn query(
    &self,
    window: &Window,
    category: Option<&Category>,
  ) -> Result<InteractionQuery, Error> {
    Ok(InteractionQuery {
      range:    window.resolve(self.today())?,
      category: category.cloned(),
    })
  }

  // ── Ledger writer ─────────────────────────────────────────────────────────

  /// Record that `visitor` interacted with `subject` today.
  ///
  /// Idempotent per day: a repeat call for the same visitor, subject and
  /// category refreshes the existing row's `updated_at` only.
  pub async fn record_interaction<T: Trackable>(
    &self,
    subject: &T,
    category: Category,
    visitor: &Visitor,
  ) -> Result<Interaction, S::Error> {
    let input = NewInteraction {
      visitor: visitor.clone(),
      subject: subject.subject_ref()?,
      category,
      date: self.today(),
    };

    tracing::debug!(
      subject = %input.subject,
      category = %input.category,
      visitor = %input.visitor,
      "recording interaction"
    );
    self.store.upsert(input).await
  }

  /// Record a plain visit (the default `"visit"` category).
  pub async fn visit<T: Trackable>(
    &self,
    subject: &T,
    visitor: &Visitor,
  ) -> Result<Interaction, S::Error> {
    self.record_interaction(subject, Category::visit(), visitor).await
  }

  /// Record many interactions in one store round-trip.
  ///
  /// Returns one result per entry, in order. Entries with an invalid subject
  /// fail individually and never reach the store.
  pub async fn record_batch<T: Trackable>(
    &self,
    entries: Vec<BatchEntry<T>>,
  ) -> Result<Vec<Result<Interaction, S::Error>>, S::Error> {
    let today = self.today();

    let mut results: Vec<Option<Result<Interaction, S::Error>>> =
      Vec::with_capacity(entries.len());
    let mut valid = Vec::new();
    let mut slots = Vec::new();

    for entry in entries {
      match entry.subject.subject_ref() {
        Ok(subject) => {
          slots.push(results.len());
          results.push(None);
          valid.push(NewInteraction {
            visitor: entry.visitor,
            subject,
            category: entry.category,
            date: today,
          });
        }
        Err(e) => results.push(Some(Err(S::Error::from(e)))),
      }
    }

    let rejected = results.len() - valid.len();
    if rejected > 0 {
      tracing::warn!(rejected, "batch entries rejected before reaching the store");
    }

    if !valid.is_empty() {
      let expected = valid.len();
      let written = self.store.upsert_batch(valid).await?;
      if written.len() != expected {
        tracing::error!(expected, returned = written.len(), "store dropped batch results");
        return Err(
          Error::IncompleteBatch { expected, returned: written.len() }.into(),
        );
      }
      for (slot, result) in slots.into_iter().zip(written) {
        results[slot] = Some(result);
      }
    }

    Ok(results.into_iter().flatten().collect())
  }

  // ── Per-subject counts ────────────────────────────────────────────────────

  /// Count `subject`'s interactions under `window`, optionally restricted to
  /// one category.
  pub async fn count<T: Trackable>(
    &self,
    subject: &T,
    window: &Window,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    let subject = subject.subject_ref()?;
    let query = self.query(window, category)?;
    self.store.count(&subject, &query).await
  }

  pub async fn count_forever<T: Trackable>(
    &self,
    subject: &T,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::Forever, category).await
  }

  /// Interactions dated on or after `today - days`.
  pub async fn count_last<T: Trackable>(
    &self,
    subject: &T,
    days: u32,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::last(days), category).await
  }

  /// Interactions dated within `[from, to]`, both ends inclusive.
  pub async fn count_between<T: Trackable>(
    &self,
    subject: &T,
    from: NaiveDate,
    to: NaiveDate,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::Between { from, to }, category).await
  }

  pub async fn count_day<T: Trackable>(
    &self,
    subject: &T,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::day(), category).await
  }

  pub async fn count_week<T: Trackable>(
    &self,
    subject: &T,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::week(), category).await
  }

  pub async fn count_month<T: Trackable>(
    &self,
    subject: &T,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::month(), category).await
  }

  pub async fn count_year<T: Trackable>(
    &self,
    subject: &T,
    category: Option<&Category>,
  ) -> Result<u64, S::Error> {
    self.count(subject, &Window::year(), category).await
  }

  /// The raw interaction history behind [`count`](Self::count).
  pub async fn interactions<T: Trackable>(
    &self,
    subject: &T,
    window: &Window,
    category: Option<&Category>,
  ) -> Result<Vec<Interaction>, S::Error> {
    let subject = subject.subject_ref()?;
    let query = self.query(window, category)?;
    self.store.list(&subject, &query).await
  }

  // ── Rankings ──────────────────────────────────────────────────────────────

  /// Order `subjects` by their interaction count under `window`, highest
  /// first. Equal counts keep input order.
  ///
  /// All subjects must share one type tag.
  pub async fn rank_popular<T: Trackable>(
    &self,
    subjects: Vec<T>,
    window: &Window,
    category: Option<&Category>,
  ) -> Result<Vec<Ranked<T>>, S::Error> {
    if subjects.is_empty() {
      return Ok(Vec::new());
    }

    let refs = subjects
      .iter()
      .map(|s| s.subject_ref())
      .collect::<Result<Vec<SubjectRef>, Error>>()?;

    let subject_type = refs[0].subject_type.clone();
    if let Some(other) = refs.iter().find(|r| r.subject_type != subject_type) {
      return Err(
        Error::MixedSubjectTypes {
          first: subject_type,
          other: other.subject_type.clone(),
        }
        .into(),
      );
    }

    let query = self.query(window, category)?;
    let ids: Vec<String> = refs.into_iter().map(|r| r.subject_id).collect();
    let counts = self.store.count_many(&subject_type, &ids, &query).await?;

    Ok(rank(ids.into_iter().zip(subjects).collect(), &counts))
  }

  /// [`rank_popular`](Self::rank_popular) over every interaction ever
  /// recorded, in every category.
  pub async fn rank_all_time<T: Trackable>(
    &self,
    subjects: Vec<T>,
  ) -> Result<Vec<Ranked<T>>, S::Error> {
    self.rank_popular(subjects, &Window::Forever, None).await
  }

  /// The `limit` most popular subjects of `subject_type` across the whole
  /// ledger.
  pub async fn top(
    &self,
    subject_type: &str,
    window: &Window,
    category: Option<&Category>,
    limit: usize,
  ) -> Result<Vec<Ranked<SubjectRef>>, S::Error> {
    let query = self.query(window, category)?;
    self.store.top(subject_type, &query, limit).await
  }
}
