//! Subjects: the tracked entities.
//!
//! One ledger holds interactions for many unrelated kinds of entity, so a
//! subject is referenced by a `(subject_type, subject_id)` pair rather than by
//! a concrete Rust type. Host types opt in by implementing [`Trackable`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A polymorphic reference to a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
  /// Type discriminator, e.g. `"post"` or `"video"`.
  pub subject_type: String,
  /// The entity's key, stored as text so both integer and string keys fit.
  pub subject_id:   String,
}

impl SubjectRef {
  /// Build a reference, rejecting empty type tags and ids.
  pub fn new(
    subject_type: impl Into<String>,
    subject_id: impl Into<String>,
  ) -> Result<Self> {
    let subject_type = subject_type.into();
    let subject_id = subject_id.into();

    if subject_type.trim().is_empty() {
      return Err(Error::InvalidSubject("subject type is empty".into()));
    }
    if subject_id.trim().is_empty() {
      return Err(Error::InvalidSubject(format!(
        "{subject_type} has no identifier"
      )));
    }

    Ok(Self { subject_type, subject_id })
  }
}

impl fmt::Display for SubjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.subject_type, self.subject_id)
  }
}

// ─── Trackable ───────────────────────────────────────────────────────────────

/// Capability implemented by any entity whose visits and interactions are
/// tracked.
///
/// The tracker never sees concrete entity types, only this interface.
pub trait Trackable {
  /// The type tag stored in `subject_type`.
  fn subject_type(&self) -> &str;

  /// The entity's key, or `None` if it has not been assigned one yet (for
  /// example an entity that was never persisted).
  fn subject_id(&self) -> Option<String>;

  /// Resolve this entity into a validated [`SubjectRef`].
  fn subject_ref(&self) -> Result<SubjectRef> {
    let id = self.subject_id().ok_or_else(|| {
      Error::InvalidSubject(format!("{} has no identifier", self.subject_type()))
    })?;
    SubjectRef::new(self.subject_type(), id)
  }
}

impl Trackable for SubjectRef {
  fn subject_type(&self) -> &str { &self.subject_type }

  fn subject_id(&self) -> Option<String> { Some(self.subject_id.clone()) }

  fn subject_ref(&self) -> Result<SubjectRef> {
    SubjectRef::new(self.subject_type.clone(), self.subject_id.clone())
  }
}

impl<T: Trackable + ?Sized> Trackable for &T {
  fn subject_type(&self) -> &str { (**self).subject_type() }

  fn subject_id(&self) -> Option<String> { (**self).subject_id() }

  fn subject_ref(&self) -> Result<SubjectRef> { (**self).subject_ref() }
}
