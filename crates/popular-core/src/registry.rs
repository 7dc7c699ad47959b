//! The subject registry: the set of type tags a deployment tracks.
//!
//! Built once at startup. Raw `(type, id)` pairs arriving from outside the
//! process (HTTP requests, imports) are turned into [`SubjectRef`]s only
//! through [`SubjectRegistry::resolve`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, subject::SubjectRef};

/// The shape of a subject type's identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
  /// Signed 64-bit integer keys, normalised to canonical decimal text.
  #[default]
  Integer,
  /// Opaque string keys, used verbatim.
  Text,
}

/// A registered subject type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectType {
  pub tag:     String,
  #[serde(default)]
  pub id_kind: IdKind,
}

/// Maps each type tag to its [`SubjectType`].
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
  types: BTreeMap<String, SubjectType>,
}

impl SubjectRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register a type tag. Re-registering a tag replaces its id kind.
  pub fn register(mut self, tag: impl Into<String>, id_kind: IdKind) -> Self {
    let tag = tag.into();
    self.types.insert(tag.clone(), SubjectType { tag, id_kind });
    self
  }

  /// Build a registry from configured types.
  pub fn from_types(types: impl IntoIterator<Item = SubjectType>) -> Self {
    types
      .into_iter()
      .fold(Self::new(), |reg, t| reg.register(t.tag, t.id_kind))
  }

  pub fn get(&self, tag: &str) -> Option<&SubjectType> { self.types.get(tag) }

  pub fn tags(&self) -> impl Iterator<Item = &str> {
    self.types.keys().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool { self.types.is_empty() }

  /// Resolve a raw type tag and id into a validated [`SubjectRef`].
  pub fn resolve(&self, tag: &str, raw_id: &str) -> Result<SubjectRef> {
    let ty = self
      .types
      .get(tag)
      .ok_or_else(|| Error::UnknownSubjectType(tag.to_owned()))?;

    let raw_id = raw_id.trim();
    let id = match ty.id_kind {
      IdKind::Integer => raw_id
        .parse::<i64>()
        .map_err(|_| {
          Error::InvalidSubject(format!("{tag} ids are integers, got {raw_id:?}"))
        })?
        .to_string(),
      IdKind::Text => raw_id.to_owned(),
    };

    SubjectRef::new(ty.tag.clone(), id)
  }
}
