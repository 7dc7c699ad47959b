//! Error types for `popular-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The subject has no usable identifier or type tag.
  #[error("invalid subject: {0}")]
  InvalidSubject(String),

  #[error("unknown subject type: {0:?}")]
  UnknownSubjectType(String),

  /// A ranking was requested over subjects of more than one type.
  #[error("cannot rank subjects of different types: {first:?} and {other:?}")]
  MixedSubjectTypes { first: String, other: String },

  #[error("invalid window: {0}")]
  InvalidWindow(String),

  /// Neither an explicit visitor, an authenticated principal nor a network
  /// address was available.
  #[error("cannot resolve visitor: no identity or address in request context")]
  UnresolvedVisitor,

  /// A backend answered a batch with the wrong number of results.
  #[error("store returned {returned} results for a batch of {expected}")]
  IncompleteBatch { expected: usize, returned: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
