//! Visitors and the request context they are resolved from.

use std::{fmt, net::IpAddr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix used to encode an authenticated principal as a visitor string.
pub const USER_PREFIX: &str = "user_";

/// Who is making a request, as supplied by the host application.
///
/// The ledger never reads ambient authentication or network state; callers
/// build this explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
  /// Identifier of the authenticated principal, if any.
  pub user_id: Option<String>,
  /// Network address of the caller, if known.
  pub address: Option<IpAddr>,
}

/// The identity an interaction is attributed to: `user_<id>` for an
/// authenticated principal, otherwise a raw network address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Visitor(String);

impl Visitor {
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.trim().is_empty() {
      return Err(Error::UnresolvedVisitor);
    }
    Ok(Self(raw))
  }

  pub fn user(user_id: impl fmt::Display) -> Self {
    Self(format!("{USER_PREFIX}{user_id}"))
  }

  pub fn address(addr: IpAddr) -> Self { Self(addr.to_string()) }

  /// Pick the visitor for a request.
  ///
  /// A non-empty `explicit` visitor wins; otherwise the authenticated
  /// principal; otherwise the network address.
  pub fn resolve(explicit: Option<&str>, ctx: &RequestContext) -> Result<Self> {
    if let Some(v) = explicit.filter(|v| !v.trim().is_empty()) {
      return Ok(Self(v.to_owned()));
    }
    if let Some(user_id) = ctx.user_id.as_deref().filter(|u| !u.is_empty()) {
      return Ok(Self::user(user_id));
    }
    ctx.address.map(Self::address).ok_or(Error::UnresolvedVisitor)
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_user(&self) -> bool { self.0.starts_with(USER_PREFIX) }
}

impl fmt::Display for Visitor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
