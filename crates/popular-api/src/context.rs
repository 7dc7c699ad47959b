//! The HTTP request context provider.
//!
//! Turns request headers and the TCP peer into a
//! [`RequestContext`](popular_core::visitor::RequestContext). The
//! authenticated principal comes from a trusted header set by an upstream
//! auth proxy; this crate does no authentication of its own.

use std::{
  convert::Infallible,
  net::{IpAddr, SocketAddr},
};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, request::Parts},
};
use popular_core::{store::InteractionStore, visitor::RequestContext};
use serde::Deserialize;

use crate::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// How visitor identity is read from requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextConfig {
  /// Header carrying the authenticated user's id, e.g. `x-authenticated-user`.
  #[serde(default)]
  pub user_header:         Option<String>,
  /// Take the client address from the first `X-Forwarded-For` entry instead
  /// of the TCP peer. Only enable behind a proxy that sets it.
  #[serde(default)]
  pub trust_forwarded_for: bool,
}

impl ContextConfig {
  pub fn resolve(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> RequestContext {
    let user_id = self
      .user_header
      .as_deref()
      .and_then(|name| headers.get(name.to_ascii_lowercase().as_str()))
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(str::to_owned);

    let forwarded = self
      .trust_forwarded_for
      .then(|| forwarded_for(headers))
      .flatten();

    RequestContext { user_id, address: forwarded.or(peer) }
  }
}

/// The left-most (client) address of `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
  headers
    .get(FORWARDED_FOR)?
    .to_str()
    .ok()?
    .split(',')
    .next()?
    .trim()
    .parse()
    .ok()
}

/// Extractor yielding the caller's [`RequestContext`].
pub struct Requester(pub RequestContext);

impl<S> FromRequestParts<AppState<S>> for Requester
where
  S: InteractionStore + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let peer = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip());
    Ok(Requester(state.context.resolve(&parts.headers, peer)))
  }
}
