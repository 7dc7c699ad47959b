//! JSON REST API for Popular.
//!
//! Exposes an axum [`Router`] backed by any
//! [`InteractionStore`](popular_core::store::InteractionStore). TLS and
//! authentication are the caller's responsibility; the authenticated user is
//! taken from a trusted header (see [`context::ContextConfig`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", popular_api::api_router(state))
//! ```

pub mod context;
pub mod error;
pub mod extract;
pub mod interactions;
pub mod query;
pub mod rankings;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use popular_core::{
  Error,
  registry::SubjectRegistry,
  store::InteractionStore,
  tracker::Tracker,
  window::Window,
};

pub use context::ContextConfig;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub tracker:  Tracker<S>,
  pub registry: Arc<SubjectRegistry>,
  pub context:  Arc<ContextConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      tracker:  self.tracker.clone(),
      registry: self.registry.clone(),
      context:  self.context.clone(),
    }
  }
}

impl<S> AppState<S>
where
  S: InteractionStore,
  S::Error: From<Error>,
{
  /// Parse the request's window and check it resolves against today, so an
  /// impossible window is a 400 rather than a store failure.
  fn checked_window(&self, params: &query::WindowParams) -> Result<Window, ApiError> {
    let window = params.to_window()?;
    window.resolve(self.tracker.today())?;
    Ok(window)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  Router::new()
    // Ledger writer
    .route("/interactions", post(interactions::create::<S>))
    .route("/interactions/batch", post(interactions::batch::<S>))
    // Per-subject reads
    .route(
      "/subjects/{subject_type}/{subject_id}/count",
      get(subjects::count::<S>),
    )
    .route(
      "/subjects/{subject_type}/{subject_id}/interactions",
      get(subjects::history::<S>),
    )
    // Rankings
    .route("/rank", post(rankings::rank::<S>))
    .route("/popular/{subject_type}", get(rankings::popular::<S>))
    .with_state(state)
}
