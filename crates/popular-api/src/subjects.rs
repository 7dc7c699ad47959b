//! Handlers for per-subject reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/{type}/{id}/count` | Window params + optional `category` |
//! | `GET`  | `/subjects/{type}/{id}/interactions` | Same params; newest first |

use axum::{
  Json,
  extract::{Path, State},
};
use popular_core::{
  Error,
  interaction::Interaction,
  store::InteractionStore,
  subject::SubjectRef,
  window::Window,
};
use serde::Serialize;

use crate::{AppState, error::ApiError, extract::QueryParams, query::WindowParams};

#[derive(Debug, Serialize)]
pub struct CountResponse {
  #[serde(flatten)]
  pub subject:  SubjectRef,
  pub window:   Window,
  pub category: Option<String>,
  pub count:    u64,
}

/// `GET /subjects/{type}/{id}/count[?window=...][&days=...][&from=...&to=...][&category=...]`
pub async fn count<S>(
  State(state): State<AppState<S>>,
  Path((subject_type, subject_id)): Path<(String, String)>,
  QueryParams(params): QueryParams<WindowParams>,
) -> Result<Json<CountResponse>, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  let subject = state.registry.resolve(&subject_type, &subject_id)?;
  let window = state.checked_window(&params)?;
  let category = params.category();

  let count = state
    .tracker
    .count(&subject, &window, category.as_ref())
    .await
    .map_err(ApiError::store)?;

  Ok(Json(CountResponse {
    subject,
    window,
    category: category.map(|c| c.as_str().to_owned()),
    count,
  }))
}

/// `GET /subjects/{type}/{id}/interactions[?window=...][&category=...]`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path((subject_type, subject_id)): Path<(String, String)>,
  QueryParams(params): QueryParams<WindowParams>,
) -> Result<Json<Vec<Interaction>>, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  let subject = state.registry.resolve(&subject_type, &subject_id)?;
  let window = state.checked_window(&params)?;

  let interactions = state
    .tracker
    .interactions(&subject, &window, params.category().as_ref())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(interactions))
}
