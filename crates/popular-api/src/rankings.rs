//! Handlers for ranking endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/rank` | Body: [`RankBody`]; ranks the given subjects |
//! | `GET`  | `/popular/{type}` | Window params, `category`, `limit` (default 10, at most 1000) |

use axum::{
  Json,
  extract::{Path, State},
};
use popular_core::{
  Error,
  ranking::Ranked,
  store::InteractionStore,
  subject::SubjectRef,
};
use serde::Deserialize;

use crate::{
  AppState,
  error::ApiError,
  extract::{JsonBody, QueryParams},
  query::WindowParams,
};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 1_000;

// ─── Rank a collection ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RankBody {
  pub subject_type: String,
  pub subject_ids:  Vec<String>,
  #[serde(flatten)]
  pub window:       WindowParams,
}

/// `POST /rank`: the given subjects ordered by count, highest first; equal
/// counts keep request order.
pub async fn rank<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<RankBody>,
) -> Result<Json<Vec<Ranked<SubjectRef>>>, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  let subjects = body
    .subject_ids
    .iter()
    .map(|id| state.registry.resolve(&body.subject_type, id))
    .collect::<Result<Vec<_>, _>>()?;
  let window = state.checked_window(&body.window)?;

  let ranked = state
    .tracker
    .rank_popular(subjects, &window, body.window.category().as_ref())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ranked))
}

// ─── Top subjects of a type ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

/// `GET /popular/{type}[?window=...][&category=...][&limit=...]`
///
/// `limit` defaults to 10; larger values are capped at 1000.
pub async fn popular<S>(
  State(state): State<AppState<S>>,
  Path(subject_type): Path<String>,
  QueryParams(params): QueryParams<WindowParams>,
  QueryParams(LimitParams { limit }): QueryParams<LimitParams>,
) -> Result<Json<Vec<Ranked<SubjectRef>>>, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  if state.registry.get(&subject_type).is_none() {
    return Err(Error::UnknownSubjectType(subject_type).into());
  }
  let window = state.checked_window(&params)?;
  let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

  let top = state
    .tracker
    .top(&subject_type, &window, params.category().as_ref(), limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(top))
}
