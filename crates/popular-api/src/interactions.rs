//! Handlers for `/interactions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/interactions` | Body: [`RecordBody`]; returns 201 + stored interaction |
//! | `POST` | `/interactions/batch` | Body: `{"items":[RecordBody…]}`; one outcome per item |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use popular_core::{
  Error,
  interaction::{Category, Interaction},
  store::InteractionStore,
  subject::SubjectRef,
  tracker::BatchEntry,
  visitor::{RequestContext, Visitor},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, context::Requester, error::ApiError, extract::JsonBody};

/// JSON body accepted by `POST /interactions`, and each item of a batch.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub subject_type: String,
  pub subject_id:   String,
  /// Defaults to `"visit"`.
  pub category:     Option<String>,
  /// Overrides the visitor derived from the request.
  pub visitor:      Option<String>,
}

impl RecordBody {
  fn resolve<S: InteractionStore>(
    &self,
    state: &AppState<S>,
    ctx: &RequestContext,
  ) -> Result<BatchEntry<SubjectRef>, Error> {
    Ok(BatchEntry {
      subject:  state.registry.resolve(&self.subject_type, &self.subject_id)?,
      category: self
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map_or_else(Category::visit, Category::new),
      visitor:  Visitor::resolve(self.visitor.as_deref(), ctx)?,
    })
  }
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// `POST /interactions`: returns 201 + the stored [`Interaction`].
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Requester(ctx): Requester,
  JsonBody(body): JsonBody<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  let entry = body.resolve(&state, &ctx)?;
  let interaction = state
    .tracker
    .record_interaction(&entry.subject, entry.category, &entry.visitor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(interaction)))
}

// ─── Batch ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  pub items: Vec<RecordBody>,
}

/// The result of one batch item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
  Ok(Interaction),
  Error(String),
}

/// `POST /interactions/batch`: items fail individually; the response lists
/// one [`BatchOutcome`] per item, in order.
pub async fn batch<S>(
  State(state): State<AppState<S>>,
  Requester(ctx): Requester,
  JsonBody(body): JsonBody<BatchBody>,
) -> Result<Json<Vec<BatchOutcome>>, ApiError>
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  let mut outcomes: Vec<Option<BatchOutcome>> = Vec::with_capacity(body.items.len());
  let mut entries = Vec::new();
  let mut slots = Vec::new();

  for item in &body.items {
    match item.resolve(&state, &ctx) {
      Ok(entry) => {
        slots.push(outcomes.len());
        outcomes.push(None);
        entries.push(entry);
      }
      Err(e) => outcomes.push(Some(BatchOutcome::Error(e.to_string()))),
    }
  }

  if !entries.is_empty() {
    let written = state
      .tracker
      .record_batch(entries)
      .await
      .map_err(ApiError::store)?;
    for (slot, result) in slots.into_iter().zip(written) {
      outcomes[slot] = Some(match result {
        Ok(interaction) => BatchOutcome::Ok(interaction),
        Err(e) => BatchOutcome::Error(e.to_string()),
      });
    }
  }

  Ok(Json(outcomes.into_iter().flatten().collect()))
}
