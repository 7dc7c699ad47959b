//! Server wiring for Popular: configuration, state bootstrap and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use popular_api::{AppState, ContextConfig, api_router};
use popular_core::{
  Error,
  registry::{SubjectRegistry, SubjectType},
  store::InteractionStore,
  tracker::Tracker,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `POPULAR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Subject types accepted by the API.
  #[serde(default)]
  pub subject_types:       Vec<SubjectType>,
  /// Trusted header carrying the authenticated user id.
  #[serde(default)]
  pub user_header:         Option<String>,
  #[serde(default)]
  pub trust_forwarded_for: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/popular/popular.db") }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn registry(&self) -> SubjectRegistry {
    SubjectRegistry::from_types(self.subject_types.iter().cloned())
  }

  pub fn context(&self) -> ContextConfig {
    ContextConfig {
      user_header:         self.user_header.clone(),
      trust_forwarded_for: self.trust_forwarded_for,
    }
  }

  /// Build handler state around an opened store.
  pub fn state<S>(&self, store: S) -> AppState<S>
  where
    S: InteractionStore,
    S::Error: From<Error>,
  {
    AppState {
      tracker:  Tracker::new(Arc::new(store)),
      registry: Arc::new(self.registry()),
      context:  Arc::new(self.context()),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: InteractionStore + 'static,
  S::Error: From<Error>,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
