//! Query parameters shared by every read endpoint.
//!
//! `window=forever|day|week|month|year|last|between`, with `days` for `last`
//! and `from`/`to` for `between`. A missing `window` means `forever`.

use chrono::NaiveDate;
use popular_core::{interaction::Category, window::Window};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowParams {
  pub window:   Option<String>,
  pub days:     Option<u32>,
  pub from:     Option<NaiveDate>,
  pub to:       Option<NaiveDate>,
  pub category: Option<String>,
}

impl WindowParams {
  pub fn to_window(&self) -> Result<Window, ApiError> {
    let window = match self.window.as_deref().unwrap_or("forever") {
      "forever" => Window::Forever,
      "day" => Window::day(),
      "week" => Window::week(),
      "month" => Window::month(),
      "year" => Window::year(),
      "last" => Window::last(self.days.ok_or_else(|| {
        ApiError::BadRequest("window=last requires `days`".into())
      })?),
      "between" => match (self.from, self.to) {
        (Some(from), Some(to)) => Window::Between { from, to },
        _ => {
          return Err(ApiError::BadRequest(
            "window=between requires `from` and `to`".into(),
          ));
        }
      },
      other => {
        return Err(ApiError::BadRequest(format!("unknown window {other:?}")));
      }
    };
    Ok(window)
  }

  pub fn category(&self) -> Option<Category> {
    self
      .category
      .as_deref()
      .filter(|c| !c.is_empty())
      .map(Category::new)
  }
}
