//! Window policies: the one place day arithmetic happens.
//!
//! Every read (single-subject counts, histories, rankings) resolves its
//! [`Window`] into a [`DateRange`] with [`Window::resolve`] and hands the
//! range to the store, which applies it as an inclusive `date` predicate.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which interactions a read considers.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
  /// Every interaction ever recorded.
  #[default]
  Forever,
  /// Interactions dated on or after `today - days`.
  LastDays { days: u32 },
  /// Interactions dated within `[from, to]`, both ends inclusive.
  Between { from: NaiveDate, to: NaiveDate },
}

impl Window {
  pub const fn last(days: u32) -> Self { Self::LastDays { days } }

  pub const fn day() -> Self { Self::last(1) }

  pub const fn week() -> Self { Self::last(7) }

  pub const fn month() -> Self { Self::last(30) }

  pub const fn year() -> Self { Self::last(365) }

  /// Resolve the policy against `today`.
  pub fn resolve(&self, today: NaiveDate) -> Result<DateRange> {
    match *self {
      Self::Forever => Ok(DateRange::UNBOUNDED),
      Self::LastDays { days } => {
        let from = today.checked_sub_days(Days::new(days.into())).ok_or_else(
          || Error::InvalidWindow(format!("{days} days before {today} is out of range")),
        )?;
        Ok(DateRange { from: Some(from), to: None })
      }
      Self::Between { from, to } => {
        if from > to {
          return Err(Error::InvalidWindow(format!("{from} is after {to}")));
        }
        Ok(DateRange { from: Some(from), to: Some(to) })
      }
    }
  }
}

/// Inclusive bounds on the `date` column; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

impl DateRange {
  pub const UNBOUNDED: Self = Self { from: None, to: None };

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from.is_none_or(|f| date >= f) && self.to.is_none_or(|t| date <= t)
  }
}
