//! Ordering subjects by interaction count.

use std::collections::HashMap;

use serde::Serialize;

/// A subject paired with its interaction count under some window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked<T> {
  pub subject: T,
  pub count:   u64,
}

/// Order keyed subjects by count, highest first.
///
/// Each entry's key is looked up in `counts`; missing keys count as zero.
/// The sort is stable, so subjects with equal counts keep their input order.
pub fn rank<T>(
  entries: Vec<(String, T)>,
  counts: &HashMap<String, u64>,
) -> Vec<Ranked<T>> {
  let mut ranked: Vec<Ranked<T>> = entries
    .into_iter()
    .map(|(key, subject)| Ranked {
      subject,
      count: counts.get(&key).copied().unwrap_or(0),
    })
    .collect();

  ranked.sort_by(|a, b| b.count.cmp(&a.count));
  ranked
}
