//! Error and state types returned by the query cache.

use thiserror::Error;

use super::key::QueryKey;
use crate::api::ApiError;

/// Freshness of one cache entry.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
  /// Never fetched successfully and nothing in flight
  Idle,
  /// A fetch is in flight
  Loading,
  Fresh,
  /// Invalidated or older than the stale time
  Stale,
}

/// A fetch that failed; the entry keeps whatever it had before.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {key}: {source}")]
pub struct FetchError {
  pub key: QueryKey,
  #[source]
  pub source: ApiError,
}

impl FetchError {
  /// Text for list placeholders.
  pub fn display_message(&self) -> String {
    self.source.notification().text()
  }
}
