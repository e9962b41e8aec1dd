//! Process-wide, key-addressed cache of fetched collections.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::key::QueryKey;
#[cfg(test)]
use super::result::EntryState;
use super::result::FetchError;
use crate::api::ApiError;
use crate::config::CacheConfig;

type AnyData = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<AnyData, ApiError>>>;

/// Cache of fetched data with invalidation-on-mutation.
///
/// Cheap to clone; clones share the same entries.
///
/// Every entry carries a generation counter. `invalidate` bumps it, and a
/// fetch result is only stored when the generation is still the one the
/// fetch started under, so a read after an invalidation never resolves to
/// data from before it.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<HashMap<QueryKey, Entry>>>,
  stale_time: Duration,
  gc_time: Duration,
}

struct Entry {
  data: Option<AnyData>,
  fetched_at: Option<Instant>,
  stale: bool,
  generation: u64,
  subscribers: usize,
  last_used: Instant,
  inflight: Option<Inflight>,
}

struct Inflight {
  generation: u64,
  future: SharedFetch,
}

impl Entry {
  fn new() -> Self {
    Self {
      data: None,
      fetched_at: None,
      stale: false,
      generation: 0,
      subscribers: 0,
      last_used: Instant::now(),
      inflight: None,
    }
  }

  fn is_fresh(&self, stale_time: Duration) -> bool {
    self.data.is_some()
      && !self.stale
      && self
        .fetched_at
        .map(|t| t.elapsed() < stale_time)
        .unwrap_or(false)
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::from_config(&CacheConfig::default())
  }
}

impl QueryCache {
  pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
    Self {
      inner: Arc::new(Mutex::new(HashMap::new())),
      stale_time,
      gc_time,
    }
  }

  pub fn from_config(config: &CacheConfig) -> Self {
    Self::new(config.stale_time(), config.gc_time())
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    // a panic while holding the lock leaves the map itself consistent
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Read `key`, fetching through `fetcher` unless a fresh value is cached.
  ///
  /// Concurrent reads of the same key and generation share one fetch.
  /// Errors are returned to every waiting reader and never cached.
  pub async fn read<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, FetchError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let (future, generation) = {
      let mut entries = self.entries();
      let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
      entry.last_used = Instant::now();

      if entry.is_fresh(self.stale_time) {
        if let Some(data) = entry.data.as_ref().and_then(|d| d.downcast_ref::<T>()) {
          return Ok(data.clone());
        }
      }

      match &entry.inflight {
        Some(inflight) if inflight.generation == entry.generation => {
          debug!(%key, "joining in-flight fetch");
          (inflight.future.clone(), inflight.generation)
        }
        _ => {
          debug!(%key, generation = entry.generation, "fetching");
          let fetch = fetcher();
          let future = async move { fetch.await.map(|v| Arc::new(v) as AnyData) }
            .boxed()
            .shared();
          entry.inflight = Some(Inflight {
            generation: entry.generation,
            future: future.clone(),
          });
          (future, entry.generation)
        }
      }
    };

    let result = future.await;

    {
      let mut entries = self.entries();
      if let Some(entry) = entries.get_mut(key) {
        if entry
          .inflight
          .as_ref()
          .is_some_and(|f| f.generation == generation)
        {
          entry.inflight = None;
        }
        if let Ok(data) = &result {
          if entry.generation == generation {
            entry.data = Some(data.clone());
            entry.fetched_at = Some(Instant::now());
            entry.stale = false;
          } else {
            debug!(%key, generation, current = entry.generation, "dropping superseded result");
          }
        }
      }
    }

    let data = result.map_err(|source| FetchError {
      key: key.clone(),
      source,
    })?;

    data
      .downcast_ref::<T>()
      .cloned()
      .ok_or_else(|| FetchError {
        key: key.clone(),
        source: ApiError::Decode(format!("cached value for {} has a different type", key)),
      })
  }

  /// Mark every entry under `prefix` stale and bump its generation.
  ///
  /// Returns the number of entries touched.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.entries();
    let mut count = 0;
    for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
      entry.generation += 1;
      entry.stale = true;
      count += 1;
      debug!(%key, generation = entry.generation, "invalidated");
    }
    count
  }

  #[cfg(test)]
  pub fn state(&self, key: &QueryKey) -> EntryState {
    let entries = self.entries();
    match entries.get(key) {
      None => EntryState::Idle,
      Some(e) if e.inflight.is_some() => EntryState::Loading,
      Some(e) if e.data.is_none() => EntryState::Idle,
      Some(e) if e.is_fresh(self.stale_time) => EntryState::Fresh,
      Some(_) => EntryState::Stale,
    }
  }

  /// Current generation of `key` (0 for unknown keys).
  pub fn generation(&self, key: &QueryKey) -> u64 {
    self.entries().get(key).map(|e| e.generation).unwrap_or(0)
  }

  /// Last stored value of `key`, fresh or not.
  #[cfg(test)]
  pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    self
      .entries()
      .get(key)
      .and_then(|e| e.data.as_ref())
      .and_then(|d| d.downcast_ref::<T>())
      .cloned()
  }

  /// Register interest in `key`; the entry survives `gc` while the guard lives.
  pub fn subscribe(&self, key: &QueryKey) -> Subscription {
    let mut entries = self.entries();
    let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.subscribers += 1;
    entry.last_used = Instant::now();
    Subscription {
      cache: self.clone(),
      key: key.clone(),
    }
  }

  /// Drop unobserved entries idle longer than the GC time. Returns how many went.
  pub fn gc(&self) -> usize {
    let gc_time = self.gc_time;
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|_, e| {
      e.subscribers > 0 || e.inflight.is_some() || e.last_used.elapsed() < gc_time
    });
    let removed = before - entries.len();
    if removed > 0 {
      debug!(removed, "cache gc");
    }
    removed
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries().len()
  }
}

/// Keeps a cache entry alive while held.
pub struct Subscription {
  cache: QueryCache,
  key: QueryKey,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let mut entries = self.cache.entries();
    if let Some(entry) = entries.get_mut(&self.key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      entry.last_used = Instant::now();
    }
  }
}
