//! Poll-driven handles onto the query cache for use inside views.
//!
//! Inspired by TanStack Query, `Query<T>` reads a cache key through a fetcher,
//! tracks loading/success/error for rendering and refetches by itself when the
//! key is invalidated. `Mutation<T>` runs one background write at a time.
//!
//! # Example
//!
//! ```ignore
//! let resource = ctx.resource::<Product>();
//! let params = ctx.scope.list_params(Product::SCOPED);
//! let key = QueryKey::list(Product::RESOURCE, &params);
//! let mut query = Query::new(ctx.cache.clone(), key, move || {
//!     let resource = resource.clone();
//!     let params = params.clone();
//!     async move { resource.list(params).await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading(_) => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::api::ApiError;
use crate::cache::{FetchError, QueryCache, QueryKey, Subscription};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching; holds the previous data during a refetch
  Loading(Option<T>),
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(FetchError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading(_))
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  /// Latest data, including data kept while a refetch is running
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) | QueryState::Loading(Some(data)) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&FetchError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  fn into_data(self) -> Option<T> {
    match self {
      QueryState::Success(data) | QueryState::Loading(Some(data)) => Some(data),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, ApiError>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query bound to one cache key.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure), run through the shared cache
/// - Loading/success/error states
/// - Async result handling via channels
/// - A cache subscription, so the entry outlives gc while the view is open
pub struct Query<T> {
  state: QueryState<T>,
  key: QueryKey,
  cache: QueryCache,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, FetchError>>>,
  /// Cache generation the running (or last) fetch started under
  generation: u64,
  _subscription: Subscription,
}

impl<T: Clone + Send + Sync + 'static> Query<T> {
  /// Create a new query reading `key` through `fetcher`.
  ///
  /// The fetcher is a closure that returns a future. It is only called when
  /// the cache has no fresh value for the key.
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let subscription = cache.subscribe(&key);
    Self {
      state: QueryState::Idle,
      generation: cache.generation(&key),
      key,
      cache,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      _subscription: subscription,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if any has been loaded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  #[cfg(test)]
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error if the query failed.
  #[cfg(test)]
  pub fn error(&self) -> Option<&FetchError> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Invalidate the key and fetch again, even if data exists.
  pub fn refetch(&mut self) {
    self.cache.invalidate(&self.key);
    // Drop the pending result; it belongs to the old generation
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Also starts a refetch when the key was invalidated since the last
  /// fetch began. Returns `true` if the state changed.
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return self.refetch_if_invalidated();
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        self.refetch_if_invalidated();
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error(FetchError {
          key: self.key.clone(),
          source: ApiError::Network("request was cancelled".into()),
        });
        self.receiver = None;
        true
      }
    }
  }

  fn refetch_if_invalidated(&mut self) -> bool {
    // auth failures wait for an explicit refetch
    if self.state.error().is_some_and(|e| e.source.is_auth()) {
      return false;
    }
    let settled = self.state.is_success() || self.state.is_error();
    if settled && self.cache.generation(&self.key) != self.generation {
      self.start_fetch();
      return true;
    }
    false
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.generation = self.cache.generation(&self.key);

    let previous = std::mem::replace(&mut self.state, QueryState::Idle).into_data();
    self.state = QueryState::Loading(previous);

    let cache = self.cache.clone();
    let key = self.key.clone();
    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = cache.read(&key, move || future).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("generation", &self.generation)
      .finish_non_exhaustive()
  }
}

/// One background write at a time, polled like a `Query`.
pub struct Mutation<T> {
  receiver: Option<mpsc::UnboundedReceiver<T>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Run `future` in the background. Returns `false` (and does nothing) while
  /// a previous mutation is still pending.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = T> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// Take the outcome once the mutation has finished.
  pub fn poll(&mut self) -> Option<T> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(output) => {
        self.receiver = None;
        Some(output)
      }
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  fn key() -> QueryKey {
    QueryKey::resource("numbers")
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(QueryCache::default(), key(), || async {
      Ok::<_, ApiError>(vec![1, 2, 3])
    });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(QueryCache::default(), key(), || async {
      Err(ApiError::NotFound("gone".into()))
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert!(query.error().unwrap().source.is_not_found());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let mut query = Query::new(QueryCache::default(), key(), move || {
      let c = c.clone();
      async move {
        c.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ApiError>(42)
      }
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch_on_poll() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let mut query = Query::new(cache.clone(), key(), move || {
      let c = c.clone();
      async move { Ok::<_, ApiError>(c.fetch_add(1, Ordering::SeqCst)) }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    // A mutation elsewhere invalidates the resource
    cache.invalidate(&QueryKey::resource("numbers"));
    assert!(query.poll());
    // Previous rows stay visible while reloading
    assert!(query.is_loading());
    assert_eq!(query.data(), Some(&0));

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_failed_query_recovers_after_invalidation() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let mut query = Query::new(cache.clone(), key(), move || {
      let c = c.clone();
      async move {
        match c.fetch_add(1, Ordering::SeqCst) {
          0 => Err(ApiError::NotFound("gone".into())),
          n => Ok(n),
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_error());

    cache.invalidate(&key());
    assert!(query.poll());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_auth_error_not_retried_on_invalidation() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let mut query = Query::new(cache.clone(), key(), move || {
      let c = c.clone();
      async move {
        c.fetch_add(1, Ordering::SeqCst);
        Err::<u32, _>(ApiError::Unauthorized("token expired".into()))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_error());

    cache.invalidate(&key());
    assert!(!query.poll());
    assert!(query.is_error());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_refetch_bypasses_fresh_cache() {
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let mut query = Query::new(QueryCache::default(), key(), move || {
      let c = c.clone();
      async move { Ok::<_, ApiError>(c.fetch_add(1, Ordering::SeqCst)) }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_mutation_single_flight() {
    let mut mutation: Mutation<u32> = Mutation::new();
    assert!(mutation.start(async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      7
    }));
    assert!(mutation.is_pending());
    assert!(!mutation.start(async { 8 }));

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(mutation.poll(), Some(7));
    assert!(!mutation.is_pending());
  }
}
